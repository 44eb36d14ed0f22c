//! Compiles a [`FormDefinition`] into one composed validator per field.
//!
//! Every validator runs the same stages in a fixed order: type coercion, the
//! required/optional gate, the type check, the user rules left to right, and
//! finally the conditional-display gate evaluated against the other fields.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::rules::{EMAIL_PATTERN, PreparedRule, RuleRegistry, text_of};
use crate::spec::field::{Field, FieldType};
use crate::spec::form::{FormDefinition, Section};
use crate::visibility::matches_expected;

/// Current value of every field, keyed by field id.
pub type FieldValues = BTreeMap<String, Value>;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const EMAIL_MESSAGE: &str = "Invalid email address";
pub const NUMBER_MESSAGE: &str = "Must be a number";
pub const TEL_MESSAGE: &str = "Invalid phone number";
pub const DATE_MESSAGE: &str = "Invalid date";
pub const OPTION_MESSAGE: &str = "Select a valid option";
pub const BOOLEAN_MESSAGE: &str = "Must be true or false";
pub const TEXT_MESSAGE: &str = "Expected text";

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("digit pattern is valid"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("phone pattern is valid"));

/// Outcome of one composed validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Gate {
    Always,
    When { depends_on: String, value: String },
    /// The dependency does not exist, so the condition can never hold.
    Never,
}

/// Validator for a single field.
#[derive(Debug, Clone)]
pub struct CompiledField {
    field: Field,
    section_id: String,
    rules: Vec<PreparedRule>,
    gate: Gate,
}

impl CompiledField {
    pub fn id(&self) -> &str {
        &self.field.id
    }

    pub fn label(&self) -> &str {
        &self.field.label
    }

    pub fn kind(&self) -> FieldType {
        self.field.kind
    }

    pub fn required(&self) -> bool {
        self.field.required
    }

    /// The declaration this validator was compiled from.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Id of the innermost section declaring the field.
    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    pub fn rules(&self) -> &[PreparedRule] {
        &self.rules
    }

    pub fn is_conditional(&self) -> bool {
        self.gate != Gate::Always
    }

    /// Applies type defaults: checkboxes read as `false` until set, `null`
    /// means absent.
    pub fn coerce(&self, raw: Option<&Value>) -> Option<Value> {
        match (self.field.kind, raw) {
            (FieldType::Checkbox, None | Some(Value::Null)) => Some(Value::Bool(false)),
            (FieldType::Checkbox, Some(Value::String(text))) => match text.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => Some(Value::String(text.clone())),
            },
            (_, None | Some(Value::Null)) => None,
            (_, Some(value)) => Some(value.clone()),
        }
    }

    /// Runs the required gate, type check and user rules, ignoring the
    /// conditional-display gate.
    pub fn check(&self, raw: Option<&Value>) -> FieldResult {
        let Some(value) = self.coerce(raw).filter(|value| !is_blank(value)) else {
            return if self.field.required {
                FieldResult::fail(REQUIRED_MESSAGE)
            } else {
                FieldResult::ok()
            };
        };

        if let Some(message) = self.type_error(&value) {
            return FieldResult::fail(message);
        }

        match self.rules.iter().find(|rule| !rule.test(&value)) {
            Some(rule) => FieldResult::fail(rule.message()),
            None => FieldResult::ok(),
        }
    }

    fn type_error(&self, value: &Value) -> Option<&'static str> {
        let accepted = match self.field.kind {
            FieldType::Text | FieldType::File | FieldType::Country => value.is_string(),
            FieldType::Email => value.as_str().is_some_and(|text| EMAIL_PATTERN.is_match(text)),
            FieldType::Number => text_of(value).is_some_and(|text| DIGITS.is_match(&text)),
            FieldType::Tel => value.as_str().is_some_and(|text| PHONE.is_match(text)),
            FieldType::Date => value
                .as_str()
                .is_some_and(|text| NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()),
            FieldType::Checkbox => value.is_boolean(),
            FieldType::Select | FieldType::Radio => match value.as_str() {
                Some(text) => {
                    if self.field.options.is_empty()
                        || self.field.options.iter().any(|option| option.value == text)
                    {
                        true
                    } else {
                        return Some(OPTION_MESSAGE);
                    }
                }
                None => false,
            },
        };

        if accepted {
            None
        } else {
            Some(type_message(self.field.kind))
        }
    }
}

fn type_message(kind: FieldType) -> &'static str {
    match kind {
        FieldType::Email => EMAIL_MESSAGE,
        FieldType::Number => NUMBER_MESSAGE,
        FieldType::Tel => TEL_MESSAGE,
        FieldType::Date => DATE_MESSAGE,
        FieldType::Checkbox => BOOLEAN_MESSAGE,
        FieldType::Select | FieldType::Radio => OPTION_MESSAGE,
        FieldType::Text | FieldType::File | FieldType::Country => TEXT_MESSAGE,
    }
}

pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Section tree of a compiled form, referencing fields by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLayout {
    pub id: String,
    pub title: String,
    pub field_ids: Vec<String>,
    pub sections: Vec<SectionLayout>,
}

/// All field validators of a form, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct CompiledForm {
    fields: Vec<CompiledField>,
    index: BTreeMap<String, usize>,
    layout: Vec<SectionLayout>,
}

impl CompiledForm {
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn sections(&self) -> &[SectionLayout] {
        &self.layout
    }

    pub fn field(&self, id: &str) -> Option<&CompiledField> {
        self.index.get(id).map(|position| &self.fields[*position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the field's display condition holds. Unknown ids are inactive.
    pub fn is_active(&self, id: &str, values: &FieldValues) -> bool {
        let Some(field) = self.field(id) else {
            return false;
        };
        match &field.gate {
            Gate::Always => true,
            Gate::Never => false,
            Gate::When { depends_on, value } => {
                let current = match self.field(depends_on) {
                    Some(dependency) => dependency.coerce(values.get(depends_on)),
                    None => None,
                };
                matches_expected(current.as_ref(), value)
            }
        }
    }

    /// The composed validator for `id`; `None` when the id is unknown.
    pub fn validate(&self, id: &str, values: &FieldValues) -> Option<FieldResult> {
        let field = self.field(id)?;
        if !self.is_active(id, values) {
            return Some(FieldResult::ok());
        }
        Some(field.check(values.get(id)))
    }
}

/// Compiles with the default rule registry.
pub fn compile(definition: &FormDefinition) -> CompiledForm {
    compile_with(definition, &RuleRegistry::default())
}

/// Compiles using `registry` for rule dispatch and custom handlers.
pub fn compile_with(definition: &FormDefinition, registry: &RuleRegistry) -> CompiledForm {
    let mut declared = Vec::new();
    for section in &definition.sections {
        collect(section, &mut declared);
    }

    let known: BTreeSet<&str> = declared.iter().map(|&(_, field)| field.id.as_str()).collect();

    let mut form = CompiledForm::default();
    for (section_id, field) in declared {
        if form.index.contains_key(&field.id) {
            warn!(field = %field.id, "duplicate field id; keeping the first declaration");
            continue;
        }

        let gate = match &field.conditional_display {
            None => Gate::Always,
            Some(condition) if known.contains(condition.depends_on.as_str()) => Gate::When {
                depends_on: condition.depends_on.clone(),
                value: condition.value.clone(),
            },
            Some(condition) => {
                warn!(
                    field = %field.id,
                    depends_on = %condition.depends_on,
                    "conditional display references an unknown field; field stays inactive"
                );
                Gate::Never
            }
        };

        let rules = field
            .validation_rules
            .iter()
            .map(|rule| registry.prepare(&field.id, rule))
            .collect();

        form.index.insert(field.id.clone(), form.fields.len());
        form.fields.push(CompiledField {
            field: field.clone(),
            section_id: section_id.to_string(),
            rules,
            gate,
        });
    }

    form.layout = definition.sections.iter().map(layout_of).collect();
    debug!(fields = form.fields.len(), "compiled form definition");
    form
}

fn layout_of(section: &Section) -> SectionLayout {
    SectionLayout {
        id: section.id.clone(),
        title: section.title.clone(),
        field_ids: section.fields.iter().map(|field| field.id.clone()).collect(),
        sections: section.sections.iter().map(layout_of).collect(),
    }
}

fn collect<'a>(section: &'a Section, out: &mut Vec<(&'a str, &'a Field)>) {
    out.extend(section.fields.iter().map(|field| (section.id.as_str(), field)));
    for nested in &section.sections {
        collect(nested, out);
    }
}
