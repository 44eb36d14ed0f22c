//! Editing API used by form builders to produce definition snapshots.

use thiserror::Error;
use uuid::Uuid;

use crate::compile::{CompiledForm, compile_with};
use crate::rules::RuleRegistry;
use crate::spec::field::{ConditionalDisplay, Field, FieldOption, FieldType};
use crate::spec::form::{FormDefinition, Section};
use crate::spec::rule::ValidationRule;

pub const NEW_SECTION_TITLE: &str = "New Section";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("section '{0}' does not exist")]
    SectionNotFound(String),
    #[error("field '{field}' does not exist in section '{section}'")]
    FieldNotFound { section: String, field: String },
    #[error("field '{field}' has no validation rule at index {index}")]
    RuleOutOfRange { field: String, index: usize },
}

/// Partial update of a field; `None` leaves an attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub kind: Option<FieldType>,
    pub label: Option<String>,
    pub required: Option<bool>,
    pub placeholder: Option<Option<String>>,
    pub validation_rules: Option<Vec<ValidationRule>>,
    pub options: Option<Vec<FieldOption>>,
    pub conditional_display: Option<Option<ConditionalDisplay>>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind(mut self, kind: FieldType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// `None` clears the placeholder.
    #[must_use]
    pub fn placeholder(mut self, placeholder: Option<String>) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn validation_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.validation_rules = Some(rules);
        self
    }

    #[must_use]
    pub fn options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// `None` removes the display condition.
    #[must_use]
    pub fn conditional_display(mut self, condition: Option<ConditionalDisplay>) -> Self {
        self.conditional_display = Some(condition);
        self
    }

    fn apply(self, field: &mut Field) {
        if let Some(kind) = self.kind {
            field.kind = kind;
        }
        if let Some(label) = self.label {
            field.label = label;
        }
        if let Some(required) = self.required {
            field.required = required;
        }
        if let Some(placeholder) = self.placeholder {
            field.placeholder = placeholder;
        }
        if let Some(rules) = self.validation_rules {
            field.validation_rules = rules;
        }
        if let Some(options) = self.options {
            field.options = options;
        }
        if let Some(condition) = self.conditional_display {
            field.conditional_display = condition;
        }
    }
}

/// Caller-owned editing session over one form definition.
///
/// Every successful edit bumps [`FormEditor::revision`] so holders of a
/// compiled form know when to recompile.
#[derive(Debug, Clone, Default)]
pub struct FormEditor {
    definition: FormDefinition,
    revision: u64,
}

impl FormEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definition(definition: FormDefinition) -> Self {
        Self {
            definition,
            revision: 0,
        }
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn into_definition(self) -> FormDefinition {
        self.definition
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn compile(&self) -> CompiledForm {
        self.compile_with(&RuleRegistry::default())
    }

    pub fn compile_with(&self, registry: &RuleRegistry) -> CompiledForm {
        compile_with(&self.definition, registry)
    }

    /// Appends an empty top-level section and returns its id.
    pub fn add_section(&mut self) -> String {
        let section = Section::new(new_id(), NEW_SECTION_TITLE);
        let id = section.id.clone();
        self.definition.sections.push(section);
        self.touch();
        id
    }

    /// Appends an empty section inside `parent_id` and returns its id.
    pub fn add_nested_section(&mut self, parent_id: &str) -> Result<String, EditError> {
        let parent = self.section_mut(parent_id)?;
        let section = Section::new(new_id(), NEW_SECTION_TITLE);
        let id = section.id.clone();
        parent.sections.push(section);
        self.touch();
        Ok(id)
    }

    pub fn update_section(&mut self, id: &str, section: Section) -> Result<(), EditError> {
        *self.section_mut(id)? = section;
        self.touch();
        Ok(())
    }

    pub fn delete_section(&mut self, id: &str) -> Result<Section, EditError> {
        let removed = remove_section(&mut self.definition.sections, id)
            .ok_or_else(|| EditError::SectionNotFound(id.to_string()))?;
        self.touch();
        Ok(removed)
    }

    /// Appends a blank text field to `section_id` and returns its id.
    pub fn add_field(&mut self, section_id: &str) -> Result<String, EditError> {
        let section = self.section_mut(section_id)?;
        let field = Field::new(new_id(), FieldType::Text, "");
        let id = field.id.clone();
        section.fields.push(field);
        self.touch();
        Ok(id)
    }

    pub fn update_field(
        &mut self,
        section_id: &str,
        field_id: &str,
        patch: FieldPatch,
    ) -> Result<(), EditError> {
        patch.apply(self.field_mut(section_id, field_id)?);
        self.touch();
        Ok(())
    }

    pub fn delete_field(&mut self, section_id: &str, field_id: &str) -> Result<Field, EditError> {
        let section = self.section_mut(section_id)?;
        let position = section
            .fields
            .iter()
            .position(|field| field.id == field_id)
            .ok_or_else(|| field_not_found(section_id, field_id))?;
        let removed = section.fields.remove(position);
        self.touch();
        Ok(removed)
    }

    pub fn add_rule(
        &mut self,
        section_id: &str,
        field_id: &str,
        rule: ValidationRule,
    ) -> Result<(), EditError> {
        self.field_mut(section_id, field_id)?
            .validation_rules
            .push(rule);
        self.touch();
        Ok(())
    }

    pub fn remove_rule(
        &mut self,
        section_id: &str,
        field_id: &str,
        index: usize,
    ) -> Result<ValidationRule, EditError> {
        let field = self.field_mut(section_id, field_id)?;
        if index >= field.validation_rules.len() {
            return Err(EditError::RuleOutOfRange {
                field: field_id.to_string(),
                index,
            });
        }
        let removed = field.validation_rules.remove(index);
        self.touch();
        Ok(removed)
    }

    fn section_mut(&mut self, id: &str) -> Result<&mut Section, EditError> {
        self.definition
            .find_section_mut(id)
            .ok_or_else(|| EditError::SectionNotFound(id.to_string()))
    }

    fn field_mut(&mut self, section_id: &str, field_id: &str) -> Result<&mut Field, EditError> {
        self.section_mut(section_id)?
            .fields
            .iter_mut()
            .find(|field| field.id == field_id)
            .ok_or_else(|| field_not_found(section_id, field_id))
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn field_not_found(section: &str, field: &str) -> EditError {
    EditError::FieldNotFound {
        section: section.to_string(),
        field: field.to_string(),
    }
}

fn remove_section(sections: &mut Vec<Section>, id: &str) -> Option<Section> {
    if let Some(position) = sections.iter().position(|section| section.id == id) {
        return Some(sections.remove(position));
    }
    sections
        .iter_mut()
        .find_map(|section| remove_section(&mut section.sections, id))
}
