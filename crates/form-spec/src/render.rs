use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use crate::{
    compile::{CompiledForm, SectionLayout, is_blank},
    runtime::{FieldState, FormSession},
    spec::field::{FieldOption, FieldType},
    submission::value_to_display,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// An active required field is still empty.
    NeedInput,
    /// Every active required field holds a value and no error is shown.
    Complete,
    /// At least one field currently shows an error.
    Error,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Error => "error",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderProgress {
    pub filled: usize,
    pub total: usize,
}

/// Everything a widget needs to draw one field.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub kind: FieldType,
    pub placeholder: Option<String>,
    pub required: bool,
    pub options: Vec<FieldOption>,
    pub value: Option<Value>,
    pub error: Option<String>,
    pub active: bool,
    pub state: FieldState,
}

#[derive(Debug, Clone)]
pub struct RenderSection {
    pub id: String,
    pub title: String,
    pub fields: Vec<RenderField>,
    pub sections: Vec<RenderSection>,
}

/// Read-only snapshot of a session for presentation layers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub sections: Vec<RenderSection>,
}

impl RenderPayload {
    /// Fields of every section, depth-first.
    pub fn fields(&self) -> Vec<&RenderField> {
        fn walk<'a>(section: &'a RenderSection, out: &mut Vec<&'a RenderField>) {
            out.extend(section.fields.iter());
            for nested in &section.sections {
                walk(nested, out);
            }
        }
        let mut out = Vec::new();
        for section in &self.sections {
            walk(section, &mut out);
        }
        out
    }
}

/// Snapshot the session without validating anything.
pub fn build_render_payload(session: &FormSession) -> RenderPayload {
    let form = session.form();
    let mut seen = BTreeSet::new();
    let sections = form
        .sections()
        .iter()
        .map(|layout| render_section(session, form, layout, &mut seen))
        .collect::<Vec<_>>();

    let mut filled = 0;
    let mut total = 0;
    let mut missing_required = false;
    for field in form.fields() {
        if !session.is_active(field.id()) {
            continue;
        }
        total += 1;
        let has_value = field
            .coerce(session.value(field.id()))
            .is_some_and(|value| !is_blank(&value));
        if has_value {
            filled += 1;
        } else if field.required() {
            missing_required = true;
        }
    }

    let status = if !session.errors().is_empty() {
        RenderStatus::Error
    } else if missing_required {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        status,
        progress: RenderProgress { filled, total },
        sections,
    }
}

fn render_section(
    session: &FormSession,
    form: &CompiledForm,
    layout: &SectionLayout,
    seen: &mut BTreeSet<String>,
) -> RenderSection {
    let fields = layout
        .field_ids
        .iter()
        .filter(|id| seen.insert((*id).clone()))
        .filter_map(|id| form.field(id))
        .map(|compiled| {
            let field = compiled.field();
            RenderField {
                id: field.id.clone(),
                label: field.label.clone(),
                kind: field.kind,
                placeholder: field.placeholder.clone(),
                required: field.required,
                options: field.options.clone(),
                value: session.value(&field.id).cloned(),
                error: session.error(&field.id).map(str::to_string),
                active: session.is_active(&field.id),
                state: session
                    .state(&field.id)
                    .unwrap_or(FieldState::Untouched),
            }
        })
        .collect();

    let sections = layout
        .sections
        .iter()
        .map(|nested| render_section(session, form, nested, seen))
        .collect();

    RenderSection {
        id: layout.id.clone(),
        title: layout.title.clone(),
        fields,
        sections,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    json!({
        "status": payload.status.as_str(),
        "progress": {
            "filled": payload.progress.filled,
            "total": payload.progress.total,
        },
        "sections": payload.sections.iter().map(section_json).collect::<Vec<_>>(),
    })
}

fn section_json(section: &RenderSection) -> Value {
    json!({
        "id": section.id,
        "title": section.title,
        "fields": section.fields.iter().map(field_json).collect::<Vec<_>>(),
        "sections": section.sections.iter().map(section_json).collect::<Vec<_>>(),
    })
}

fn field_json(field: &RenderField) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(field.id.clone()));
    map.insert("label".into(), Value::String(field.label.clone()));
    map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
    map.insert("required".into(), Value::Bool(field.required));
    if let Some(placeholder) = &field.placeholder {
        map.insert("placeholder".into(), Value::String(placeholder.clone()));
    }
    if !field.options.is_empty() {
        map.insert(
            "options".into(),
            Value::Array(
                field
                    .options
                    .iter()
                    .map(|option| json!({ "label": option.label, "value": option.value }))
                    .collect(),
            ),
        );
    }
    map.insert("value".into(), field.value.clone().unwrap_or(Value::Null));
    map.insert(
        "error".into(),
        field.error.clone().map(Value::String).unwrap_or(Value::Null),
    );
    map.insert("active".into(), Value::Bool(field.active));
    map.insert("state".into(), Value::String(field.state.as_str().to_string()));
    Value::Object(map)
}

/// Render the payload as human-friendly text. Inactive fields are omitted.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.filled,
        payload.progress.total
    ));
    for section in &payload.sections {
        section_text(section, 0, &mut lines);
    }
    lines.join("\n")
}

fn section_text(section: &RenderSection, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    lines.push(format!("{}[{}]", indent, section.title));
    for field in section.fields.iter().filter(|field| field.active) {
        let mut entry = format!("{} - {} ({})", indent, field.label, field.kind);
        if field.required {
            entry.push_str(" [required]");
        }
        if let Some(value) = &field.value {
            entry.push_str(&format!(" = {}", value_to_display(value)));
        }
        if let Some(error) = &field.error {
            entry.push_str(&format!(" ! {}", error));
        }
        lines.push(entry);
    }
    for nested in &section.sections {
        section_text(nested, depth + 1, lines);
    }
}
