use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::field::Field;

/// Failures while reading or writing a form definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse form definition: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to encode form definition: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Named, ordered group of fields and nested sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            fields: Vec::new(),
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Fields of this section, then of nested sections, depth-first.
    pub fn all_fields(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        collect_fields(self, &mut out);
        out
    }

    pub fn find_section(&self, id: &str) -> Option<&Section> {
        if self.id == id {
            return Some(self);
        }
        self.sections
            .iter()
            .find_map(|nested| nested.find_section(id))
    }

    pub fn find_section_mut(&mut self, id: &str) -> Option<&mut Section> {
        if self.id == id {
            return Some(self);
        }
        self.sections
            .iter_mut()
            .find_map(|nested| nested.find_section_mut(id))
    }
}

fn collect_fields<'a>(section: &'a Section, out: &mut Vec<&'a Field>) {
    out.extend(section.fields.iter());
    for nested in &section.sections {
        collect_fields(nested, out);
    }
}

/// Complete declarative description of a form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormDefinition {
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl FormDefinition {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).map_err(DefinitionError::Parse)
    }

    pub fn to_json_pretty(&self) -> Result<String, DefinitionError> {
        serde_json::to_string_pretty(self).map_err(DefinitionError::Encode)
    }

    /// Every field in declaration order.
    pub fn fields(&self) -> Vec<&Field> {
        self.sections.iter().flat_map(Section::all_fields).collect()
    }

    pub fn find_field(&self, id: &str) -> Option<&Field> {
        self.fields().into_iter().find(|field| field.id == id)
    }

    pub fn find_section(&self, id: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find_map(|section| section.find_section(id))
    }

    pub fn find_section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find_map(|section| section.find_section_mut(id))
    }
}

/// JSON Schema describing the form definition format.
pub fn definition_schema() -> Schema {
    schema_for!(FormDefinition)
}
