//! Label-keyed output of a validated form.

use std::collections::BTreeSet;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::compile::{CompiledForm, FieldValues};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cbor encode error: {0}")]
    Cbor(#[from] serde_cbor::Error),
}

/// One submitted value and the key it is published under.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionEntry {
    pub key: String,
    pub field_id: String,
    pub value: Value,
}

/// Ordered label → value pairs in section/field declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Submission {
    entries: Vec<SubmissionEntry>,
}

impl Submission {
    pub fn entries(&self) -> &[SubmissionEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty JSON object; keys keep declaration order.
    pub fn to_json_pretty(&self) -> Result<String, SubmissionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `Label: value` lines.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}: {}", entry.key, value_to_display(&entry.value)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, SubmissionError> {
        Ok(serde_cbor::to_vec(self)?)
    }
}

impl Serialize for Submission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

/// Builds the submission for the active fields of `form`.
///
/// Fields without a label are keyed by id; a label already taken by an
/// earlier field becomes `Label (id)`, suffixed again until the key is
/// free, so no value is dropped.
pub fn format_submission(form: &CompiledForm, values: &FieldValues) -> Submission {
    let mut used = BTreeSet::new();
    let mut entries = Vec::new();

    for field in form.fields() {
        if !form.is_active(field.id(), values) {
            continue;
        }
        let Some(value) = field.coerce(values.get(field.id())) else {
            continue;
        };

        let mut key = field.field().display_key().to_string();
        while used.contains(&key) {
            key = format!("{} ({})", key, field.id());
        }
        used.insert(key.clone());

        entries.push(SubmissionEntry {
            key,
            field_id: field.id().to_string(),
            value,
        });
    }

    Submission { entries }
}

pub(crate) fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::spec::{Field, FieldType, FormDefinition, Section};
    use serde_json::json;

    fn form() -> CompiledForm {
        compile(&FormDefinition::new(vec![
            Section::new("s", "Main")
                .field(Field::new("name", FieldType::Text, "Name"))
                .field(Field::new("age", FieldType::Number, "Age"))
                .field(Field::new("nick", FieldType::Text, "Name"))
                .field(Field::new("f-9", FieldType::Text, ""))
                .field(Field::new("news", FieldType::Checkbox, "Newsletter")),
        ]))
    }

    #[test]
    fn keys_follow_labels_in_declaration_order() {
        let values = FieldValues::from([
            ("age".to_string(), json!("30")),
            ("name".to_string(), json!("Jane")),
            ("nick".to_string(), json!("JJ")),
            ("f-9".to_string(), json!("x")),
        ]);
        let submission = format_submission(&form(), &values);
        let keys: Vec<_> = submission.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Name", "Age", "Name (nick)", "f-9", "Newsletter"]);
        assert_eq!(submission.get("Newsletter"), Some(&json!(false)));
        assert_eq!(
            submission.to_text(),
            "Name: Jane\nAge: 30\nName (nick): JJ\nf-9: x\nNewsletter: false"
        );
    }

    #[test]
    fn suffixed_keys_never_shadow_a_real_label() {
        let form = compile(&FormDefinition::new(vec![
            Section::new("s", "Main")
                .field(Field::new("name", FieldType::Text, "Name"))
                .field(Field::new("nick", FieldType::Text, "Name"))
                .field(Field::new("alias", FieldType::Text, "Name (nick)")),
        ]));
        let values = FieldValues::from([
            ("name".to_string(), json!("Jane")),
            ("nick".to_string(), json!("JJ")),
            ("alias".to_string(), json!("J")),
        ]);
        let submission = format_submission(&form, &values);
        let keys: Vec<_> = submission.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Name", "Name (nick)", "Name (nick) (alias)"]);

        let text = serde_json::to_string(&submission).expect("json");
        let decoded: serde_json::Map<String, Value> = serde_json::from_str(&text).expect("map");
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.get("Name (nick)"), Some(&json!("JJ")));
        assert_eq!(decoded.get("Name (nick) (alias)"), Some(&json!("J")));
    }

    #[test]
    fn json_output_keeps_order() {
        let values = FieldValues::from([
            ("age".to_string(), json!("30")),
            ("name".to_string(), json!("Jane")),
        ]);
        let text = serde_json::to_string(&format_submission(&form(), &values)).expect("json");
        assert_eq!(text, r#"{"Name":"Jane","Age":"30","Newsletter":false}"#);
    }

    #[test]
    fn cbor_output_decodes_back() {
        let values = FieldValues::from([("name".to_string(), json!("Jane"))]);
        let bytes = format_submission(&form(), &values).to_cbor().expect("cbor");
        let decoded: serde_json::Map<String, Value> =
            serde_cbor::from_slice(&bytes).expect("decode");
        assert_eq!(decoded.get("Name"), Some(&json!("Jane")));
    }
}
