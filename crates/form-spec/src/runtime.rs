//! Stateful validation session for one filled-in form.
//!
//! Validation is trigger-driven: values change through [`FormSession::set_value`]
//! and errors only change when a field is validated (blur) or the whole form
//! is validated (submit).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::compile::{CompiledForm, FieldValues, compile_with};
use crate::rules::RuleRegistry;
use crate::spec::form::FormDefinition;
use crate::submission::{Submission, format_submission};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("form has no field '{0}'")]
    UnknownField(String),
}

/// Per-field lifecycle: untouched until first validated, then valid or invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    Untouched,
    Valid,
    Invalid,
}

impl FieldState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldState::Untouched => "untouched",
            FieldState::Valid => "valid",
            FieldState::Invalid => "invalid",
        }
    }
}

/// Owns the value and error maps of one form session.
#[derive(Debug, Clone)]
pub struct FormSession {
    form: CompiledForm,
    values: FieldValues,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
}

impl FormSession {
    pub fn new(form: CompiledForm) -> Self {
        Self {
            form,
            values: FieldValues::new(),
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
        }
    }

    pub fn from_definition(definition: &FormDefinition) -> Self {
        Self::with_registry(definition, &RuleRegistry::default())
    }

    pub fn with_registry(definition: &FormDefinition, registry: &RuleRegistry) -> Self {
        Self::new(compile_with(definition, registry))
    }

    pub fn form(&self) -> &CompiledForm {
        &self.form
    }

    /// Stores a value without validating it.
    pub fn set_value(&mut self, id: &str, value: Value) -> Result<(), SessionError> {
        self.ensure_known(id)?;
        self.values.insert(id.to_string(), value);
        Ok(())
    }

    pub fn clear_value(&mut self, id: &str) -> Result<(), SessionError> {
        self.ensure_known(id)?;
        self.values.remove(id);
        Ok(())
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Current error of an active field; hidden fields never report one.
    pub fn error(&self, id: &str) -> Option<&str> {
        if !self.is_active(id) {
            return None;
        }
        self.errors.get(id).map(String::as_str)
    }

    /// Errors of the currently active fields, keyed by field id.
    pub fn errors(&self) -> BTreeMap<&str, &str> {
        self.errors
            .iter()
            .filter(|(id, _)| self.is_active(id))
            .map(|(id, message)| (id.as_str(), message.as_str()))
            .collect()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.form.is_active(id, &self.values)
    }

    pub fn state(&self, id: &str) -> Option<FieldState> {
        if !self.form.contains(id) {
            return None;
        }
        Some(if !self.touched.contains(id) {
            FieldState::Untouched
        } else if self.error(id).is_some() {
            FieldState::Invalid
        } else {
            FieldState::Valid
        })
    }

    /// Re-runs the field's composed validator and updates its error slot.
    pub fn validate_field(&mut self, id: &str) -> Result<bool, SessionError> {
        let result = self
            .form
            .validate(id, &self.values)
            .ok_or_else(|| SessionError::UnknownField(id.to_string()))?;

        self.touched.insert(id.to_string());
        let valid = match result.error {
            Some(message) => {
                debug!(field = id, error = %message, "field failed validation");
                self.errors.insert(id.to_string(), message);
                false
            }
            None => {
                self.errors.remove(id);
                true
            }
        };
        self.drop_hidden_errors();
        Ok(valid)
    }

    fn drop_hidden_errors(&mut self) {
        let form = &self.form;
        let values = &self.values;
        self.errors.retain(|id, _| form.is_active(id, values));
    }

    /// Validates every active field; inactive fields lose any stale error.
    pub fn validate_all(&mut self) -> bool {
        let ids: Vec<String> = self
            .form
            .fields()
            .iter()
            .map(|field| field.id().to_string())
            .collect();

        let mut valid = true;
        for id in ids {
            if !self.form.is_active(&id, &self.values) {
                self.errors.remove(&id);
                continue;
            }
            // ids come from the compiled form, so the lookup cannot miss
            if let Ok(field_valid) = self.validate_field(&id) {
                valid &= field_valid;
            }
        }
        valid
    }

    /// Validates everything and, when valid, formats the submission.
    pub fn submit(&mut self) -> Option<Submission> {
        if !self.validate_all() {
            debug!(errors = self.errors.len(), "submit blocked by invalid fields");
            return None;
        }
        let submission = format_submission(&self.form, &self.values);
        info!(entries = submission.len(), "form submitted");
        Some(submission)
    }

    /// Swaps in a newly compiled form, keeping state of fields that survive.
    pub fn recompile(&mut self, form: CompiledForm) {
        self.values.retain(|id, _| form.contains(id));
        self.errors.retain(|id, _| form.contains(id));
        self.touched.retain(|id| form.contains(id));
        debug!(fields = form.len(), "session recompiled");
        self.form = form;
    }

    fn ensure_known(&self, id: &str) -> Result<(), SessionError> {
        if self.form.contains(id) {
            Ok(())
        } else {
            Err(SessionError::UnknownField(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::spec::{Field, FieldType, Section};
    use serde_json::json;

    fn session() -> FormSession {
        FormSession::from_definition(&FormDefinition::new(vec![
            Section::new("s", "Main")
                .field(Field::new("name", FieldType::Text, "Name").required())
                .field(Field::new("email", FieldType::Email, "Email")),
        ]))
    }

    #[test]
    fn fields_start_untouched_even_when_invalid() {
        let session = session();
        assert_eq!(session.state("name"), Some(FieldState::Untouched));
        assert_eq!(session.error("name"), None);
        assert_eq!(session.state("missing"), None);
    }

    #[test]
    fn set_value_does_not_validate() {
        let mut session = session();
        session.set_value("email", json!("nope")).expect("known");
        assert_eq!(session.error("email"), None);
        assert_eq!(session.validate_field("email"), Ok(false));
        assert_eq!(session.state("email"), Some(FieldState::Invalid));
        session.set_value("email", json!("a@b.com")).expect("known");
        assert_eq!(session.error("email"), Some("Invalid email address"));
        assert_eq!(session.validate_field("email"), Ok(true));
        assert_eq!(session.state("email"), Some(FieldState::Valid));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut session = session();
        assert_eq!(
            session.set_value("ghost", json!("x")),
            Err(SessionError::UnknownField("ghost".into()))
        );
        assert!(session.validate_field("ghost").is_err());
    }

    #[test]
    fn hiding_a_field_hides_its_error() {
        let mut session = FormSession::from_definition(&FormDefinition::new(vec![
            Section::new("s", "Main")
                .field(Field::new("c", FieldType::Text, "Contact"))
                .field(
                    Field::new("d", FieldType::Text, "Details")
                        .required()
                        .shown_when("c", "yes"),
                ),
        ]));
        session.set_value("c", json!("yes")).expect("known");
        assert_eq!(session.validate_field("d"), Ok(false));
        assert_eq!(session.error("d"), Some("This field is required"));

        session.set_value("c", json!("no")).expect("known");
        assert_eq!(session.error("d"), None);
        assert!(session.errors().is_empty());
        assert_eq!(session.state("d"), Some(FieldState::Valid));

        assert_eq!(session.validate_field("c"), Ok(true));
        session.set_value("c", json!("yes")).expect("known");
        assert_eq!(session.error("d"), None);
    }

    #[test]
    fn recompile_keeps_surviving_state() {
        let mut session = session();
        session.set_value("name", json!("Jane")).expect("known");
        session.set_value("email", json!("bad")).expect("known");
        session.validate_all();

        let smaller = compile(&FormDefinition::new(vec![
            Section::new("s", "Main").field(Field::new("name", FieldType::Text, "Full name")),
        ]));
        session.recompile(smaller);

        assert_eq!(session.value("name"), Some(&json!("Jane")));
        assert_eq!(session.value("email"), None);
        assert!(session.errors().is_empty());
        assert_eq!(session.state("name"), Some(FieldState::Valid));
    }
}
