use std::collections::BTreeMap;

use serde::Serialize;

use crate::compile::{CompiledForm, FieldValues};

/// Stateless validation of a complete value map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Error message per failing active field.
    pub errors: BTreeMap<String, String>,
    /// Fields skipped because their display condition does not hold.
    pub inactive: Vec<String>,
    /// Value keys that name no field of the form. Reported, never fatal.
    pub unknown_fields: Vec<String>,
}

pub fn validate(form: &CompiledForm, values: &FieldValues) -> ValidationReport {
    let mut errors = BTreeMap::new();
    let mut inactive = Vec::new();

    for field in form.fields() {
        if !form.is_active(field.id(), values) {
            inactive.push(field.id().to_string());
            continue;
        }
        if let Some(message) = field.check(values.get(field.id())).error {
            errors.insert(field.id().to_string(), message);
        }
    }

    let unknown_fields = values
        .keys()
        .filter(|key| !form.contains(key))
        .cloned()
        .collect();

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        inactive,
        unknown_fields,
    }
}
