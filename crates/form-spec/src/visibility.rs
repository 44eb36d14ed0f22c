use std::collections::BTreeMap;

use serde_json::Value;

use crate::compile::{CompiledForm, FieldValues};

pub type VisibilityMap = BTreeMap<String, bool>;

/// Whether a dependency value equals the expected text of a condition.
///
/// Booleans and numbers compare through their JSON text (`true`, `42`);
/// absent values never match.
pub fn matches_expected(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(text)) => text == expected,
        Some(Value::Bool(flag)) => flag.to_string() == expected,
        Some(Value::Number(number)) => number.to_string() == expected,
        _ => false,
    }
}

/// Active flag of every compiled field for the given values.
pub fn resolve_visibility(form: &CompiledForm, values: &FieldValues) -> VisibilityMap {
    form.fields()
        .iter()
        .map(|field| (field.id().to_string(), form.is_active(field.id(), values)))
        .collect()
}
