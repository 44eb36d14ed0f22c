use serde_json::{Map, Value, json};

use crate::compile::{CompiledField, CompiledForm, FieldValues};
use crate::spec::field::FieldType;

/// JSON Schema for the values a client may currently submit.
///
/// Only fields active under `values` are described; required active fields
/// are listed under `required`.
pub fn generate(form: &CompiledForm, values: &FieldValues) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in form.fields() {
        if !form.is_active(field.id(), values) {
            continue;
        }
        properties.insert(field.id().to_string(), field_schema(field));
        if field.required() {
            required.push(Value::String(field.id().to_string()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn field_schema(field: &CompiledField) -> Value {
    let mut schema = Map::new();
    schema.insert("title".into(), Value::String(field.field().display_key().into()));

    match field.kind() {
        FieldType::Checkbox => {
            schema.insert("type".into(), json!("boolean"));
        }
        FieldType::Number => {
            schema.insert("type".into(), json!(["string", "integer"]));
            schema.insert("pattern".into(), json!("^[0-9]+$"));
        }
        FieldType::Email => {
            schema.insert("type".into(), json!("string"));
            schema.insert("format".into(), json!("email"));
        }
        FieldType::Date => {
            schema.insert("type".into(), json!("string"));
            schema.insert("format".into(), json!("date"));
        }
        kind if kind.is_choice() && !field.field().options.is_empty() => {
            schema.insert("type".into(), json!("string"));
            let choices = field
                .field()
                .options
                .iter()
                .map(|option| Value::String(option.value.clone()))
                .collect();
            schema.insert("enum".into(), Value::Array(choices));
        }
        _ => {
            schema.insert("type".into(), json!("string"));
        }
    }

    if let Some(placeholder) = &field.field().placeholder {
        schema.insert("description".into(), Value::String(placeholder.clone()));
    }
    Value::Object(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::spec::{Field, FormDefinition, Section};

    #[test]
    fn describes_active_fields_only() {
        let form = compile(&FormDefinition::new(vec![
            Section::new("s", "Main")
                .field(
                    Field::new("plan", FieldType::Radio, "Plan")
                        .required()
                        .option("Free", "free")
                        .option("Pro", "pro"),
                )
                .field(Field::new("seats", FieldType::Number, "Seats").shown_when("plan", "pro")),
        ]));

        let schema = generate(&form, &FieldValues::new());
        let props = schema["properties"].as_object().unwrap();
        assert_eq!(props["plan"]["enum"], json!(["free", "pro"]));
        assert!(!props.contains_key("seats"));
        assert_eq!(schema["required"], json!(["plan"]));

        let values = FieldValues::from([("plan".to_string(), json!("pro"))]);
        let schema = generate(&form, &values);
        assert_eq!(schema["properties"]["seats"]["title"], "Seats");
    }
}
