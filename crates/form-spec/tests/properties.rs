//! Property tests for the composed validators.

use form_spec::{
    Field, FieldType, FieldValues, FormDefinition, Section, ValidationRule, compile,
};
use proptest::prelude::*;
use serde_json::{Value, json};

fn kind_strategy() -> impl Strategy<Value = FieldType> {
    prop::sample::select(FieldType::ALL.to_vec())
}

fn rule_strategy() -> impl Strategy<Value = ValidationRule> {
    prop_oneof![
        (0u64..20).prop_map(|bound| ValidationRule::min(bound, "min")),
        (0u64..20).prop_map(|bound| ValidationRule::max(bound, "max")),
        Just(ValidationRule::email("email")),
        prop::string::string_regex("[a-z()\\[\\]*+?^$]{0,8}")
            .unwrap()
            .prop_map(|pattern| ValidationRule::regex(pattern, "regex")),
    ]
}

fn blank_strategy() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(Value::Null)),
        prop::string::string_regex("[ \t\n]{0,6}")
            .unwrap()
            .prop_map(|text| Some(Value::String(text))),
    ]
}

fn form_of(field: Field) -> FormDefinition {
    FormDefinition::new(vec![Section::new("main", "Main").field(field)])
}

fn values_with(value: Option<Value>) -> FieldValues {
    value
        .map(|value| FieldValues::from([("f".to_string(), value)]))
        .unwrap_or_default()
}

proptest! {
    /// Optional fields accept any empty input whatever rules they carry.
    #[test]
    fn optional_empty_is_valid(
        kind in kind_strategy(),
        rules in prop::collection::vec(rule_strategy(), 0..4),
        blank in blank_strategy(),
    ) {
        let mut field = Field::new("f", kind, "F");
        field.validation_rules = rules;
        let form = compile(&form_of(field));

        let result = form.validate("f", &values_with(blank)).unwrap();
        prop_assert!(result.valid);
    }

    /// Required fields reject empty and whitespace-only strings.
    #[test]
    fn required_whitespace_is_invalid(
        kind in kind_strategy(),
        text in prop::string::string_regex("[ \t]{0,6}").unwrap(),
    ) {
        let form = compile(&form_of(Field::new("f", kind, "F").required()));
        let result = form.validate("f", &values_with(Some(json!(text)))).unwrap();
        prop_assert_eq!(result.error.as_deref(), Some("This field is required"));
    }

    /// Compiling the same definition twice gives the same verdicts.
    #[test]
    fn compilation_is_deterministic(
        kind in kind_strategy(),
        required in any::<bool>(),
        rules in prop::collection::vec(rule_strategy(), 0..4),
        input in prop::string::string_regex("[a-zA-Z0-9@. ]{0,12}").unwrap(),
    ) {
        let mut field = Field::new("f", kind, "F");
        field.required = required;
        field.validation_rules = rules;
        let definition = form_of(field);

        let values = values_with(Some(json!(input)));
        let first = compile(&definition).validate("f", &values);
        let second = compile(&definition).validate("f", &values);
        prop_assert_eq!(first, second);
    }
}
