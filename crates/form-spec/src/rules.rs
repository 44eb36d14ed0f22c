//! Rule registry: predicates and default messages for user-authored rules.
//!
//! Malformed rules (unparsable bounds, patterns that do not compile, custom
//! rules naming no registered handler) become inert instead of failing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::spec::rule::{RuleKind, RuleValue, ValidationRule};

pub(crate) static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is valid")
});

/// Integrator-supplied predicate for `custom` rules.
pub type CustomHandler = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Maps rule kinds to predicates; holds registered custom handlers.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    custom: BTreeMap<String, CustomHandler>,
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler run by `custom` rules whose value is `name`.
    pub fn register_custom<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_custom<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.register_custom(name, handler);
        self
    }

    pub fn has_custom(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Message used when a rule was authored with an empty one.
    pub fn default_message(kind: RuleKind) -> &'static str {
        match kind {
            RuleKind::Min => "Value is too short",
            RuleKind::Max => "Value is too long",
            RuleKind::Email => "Invalid email address",
            RuleKind::Regex => "Invalid format",
            RuleKind::Custom => "Invalid value",
        }
    }

    /// Resolves a rule into an executable check for `field_id`.
    pub fn prepare(&self, field_id: &str, rule: &ValidationRule) -> PreparedRule {
        let check = match rule {
            ValidationRule::Min { value, .. } => {
                bound(field_id, rule.kind(), value.as_ref()).map_or(Check::Inert, Check::MinLength)
            }
            ValidationRule::Max { value, .. } => {
                bound(field_id, rule.kind(), value.as_ref()).map_or(Check::Inert, Check::MaxLength)
            }
            ValidationRule::Email { .. } => Check::Email,
            ValidationRule::Regex { value, .. } => match value.as_ref().and_then(RuleValue::as_pattern) {
                Some(pattern) => match Regex::new(pattern) {
                    Ok(regex) => Check::Pattern(regex),
                    Err(err) => {
                        warn!(field = field_id, pattern, error = %err, "regex rule does not compile; ignoring it");
                        Check::Inert
                    }
                },
                None => Check::Inert,
            },
            ValidationRule::Custom { value, .. } => {
                match value.as_ref().and_then(Value::as_str).and_then(|name| self.custom.get(name)) {
                    Some(handler) => Check::Custom(Arc::clone(handler)),
                    None => {
                        debug!(field = field_id, "custom rule has no registered handler");
                        Check::Inert
                    }
                }
            }
        };

        let message = if rule.message().trim().is_empty() {
            Self::default_message(rule.kind()).to_string()
        } else {
            rule.message().to_string()
        };

        PreparedRule {
            kind: rule.kind(),
            check,
            message,
        }
    }

    /// One-shot evaluation of `rule` against `value`.
    pub fn check(&self, rule: &ValidationRule, value: &Value) -> bool {
        self.prepare("", rule).test(value)
    }
}

fn bound(field_id: &str, kind: RuleKind, value: Option<&RuleValue>) -> Option<f64> {
    let parsed = value.and_then(RuleValue::as_bound);
    if parsed.is_none() {
        warn!(field = field_id, rule = %kind, "length bound is not a finite number; ignoring rule");
    }
    parsed
}

#[derive(Clone)]
enum Check {
    MinLength(f64),
    MaxLength(f64),
    Email,
    Pattern(Regex),
    Custom(CustomHandler),
    Inert,
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::MinLength(n) => write!(f, "MinLength({n})"),
            Check::MaxLength(n) => write!(f, "MaxLength({n})"),
            Check::Email => f.write_str("Email"),
            Check::Pattern(regex) => write!(f, "Pattern({})", regex.as_str()),
            Check::Custom(_) => f.write_str("Custom"),
            Check::Inert => f.write_str("Inert"),
        }
    }
}

/// A rule resolved against the registry, ready to run.
#[derive(Debug, Clone)]
pub struct PreparedRule {
    kind: RuleKind,
    check: Check,
    message: String,
}

impl PreparedRule {
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.check, Check::Inert)
    }

    /// Whether `value` satisfies the rule. Length, email and pattern checks
    /// only look at text-like values.
    pub fn test(&self, value: &Value) -> bool {
        match &self.check {
            Check::Inert => true,
            Check::Custom(handler) => handler(value),
            check => match text_of(value) {
                Some(text) => match check {
                    Check::MinLength(min) => utf16_len(&text) >= *min,
                    Check::MaxLength(max) => utf16_len(&text) <= *max,
                    Check::Email => EMAIL_PATTERN.is_match(&text),
                    Check::Pattern(regex) => regex.is_match(&text),
                    Check::Custom(_) | Check::Inert => true,
                },
                None => true,
            },
        }
    }
}

/// Length in UTF-16 code units, the unit browser form libraries count in.
fn utf16_len(text: &str) -> f64 {
    text.encode_utf16().count() as f64
}

pub(crate) fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn min_and_max_measure_string_length() {
        let registry = RuleRegistry::new();
        let min = ValidationRule::min(3u64, "short");
        let max = ValidationRule::max("5", "long");

        assert!(!registry.check(&min, &json!("ab")));
        assert!(registry.check(&min, &json!("abc")));
        assert!(registry.check(&max, &json!("abcde")));
        assert!(!registry.check(&max, &json!("abcdef")));
        // a number is measured by its digits, not its magnitude
        assert!(registry.check(&max, &json!(99999)));
        assert!(!registry.check(&min, &json!("12")));
    }

    #[test]
    fn blank_bounds_read_as_zero() {
        let registry = RuleRegistry::new();
        let max = ValidationRule::max("", "too long");
        let min = ValidationRule::min(" ", "too short");
        assert!(!registry.prepare("f", &max).is_inert());
        assert!(!registry.check(&max, &json!("abc")));
        assert!(registry.check(&max, &json!("")));
        assert!(registry.check(&min, &json!("a")));
    }

    #[test]
    fn lengths_count_utf16_units() {
        let registry = RuleRegistry::new();
        let max = ValidationRule::max(1u64, "too long");
        assert!(registry.check(&max, &json!("é")));
        assert!(!registry.check(&max, &json!("\u{1F600}")));
        let min = ValidationRule::min(2u64, "too short");
        assert!(registry.check(&min, &json!("\u{1F600}")));
    }

    #[test]
    fn non_numeric_bounds_are_inert() {
        let registry = RuleRegistry::new();
        let rule = ValidationRule::min("lots", "never fires");
        let prepared = registry.prepare("f", &rule);
        assert!(prepared.is_inert());
        assert!(prepared.test(&json!("")));

        let missing = ValidationRule::Max {
            value: None,
            message: "x".into(),
        };
        assert!(registry.check(&missing, &json!("anything at all")));
    }

    #[test]
    fn broken_patterns_are_inert() {
        let registry = RuleRegistry::new();
        let rule = ValidationRule::regex("([a-z", "bad");
        assert!(registry.prepare("f", &rule).is_inert());
        assert!(registry.check(&rule, &json!("ZZZ")));

        let numeric = ValidationRule::Regex {
            value: Some(RuleValue::from(12u64)),
            message: "x".into(),
        };
        assert!(registry.check(&numeric, &json!("abc")));
    }

    #[test]
    fn email_rule_uses_standard_pattern() {
        let registry = RuleRegistry::new();
        let rule = ValidationRule::email("bad email");
        assert!(registry.check(&rule, &json!("a@b.com")));
        assert!(!registry.check(&rule, &json!("not-an-email")));
    }

    #[test]
    fn custom_rules_pass_unless_registered() {
        let rule = ValidationRule::custom("even-length", "odd length");
        assert!(RuleRegistry::new().check(&rule, &json!("abc")));

        let registry = RuleRegistry::new().with_custom("even-length", |value| {
            value.as_str().is_some_and(|text| text.len() % 2 == 0)
        });
        assert!(registry.has_custom("even-length"));
        assert!(!registry.check(&rule, &json!("abc")));
        assert!(registry.check(&rule, &json!("abcd")));
    }

    #[test]
    fn empty_messages_fall_back_to_defaults() {
        let registry = RuleRegistry::new();
        let prepared = registry.prepare("f", &ValidationRule::email(""));
        assert_eq!(prepared.message(), "Invalid email address");
        assert_eq!(prepared.kind(), RuleKind::Email);
    }
}
