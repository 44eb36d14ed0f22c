use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Parameter attached to a rule, kept in the JSON shape it was authored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RuleValue {
    Number(Number),
    Text(String),
}

impl RuleValue {
    /// Numeric reading used by length bounds; `None` when not a finite number.
    /// Blank text reads as `0`, the bound a builder emits for an empty box.
    pub fn as_bound(&self) -> Option<f64> {
        let bound = match self {
            RuleValue::Number(number) => number.as_f64()?,
            RuleValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
        };
        bound.is_finite().then_some(bound)
    }

    /// Pattern source; only text values are patterns.
    pub fn as_pattern(&self) -> Option<&str> {
        match self {
            RuleValue::Text(text) => Some(text),
            RuleValue::Number(_) => None,
        }
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Text(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Text(value)
    }
}

impl From<u64> for RuleValue {
    fn from(value: u64) -> Self {
        RuleValue::Number(Number::from(value))
    }
}

/// Discriminant of a [`ValidationRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Min,
    Max,
    Email,
    Regex,
    Custom,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::Email => "email",
            RuleKind::Regex => "regex",
            RuleKind::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-authored constraint attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValidationRule {
    /// Minimum string length.
    Min {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<RuleValue>,
        #[serde(default)]
        message: String,
    },
    /// Maximum string length.
    Max {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<RuleValue>,
        #[serde(default)]
        message: String,
    },
    /// `value` is carried through unchanged; the address check ignores it.
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<RuleValue>,
        #[serde(default)]
        message: String,
    },
    Regex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<RuleValue>,
        #[serde(default)]
        message: String,
    },
    /// Extension point; `value` names a handler registered on the rule registry.
    Custom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default)]
        message: String,
    },
}

impl ValidationRule {
    pub fn min(bound: impl Into<RuleValue>, message: impl Into<String>) -> Self {
        ValidationRule::Min {
            value: Some(bound.into()),
            message: message.into(),
        }
    }

    pub fn max(bound: impl Into<RuleValue>, message: impl Into<String>) -> Self {
        ValidationRule::Max {
            value: Some(bound.into()),
            message: message.into(),
        }
    }

    pub fn email(message: impl Into<String>) -> Self {
        ValidationRule::Email {
            value: None,
            message: message.into(),
        }
    }

    pub fn regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationRule::Regex {
            value: Some(RuleValue::Text(pattern.into())),
            message: message.into(),
        }
    }

    pub fn custom(handler: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationRule::Custom {
            value: Some(Value::String(handler.into())),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            ValidationRule::Min { .. } => RuleKind::Min,
            ValidationRule::Max { .. } => RuleKind::Max,
            ValidationRule::Email { .. } => RuleKind::Email,
            ValidationRule::Regex { .. } => RuleKind::Regex,
            ValidationRule::Custom { .. } => RuleKind::Custom,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationRule::Min { message, .. }
            | ValidationRule::Max { message, .. }
            | ValidationRule::Email { message, .. }
            | ValidationRule::Regex { message, .. }
            | ValidationRule::Custom { message, .. } => message,
        }
    }
}
