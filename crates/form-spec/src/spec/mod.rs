pub mod field;
pub mod form;
pub mod rule;

pub use field::{ConditionalDisplay, Field, FieldOption, FieldType};
pub use form::{DefinitionError, FormDefinition, Section, definition_schema};
pub use rule::{RuleKind, RuleValue, ValidationRule};
