#![allow(missing_docs)]

pub mod compile;
pub mod edit;
pub mod lint;
pub mod render;
pub mod rules;
pub mod runtime;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod values_schema;
pub mod visibility;

pub use compile::{
    CompiledField, CompiledForm, FieldResult, FieldValues, SectionLayout, compile, compile_with,
};
pub use edit::{EditError, FieldPatch, FormEditor};
pub use lint::{DefinitionIssue, IssueCode, check_definition};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderSection, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use rules::{CustomHandler, PreparedRule, RuleRegistry};
pub use runtime::{FieldState, FormSession, SessionError};
pub use spec::{
    ConditionalDisplay, DefinitionError, Field, FieldOption, FieldType, FormDefinition, RuleKind,
    RuleValue, Section, ValidationRule, definition_schema,
};
pub use submission::{Submission, SubmissionEntry, SubmissionError, format_submission};
pub use validate::{ValidationReport, validate};
pub use values_schema::generate as values_schema;
pub use visibility::{VisibilityMap, resolve_visibility};
