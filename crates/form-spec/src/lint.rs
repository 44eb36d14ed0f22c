//! Authoring checks for form definitions.
//!
//! These never block compilation: each issue describes something the
//! compiler will quietly tolerate (an inert rule, an inactive field, a
//! shadowed duplicate).

use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;

use crate::spec::field::Field;
use crate::spec::form::{FormDefinition, Section};
use crate::spec::rule::{RuleValue, ValidationRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DuplicateSectionId,
    DuplicateFieldId,
    EmptyRuleMessage,
    InvalidBound,
    InvalidPattern,
    UnknownDependency,
    SelfDependency,
    MissingOptions,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::DuplicateSectionId => "duplicate_section_id",
            IssueCode::DuplicateFieldId => "duplicate_field_id",
            IssueCode::EmptyRuleMessage => "empty_rule_message",
            IssueCode::InvalidBound => "invalid_bound",
            IssueCode::InvalidPattern => "invalid_pattern",
            IssueCode::UnknownDependency => "unknown_dependency",
            IssueCode::SelfDependency => "self_dependency",
            IssueCode::MissingOptions => "missing_options",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionIssue {
    /// Section or field id the issue is attached to.
    pub target: String,
    pub code: IssueCode,
    pub message: String,
}

impl DefinitionIssue {
    fn new(target: &str, code: IssueCode, message: String) -> Self {
        Self {
            target: target.to_string(),
            code,
            message,
        }
    }
}

/// Lists authoring problems in declaration order.
pub fn check_definition(definition: &FormDefinition) -> Vec<DefinitionIssue> {
    let mut issues = Vec::new();
    let mut section_ids = BTreeSet::new();
    for section in &definition.sections {
        check_section_ids(section, &mut section_ids, &mut issues);
    }

    let fields = definition.fields();
    let known: BTreeSet<&str> = fields.iter().map(|&field| field.id.as_str()).collect();
    let mut seen = BTreeSet::new();

    for field in fields {
        if !seen.insert(field.id.as_str()) {
            issues.push(DefinitionIssue::new(
                &field.id,
                IssueCode::DuplicateFieldId,
                format!("duplicate field id '{}'", field.id),
            ));
        }
        check_field(field, &known, &mut issues);
    }

    issues
}

fn check_section_ids<'a>(
    section: &'a Section,
    seen: &mut BTreeSet<&'a str>,
    issues: &mut Vec<DefinitionIssue>,
) {
    if !seen.insert(section.id.as_str()) {
        issues.push(DefinitionIssue::new(
            &section.id,
            IssueCode::DuplicateSectionId,
            format!("duplicate section id '{}'", section.id),
        ));
    }
    for nested in &section.sections {
        check_section_ids(nested, seen, issues);
    }
}

fn check_field(field: &Field, known: &BTreeSet<&str>, issues: &mut Vec<DefinitionIssue>) {
    if field.kind.is_choice() && field.options.is_empty() {
        issues.push(DefinitionIssue::new(
            &field.id,
            IssueCode::MissingOptions,
            format!("{} field '{}' declares no options", field.kind, field.id),
        ));
    }

    if let Some(condition) = &field.conditional_display {
        if condition.depends_on == field.id {
            issues.push(DefinitionIssue::new(
                &field.id,
                IssueCode::SelfDependency,
                format!("field '{}' depends on itself", field.id),
            ));
        } else if !known.contains(condition.depends_on.as_str()) {
            issues.push(DefinitionIssue::new(
                &field.id,
                IssueCode::UnknownDependency,
                format!(
                    "field '{}' depends on unknown field '{}'",
                    field.id, condition.depends_on
                ),
            ));
        }
    }

    for (index, rule) in field.validation_rules.iter().enumerate() {
        if rule.message().trim().is_empty() {
            issues.push(DefinitionIssue::new(
                &field.id,
                IssueCode::EmptyRuleMessage,
                format!("rule #{} ({}) has no message", index + 1, rule.kind()),
            ));
        }
        match rule {
            ValidationRule::Min { value, .. } | ValidationRule::Max { value, .. }
                if value.as_ref().and_then(RuleValue::as_bound).is_none() =>
            {
                issues.push(DefinitionIssue::new(
                    &field.id,
                    IssueCode::InvalidBound,
                    format!("rule #{} ({}) bound is not a number", index + 1, rule.kind()),
                ));
            }
            ValidationRule::Regex {
                value: Some(RuleValue::Text(pattern)),
                ..
            } => {
                if let Err(err) = Regex::new(pattern) {
                    issues.push(DefinitionIssue::new(
                        &field.id,
                        IssueCode::InvalidPattern,
                        format!("rule #{} pattern does not compile: {}", index + 1, err),
                    ));
                }
            }
            _ => {}
        }
    }
}
