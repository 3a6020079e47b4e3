//! Property validation rules and their evaluator — pure logic, no database
//! access.
//!
//! Rules run against the incoming property values before any trigger
//! executes. Any violation aborts the transition attempt with a structured
//! error; no triggers run.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::PropertyMap;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A validation rule attached to one artifact property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRule {
    pub property: String,
    pub kind: RuleKind,
    /// Human-readable message reported when the rule is violated.
    pub message: String,
}

/// What a [`PropertyRule`] checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleKind {
    Required,
    NumericRange { min: f64, max: f64 },
    MaxLength { max: usize },
    OneOf { values: Vec<String> },
    Pattern { pattern: String },
}

/// A single property-level rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyViolation {
    pub property: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluate all rules against one property map.
///
/// Returns every violation, not just the first one.
pub fn evaluate_rules(
    rules: &[PropertyRule],
    properties: &PropertyMap,
) -> Vec<PropertyViolation> {
    rules
        .iter()
        .filter_map(|rule| evaluate_single_rule(rule, properties.get(&rule.property)))
        .collect()
}

fn evaluate_single_rule(rule: &PropertyRule, value: Option<&Value>) -> Option<PropertyViolation> {
    match &rule.kind {
        RuleKind::Required => evaluate_required(rule, value),
        RuleKind::NumericRange { min, max } => evaluate_numeric_range(rule, value, *min, *max),
        RuleKind::MaxLength { max } => evaluate_max_length(rule, value, *max),
        RuleKind::OneOf { values } => evaluate_one_of(rule, value, values),
        RuleKind::Pattern { pattern } => evaluate_pattern(rule, value, pattern),
    }
}

fn violation(rule: &PropertyRule, value: Option<&Value>) -> PropertyViolation {
    PropertyViolation {
        property: rule.property.clone(),
        message: rule.message.clone(),
        value: value.cloned(),
    }
}

fn evaluate_required(rule: &PropertyRule, value: Option<&Value>) -> Option<PropertyViolation> {
    match value {
        None | Some(Value::Null) => Some(violation(rule, value)),
        Some(Value::String(s)) if s.is_empty() => Some(violation(rule, value)),
        _ => None,
    }
}

fn evaluate_numeric_range(
    rule: &PropertyRule,
    value: Option<&Value>,
    min: f64,
    max: f64,
) -> Option<PropertyViolation> {
    // Range rules do not enforce presence; absent values pass.
    let num = value.and_then(|v| v.as_f64())?;
    if num < min || num > max {
        Some(violation(rule, value))
    } else {
        None
    }
}

fn evaluate_max_length(
    rule: &PropertyRule,
    value: Option<&Value>,
    max: usize,
) -> Option<PropertyViolation> {
    let s = value.and_then(|v| v.as_str())?;
    if s.len() > max {
        Some(violation(rule, value))
    } else {
        None
    }
}

fn evaluate_one_of(
    rule: &PropertyRule,
    value: Option<&Value>,
    allowed: &[String],
) -> Option<PropertyViolation> {
    let s = value.and_then(|v| v.as_str())?;
    if allowed.iter().any(|a| a == s) {
        None
    } else {
        Some(violation(rule, value))
    }
}

fn evaluate_pattern(
    rule: &PropertyRule,
    value: Option<&Value>,
    pattern: &str,
) -> Option<PropertyViolation> {
    let s = value.and_then(|v| v.as_str())?;
    // An invalid pattern is a configuration mistake; the rule passes rather
    // than blocking every transition that touches the property.
    let regex = Regex::new(pattern).ok()?;
    if regex.is_match(s) {
        None
    } else {
        Some(violation(rule, value))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(property: &str, kind: RuleKind) -> PropertyRule {
        PropertyRule {
            property: property.to_string(),
            kind,
            message: format!("{property} is invalid"),
        }
    }

    fn props(pairs: &[(&str, Value)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn required_rejects_missing_null_and_empty() {
        let rules = [rule("Priority", RuleKind::Required)];
        assert_eq!(evaluate_rules(&rules, &props(&[])).len(), 1);
        assert_eq!(
            evaluate_rules(&rules, &props(&[("Priority", Value::Null)])).len(),
            1
        );
        assert_eq!(
            evaluate_rules(&rules, &props(&[("Priority", json!(""))])).len(),
            1
        );
        assert!(evaluate_rules(&rules, &props(&[("Priority", json!("High"))])).is_empty());
    }

    #[test]
    fn numeric_range_bounds_are_inclusive() {
        let rules = [rule(
            "Estimate",
            RuleKind::NumericRange { min: 0.0, max: 40.0 },
        )];
        assert!(evaluate_rules(&rules, &props(&[("Estimate", json!(0))])).is_empty());
        assert!(evaluate_rules(&rules, &props(&[("Estimate", json!(40))])).is_empty());
        assert_eq!(
            evaluate_rules(&rules, &props(&[("Estimate", json!(41))])).len(),
            1
        );
        assert_eq!(
            evaluate_rules(&rules, &props(&[("Estimate", json!(-1))])).len(),
            1
        );
    }

    #[test]
    fn numeric_range_ignores_absent_values() {
        let rules = [rule(
            "Estimate",
            RuleKind::NumericRange { min: 0.0, max: 40.0 },
        )];
        assert!(evaluate_rules(&rules, &props(&[])).is_empty());
    }

    #[test]
    fn one_of_checks_membership() {
        let rules = [rule(
            "Priority",
            RuleKind::OneOf {
                values: vec!["Low".to_string(), "High".to_string()],
            },
        )];
        assert!(evaluate_rules(&rules, &props(&[("Priority", json!("High"))])).is_empty());
        assert_eq!(
            evaluate_rules(&rules, &props(&[("Priority", json!("Urgent"))])).len(),
            1
        );
    }

    #[test]
    fn pattern_rule_matches_regex() {
        let rules = [rule(
            "Code",
            RuleKind::Pattern {
                pattern: "^[A-Z]{2}-\\d+$".to_string(),
            },
        )];
        assert!(evaluate_rules(&rules, &props(&[("Code", json!("AB-12"))])).is_empty());
        assert_eq!(
            evaluate_rules(&rules, &props(&[("Code", json!("ab12"))])).len(),
            1
        );
    }

    #[test]
    fn all_violations_are_collected() {
        let rules = [
            rule("Priority", RuleKind::Required),
            rule("Estimate", RuleKind::NumericRange { min: 0.0, max: 10.0 }),
        ];
        let violations = evaluate_rules(&rules, &props(&[("Estimate", json!(99))]));
        assert_eq!(violations.len(), 2);
    }
}
