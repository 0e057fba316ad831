// crates/warden-core/src/runtime/condition.rs
// ============================================================================
// Module: Warden Condition Evaluation
// Description: Operator evaluation for policy conditions.
// Purpose: Convert request-derived fields into pass/fail condition outcomes.
// Dependencies: crate::core, regex, serde_json
// ============================================================================

//! ## Overview
//! Condition evaluation resolves a [`ConditionField`] against the request and
//! applies one [`ConditionOperator`]. Missing fields and non-comparable value
//! pairings fail the condition to preserve fail-closed behavior; nothing in
//! this module returns an error. `Matches` patterns are compiled at policy
//! registration and passed in pre-built.
//!
//! Security posture: field values come from untrusted request input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde_json::Value;
use serde_json::json;

use crate::core::policy::Condition;
use crate::core::policy::ConditionField;
use crate::core::policy::ConditionOperator;
use crate::core::request::AccessRequest;

// ============================================================================
// SECTION: Field Resolution
// ============================================================================

/// Resolves a condition field to a JSON value.
///
/// Returns `None` when the field is absent from the request; absent fields
/// fail their condition.
#[must_use]
pub fn resolve_field(field: &ConditionField, request: &AccessRequest, risk_score: f64) -> Option<Value> {
    match field {
        ConditionField::HourOfDay => Some(json!(request.context.timestamp.hour_of_day())),
        ConditionField::DayOfWeek => Some(json!(request.context.timestamp.day_of_week())),
        ConditionField::Timestamp => Some(json!(request.context.timestamp.as_unix_millis())),
        ConditionField::ClientIp => Some(json!(request.context.client_ip.to_string())),
        ConditionField::Environment => Some(json!(request.context.environment)),
        ConditionField::RiskScore => Some(json!(risk_score)),
        ConditionField::Context { key } => request.context.extra.get(key).cloned(),
        ConditionField::SubjectAttribute { key } => request.subject.attributes.get(key).cloned(),
    }
}

// ============================================================================
// SECTION: Condition Evaluation
// ============================================================================

/// Evaluates one condition against a request.
///
/// `compiled` carries the pre-built regex for `Matches` conditions; a
/// `Matches` condition without a compiled pattern fails.
#[must_use]
pub fn evaluate_condition(
    condition: &Condition,
    compiled: Option<&Regex>,
    request: &AccessRequest,
    risk_score: f64,
) -> bool {
    let Some(actual) = resolve_field(&condition.field, request, risk_score) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => values_equal(&actual, &condition.expected),
        ConditionOperator::NotEquals => !values_equal(&actual, &condition.expected),
        ConditionOperator::Contains => evaluate_contains(&actual, &condition.expected),
        ConditionOperator::GreaterThan => {
            compare_numeric(&actual, &condition.expected).is_some_and(|ord| ord == std::cmp::Ordering::Greater)
        }
        ConditionOperator::LessThan => {
            compare_numeric(&actual, &condition.expected).is_some_and(|ord| ord == std::cmp::Ordering::Less)
        }
        ConditionOperator::In => evaluate_in(&actual, &condition.expected),
        ConditionOperator::NotIn => {
            matches!(condition.expected, Value::Array(_)) && !evaluate_in(&actual, &condition.expected)
        }
        ConditionOperator::Matches => evaluate_matches(&actual, compiled),
    }
}

/// Compares values for equality with numeric coercion.
///
/// Numbers compare by value so `5` and `5.0` are equal; everything else uses
/// strict JSON equality.
fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Value::Number(left_num), Value::Number(right_num)) = (left, right)
        && let (Some(left_f), Some(right_f)) = (left_num.as_f64(), right_num.as_f64())
    {
        return (left_f - right_f).abs() < f64::EPSILON;
    }
    left == right
}

/// Orders two numeric values when both are numbers.
fn compare_numeric(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    let left_f = left.as_f64()?;
    let right_f = right.as_f64()?;
    left_f.partial_cmp(&right_f)
}

/// Evaluates string and array containment.
fn evaluate_contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(haystack) => expected.as_str().is_some_and(|needle| haystack.contains(needle)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}

/// Evaluates membership of the actual value in the expected array.
fn evaluate_in(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(|item| values_equal(item, actual)),
        _ => false,
    }
}

/// Evaluates a pre-compiled regex against the actual value.
fn evaluate_matches(actual: &Value, compiled: Option<&Regex>) -> bool {
    let Some(regex) = compiled else {
        return false;
    };
    actual.as_str().is_some_and(|text| regex.is_match(text))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use serde_json::json;

    use super::values_equal;

    #[test]
    fn numeric_equality_coerces_int_and_float() {
        assert!(values_equal(&json!(5), &json!(5.0)));
        assert!(!values_equal(&json!(5), &json!(6)));
    }

    #[test]
    fn strings_use_strict_equality() {
        assert!(values_equal(&json!("a"), &json!("a")));
        assert!(!values_equal(&json!("a"), &json!("A")));
    }
}
