// crates/warden-core/src/core/policy.rs
// ============================================================================
// Module: Warden Attribute Policies
// Description: Attribute-based policies, matchers, conditions, and obligations.
// Purpose: Describe the ABAC half of the access control data model.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`SecurityPolicy`] is a prioritized allow/deny rule over subject,
//! resource, and action matchers plus an ordered condition list. Policies are
//! evaluated in descending priority order; the first full match decides.
//! Condition fields are a tagged enumeration rather than free-form object
//! paths, so evaluation stays type-safe and infallible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::PolicyId;
use crate::core::identifiers::RoleId;
use crate::core::identifiers::TenantId;
use crate::core::request::ActionKind;
use crate::core::resource::ResourceType;
use crate::core::resource::SensitivityTier;
use crate::core::subject::SubjectType;

// ============================================================================
// SECTION: Effect
// ============================================================================

/// Policy effect when the policy matches.
///
/// # Invariants
/// - Variants are stable for serialization; `Deny` short-circuits evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEffect {
    /// Grant access and attach obligations.
    Allow,
    /// Deny access immediately.
    Deny,
}

// ============================================================================
// SECTION: Matchers
// ============================================================================

/// Subject matcher for policy applicability.
///
/// # Invariants
/// - Empty fields are wildcards; all populated fields must match.
/// - `roles` matches when the subject holds any listed role.
/// - `attributes` requires exact equality for every listed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubjectMatcher {
    /// Required subject type, or `None` for any.
    pub subject_type: Option<SubjectType>,
    /// Any-of required roles; empty means any.
    pub roles: Vec<RoleId>,
    /// Exact-equality attribute requirements.
    pub attributes: BTreeMap<String, Value>,
}

/// Resource matcher for policy applicability.
///
/// # Invariants
/// - Empty fields are wildcards; all populated fields must match.
/// - `sensitivity` matches when the resource tier is any listed tier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceMatcher {
    /// Required resource type, or `None` for any.
    pub resource_type: Option<ResourceType>,
    /// Exact resource identifier, or `None` for any.
    pub resource_id: Option<String>,
    /// Exact tenant, or `None` for any.
    pub tenant_id: Option<TenantId>,
    /// Any-of sensitivity tiers; empty means any.
    pub sensitivity: Vec<SensitivityTier>,
}

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// Request-derived field a condition evaluates against.
///
/// # Invariants
/// - Variants enumerate every legal field; there is no free-form path lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionField {
    /// UTC hour of day (0-23) of the request timestamp.
    HourOfDay,
    /// UTC day of week (0 = Sunday .. 6 = Saturday) of the request timestamp.
    DayOfWeek,
    /// Request timestamp as unix epoch milliseconds.
    Timestamp,
    /// Client address as a string.
    ClientIp,
    /// Deployment environment name.
    Environment,
    /// Risk score supplied by threat analysis (0.0-1.0).
    RiskScore,
    /// Named entry in the request's extra context map.
    Context {
        /// Context key to resolve.
        key: String,
    },
    /// Named entry in the subject's attribute map.
    SubjectAttribute {
        /// Attribute key to resolve.
        key: String,
    },
}

/// Comparison operator applied to a condition field.
///
/// # Invariants
/// - Variants are stable for serialization; evaluation is infallible and a
///   non-comparable pairing simply fails the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field equals the expected value.
    Equals,
    /// Field does not equal the expected value.
    NotEquals,
    /// Field (string or array) contains the expected value.
    Contains,
    /// Field exceeds the expected numeric value.
    GreaterThan,
    /// Field is below the expected numeric value.
    LessThan,
    /// Field is a member of the expected array.
    In,
    /// Field is not a member of the expected array.
    NotIn,
    /// Field matches the expected regular expression.
    Matches,
}

/// Single condition within a policy.
///
/// # Invariants
/// - Conditions are conjunctive; all must hold for the policy to match.
/// - `Matches` expressions are compiled at registration; malformed patterns
///   are rejected before the policy is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Field to evaluate.
    pub field: ConditionField,
    /// Operator to apply.
    pub operator: ConditionOperator,
    /// Expected value.
    pub expected: Value,
}

// ============================================================================
// SECTION: Obligations
// ============================================================================

/// Side-effect instruction attached to an allow decision.
///
/// # Invariants
/// - Obligations never affect the allow/deny outcome; they are instructions
///   for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Obligation kind label (for example `log` or `notify`).
    pub kind: String,
    /// Structured obligation parameters.
    pub params: BTreeMap<String, Value>,
}

impl Obligation {
    /// Creates an obligation with no parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Security Policy
// ============================================================================

/// Prioritized attribute-based policy.
///
/// # Invariants
/// - Policies are evaluated in descending `priority` order; ties break by
///   policy identifier for determinism.
/// - Disabled policies never participate in evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Policy identifier.
    pub policy_id: PolicyId,
    /// Human-readable policy name.
    pub name: String,
    /// Effect when the policy matches.
    pub effect: PolicyEffect,
    /// Evaluation priority; higher evaluates first.
    pub priority: i32,
    /// Whether the policy participates in evaluation.
    pub enabled: bool,
    /// Subject applicability matcher.
    pub subject: SubjectMatcher,
    /// Resource applicability matcher.
    pub resource: ResourceMatcher,
    /// Actions the policy applies to; empty means any.
    pub actions: Vec<ActionKind>,
    /// Ordered conjunctive conditions.
    pub conditions: Vec<Condition>,
    /// Obligations attached when the effect is allow.
    pub obligations: Vec<Obligation>,
}
