// crates/warden-core/src/runtime/access.rs
// ============================================================================
// Module: Warden Access Control Engine
// Description: RBAC and ABAC evaluation composed into one access decision.
// Purpose: Decide whether a subject may perform an action on a resource.
// Dependencies: crate::core, crate::runtime::condition, regex, thiserror
// ============================================================================

//! ## Overview
//! The engine evaluates RBAC first (constraint-filtered roles, inherited
//! permission union), then ABAC (prioritized first-match policies). A deny
//! from either stage wins. Policies with malformed `Matches` patterns are
//! rejected at registration, so evaluation never errors.
//!
//! Invariants:
//! - Role inheritance walks carry a visited set; cycles terminate and no role
//!   is processed twice.
//! - Policies evaluate in descending priority, ties broken by identifier.
//! - Every deny carries a human-readable reason.
//!
//! Security posture: subjects, attributes, and contexts are untrusted input;
//! a poisoned registry lock denies rather than panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::RwLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::PolicyId;
use crate::core::identifiers::RoleId;
use crate::core::policy::Condition;
use crate::core::policy::ConditionOperator;
use crate::core::policy::Obligation;
use crate::core::policy::PolicyEffect;
use crate::core::policy::ResourceMatcher;
use crate::core::policy::SecurityPolicy;
use crate::core::policy::SubjectMatcher;
use crate::core::request::AccessRequest;
use crate::core::request::PRODUCTION_ENVIRONMENT;
use crate::core::resource::SensitivityTier;
use crate::core::role::PermissionGrants;
use crate::core::role::Role;
use crate::core::role::RoleConstraint;
use crate::runtime::condition::evaluate_condition;

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of one access control evaluation.
///
/// # Invariants
/// - `reason` is never empty.
/// - `audit_required` is true for every deny and for sensitive allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether access is granted.
    pub allowed: bool,
    /// Human-readable decision reason.
    pub reason: String,
    /// Policy that decided the ABAC stage, when one matched.
    pub matched_policy: Option<PolicyId>,
    /// Obligations attached to an allow.
    pub obligations: Vec<Obligation>,
    /// Whether the caller must write an audit record for this decision.
    pub audit_required: bool,
}

// ============================================================================
// SECTION: Registration Errors
// ============================================================================

/// Errors raised while registering a policy.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Registration failures leave the policy store unchanged.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A `Matches` condition carries a non-string expected value.
    #[error("policy {policy_id} condition {index}: matches operator expects a string pattern")]
    PatternNotString {
        /// Offending policy.
        policy_id: PolicyId,
        /// Condition index within the policy.
        index: usize,
    },
    /// A `Matches` condition carries a malformed regular expression.
    #[error("policy {policy_id} condition {index}: invalid pattern: {source}")]
    InvalidPattern {
        /// Offending policy.
        policy_id: PolicyId,
        /// Condition index within the policy.
        index: usize,
        /// Underlying regex error.
        source: regex::Error,
    },
}

// ============================================================================
// SECTION: Engine State
// ============================================================================

/// Policy with its `Matches` patterns compiled at registration.
struct CompiledPolicy {
    /// Registered policy.
    policy: SecurityPolicy,
    /// Compiled regexes keyed by condition index.
    regexes: BTreeMap<usize, Regex>,
}

/// Interior registry state guarded by one lock.
#[derive(Default)]
struct EngineState {
    /// Registered roles by identifier.
    roles: BTreeMap<RoleId, Role>,
    /// Diagnostics-only transitive closure: role to all inherited ancestors.
    /// Decisions never consult this index; they recompute via the walk.
    closure: BTreeMap<RoleId, BTreeSet<RoleId>>,
    /// Compiled policies sorted by descending priority, ties by identifier.
    policies: Vec<CompiledPolicy>,
}

/// Access control engine combining RBAC and ABAC.
pub struct AccessControlEngine {
    /// Registry state.
    state: RwLock<EngineState>,
}

impl Default for AccessControlEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessControlEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
        }
    }

    // ------------------------------------------------------------------
    // Role registry
    // ------------------------------------------------------------------

    /// Registers or replaces a role and refreshes the diagnostics closure.
    pub fn register_role(&self, role: Role) {
        if let Ok(mut state) = self.state.write() {
            state.roles.insert(role.role_id.clone(), role);
            state.closure = build_closure(&state.roles);
        }
    }

    /// Returns a copy of the registered role, when present.
    #[must_use]
    pub fn role(&self, role_id: &RoleId) -> Option<Role> {
        self.state.read().ok().and_then(|state| state.roles.get(role_id).cloned())
    }

    /// Returns the diagnostics ancestor set for a role, when present.
    #[must_use]
    pub fn ancestors_of(&self, role_id: &RoleId) -> Option<BTreeSet<RoleId>> {
        self.state.read().ok().and_then(|state| state.closure.get(role_id).cloned())
    }

    /// Computes the effective permission set for a role via the inheritance
    /// walk described in the role model (visited-set, cycle safe).
    #[must_use]
    pub fn effective_permissions(&self, role_id: &RoleId) -> PermissionGrants {
        self.state.read().map_or_else(
            |_| PermissionGrants::new(),
            |state| effective_permissions(&state.roles, role_id),
        )
    }

    // ------------------------------------------------------------------
    // Policy registry
    // ------------------------------------------------------------------

    /// Registers or replaces a policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when a `Matches` condition is malformed; the
    /// store is left unchanged.
    pub fn register_policy(&self, policy: SecurityPolicy) -> Result<(), PolicyError> {
        let compiled = compile_policy(policy)?;
        if let Ok(mut state) = self.state.write() {
            state.policies.retain(|entry| entry.policy.policy_id != compiled.policy.policy_id);
            state.policies.push(compiled);
            state.policies.sort_by(|a, b| {
                b.policy
                    .priority
                    .cmp(&a.policy.priority)
                    .then_with(|| a.policy.policy_id.cmp(&b.policy.policy_id))
            });
        }
        Ok(())
    }

    /// Removes a policy, returning whether it was present.
    pub fn remove_policy(&self, policy_id: &PolicyId) -> bool {
        self.state.write().is_ok_and(|mut state| {
            let before = state.policies.len();
            state.policies.retain(|entry| entry.policy.policy_id != *policy_id);
            state.policies.len() != before
        })
    }

    /// Returns the number of registered roles and policies.
    #[must_use]
    pub fn registry_counts(&self) -> (usize, usize) {
        self.state
            .read()
            .map_or((0, 0), |state| (state.roles.len(), state.policies.len()))
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluates an access request into a decision.
    ///
    /// `risk_score` feeds `RiskScore` conditions; callers without a threat
    /// analysis pass `0.0`.
    #[must_use]
    pub fn evaluate(&self, request: &AccessRequest, risk_score: f64) -> AccessDecision {
        let Ok(state) = self.state.read() else {
            return finalize(
                AccessDecision {
                    allowed: false,
                    reason: "access registry unavailable".to_string(),
                    matched_policy: None,
                    obligations: Vec::new(),
                    audit_required: true,
                },
                request,
            );
        };

        // Stage 1: RBAC.
        if !rbac_grants(&state.roles, request) {
            return finalize(
                AccessDecision {
                    allowed: false,
                    reason: "no role grants the required permission".to_string(),
                    matched_policy: None,
                    obligations: Vec::new(),
                    audit_required: true,
                },
                request,
            );
        }

        // Stage 2: ABAC, first full match decides.
        for entry in &state.policies {
            if !entry.policy.enabled || !policy_applies(&entry.policy, request) {
                continue;
            }
            if !conditions_hold(&entry.policy.conditions, &entry.regexes, request, risk_score) {
                continue;
            }
            return match entry.policy.effect {
                PolicyEffect::Deny => finalize(
                    AccessDecision {
                        allowed: false,
                        reason: format!("denied by policy {}", entry.policy.name),
                        matched_policy: Some(entry.policy.policy_id.clone()),
                        obligations: Vec::new(),
                        audit_required: true,
                    },
                    request,
                ),
                PolicyEffect::Allow => finalize(
                    AccessDecision {
                        allowed: true,
                        reason: format!("allowed by policy {}", entry.policy.name),
                        matched_policy: Some(entry.policy.policy_id.clone()),
                        obligations: entry.policy.obligations.clone(),
                        audit_required: false,
                    },
                    request,
                ),
            };
        }

        // No policy matched; RBAC already granted the permission.
        finalize(
            AccessDecision {
                allowed: true,
                reason: "allowed by role permissions".to_string(),
                matched_policy: None,
                obligations: Vec::new(),
                audit_required: false,
            },
            request,
        )
    }
}

// ============================================================================
// SECTION: RBAC Helpers
// ============================================================================

/// Returns whether any constraint-passing subject role grants the action.
fn rbac_grants(roles: &BTreeMap<RoleId, Role>, request: &AccessRequest) -> bool {
    request.subject.roles.iter().any(|role_id| {
        let Some(role) = roles.get(role_id) else {
            return false;
        };
        if !constraints_hold(&role.constraints, request) {
            return false;
        }
        effective_permissions(roles, role_id)
            .get(&request.resource.resource_type)
            .is_some_and(|actions| actions.contains(&request.action))
    })
}

/// Returns whether every role constraint holds for the request.
fn constraints_hold(constraints: &[RoleConstraint], request: &AccessRequest) -> bool {
    constraints.iter().all(|constraint| match constraint {
        RoleConstraint::TimeWindow { start_hour, end_hour } => {
            let hour = request.context.timestamp.hour_of_day();
            if start_hour <= end_hour {
                (*start_hour..=*end_hour).contains(&hour)
            } else {
                // Window wraps midnight.
                hour >= *start_hour || hour <= *end_hour
            }
        }
        RoleConstraint::IpAllowList { matchers } => {
            matchers.iter().any(|matcher| matcher.matches(request.context.client_ip))
        }
        RoleConstraint::MfaRequired => request.subject.mfa_verified,
        RoleConstraint::TenantAllowList { tenants } => tenants.contains(&request.subject.tenant_id),
        RoleConstraint::EnvironmentAllowList { environments } => {
            environments.contains(&request.context.environment)
        }
    })
}

/// Computes the effective permission union for a role with cycle protection.
fn effective_permissions(roles: &BTreeMap<RoleId, Role>, role_id: &RoleId) -> PermissionGrants {
    let mut grants = PermissionGrants::new();
    let mut visited: BTreeSet<RoleId> = BTreeSet::new();
    let mut pending = vec![role_id.clone()];

    while let Some(current) = pending.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(role) = roles.get(&current) else {
            continue;
        };
        for (resource_type, actions) in &role.permissions {
            grants.entry(*resource_type).or_default().extend(actions.iter().copied());
        }
        pending.extend(role.inherits.iter().cloned());
    }

    grants
}

/// Builds the diagnostics-only transitive-closure index for all roles.
fn build_closure(roles: &BTreeMap<RoleId, Role>) -> BTreeMap<RoleId, BTreeSet<RoleId>> {
    roles
        .keys()
        .map(|role_id| {
            let mut ancestors = BTreeSet::new();
            let mut pending: Vec<RoleId> = roles
                .get(role_id)
                .map(|role| role.inherits.clone())
                .unwrap_or_default();
            while let Some(current) = pending.pop() {
                if current != *role_id && ancestors.insert(current.clone())
                    && let Some(role) = roles.get(&current)
                {
                    pending.extend(role.inherits.iter().cloned());
                }
            }
            (role_id.clone(), ancestors)
        })
        .collect()
}

// ============================================================================
// SECTION: ABAC Helpers
// ============================================================================

/// Compiles a policy's `Matches` conditions.
fn compile_policy(policy: SecurityPolicy) -> Result<CompiledPolicy, PolicyError> {
    let mut regexes = BTreeMap::new();
    for (index, condition) in policy.conditions.iter().enumerate() {
        if condition.operator != ConditionOperator::Matches {
            continue;
        }
        let Some(pattern) = condition.expected.as_str() else {
            return Err(PolicyError::PatternNotString {
                policy_id: policy.policy_id.clone(),
                index,
            });
        };
        let regex = Regex::new(pattern).map_err(|source| PolicyError::InvalidPattern {
            policy_id: policy.policy_id.clone(),
            index,
            source,
        })?;
        regexes.insert(index, regex);
    }
    Ok(CompiledPolicy { policy, regexes })
}

/// Returns whether the policy's matchers and action list apply.
fn policy_applies(policy: &SecurityPolicy, request: &AccessRequest) -> bool {
    subject_matches(&policy.subject, request)
        && resource_matches(&policy.resource, request)
        && (policy.actions.is_empty() || policy.actions.contains(&request.action))
}

/// Returns whether the subject matcher applies.
fn subject_matches(matcher: &SubjectMatcher, request: &AccessRequest) -> bool {
    if matcher
        .subject_type
        .is_some_and(|expected| expected != request.subject.subject_type)
    {
        return false;
    }
    if !matcher.roles.is_empty() && !matcher.roles.iter().any(|role| request.subject.roles.contains(role)) {
        return false;
    }
    matcher
        .attributes
        .iter()
        .all(|(key, expected)| request.subject.attributes.get(key) == Some(expected))
}

/// Returns whether the resource matcher applies.
fn resource_matches(matcher: &ResourceMatcher, request: &AccessRequest) -> bool {
    if matcher
        .resource_type
        .is_some_and(|expected| expected != request.resource.resource_type)
    {
        return false;
    }
    if matcher
        .resource_id
        .as_ref()
        .is_some_and(|expected| *expected != request.resource.resource_id)
    {
        return false;
    }
    if matcher
        .tenant_id
        .as_ref()
        .is_some_and(|expected| *expected != request.resource.tenant_id)
    {
        return false;
    }
    if !matcher.sensitivity.is_empty() {
        return request
            .resource
            .sensitivity
            .is_some_and(|tier| matcher.sensitivity.contains(&tier));
    }
    true
}

/// Returns whether every condition holds.
fn conditions_hold(
    conditions: &[Condition],
    regexes: &BTreeMap<usize, Regex>,
    request: &AccessRequest,
    risk_score: f64,
) -> bool {
    conditions
        .iter()
        .enumerate()
        .all(|(index, condition)| evaluate_condition(condition, regexes.get(&index), request, risk_score))
}

// ============================================================================
// SECTION: Decision Finalization
// ============================================================================

/// Forces the audit flag for sensitive resources, actions, and environments.
fn finalize(mut decision: AccessDecision, request: &AccessRequest) -> AccessDecision {
    let sensitive_resource = request
        .resource
        .sensitivity
        .is_some_and(SensitivityTier::forces_audit);
    if sensitive_resource
        || request.action.forces_audit()
        || request.context.environment == PRODUCTION_ENVIRONMENT
    {
        decision.audit_required = true;
    }
    decision
}
