// crates/warden-core/tests/abac.rs
// ============================================================================
// Module: ABAC Tests
// Description: Policy matching, priority ordering, conditions, and obligations.
// Purpose: Validate the ABAC half of the access control engine.
// Dependencies: warden-core, serde_json
// ============================================================================
//! ## Overview
//! Validates priority-ordered first-match evaluation, deny precedence over
//! role grants, condition operators, and registration-time pattern rejection.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use serde_json::json;
use warden_core::AccessControlEngine;
use warden_core::ActionKind;
use warden_core::Condition;
use warden_core::ConditionField;
use warden_core::ConditionOperator;
use warden_core::Obligation;
use warden_core::PolicyEffect;
use warden_core::PolicyId;
use warden_core::ResourceMatcher;
use warden_core::ResourceType;
use warden_core::Role;
use warden_core::SecurityPolicy;
use warden_core::SensitivityTier;
use warden_core::SubjectMatcher;
use warden_core::Timestamp;

use common::request;
use common::resource;
use common::subject;

/// Builds a wildcard policy skeleton with the given identity and effect.
fn policy(id: &str, effect: PolicyEffect, priority: i32) -> SecurityPolicy {
    SecurityPolicy {
        policy_id: PolicyId::new(id),
        name: id.to_string(),
        effect,
        priority,
        enabled: true,
        subject: SubjectMatcher::default(),
        resource: ResourceMatcher::default(),
        actions: Vec::new(),
        conditions: Vec::new(),
        obligations: Vec::new(),
    }
}

/// Engine with an admin role granting delete on secrets.
fn engine_with_admin() -> AccessControlEngine {
    let engine = AccessControlEngine::new();
    engine.register_role(
        Role::new("admin", "Admin").grant(ResourceType::Secret, [ActionKind::Delete, ActionKind::Read]),
    );
    engine
}

#[test]
fn deny_policy_overrides_role_grant() {
    let engine = engine_with_admin();
    let mut deny = policy("no-secret-delete", PolicyEffect::Deny, 100);
    deny.resource.resource_type = Some(ResourceType::Secret);
    deny.actions = vec![ActionKind::Delete];
    engine.register_policy(deny).unwrap();

    let decision = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Delete,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(!decision.allowed);
    assert_eq!(decision.matched_policy, Some(PolicyId::new("no-secret-delete")));
    assert!(decision.audit_required);
}

#[test]
fn higher_priority_allow_wins_over_lower_deny() {
    let engine = engine_with_admin();
    let mut allow = policy("break-glass", PolicyEffect::Allow, 200);
    allow.actions = vec![ActionKind::Delete];
    allow.obligations = vec![Obligation::new("log")];
    engine.register_policy(allow).unwrap();
    let mut deny = policy("no-delete", PolicyEffect::Deny, 100);
    deny.actions = vec![ActionKind::Delete];
    engine.register_policy(deny).unwrap();

    let decision = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Delete,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(decision.allowed);
    assert_eq!(decision.matched_policy, Some(PolicyId::new("break-glass")));
    assert_eq!(decision.obligations.len(), 1);
    assert_eq!(decision.obligations[0].kind, "log");
}

#[test]
fn no_matching_policy_defaults_to_allow_after_rbac() {
    let engine = engine_with_admin();
    let mut deny = policy("tool-only", PolicyEffect::Deny, 50);
    deny.resource.resource_type = Some(ResourceType::Tool);
    engine.register_policy(deny).unwrap();

    let decision = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(decision.allowed);
    assert!(decision.matched_policy.is_none());
    assert!(decision.reason.contains("role permissions"));
}

#[test]
fn disabled_policy_never_participates() {
    let engine = engine_with_admin();
    let mut deny = policy("disabled-deny", PolicyEffect::Deny, 100);
    deny.enabled = false;
    engine.register_policy(deny).unwrap();

    let decision = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(decision.allowed);
}

#[test]
fn condition_failure_skips_policy() {
    let engine = engine_with_admin();
    let mut deny = policy("prod-only-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::Environment,
        operator: ConditionOperator::Equals,
        expected: json!("production"),
    }];
    engine.register_policy(deny).unwrap();

    // Requests built by the common helper run in `staging`.
    let decision = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(decision.allowed);
}

#[test]
fn risk_score_condition_uses_supplied_score() {
    let engine = engine_with_admin();
    let mut deny = policy("high-risk-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::RiskScore,
        operator: ConditionOperator::GreaterThan,
        expected: json!(0.7),
    }];
    engine.register_policy(deny).unwrap();

    let req = request(
        subject("root", &["admin"]),
        resource(ResourceType::Secret, "db-password"),
        ActionKind::Read,
        "10.0.0.1",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    assert!(engine.evaluate(&req, 0.2).allowed);
    assert!(!engine.evaluate(&req, 0.9).allowed);
}

#[test]
fn subject_attribute_and_in_operator() {
    let engine = engine_with_admin();
    let mut deny = policy("contractor-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::SubjectAttribute { key: "employment".to_string() },
        operator: ConditionOperator::In,
        expected: json!(["contractor", "intern"]),
    }];
    engine.register_policy(deny).unwrap();

    let mut contractor = subject("bob", &["admin"]);
    contractor
        .attributes
        .insert("employment".to_string(), json!("contractor"));
    let denied = engine.evaluate(
        &request(
            contractor,
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(!denied.allowed);

    // A subject without the attribute fails the condition, so the policy
    // does not match and RBAC prevails.
    let allowed = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            resource(ResourceType::Secret, "db-password"),
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(allowed.allowed);
}

#[test]
fn not_equals_and_not_in_gate_on_environment() {
    let engine = engine_with_admin();
    let mut deny = policy("nonprod-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::Environment,
        operator: ConditionOperator::NotEquals,
        expected: json!("production"),
    }];
    engine.register_policy(deny).unwrap();

    // The common helper runs requests in `staging`, so the deny matches.
    let req = request(
        subject("root", &["admin"]),
        resource(ResourceType::Secret, "db-password"),
        ActionKind::Read,
        "10.0.0.1",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    assert!(!engine.evaluate(&req, 0.0).allowed);

    let mut prod = req.clone();
    prod.context.environment = "production".to_string();
    assert!(engine.evaluate(&prod, 0.0).allowed);

    // NotIn behaves the same over an environment list.
    assert!(engine.remove_policy(&PolicyId::new("nonprod-deny")));
    let mut deny = policy("ephemeral-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::Environment,
        operator: ConditionOperator::NotIn,
        expected: json!(["production", "dr"]),
    }];
    engine.register_policy(deny).unwrap();
    assert!(!engine.evaluate(&req, 0.0).allowed);
    assert!(engine.evaluate(&prod, 0.0).allowed);
}

#[test]
fn less_than_gates_on_hour_of_day() {
    let engine = engine_with_admin();
    let mut deny = policy("early-hours-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::HourOfDay,
        operator: ConditionOperator::LessThan,
        expected: json!(6),
    }];
    engine.register_policy(deny).unwrap();

    // 1_700_000_000_000 ms falls at 22:13 UTC; five hours later is 03:13.
    let evening = request(
        subject("root", &["admin"]),
        resource(ResourceType::Secret, "db-password"),
        ActionKind::Read,
        "10.0.0.1",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    assert!(engine.evaluate(&evening, 0.0).allowed);

    let mut small_hours = evening.clone();
    small_hours.context.timestamp = Timestamp::from_unix_millis(1_700_000_000_000 + 5 * 3_600_000);
    assert!(!engine.evaluate(&small_hours, 0.0).allowed);
}

#[test]
fn contains_matches_tagged_context_values() {
    let engine = engine_with_admin();
    let mut deny = policy("debug-deny", PolicyEffect::Deny, 100);
    deny.conditions = vec![Condition {
        field: ConditionField::Context { key: "tags".to_string() },
        operator: ConditionOperator::Contains,
        expected: json!("debug"),
    }];
    engine.register_policy(deny).unwrap();

    let mut tagged = request(
        subject("root", &["admin"]),
        resource(ResourceType::Secret, "db-password"),
        ActionKind::Read,
        "10.0.0.1",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    tagged.context.extra.insert("tags".to_string(), json!(["beta", "debug"]));
    assert!(!engine.evaluate(&tagged, 0.0).allowed);

    // A request without the context key fails the condition; RBAC prevails.
    let untagged = request(
        subject("root", &["admin"]),
        resource(ResourceType::Secret, "db-password"),
        ActionKind::Read,
        "10.0.0.1",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    assert!(engine.evaluate(&untagged, 0.0).allowed);
}

#[test]
fn malformed_matches_pattern_fails_registration() {
    let engine = engine_with_admin();
    let mut bad = policy("bad-pattern", PolicyEffect::Deny, 10);
    bad.conditions = vec![Condition {
        field: ConditionField::Environment,
        operator: ConditionOperator::Matches,
        expected: json!("unclosed(group"),
    }];
    assert!(engine.register_policy(bad).is_err());
    let (_, policies) = engine.registry_counts();
    assert_eq!(policies, 0);
}

#[test]
fn sensitivity_matcher_and_forced_audit() {
    let engine = engine_with_admin();
    let mut deny = policy("restricted-deny", PolicyEffect::Deny, 100);
    deny.resource.sensitivity = vec![SensitivityTier::Restricted];
    engine.register_policy(deny).unwrap();

    let mut restricted = resource(ResourceType::Secret, "master-key");
    restricted.sensitivity = Some(SensitivityTier::Restricted);
    let denied = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            restricted,
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(!denied.allowed);

    // An allow on a confidential resource still forces the audit flag.
    let mut confidential = resource(ResourceType::Secret, "api-key");
    confidential.sensitivity = Some(SensitivityTier::Confidential);
    let allowed = engine.evaluate(
        &request(
            subject("root", &["admin"]),
            confidential,
            ActionKind::Read,
            "10.0.0.1",
            Timestamp::from_unix_millis(1_700_000_000_000),
        ),
        0.0,
    );
    assert!(allowed.allowed);
    assert!(allowed.audit_required);
}

#[test]
fn remove_policy_restores_prior_outcome() {
    let engine = engine_with_admin();
    let mut deny = policy("temp-deny", PolicyEffect::Deny, 100);
    deny.actions = vec![ActionKind::Read];
    engine.register_policy(deny).unwrap();

    let req = request(
        subject("root", &["admin"]),
        resource(ResourceType::Secret, "db-password"),
        ActionKind::Read,
        "10.0.0.1",
        Timestamp::from_unix_millis(1_700_000_000_000),
    );
    assert!(!engine.evaluate(&req, 0.0).allowed);
    assert!(engine.remove_policy(&PolicyId::new("temp-deny")));
    assert!(engine.evaluate(&req, 0.0).allowed);
    assert!(!engine.remove_policy(&PolicyId::new("temp-deny")));
}
