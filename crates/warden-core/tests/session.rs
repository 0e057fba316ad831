// crates/warden-core/tests/session.rs
// ============================================================================
// Module: Session Manager Tests
// Description: Session lifecycle, eviction, rotation, and sweep behavior.
// Purpose: Validate session validity rules and terminal-state transitions.
// Dependencies: warden-core
// ============================================================================
//! ## Overview
//! Validates creation policy, idle and absolute expiry, IP binding, the
//! concurrent-session cap, rotation identity, revocation, and sweeping.

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

use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::Clock;
use warden_core::ManualClock;
use warden_core::NewSession;
use warden_core::SecurityEventType;
use warden_core::SessionError;
use warden_core::SessionManager;
use warden_core::SessionManagerConfig;
use warden_core::Severity;
use warden_core::SubjectId;
use warden_core::SubjectType;
use warden_core::TenantId;
use warden_core::Timestamp;
use warden_core::ValidationFailure;

use common::CollectingSink;
use common::SeqTokens;
use common::ip;

/// Builds a manager with a manual clock and collecting audit sink.
fn manager(config: SessionManagerConfig) -> (SessionManager, Arc<ManualClock>, Arc<CollectingSink>) {
    let clock = Arc::new(ManualClock::starting_at(Timestamp::from_unix_millis(1_700_000_000_000)));
    let sink = Arc::new(CollectingSink::default());
    let manager = SessionManager::new(config, clock.clone(), Arc::new(SeqTokens::default()), sink.clone());
    (manager, clock, sink)
}

/// Creation parameters for the default test subject.
fn new_session(subject: &str, addr: &str) -> NewSession {
    NewSession {
        subject_id: SubjectId::new(subject),
        subject_type: SubjectType::User,
        tenant_id: TenantId::new("acme"),
        ip_address: ip(addr),
        user_agent: "warden-test/1.0".to_string(),
        mfa_verified: false,
        attributes: BTreeMap::new(),
    }
}

#[test]
fn created_session_validates_and_touches_activity() {
    let (manager, clock, _) = manager(SessionManagerConfig::default());
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    clock.advance(60_000);
    let validation = manager.validate_session(&session.session_id, Some(ip("1.2.3.4")));
    assert!(validation.valid);
    let touched = validation.session.unwrap();
    assert_eq!(touched.last_activity_at, clock.now());
    assert!(!validation.should_rotate);
}

#[test]
fn mfa_required_rejects_unverified_creation() {
    let config = SessionManagerConfig {
        require_mfa: true,
        ..SessionManagerConfig::default()
    };
    let (manager, _, _) = manager(config);
    let err = manager.create_session(new_session("alice", "1.2.3.4")).unwrap_err();
    assert_eq!(err, SessionError::MfaRequired);
    assert_eq!(err.code(), "MFA_REQUIRED");
}

#[test]
fn idle_timeout_invalidates_untouched_session() {
    let (manager, clock, _) = manager(SessionManagerConfig::default());
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    clock.advance(30 * 60 * 1_000 + 1);
    let validation = manager.validate_session(&session.session_id, Some(ip("1.2.3.4")));
    assert!(!validation.valid);
    assert_eq!(validation.reason.as_deref(), Some("session idle timeout"));
    assert_eq!(validation.failure, Some(ValidationFailure::IdleTimeout));
    assert!(!ValidationFailure::IdleTimeout.suspicious());

    // Validity never comes back.
    clock.advance(1);
    assert!(!manager.validate_session(&session.session_id, Some(ip("1.2.3.4"))).valid);
}

#[test]
fn absolute_expiry_invalidates_even_active_session() {
    let (manager, clock, _) = manager(SessionManagerConfig::default());
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    // Touch every 10 minutes to stay ahead of the idle window.
    for _ in 0..48 {
        clock.advance(10 * 60 * 1_000);
        let _ = manager.validate_session(&session.session_id, Some(ip("1.2.3.4")));
    }
    clock.advance(10 * 60 * 1_000);
    let validation = manager.validate_session(&session.session_id, Some(ip("1.2.3.4")));
    assert!(!validation.valid);
    assert_eq!(validation.reason.as_deref(), Some("session expired"));
    assert_eq!(validation.failure, Some(ValidationFailure::Expired));
    assert!(!ValidationFailure::Expired.suspicious());
}

#[test]
fn ip_mismatch_denies_and_audits() {
    let (manager, _, sink) = manager(SessionManagerConfig::default());
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    let validation = manager.validate_session(&session.session_id, Some(ip("9.9.9.9")));
    assert!(!validation.valid);
    assert_eq!(validation.reason.as_deref(), Some("IP address mismatch"));
    assert_eq!(validation.failure, Some(ValidationFailure::IpMismatch));
    assert!(ValidationFailure::IpMismatch.suspicious());

    let events = sink.snapshot();
    let mismatch = events
        .iter()
        .find(|event| event.action.as_deref() == Some("session_ip_mismatch"))
        .unwrap();
    assert_eq!(mismatch.event_type, SecurityEventType::Session);
    assert_eq!(mismatch.severity, Severity::High);
}

#[test]
fn unbound_manager_ignores_ip_mismatch() {
    let config = SessionManagerConfig {
        bind_to_ip: false,
        ..SessionManagerConfig::default()
    };
    let (manager, _, _) = manager(config);
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();
    assert!(manager.validate_session(&session.session_id, Some(ip("9.9.9.9"))).valid);
}

#[test]
fn cap_evicts_oldest_live_session() {
    let config = SessionManagerConfig {
        max_sessions_per_subject: 2,
        ..SessionManagerConfig::default()
    };
    let (manager, clock, sink) = manager(config);

    let first = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();
    clock.advance(1_000);
    let second = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();
    clock.advance(1_000);
    let third = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    assert_eq!(manager.live_session_count(), 2);
    assert!(!manager.validate_session(&first.session_id, Some(ip("1.2.3.4"))).valid);
    assert!(manager.validate_session(&second.session_id, Some(ip("1.2.3.4"))).valid);
    assert!(manager.validate_session(&third.session_id, Some(ip("1.2.3.4"))).valid);

    let events = sink.snapshot();
    assert!(events.iter().any(|event| event.action.as_deref() == Some("session_evicted_by_cap")));
}

#[test]
fn rotation_replaces_identifier_and_keeps_data() {
    let (manager, clock, sink) = manager(SessionManagerConfig::default());
    let mut new = new_session("alice", "1.2.3.4");
    new.attributes.insert("device".to_string(), serde_json::json!("laptop"));
    let session = manager.create_session(new).unwrap();

    clock.advance(1_000);
    let rotated = manager.rotate_session(&session.session_id).unwrap();
    assert_ne!(rotated.session_id, session.session_id);
    assert_eq!(rotated.subject_id, session.subject_id);
    assert_eq!(rotated.tenant_id, session.tenant_id);
    assert_eq!(rotated.attributes, session.attributes);

    // Old identifier dies with the rotation; the new one is live.
    assert!(!manager.validate_session(&session.session_id, Some(ip("1.2.3.4"))).valid);
    assert!(manager.validate_session(&rotated.session_id, Some(ip("1.2.3.4"))).valid);

    let events = sink.snapshot();
    let event = events
        .iter()
        .find(|event| event.action.as_deref() == Some("session_rotated"))
        .unwrap();
    assert!(event.details.contains_key("previous_session"));
    assert!(event.details.contains_key("new_session"));
}

#[test]
fn rotation_requests_surface_after_interval() {
    let config = SessionManagerConfig {
        rotation_interval_ms: 60_000,
        ..SessionManagerConfig::default()
    };
    let (manager, clock, _) = manager(config);
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    clock.advance(59_000);
    assert!(!manager.validate_session(&session.session_id, Some(ip("1.2.3.4"))).should_rotate);
    clock.advance(2_000);
    assert!(manager.validate_session(&session.session_id, Some(ip("1.2.3.4"))).should_rotate);
}

#[test]
fn revoked_session_answers_revoked_until_swept() {
    let (manager, _, _) = manager(SessionManagerConfig::default());
    let session = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();

    manager.revoke_session(&session.session_id, Some("operator request".to_string())).unwrap();
    let validation = manager.validate_session(&session.session_id, Some(ip("1.2.3.4")));
    assert!(!validation.valid);
    assert_eq!(validation.reason.as_deref(), Some("session revoked"));
    assert_eq!(validation.failure, Some(ValidationFailure::Revoked));
    assert!(ValidationFailure::Revoked.suspicious());
    assert_eq!(manager.rotate_session(&session.session_id).unwrap_err(), SessionError::Revoked);

    let report = manager.sweep();
    assert_eq!(report.revoked, 1);
    assert_eq!(
        manager.validate_session(&session.session_id, Some(ip("1.2.3.4"))).reason.as_deref(),
        Some("session not found"),
    );
}

#[test]
fn revoke_all_counts_only_state_changes() {
    let (manager, _, _) = manager(SessionManagerConfig::default());
    let first = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();
    manager.create_session(new_session("alice", "1.2.3.4")).unwrap();
    manager.create_session(new_session("bob", "5.6.7.8")).unwrap();

    manager.revoke_session(&first.session_id, None).unwrap();
    let count = manager.revoke_all_sessions(&SubjectId::new("alice"), Some("offboarding".to_string()));
    assert_eq!(count, 1);
    assert_eq!(manager.revoke_all_sessions(&SubjectId::new("alice"), None), 0);
    assert!(manager.sessions_for_subject(&SubjectId::new("bob")).len() == 1);
}

#[test]
fn sweep_buckets_expired_and_idle() {
    let config = SessionManagerConfig {
        absolute_ttl_ms: 100_000,
        idle_timeout_ms: 50_000,
        ..SessionManagerConfig::default()
    };
    let (manager, clock, _) = manager(config);

    let _expired = manager.create_session(new_session("alice", "1.2.3.4")).unwrap();
    clock.advance(60_000);
    // The second session ages past its idle window while the first crosses
    // absolute expiry.
    let _idle = manager.create_session(new_session("bob", "5.6.7.8")).unwrap();
    clock.advance(55_000);

    let report = manager.sweep();
    // alice: past absolute expiry (115s > 100s). bob: idle (55s > 50s).
    assert_eq!(report.expired, 1);
    assert_eq!(report.idle, 1);
    assert_eq!(report.total(), 2);
    assert_eq!(manager.total_session_count(), 0);
}

#[test]
fn missing_session_reads_as_not_found() {
    let (manager, _, _) = manager(SessionManagerConfig::default());
    assert_eq!(
        manager.rotate_session(&warden_core::SessionId::new("ghost")).unwrap_err(),
        SessionError::NotFound,
    );
    assert_eq!(
        manager.revoke_session(&warden_core::SessionId::new("ghost"), None).unwrap_err(),
        SessionError::NotFound,
    );
}
