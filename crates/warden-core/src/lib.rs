// crates/warden-core/src/lib.rs
// ============================================================================
// Module: Warden Core Library
// Description: Data model and decision engines for the Warden authorization core.
// Purpose: Provide RBAC/ABAC evaluation, session lifecycle, and threat analysis.
// Dependencies: serde, serde_json, thiserror, time, regex
// ============================================================================

//! ## Overview
//! Warden Core contains the three decision components composed by the gateway
//! facade: the [`runtime::AccessControlEngine`], the [`runtime::SessionManager`],
//! and the [`runtime::ThreatDetector`], together with the shared data model.
//! Invariants:
//! - The core never reads wall-clock time; hosts inject a [`interfaces::Clock`].
//! - Malformed policy or pattern configuration fails at registration time,
//!   never during request evaluation.
//! - Every denial carries a human-readable reason suitable for audit records.
//!
//! Security posture: requests, subjects, and attributes are untrusted input;
//! evaluation fails closed on missing or invalid data.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::audit::AuditOutcome;
pub use crate::core::audit::SecurityEvent;
pub use crate::core::audit::SecurityEventType;
pub use crate::core::audit::Severity;
pub use crate::core::identifiers::EventId;
pub use crate::core::identifiers::PolicyId;
pub use crate::core::identifiers::RequestId;
pub use crate::core::identifiers::RoleId;
pub use crate::core::identifiers::SessionId;
pub use crate::core::identifiers::SignalId;
pub use crate::core::identifiers::SubjectId;
pub use crate::core::identifiers::TenantId;
pub use crate::core::net::IpMatcher;
pub use crate::core::net::IpMatcherError;
pub use crate::core::policy::Condition;
pub use crate::core::policy::ConditionField;
pub use crate::core::policy::ConditionOperator;
pub use crate::core::policy::Obligation;
pub use crate::core::policy::PolicyEffect;
pub use crate::core::policy::ResourceMatcher;
pub use crate::core::policy::SecurityPolicy;
pub use crate::core::policy::SubjectMatcher;
pub use crate::core::request::AccessRequest;
pub use crate::core::request::ActionKind;
pub use crate::core::request::RequestContext;
pub use crate::core::resource::Resource;
pub use crate::core::resource::ResourceType;
pub use crate::core::resource::SensitivityTier;
pub use crate::core::role::Role;
pub use crate::core::role::RoleConstraint;
pub use crate::core::session::Session;
pub use crate::core::session::SessionManagerConfig;
pub use crate::core::subject::Subject;
pub use crate::core::subject::SubjectType;
pub use crate::core::threat::IpReputation;
pub use crate::core::threat::ThreatAction;
pub use crate::core::threat::ThreatIndicator;
pub use crate::core::threat::ThreatResponse;
pub use crate::core::threat::ThreatSignal;
pub use crate::core::threat::ThreatSource;
pub use crate::core::threat::ThreatType;
pub use crate::core::threat::UserBehaviorProfile;
pub use crate::core::time::Timestamp;
pub use interfaces::AuditSink;
pub use interfaces::Clock;
pub use interfaces::ManualClock;
pub use interfaces::NoopAuditSink;
pub use interfaces::TokenGenerator;
pub use runtime::AccessControlEngine;
pub use runtime::AccessDecision;
pub use runtime::NewSession;
pub use runtime::PolicyError;
pub use runtime::SessionError;
pub use runtime::SessionManager;
pub use runtime::SessionValidation;
pub use runtime::SweepReport;
pub use runtime::ThreatConfigError;
pub use runtime::ThreatDetector;
pub use runtime::ThreatDetectorConfig;
pub use runtime::ThreatPattern;
pub use runtime::ValidationFailure;
