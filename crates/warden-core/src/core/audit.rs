// crates/warden-core/src/core/audit.rs
// ============================================================================
// Module: Warden Audit Events
// Description: Structured security events emitted on the decision path.
// Purpose: Give audit sinks a stable, queryable event shape.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every security-relevant step (session lifecycle, threat detection, access
//! decisions) emits a [`SecurityEvent`] to an injected
//! [`crate::interfaces::AuditSink`]. The core does not persist events;
//! persistence, retention, and compliance formatting belong to the host.
//!
//! Security posture: emission is fire-and-forget and must never block or fail
//! the decision path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::EventId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::SubjectId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event Classification
// ============================================================================

/// Audit event category.
///
/// # Invariants
/// - Variants are stable for serialization and audit-log filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    /// Session lifecycle event.
    Session,
    /// Threat detection event.
    Threat,
    /// Access control event.
    Access,
}

impl SecurityEventType {
    /// Returns a stable label for the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Threat => "threat",
            Self::Access => "access",
        }
    }
}

/// Audit event severity.
///
/// # Invariants
/// - Ordering reflects increasing severity for filter comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Info,
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical severity.
    Critical,
}

impl Severity {
    /// Returns a stable label for the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Outcome label attached to access and session events.
///
/// # Invariants
/// - Variants are stable for serialization and audit-log filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The operation succeeded or access was granted.
    Success,
    /// The operation failed or access was denied.
    Denied,
    /// The operation requires an additional challenge.
    Challenged,
}

// ============================================================================
// SECTION: Security Event
// ============================================================================

/// Structured security event emitted to audit sinks.
///
/// # Invariants
/// - `details` values are snapshots; sinks must not rely on later mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Event identifier.
    pub event_id: EventId,
    /// Event timestamp.
    pub timestamp: Timestamp,
    /// Event category.
    pub event_type: SecurityEventType,
    /// Event severity.
    pub severity: Severity,
    /// Subject the event concerns, when known.
    pub subject_id: Option<SubjectId>,
    /// Resource label, when applicable.
    pub resource: Option<String>,
    /// Action label, when applicable.
    pub action: Option<String>,
    /// Outcome, when applicable.
    pub outcome: Option<AuditOutcome>,
    /// Source address, when known.
    pub ip_address: Option<String>,
    /// Correlating request identifier, when known.
    pub request_id: Option<RequestId>,
    /// Structured event details.
    pub details: BTreeMap<String, Value>,
}
