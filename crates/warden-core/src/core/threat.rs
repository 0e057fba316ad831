// crates/warden-core/src/core/threat.rs
// ============================================================================
// Module: Warden Threat Records
// Description: Threat signals, indicators, reputation, and behavior profiles.
// Purpose: Describe the state the threat detector accumulates and emits.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The threat detector keeps two append-and-prune structures per source:
//! [`IpReputation`] (per address) and [`UserBehaviorProfile`] (per subject).
//! Sliding-window timestamp lists discard entries older than the window on
//! every access. Detected conditions become [`ThreatSignal`]s; each analysis
//! returns a [`ThreatResponse`] folding all indicators into one action.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::audit::Severity;
use crate::core::identifiers::SignalId;
use crate::core::identifiers::SubjectId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Threat Classification
// ============================================================================

/// Threat category attached to signals and indicators.
///
/// # Invariants
/// - Variants are stable for serialization and statistics keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    /// Repeated authentication failures from one address.
    BruteForce,
    /// Request content matched a suspicious pattern.
    SuspiciousPattern,
    /// Request volume exceeded the rate window.
    Volume,
    /// Subject appeared from a previously unseen address.
    NewIp,
    /// Behavioral anomaly (for example off-hours activity).
    Anomaly,
    /// Request arrived from a blocked address.
    Blocked,
}

impl ThreatType {
    /// Returns a stable label for the threat type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BruteForce => "brute_force",
            Self::SuspiciousPattern => "suspicious_pattern",
            Self::Volume => "volume",
            Self::NewIp => "new_ip",
            Self::Anomaly => "anomaly",
            Self::Blocked => "blocked",
        }
    }
}

/// Source a threat signal is attributed to.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThreatSource {
    /// Signal attributed to a network address.
    Ip {
        /// Source address.
        address: IpAddr,
    },
    /// Signal attributed to a subject.
    Subject {
        /// Source subject.
        subject_id: SubjectId,
    },
}

// ============================================================================
// SECTION: Indicators and Signals
// ============================================================================

/// Single detection indicator contributing to a threat response.
///
/// # Invariants
/// - `confidence` is within `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIndicator {
    /// Indicator kind.
    pub kind: ThreatType,
    /// Human-readable indicator value (what was observed).
    pub value: String,
    /// Detection confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

impl ThreatIndicator {
    /// Creates an indicator, clamping confidence into `[0.0, 1.0]`.
    #[must_use]
    pub fn new(kind: ThreatType, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Persisted threat signal.
///
/// # Invariants
/// - Signals are append-only; mitigation flips `mitigated` without removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSignal {
    /// Signal identifier.
    pub signal_id: SignalId,
    /// Detection time.
    pub timestamp: Timestamp,
    /// Threat category.
    pub threat_type: ThreatType,
    /// Signal severity.
    pub severity: Severity,
    /// Attribution source.
    pub source: ThreatSource,
    /// Optional target description (resource, subject, endpoint).
    pub target: Option<String>,
    /// Contributing indicators.
    pub indicators: Vec<ThreatIndicator>,
    /// Free-form context captured at detection time.
    pub context: BTreeMap<String, Value>,
    /// Whether the signal has been mitigated.
    pub mitigated: bool,
    /// Mitigation description, when mitigated.
    pub mitigation: Option<String>,
}

// ============================================================================
// SECTION: Threat Response
// ============================================================================

/// Action the detector recommends for a request.
///
/// # Invariants
/// - Ordering reflects increasing severity of response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatAction {
    /// No action required.
    Allow,
    /// Allow but record for follow-up.
    Monitor,
    /// Require an additional verification step.
    Challenge,
    /// Deny the request outright.
    Block,
}

impl ThreatAction {
    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Monitor => "monitor",
            Self::Challenge => "challenge",
            Self::Block => "block",
        }
    }
}

/// Outcome of one threat analysis pass.
///
/// # Invariants
/// - `risk_score` is the mean indicator confidence, `0.0` with no indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatResponse {
    /// Recommended action.
    pub action: ThreatAction,
    /// Human-readable reason.
    pub reason: String,
    /// Indicators contributing to the decision.
    pub indicators: Vec<ThreatIndicator>,
    /// Suggested block duration in milliseconds, for block actions.
    pub block_duration_ms: Option<u64>,
    /// Whether the response warrants escalation to operators.
    pub escalate: bool,
    /// Mean indicator confidence, fed to ABAC risk conditions.
    pub risk_score: f64,
}

// ============================================================================
// SECTION: Reputation and Behavior State
// ============================================================================

/// Per-address reputation with sliding windows.
///
/// # Invariants
/// - Timestamp lists are pruned to their windows on every access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpReputation {
    /// Failed authentication timestamps within the brute-force window.
    pub failed_auths: Vec<Timestamp>,
    /// Count of successful authentications.
    pub successful_auths: u64,
    /// Request timestamps within the rate window.
    pub requests: Vec<Timestamp>,
    /// Whether the address is currently blocked.
    pub blocked: bool,
    /// Block expiry, when blocked with a duration.
    pub block_expires_at: Option<Timestamp>,
    /// Block reason, when blocked.
    pub block_reason: Option<String>,
}

/// Per-subject behavior profile.
///
/// # Invariants
/// - `known_ips` and `active_hours` only grow; pruning is not required for
///   correctness, only for memory in long-running hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBehaviorProfile {
    /// Addresses the subject has successfully authenticated from.
    pub known_ips: BTreeSet<IpAddr>,
    /// UTC hours of day the subject has historically been active in.
    pub active_hours: BTreeSet<u8>,
    /// Total failed login count.
    pub failed_logins: u64,
    /// Last successful login time.
    pub last_login_at: Option<Timestamp>,
    /// Last failed login time.
    pub last_failure_at: Option<Timestamp>,
}
