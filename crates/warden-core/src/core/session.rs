// crates/warden-core/src/core/session.rs
// ============================================================================
// Module: Warden Sessions
// Description: Session records and session manager configuration.
// Purpose: Describe authenticated session state and its lifecycle knobs.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Session`] is born live on successful authentication and dies by
//! revocation, rotation (the old identifier dies, a new one carries the same
//! data), or the background sweep once expired or idle. All terminal states
//! are equivalent to the validator: invalid.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::SessionId;
use crate::core::identifiers::SubjectId;
use crate::core::identifiers::TenantId;
use crate::core::subject::SubjectType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Session Record
// ============================================================================

/// Authenticated session record.
///
/// # Invariants
/// - `expires_at` is fixed at creation (absolute expiry); `last_activity_at`
///   advances on every successful validation (idle expiry).
/// - A revoked session stays in storage until swept so that "already revoked"
///   queries remain answerable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub session_id: SessionId,
    /// Subject the session belongs to.
    pub subject_id: SubjectId,
    /// Subject classification.
    pub subject_type: SubjectType,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Creation time.
    pub created_at: Timestamp,
    /// Absolute expiry time.
    pub expires_at: Timestamp,
    /// Last validated-use time.
    pub last_activity_at: Timestamp,
    /// Address the session is bound to.
    pub ip_address: IpAddr,
    /// Client user agent recorded at creation.
    pub user_agent: String,
    /// Whether the session was established with MFA.
    pub mfa_verified: bool,
    /// Free-form session attributes.
    pub attributes: BTreeMap<String, Value>,
    /// Whether the session has been revoked.
    pub revoked: bool,
    /// Revocation reason, when revoked.
    pub revoked_reason: Option<String>,
    /// Revocation time, when revoked.
    pub revoked_at: Option<Timestamp>,
}

impl Session {
    /// Returns whether the session is past absolute expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Returns whether the session is past the idle window at `now`.
    #[must_use]
    pub fn is_idle(&self, now: Timestamp, idle_timeout_ms: u64) -> bool {
        now.elapsed_since(self.last_activity_at) > idle_timeout_ms
    }

    /// Returns whether the session is live (not revoked, expired, or idle).
    #[must_use]
    pub fn is_live(&self, now: Timestamp, idle_timeout_ms: u64) -> bool {
        !self.revoked && !self.is_expired(now) && !self.is_idle(now, idle_timeout_ms)
    }
}

// ============================================================================
// SECTION: Session Manager Configuration
// ============================================================================

/// Session manager lifecycle configuration.
///
/// # Invariants
/// - Durations are milliseconds and must be non-zero; the config loader
///   rejects zero windows before construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManagerConfig {
    /// Absolute session lifetime in milliseconds.
    pub absolute_ttl_ms: u64,
    /// Idle timeout in milliseconds.
    pub idle_timeout_ms: u64,
    /// Maximum concurrent live sessions per subject.
    pub max_sessions_per_subject: usize,
    /// Whether validation enforces the bound address.
    pub bind_to_ip: bool,
    /// Whether creation requires MFA.
    pub require_mfa: bool,
    /// Whether validation computes rotation hints.
    pub rotate_on_activity: bool,
    /// Age after which validation requests rotation, in milliseconds.
    pub rotation_interval_ms: u64,
    /// Background sweep cadence in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            absolute_ttl_ms: 8 * 60 * 60 * 1_000,
            idle_timeout_ms: 30 * 60 * 1_000,
            max_sessions_per_subject: 5,
            bind_to_ip: true,
            require_mfa: false,
            rotate_on_activity: true,
            rotation_interval_ms: 15 * 60 * 1_000,
            sweep_interval_ms: 5 * 60 * 1_000,
        }
    }
}
