// crates/warden-core/src/runtime/session.rs
// ============================================================================
// Module: Warden Session Manager
// Description: Session lifecycle: creation, validation, rotation, revocation, sweep.
// Purpose: Own the live-session set and enforce expiry, binding, and caps.
// Dependencies: crate::core, crate::interfaces, serde, thiserror
// ============================================================================

//! ## Overview
//! Sessions are born live and die by revocation, rotation, or sweep. The
//! manager enforces absolute expiry, idle timeout, optional IP binding, and
//! the concurrent-session cap (creating session N+1 evicts the subject's
//! oldest live session). Rotation installs the new identifier and removes the
//! old one under a single lock, so no caller ever observes both or neither.
//!
//! Invariants:
//! - Session validity is monotonically non-increasing in time for untouched
//!   sessions; nothing un-expires.
//! - Revoked sessions stay in storage until swept so that "already revoked"
//!   queries remain answerable.
//! - An index entry pointing at a missing session reads as not found.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::audit::AuditOutcome;
use crate::core::audit::SecurityEvent;
use crate::core::audit::SecurityEventType;
use crate::core::audit::Severity;
use crate::core::identifiers::EventId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::SubjectId;
use crate::core::identifiers::TenantId;
use crate::core::session::Session;
use crate::core::session::SessionManagerConfig;
use crate::core::subject::SubjectType;
use crate::core::time::Timestamp;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::interfaces::TokenGenerator;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Session lifecycle errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; `code` labels never change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session does not exist (or the store is inconsistent).
    #[error("session not found")]
    NotFound,
    /// The session has been revoked.
    #[error("session revoked")]
    Revoked,
    /// The manager requires MFA and it was not supplied.
    #[error("mfa required")]
    MfaRequired,
}

impl SessionError {
    /// Returns the stable error code used in audit details.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "SESSION_NOT_FOUND",
            Self::Revoked => "SESSION_REVOKED",
            Self::MfaRequired => "MFA_REQUIRED",
        }
    }
}

// ============================================================================
// SECTION: Operation Records
// ============================================================================

/// Parameters for creating a session.
///
/// # Invariants
/// - This is a pure request container; policy checks happen in `create_session`.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Subject the session is for.
    pub subject_id: SubjectId,
    /// Subject classification.
    pub subject_type: SubjectType,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Client address.
    pub ip_address: IpAddr,
    /// Client user agent.
    pub user_agent: String,
    /// Whether MFA was completed.
    pub mfa_verified: bool,
    /// Initial session attributes.
    pub attributes: BTreeMap<String, Value>,
}

/// Classified reason a validation call failed.
///
/// # Invariants
/// - `suspicious` failures indicate misuse of a credential; the rest are
///   natural lifecycle outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    /// No session exists for the presented identifier.
    NotFound,
    /// The presented identifier belongs to a revoked session.
    Revoked,
    /// The session passed its absolute expiry.
    Expired,
    /// The session sat idle past the timeout.
    IdleTimeout,
    /// The caller's address differs from the bound address.
    IpMismatch,
}

impl ValidationFailure {
    /// Returns whether the failure indicates credential misuse rather than
    /// natural expiry.
    #[must_use]
    pub const fn suspicious(self) -> bool {
        matches!(self, Self::NotFound | Self::Revoked | Self::IpMismatch)
    }
}

/// Result of a validation call.
///
/// # Invariants
/// - `session` and `should_rotate` are populated only when `valid`.
/// - `reason` and `failure` are populated only when invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionValidation {
    /// Whether the session is valid.
    pub valid: bool,
    /// Denial reason, when invalid.
    pub reason: Option<String>,
    /// Classified failure, when invalid.
    pub failure: Option<ValidationFailure>,
    /// Validated session snapshot, when valid.
    pub session: Option<Session>,
    /// Whether the caller should rotate the session identifier.
    pub should_rotate: bool,
}

impl SessionValidation {
    /// Builds an invalid result with a classified failure and reason.
    fn invalid(failure: ValidationFailure, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            failure: Some(failure),
            session: None,
            should_rotate: false,
        }
    }
}

/// Counts removed by one sweep pass.
///
/// # Invariants
/// - Each removed session counts in exactly one bucket; revocation wins over
///   expiry when both apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Sessions removed because they were revoked.
    pub revoked: usize,
    /// Sessions removed past absolute expiry.
    pub expired: usize,
    /// Sessions removed past the idle window.
    pub idle: usize,
}

impl SweepReport {
    /// Total sessions removed by the pass.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.revoked + self.expired + self.idle
    }
}

// ============================================================================
// SECTION: Manager State
// ============================================================================

/// Interior session store guarded by one lock.
#[derive(Default)]
struct SessionState {
    /// Sessions by identifier.
    sessions: BTreeMap<SessionId, Session>,
    /// Session identifiers by owning subject.
    by_subject: BTreeMap<SubjectId, BTreeSet<SessionId>>,
}

impl SessionState {
    /// Removes a session and untracks it from the subject index.
    fn remove(&mut self, session_id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(session_id)?;
        if let Some(ids) = self.by_subject.get_mut(&session.subject_id) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.by_subject.remove(&session.subject_id);
            }
        }
        Some(session)
    }

    /// Tracks a session in both maps.
    fn insert(&mut self, session: Session) {
        self.by_subject
            .entry(session.subject_id.clone())
            .or_default()
            .insert(session.session_id.clone());
        self.sessions.insert(session.session_id.clone(), session);
    }
}

/// Session lifecycle manager.
pub struct SessionManager {
    /// Lifecycle configuration.
    config: SessionManagerConfig,
    /// Injected time source.
    clock: Arc<dyn Clock>,
    /// Injected session identifier source.
    tokens: Arc<dyn TokenGenerator>,
    /// Injected audit sink.
    audit: Arc<dyn AuditSink>,
    /// Session store.
    state: Mutex<SessionState>,
    /// Monotonic audit event sequence.
    event_seq: AtomicU64,
}

impl SessionManager {
    /// Creates a session manager with injected collaborators.
    #[must_use]
    pub fn new(
        config: SessionManagerConfig,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenGenerator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            clock,
            tokens,
            audit,
            state: Mutex::new(SessionState::default()),
            event_seq: AtomicU64::new(0),
        }
    }

    /// Returns the lifecycle configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    /// Acquires the store lock, recovering from poisoning.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Creates a session, enforcing MFA policy and the concurrent cap.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MfaRequired`] when the manager requires MFA and
    /// the request did not complete it.
    pub fn create_session(&self, new: NewSession) -> Result<Session, SessionError> {
        if self.config.require_mfa && !new.mfa_verified {
            return Err(SessionError::MfaRequired);
        }

        let now = self.clock.now();
        let mut state = self.state();

        self.evict_to_cap(&mut state, &new.subject_id, now);

        let session = Session {
            session_id: self.tokens.generate(),
            subject_id: new.subject_id,
            subject_type: new.subject_type,
            tenant_id: new.tenant_id,
            created_at: now,
            expires_at: now.plus_millis(self.config.absolute_ttl_ms),
            last_activity_at: now,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            mfa_verified: new.mfa_verified,
            attributes: new.attributes,
            revoked: false,
            revoked_reason: None,
            revoked_at: None,
        };
        state.insert(session.clone());
        drop(state);

        self.emit(
            Severity::Info,
            &session,
            AuditOutcome::Success,
            "session_created",
            BTreeMap::new(),
        );
        Ok(session)
    }

    /// Evicts the subject's oldest live sessions until below the cap.
    fn evict_to_cap(&self, state: &mut SessionState, subject_id: &SubjectId, now: Timestamp) {
        loop {
            let oldest_id = {
                let live: Vec<&Session> = state
                    .by_subject
                    .get(subject_id)
                    .into_iter()
                    .flatten()
                    .filter_map(|id| state.sessions.get(id))
                    .filter(|session| session.is_live(now, self.config.idle_timeout_ms))
                    .collect();
                if live.len() < self.config.max_sessions_per_subject {
                    return;
                }
                live.iter()
                    .min_by_key(|session| (session.created_at, session.session_id.clone()))
                    .map(|session| session.session_id.clone())
            };
            let Some(oldest_id) = oldest_id else {
                return;
            };
            if let Some(evicted) = state.remove(&oldest_id) {
                self.emit(
                    Severity::Low,
                    &evicted,
                    AuditOutcome::Denied,
                    "session_evicted_by_cap",
                    BTreeMap::from([(
                        "max_sessions".to_string(),
                        json!(self.config.max_sessions_per_subject),
                    )]),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validates a session and touches its activity time on success.
    #[must_use]
    pub fn validate_session(&self, session_id: &SessionId, ip: Option<IpAddr>) -> SessionValidation {
        let now = self.clock.now();
        let mut state = self.state();

        let Some(session) = state.sessions.get_mut(session_id) else {
            return SessionValidation::invalid(ValidationFailure::NotFound, "session not found");
        };
        if session.revoked {
            return SessionValidation::invalid(ValidationFailure::Revoked, "session revoked");
        }
        if session.is_expired(now) {
            return SessionValidation::invalid(ValidationFailure::Expired, "session expired");
        }
        if session.is_idle(now, self.config.idle_timeout_ms) {
            return SessionValidation::invalid(ValidationFailure::IdleTimeout, "session idle timeout");
        }
        if self.config.bind_to_ip
            && let Some(caller_ip) = ip
            && caller_ip != session.ip_address
        {
            let snapshot = session.clone();
            drop(state);
            self.emit(
                Severity::High,
                &snapshot,
                AuditOutcome::Denied,
                "session_ip_mismatch",
                BTreeMap::from([
                    ("bound_ip".to_string(), json!(snapshot.ip_address.to_string())),
                    ("caller_ip".to_string(), json!(caller_ip.to_string())),
                ]),
            );
            return SessionValidation::invalid(ValidationFailure::IpMismatch, "IP address mismatch");
        }

        session.last_activity_at = now;
        let should_rotate = self.config.rotate_on_activity
            && now.elapsed_since(session.created_at) > self.config.rotation_interval_ms;
        SessionValidation {
            valid: true,
            reason: None,
            failure: None,
            session: Some(session.clone()),
            should_rotate,
        }
    }

    // ------------------------------------------------------------------
    // Rotation
    // ------------------------------------------------------------------

    /// Rotates a session to a fresh identifier carrying the same data.
    ///
    /// The new identifier is installed and the old one removed under the same
    /// lock; duplicate rotations of one identifier serialize on that lock and
    /// the loser observes [`SessionError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] or [`SessionError::Revoked`].
    pub fn rotate_session(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let mut state = self.state();

        let existing = state.sessions.get(session_id).ok_or(SessionError::NotFound)?;
        if existing.revoked {
            return Err(SessionError::Revoked);
        }

        let mut rotated = existing.clone();
        rotated.session_id = self.tokens.generate();
        rotated.created_at = now;
        rotated.last_activity_at = now;
        rotated.expires_at = now.plus_millis(self.config.absolute_ttl_ms);

        // Install the replacement before dropping the old identifier.
        state.insert(rotated.clone());
        state.remove(session_id);
        drop(state);

        self.emit(
            Severity::Info,
            &rotated,
            AuditOutcome::Success,
            "session_rotated",
            BTreeMap::from([
                ("previous_session".to_string(), json!(session_id.as_str())),
                ("new_session".to_string(), json!(rotated.session_id.as_str())),
            ]),
        );
        Ok(rotated)
    }

    // ------------------------------------------------------------------
    // Revocation
    // ------------------------------------------------------------------

    /// Revokes a session in place; the record remains until swept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] when the session does not exist.
    pub fn revoke_session(&self, session_id: &SessionId, reason: Option<String>) -> Result<(), SessionError> {
        let now = self.clock.now();
        let mut state = self.state();

        let session = state.sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;
        session.revoked = true;
        session.revoked_at = Some(now);
        session.revoked_reason.clone_from(&reason);
        let snapshot = session.clone();
        drop(state);

        self.emit(
            Severity::Medium,
            &snapshot,
            AuditOutcome::Success,
            "session_revoked",
            BTreeMap::from([("reason".to_string(), json!(reason.unwrap_or_default()))]),
        );
        Ok(())
    }

    /// Revokes every session held by a subject; returns how many changed state.
    pub fn revoke_all_sessions(&self, subject_id: &SubjectId, reason: Option<String>) -> usize {
        let now = self.clock.now();
        let mut state = self.state();

        let ids: Vec<SessionId> = state
            .by_subject
            .get(subject_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        let mut revoked = 0;
        for id in &ids {
            if let Some(session) = state.sessions.get_mut(id)
                && !session.revoked
            {
                session.revoked = true;
                session.revoked_at = Some(now);
                session.revoked_reason.clone_from(&reason);
                revoked += 1;
            }
        }
        revoked
    }

    // ------------------------------------------------------------------
    // Sweep and introspection
    // ------------------------------------------------------------------

    /// Removes revoked, expired, and idle sessions in one bounded pass.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut state = self.state();

        let dead: Vec<(SessionId, SweepBucket)> = state
            .sessions
            .values()
            .filter_map(|session| {
                if session.revoked {
                    Some((session.session_id.clone(), SweepBucket::Revoked))
                } else if session.is_expired(now) {
                    Some((session.session_id.clone(), SweepBucket::Expired))
                } else if session.is_idle(now, self.config.idle_timeout_ms) {
                    Some((session.session_id.clone(), SweepBucket::Idle))
                } else {
                    None
                }
            })
            .collect();

        let mut report = SweepReport::default();
        for (session_id, bucket) in dead {
            if state.remove(&session_id).is_some() {
                match bucket {
                    SweepBucket::Revoked => report.revoked += 1,
                    SweepBucket::Expired => report.expired += 1,
                    SweepBucket::Idle => report.idle += 1,
                }
            }
        }
        report
    }

    /// Returns the subject's session identifiers, live or not.
    #[must_use]
    pub fn sessions_for_subject(&self, subject_id: &SubjectId) -> Vec<SessionId> {
        self.state()
            .by_subject
            .get(subject_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the count of live sessions across all subjects.
    #[must_use]
    pub fn live_session_count(&self) -> usize {
        let now = self.clock.now();
        self.state()
            .sessions
            .values()
            .filter(|session| session.is_live(now, self.config.idle_timeout_ms))
            .count()
    }

    /// Returns the count of stored sessions, including dead ones not yet swept.
    #[must_use]
    pub fn total_session_count(&self) -> usize {
        self.state().sessions.len()
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// Emits a session lifecycle event.
    fn emit(
        &self,
        severity: Severity,
        session: &Session,
        outcome: AuditOutcome,
        action: &str,
        details: BTreeMap<String, Value>,
    ) {
        let seq = self.event_seq.fetch_add(1, Ordering::Relaxed);
        self.audit.emit(SecurityEvent {
            event_id: EventId::new(format!("session-{seq}")),
            timestamp: self.clock.now(),
            event_type: SecurityEventType::Session,
            severity,
            subject_id: Some(session.subject_id.clone()),
            resource: None,
            action: Some(action.to_string()),
            outcome: Some(outcome),
            ip_address: Some(session.ip_address.to_string()),
            request_id: None,
            details,
        });
    }
}

/// Removal classification used by the sweep pass.
#[derive(Debug, Clone, Copy)]
enum SweepBucket {
    /// Session was revoked.
    Revoked,
    /// Session passed absolute expiry.
    Expired,
    /// Session passed the idle window.
    Idle,
}
