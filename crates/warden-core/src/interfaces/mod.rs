// crates/warden-core/src/interfaces/mod.rs
// ============================================================================
// Module: Warden Interfaces
// Description: Host-provided seams for time, token entropy, and audit emission.
// Purpose: Define the contract surfaces used by the Warden decision engines.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the decision engines integrate with their host
//! without embedding backend-specific details. The core never reads the wall
//! clock, never generates randomness, and never persists audit events; hosts
//! inject a [`Clock`], a [`TokenGenerator`], and an [`AuditSink`].
//!
//! Security posture: implementations are trust boundaries; token generators
//! must be cryptographically secure, and audit sinks must never block the
//! decision path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use crate::core::audit::SecurityEvent;
use crate::core::identifiers::SessionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source injected into the decision engines.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Manually advanced clock for deterministic hosts and tests.
///
/// # Invariants
/// - Time only moves when a caller advances or sets it.
#[derive(Debug)]
pub struct ManualClock {
    /// Current manual time, mutated by `set` and `advance`.
    now: Mutex<Timestamp>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Timestamp::EPOCH)
    }
}

impl ManualClock {
    /// Creates a manual clock starting at the given time.
    #[must_use]
    pub fn starting_at(now: Timestamp) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        if let Ok(mut slot) = self.now.lock() {
            *slot = now;
        }
    }

    /// Advances the current time by `millis`.
    pub fn advance(&self, millis: u64) {
        if let Ok(mut slot) = self.now.lock() {
            *slot = slot.plus_millis(millis);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.lock().map_or(Timestamp::EPOCH, |slot| *slot)
    }
}

// ============================================================================
// SECTION: Token Generator
// ============================================================================

/// Session identifier source.
///
/// Implementations must produce unguessable, collision-free identifiers at
/// practical scale (>= 256 bits of entropy, URL-safe encoding).
pub trait TokenGenerator: Send + Sync {
    /// Generates a fresh session identifier.
    fn generate(&self) -> SessionId;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Destination for structured security events.
///
/// Emission is fire-and-forget: implementations must not block the decision
/// path and must swallow their own delivery failures.
pub trait AuditSink: Send + Sync {
    /// Records a security event.
    fn emit(&self, event: SecurityEvent);
}

/// No-op audit sink.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: SecurityEvent) {}
}
