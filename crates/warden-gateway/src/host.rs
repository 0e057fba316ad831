// crates/warden-gateway/src/host.rs
// ============================================================================
// Module: Gateway Host Adapters
// Description: Production implementations of the core's injected interfaces.
// Purpose: Supply wall-clock time, secure tokens, and tracing audit output.
// Dependencies: warden-core, rand, base64, tracing
// ============================================================================

//! ## Overview
//! The core engines never read the wall clock, generate randomness, or write
//! logs themselves; these adapters provide the production implementations of
//! the [`Clock`], [`TokenGenerator`], and [`AuditSink`] seams.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use warden_core::AuditSink;
use warden_core::Clock;
use warden_core::SecurityEvent;
use warden_core::SessionId;
use warden_core::Severity;
use warden_core::Timestamp;
use warden_core::TokenGenerator;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
            });
        Timestamp::from_unix_millis(millis)
    }
}

// ============================================================================
// SECTION: Token Generator
// ============================================================================

/// Session identifier source backed by the operating system RNG.
///
/// # Invariants
/// - Identifiers carry 256 bits of entropy, URL-safe base64 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> SessionId {
        let mut bytes = [0_u8; 32];
        OsRng.fill_bytes(&mut bytes);
        SessionId::new(URL_SAFE_NO_PAD.encode(bytes))
    }
}

// ============================================================================
// SECTION: Tracing Sink
// ============================================================================

/// Audit sink forwarding events to the `tracing` subscriber.
///
/// # Invariants
/// - Emission never blocks and never fails; delivery is fire-and-forget.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: SecurityEvent) {
        let action = event.action.as_deref().unwrap_or("-");
        let subject = event.subject_id.as_ref().map_or("-", |id| id.as_str());
        match event.severity {
            Severity::Critical | Severity::High => tracing::warn!(
                event_id = %event.event_id,
                event_type = event.event_type.as_str(),
                severity = event.severity.as_str(),
                subject,
                action,
                "security event"
            ),
            Severity::Medium | Severity::Low | Severity::Info => tracing::info!(
                event_id = %event.event_id,
                event_type = event.event_type.as_str(),
                severity = event.severity.as_str(),
                subject,
                action,
                "security event"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use std::collections::BTreeSet;

    use warden_core::TokenGenerator;

    use super::RandomTokenGenerator;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let tokens = RandomTokenGenerator;
        let mut seen = BTreeSet::new();
        for _ in 0..64 {
            let token = tokens.generate();
            assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert!(seen.insert(token));
        }
    }
}
