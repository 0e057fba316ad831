// crates/warden-gateway/src/sweeper.rs
// ============================================================================
// Module: Session Sweeper
// Description: Background task removing dead sessions on an interval.
// Purpose: Keep the session store bounded without blocking request serving.
// Dependencies: warden-core, tokio, tracing
// ============================================================================

//! ## Overview
//! The sweeper calls [`SessionManager::sweep`] on the configured interval.
//! Each pass is bounded: the manager holds its lock only for the duration of
//! one sweep, so request serving never waits on the sweeper.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use warden_core::SessionManager;

// ============================================================================
// SECTION: Sweeper Task
// ============================================================================

/// Spawns the periodic sweep task on the current tokio runtime.
///
/// The interval comes from the manager's `sweep_interval_ms`. Abort the
/// returned handle to stop sweeping; sessions then die lazily on validation.
pub fn spawn_sweeper(sessions: Arc<SessionManager>) -> JoinHandle<()> {
    let interval = Duration::from_millis(sessions.config().sweep_interval_ms);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so an empty store
        // is not swept at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let report = sessions.sweep();
            if report.total() > 0 {
                tracing::debug!(
                    revoked = report.revoked,
                    expired = report.expired,
                    idle = report.idle,
                    "session sweep removed dead sessions"
                );
            }
        }
    })
}
