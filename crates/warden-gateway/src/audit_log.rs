// crates/warden-gateway/src/audit_log.rs
// ============================================================================
// Module: Gateway Audit Log
// Description: Bounded in-memory security event log with filtered queries.
// Purpose: Retain recent security events for stats and operator queries.
// Dependencies: warden-core, serde
// ============================================================================

//! ## Overview
//! [`InMemoryAuditLog`] is an [`AuditSink`] retaining the most recent events
//! up to a fixed capacity; the oldest events are discarded first. Queries
//! filter by event type, minimum severity, subject, and time range, newest
//! first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use warden_core::AuditSink;
use warden_core::SecurityEvent;
use warden_core::SecurityEventType;
use warden_core::Severity;
use warden_core::SubjectId;
use warden_core::Timestamp;

// ============================================================================
// SECTION: Query
// ============================================================================

/// Filter applied to audit log queries; unset fields match everything.
///
/// # Invariants
/// - Results are returned newest first; `limit` bounds the result count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Restrict to one event type.
    pub event_type: Option<SecurityEventType>,
    /// Restrict to events at or above this severity.
    pub min_severity: Option<Severity>,
    /// Restrict to one subject.
    pub subject_id: Option<SubjectId>,
    /// Restrict to events at or after this time.
    pub since: Option<Timestamp>,
    /// Restrict to events at or before this time.
    pub until: Option<Timestamp>,
    /// Maximum number of events returned.
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Returns whether an event passes every set filter.
    fn matches(&self, event: &SecurityEvent) -> bool {
        if self.event_type.is_some_and(|wanted| event.event_type != wanted) {
            return false;
        }
        if self.min_severity.is_some_and(|floor| event.severity < floor) {
            return false;
        }
        if let Some(subject_id) = &self.subject_id
            && event.subject_id.as_ref() != Some(subject_id)
        {
            return false;
        }
        if self.since.is_some_and(|since| event.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.timestamp > until) {
            return false;
        }
        true
    }
}

// ============================================================================
// SECTION: In-Memory Log
// ============================================================================

/// Default retained event capacity.
const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded in-memory audit log.
pub struct InMemoryAuditLog {
    /// Retained events, oldest first.
    events: Mutex<VecDeque<SecurityEvent>>,
    /// Maximum retained event count.
    capacity: usize,
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryAuditLog {
    /// Creates a log retaining at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Acquires the event lock, recovering from poisoning.
    fn events(&self) -> MutexGuard<'_, VecDeque<SecurityEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the events matching a query, newest first.
    #[must_use]
    pub fn query(&self, query: &AuditQuery) -> Vec<SecurityEvent> {
        let events = self.events();
        let limit = query.limit.unwrap_or(usize::MAX);
        events
            .iter()
            .rev()
            .filter(|event| query.matches(event))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events().len()
    }

    /// Returns whether the log holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn emit(&self, event: SecurityEvent) {
        let mut events = self.events();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use std::collections::BTreeMap;

    use warden_core::AuditSink;
    use warden_core::EventId;
    use warden_core::SecurityEvent;
    use warden_core::SecurityEventType;
    use warden_core::Severity;
    use warden_core::SubjectId;
    use warden_core::Timestamp;

    use super::AuditQuery;
    use super::InMemoryAuditLog;

    fn event(n: i64, severity: Severity) -> SecurityEvent {
        SecurityEvent {
            event_id: EventId::new(format!("event-{n}")),
            timestamp: Timestamp::from_unix_millis(n),
            event_type: SecurityEventType::Session,
            severity,
            subject_id: Some(SubjectId::new("alice")),
            resource: None,
            action: None,
            outcome: None,
            ip_address: None,
            request_id: None,
            details: BTreeMap::new(),
        }
    }

    #[test]
    fn capacity_discards_oldest_first() {
        let log = InMemoryAuditLog::with_capacity(3);
        for n in 0..5 {
            log.emit(event(n, Severity::Info));
        }
        assert_eq!(log.len(), 3);
        let newest_first = log.query(&AuditQuery::default());
        assert_eq!(newest_first[0].timestamp, Timestamp::from_unix_millis(4));
        assert_eq!(newest_first[2].timestamp, Timestamp::from_unix_millis(2));
    }

    #[test]
    fn filters_compose() {
        let log = InMemoryAuditLog::default();
        log.emit(event(1, Severity::Info));
        log.emit(event(2, Severity::High));
        log.emit(event(3, Severity::Critical));

        let query = AuditQuery {
            min_severity: Some(Severity::High),
            since: Some(Timestamp::from_unix_millis(2)),
            until: Some(Timestamp::from_unix_millis(2)),
            ..AuditQuery::default()
        };
        let hits = log.query(&query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::High);
    }

    #[test]
    fn limit_truncates_newest_first() {
        let log = InMemoryAuditLog::default();
        for n in 0..10 {
            log.emit(event(n, Severity::Info));
        }
        let query = AuditQuery {
            limit: Some(2),
            ..AuditQuery::default()
        };
        let hits = log.query(&query);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].timestamp, Timestamp::from_unix_millis(9));
    }
}
