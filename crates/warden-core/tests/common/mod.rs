// crates/warden-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for warden-core tests.
// Purpose: Provide reusable builders and stub collaborators for engine tests.
// Dependencies: warden-core, serde_json
// ============================================================================

//! ## Overview
//! Provides shared builders and injected-collaborator stubs for access,
//! session, and threat engine tests.

#![allow(
    dead_code,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted; not every test target uses every helper."
)]

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use warden_core::AccessRequest;
use warden_core::ActionKind;
use warden_core::AuditSink;
use warden_core::RequestContext;
use warden_core::Resource;
use warden_core::ResourceType;
use warden_core::RoleId;
use warden_core::SecurityEvent;
use warden_core::SessionId;
use warden_core::Subject;
use warden_core::SubjectType;
use warden_core::TenantId;
use warden_core::Timestamp;
use warden_core::TokenGenerator;

/// Deterministic token generator issuing `tok-0`, `tok-1`, ...
#[derive(Default)]
pub struct SeqTokens {
    /// Next token ordinal.
    next: AtomicU64,
}

impl TokenGenerator for SeqTokens {
    fn generate(&self) -> SessionId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        SessionId::new(format!("tok-{n}"))
    }
}

/// Audit sink collecting events for assertions.
#[derive(Default)]
pub struct CollectingSink {
    /// Collected events.
    pub events: Mutex<Vec<SecurityEvent>>,
}

impl CollectingSink {
    /// Returns a snapshot of collected events.
    pub fn snapshot(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for CollectingSink {
    fn emit(&self, event: SecurityEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Parses an address for test input.
pub fn ip(addr: &str) -> IpAddr {
    IpAddr::from_str(addr).unwrap()
}

/// Builds a subject in tenant `acme` holding the given roles.
pub fn subject(id: &str, roles: &[&str]) -> Subject {
    Subject {
        subject_id: id.into(),
        subject_type: SubjectType::User,
        tenant_id: TenantId::new("acme"),
        roles: roles.iter().map(|r| RoleId::new(*r)).collect(),
        attributes: BTreeMap::new(),
        mfa_verified: false,
    }
}

/// Builds a resource in tenant `acme` with no sensitivity tier.
pub fn resource(resource_type: ResourceType, id: &str) -> Resource {
    Resource {
        resource_type,
        resource_id: id.to_string(),
        tenant_id: TenantId::new("acme"),
        sensitivity: None,
    }
}

/// Builds an access request in the `staging` environment.
pub fn request(subject: Subject, resource: Resource, action: ActionKind, client: &str, at: Timestamp) -> AccessRequest {
    AccessRequest {
        subject,
        resource,
        action,
        context: RequestContext {
            client_ip: ip(client),
            environment: "staging".to_string(),
            timestamp: at,
            extra: BTreeMap::new(),
        },
    }
}
