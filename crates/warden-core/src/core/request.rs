// crates/warden-core/src/core/request.rs
// ============================================================================
// Module: Warden Access Requests
// Description: Immutable access request records and their evaluation context.
// Purpose: Carry subject, resource, action, and environment into one decision.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`AccessRequest`] is the immutable input to exactly one authorization
//! decision. The embedded [`RequestContext`] carries the environment facts
//! (client address, environment name, timestamp, extra context) that role
//! constraints and ABAC conditions evaluate against.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::resource::Resource;
use crate::core::subject::Subject;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Fixed enumeration of requestable actions.
///
/// # Invariants
/// - Variants are stable for serialization and permission lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Read a resource.
    Read,
    /// Create or update a resource.
    Write,
    /// Execute a tool or operation.
    Execute,
    /// Delete a resource.
    Delete,
    /// Administrative operation; access is always audited.
    Admin,
    /// Enumerate resources.
    List,
}

impl ActionKind {
    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
            Self::Delete => "delete",
            Self::Admin => "admin",
            Self::List => "list",
        }
    }

    /// Returns whether this action always requires an audit record.
    #[must_use]
    pub const fn forces_audit(self) -> bool {
        matches!(self, Self::Admin | Self::Delete)
    }
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Environment facts accompanying an access request.
///
/// # Invariants
/// - `timestamp` is supplied by the host; the core never reads the wall clock.
/// - `extra` values are untrusted and only compared, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Client address the request arrived from.
    pub client_ip: IpAddr,
    /// Deployment environment name (for example `production`).
    pub environment: String,
    /// Request timestamp.
    pub timestamp: Timestamp,
    /// Free-form additional context (serialized body, headers, metadata).
    pub extra: BTreeMap<String, Value>,
}

/// Environment name that forces audit logging for every decision.
pub(crate) const PRODUCTION_ENVIRONMENT: &str = "production";

// ============================================================================
// SECTION: Access Request
// ============================================================================

/// Immutable input to one authorization decision.
///
/// # Invariants
/// - The request is never mutated by evaluation; engines own their own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Subject requesting access.
    pub subject: Subject,
    /// Resource being accessed.
    pub resource: Resource,
    /// Requested action.
    pub action: ActionKind,
    /// Environment context.
    pub context: RequestContext,
}
