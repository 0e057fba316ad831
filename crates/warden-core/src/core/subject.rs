// crates/warden-core/src/core/subject.rs
// ============================================================================
// Module: Warden Subjects
// Description: Calling subjects and their attribute surface.
// Purpose: Describe who is requesting access for RBAC/ABAC evaluation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Subject`] is the authenticated caller of a gateway operation: a human
//! user, a backend service, or an autonomous agent. Role membership drives
//! RBAC; the free-form attribute map drives ABAC matchers and conditions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::RoleId;
use crate::core::identifiers::SubjectId;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Subject Types
// ============================================================================

/// Classification of the calling subject.
///
/// # Invariants
/// - Variants are stable for serialization and audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// Human user.
    User,
    /// Backend service principal.
    Service,
    /// Autonomous agent principal.
    Agent,
}

impl SubjectType {
    /// Returns a stable label for the subject type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Service => "service",
            Self::Agent => "agent",
        }
    }
}

/// Authenticated subject requesting access.
///
/// # Invariants
/// - `roles` reference identifiers registered with the access control engine;
///   unknown roles are skipped during evaluation, never an error.
/// - `attributes` are untrusted input and only compared, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject identifier.
    pub subject_id: SubjectId,
    /// Subject classification.
    pub subject_type: SubjectType,
    /// Tenant the subject belongs to.
    pub tenant_id: TenantId,
    /// Role memberships.
    pub roles: BTreeSet<RoleId>,
    /// Free-form attribute map for ABAC evaluation.
    pub attributes: BTreeMap<String, Value>,
    /// Whether the subject has completed multi-factor authentication.
    pub mfa_verified: bool,
}
