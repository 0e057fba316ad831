// crates/warden-core/src/core/resource.rs
// ============================================================================
// Module: Warden Resources
// Description: Protected resources and sensitivity tiers.
// Purpose: Describe what is being accessed for permission lookup and auditing.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Resources are identified by a fixed type enumeration plus an opaque
//! instance identifier, scoped to a tenant. The optional sensitivity tier
//! forces audit logging for confidential and restricted resources regardless
//! of the access outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// Fixed enumeration of protected resource types.
///
/// # Invariants
/// - Variants are stable for serialization and permission lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Tool or operation exposed by the gateway.
    Tool,
    /// Stored secret material.
    Secret,
    /// Gateway configuration.
    Config,
    /// Authentication session records.
    Session,
    /// Tenant administration surface.
    Tenant,
    /// Audit log query surface.
    AuditLog,
    /// Access policy administration surface.
    Policy,
}

impl ResourceType {
    /// Returns a stable label for the resource type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Secret => "secret",
            Self::Config => "config",
            Self::Session => "session",
            Self::Tenant => "tenant",
            Self::AuditLog => "audit_log",
            Self::Policy => "policy",
        }
    }
}

/// Sensitivity tier attached to a resource.
///
/// # Invariants
/// - Ordering reflects increasing sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityTier {
    /// Publicly visible.
    Public,
    /// Internal to the tenant.
    Internal,
    /// Confidential; access is always audited.
    Confidential,
    /// Restricted; access is always audited.
    Restricted,
}

impl SensitivityTier {
    /// Returns a stable label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Confidential => "confidential",
            Self::Restricted => "restricted",
        }
    }

    /// Returns whether access to this tier always requires an audit record.
    #[must_use]
    pub const fn forces_audit(self) -> bool {
        matches!(self, Self::Confidential | Self::Restricted)
    }
}

/// Protected resource targeted by an access request.
///
/// # Invariants
/// - `tenant_id` scopes the resource; cross-tenant checks are a policy concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type.
    pub resource_type: ResourceType,
    /// Resource instance identifier.
    pub resource_id: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Optional sensitivity tier.
    pub sensitivity: Option<SensitivityTier>,
}
