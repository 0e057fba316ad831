// crates/warden-core/src/core/role.rs
// ============================================================================
// Module: Warden Roles
// Description: Role definitions, permission grants, and role constraints.
// Purpose: Describe the RBAC half of the access control data model.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Role`] grants sets of actions per resource type and may inherit from
//! parent roles. Effective permissions are recomputed for every decision with
//! a visited-set walk over `inherits` (cycle safe); the registration-time
//! transitive-closure index is diagnostics only.
//!
//! [`RoleConstraint`]s gate whether a role participates in a given request at
//! all: a failing constraint removes the role from consideration for that
//! request without affecting other roles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RoleId;
use crate::core::identifiers::TenantId;
use crate::core::net::IpMatcher;
use crate::core::request::ActionKind;
use crate::core::resource::ResourceType;

// ============================================================================
// SECTION: Permission Grants
// ============================================================================

/// Mapping from resource type to the set of permitted actions.
pub type PermissionGrants = BTreeMap<ResourceType, BTreeSet<ActionKind>>;

// ============================================================================
// SECTION: Role Constraints
// ============================================================================

/// Context-sensitive constraint narrowing when a role applies.
///
/// # Invariants
/// - Constraints are conjunctive; all must hold for the role to participate.
/// - Evaluation is infallible; matchers are parsed at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleConstraint {
    /// Role applies only within a UTC hour-of-day window.
    TimeWindow {
        /// Inclusive start hour (0-23).
        start_hour: u8,
        /// Inclusive end hour (0-23); may be below `start_hour` to wrap midnight.
        end_hour: u8,
    },
    /// Role applies only from allow-listed addresses.
    IpAllowList {
        /// Accepted address matchers.
        matchers: Vec<IpMatcher>,
    },
    /// Role applies only to MFA-verified subjects.
    MfaRequired,
    /// Role applies only within the listed tenants.
    TenantAllowList {
        /// Accepted tenants.
        tenants: Vec<TenantId>,
    },
    /// Role applies only within the listed environments.
    EnvironmentAllowList {
        /// Accepted environment names.
        environments: Vec<String>,
    },
}

// ============================================================================
// SECTION: Role
// ============================================================================

/// Role granting permissions, with optional inheritance and constraints.
///
/// # Invariants
/// - The effective permission set is the union of `permissions` and all
///   permissions transitively reachable through `inherits`, computed with
///   cycle protection (no role is processed twice).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub role_id: RoleId,
    /// Human-readable role name.
    pub name: String,
    /// Permission grants by resource type.
    pub permissions: PermissionGrants,
    /// Parent roles to inherit permissions from.
    pub inherits: Vec<RoleId>,
    /// Constraints narrowing when the role applies.
    pub constraints: Vec<RoleConstraint>,
}

impl Role {
    /// Creates a role with no inheritance or constraints.
    #[must_use]
    pub fn new(role_id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            name: name.into(),
            permissions: PermissionGrants::new(),
            inherits: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Adds a permission grant and returns the role for chaining.
    #[must_use]
    pub fn grant(mut self, resource_type: ResourceType, actions: impl IntoIterator<Item = ActionKind>) -> Self {
        self.permissions.entry(resource_type).or_default().extend(actions);
        self
    }

    /// Adds a parent role and returns the role for chaining.
    #[must_use]
    pub fn inherit(mut self, parent: impl Into<RoleId>) -> Self {
        self.inherits.push(parent.into());
        self
    }

    /// Adds a constraint and returns the role for chaining.
    #[must_use]
    pub fn constrain(mut self, constraint: RoleConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}
