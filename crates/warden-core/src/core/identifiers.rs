// crates/warden-core/src/core/identifiers.rs
// ============================================================================
// Module: Warden Identifiers
// Description: Canonical opaque identifiers for subjects, sessions, and policies.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Warden.
//! Identifiers are opaque UTF-8 strings and serialize transparently on the
//! wire. No normalization or validation is applied by these types; callers
//! own uniqueness and entropy requirements (session identifiers come from a
//! [`crate::interfaces::TokenGenerator`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Defines an opaque string identifier newtype with the standard surface.
macro_rules! string_id {
    ($(#[$docs:meta])* $name:ident) => {
        $(#[$docs])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id! {
    /// Tenant identifier scoping subjects, resources, and sessions.
    TenantId
}

string_id! {
    /// Subject identifier for users, services, and agents.
    SubjectId
}

string_id! {
    /// Session identifier issued by the session manager.
    SessionId
}

string_id! {
    /// Role identifier registered with the access control engine.
    RoleId
}

string_id! {
    /// Attribute-based policy identifier.
    PolicyId
}

string_id! {
    /// Threat signal identifier.
    SignalId
}

string_id! {
    /// Request identifier correlating audit events to one gateway call.
    RequestId
}

string_id! {
    /// Audit event identifier.
    EventId
}
