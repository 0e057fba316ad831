// crates/warden-core/src/runtime/mod.rs
// ============================================================================
// Module: Warden Runtime
// Description: Decision engines operating over the core data model.
// Purpose: House the access, session, and threat evaluation logic.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime layer contains the three engines the gateway facade composes:
//! [`AccessControlEngine`], [`SessionManager`], and [`ThreatDetector`]. All
//! three are safe to share behind `Arc` and guard their state with interior
//! locks; callers never observe partially applied mutations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod access;
pub mod condition;
pub mod patterns;
pub mod session;
pub mod threat;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessControlEngine;
pub use access::AccessDecision;
pub use access::PolicyError;
pub use patterns::CompiledThreatPattern;
pub use patterns::ThreatConfigError;
pub use patterns::ThreatPattern;
pub use patterns::default_patterns;
pub use session::NewSession;
pub use session::SessionError;
pub use session::SessionManager;
pub use session::SessionValidation;
pub use session::SweepReport;
pub use session::ValidationFailure;
pub use threat::ThreatDetector;
pub use threat::ThreatDetectorConfig;
