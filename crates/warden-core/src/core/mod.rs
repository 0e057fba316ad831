// crates/warden-core/src/core/mod.rs
// ============================================================================
// Module: Warden Core Data Model
// Description: Shared data types for subjects, resources, sessions, and threats.
// Purpose: Define the canonical records consumed by the decision engines.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! The core data model is plain data: identifiers, requests, roles, policies,
//! sessions, and threat records. Evaluation logic lives in [`crate::runtime`];
//! nothing in this module performs I/O or reads the wall clock.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod identifiers;
pub mod net;
pub mod policy;
pub mod request;
pub mod resource;
pub mod role;
pub mod session;
pub mod subject;
pub mod threat;
pub mod time;
