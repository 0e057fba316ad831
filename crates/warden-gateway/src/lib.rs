// crates/warden-gateway/src/lib.rs
// ============================================================================
// Module: Warden Gateway Library
// Description: Security facade composing the Warden decision engines.
// Purpose: Provide one request-authorization entry point plus host adapters.
// Dependencies: warden-core, warden-config, tokio, tracing, rand, base64
// ============================================================================

//! ## Overview
//! The gateway composes the three core engines behind a single call:
//! [`SecurityGateway::authenticate_and_authorize`] validates the session,
//! consults the threat detector, evaluates RBAC and ABAC policy, and rotates
//! the session identifier when the manager asks for it. Engines are
//! dependency-injected through the builder; there are no globals.
//!
//! Hosts that do not bring their own adapters get [`SystemClock`],
//! [`RandomTokenGenerator`], and an audit fan-out of the in-memory log plus
//! a [`TracingAuditSink`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit_log;
pub mod gateway;
pub mod host;
pub mod sweeper;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit_log::AuditQuery;
pub use audit_log::InMemoryAuditLog;
pub use gateway::AuthorizeInput;
pub use gateway::GatewayDecision;
pub use gateway::GatewayError;
pub use gateway::GatewayStats;
pub use gateway::SecurityGateway;
pub use gateway::SecurityGatewayBuilder;
pub use host::RandomTokenGenerator;
pub use host::SystemClock;
pub use host::TracingAuditSink;
pub use sweeper::spawn_sweeper;
