// crates/warden-gateway/src/gateway.rs
// ============================================================================
// Module: Security Gateway
// Description: Facade composing session, threat, and access evaluation.
// Purpose: Expose one authorization entry point over the injected engines.
// Dependencies: warden-core, warden-config, tracing, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SecurityGateway`] owns one instance each of the access control engine,
//! the session manager, and the threat detector, all constructed through
//! [`SecurityGatewayBuilder`] with injected collaborators. The decision path
//! runs the fixed pipeline: session validation, threat analysis, RBAC then
//! ABAC evaluation, then rotation when the manager requested it. Each stage
//! short-circuits on failure, so a blocked address never reaches policy
//! evaluation.
//!
//! Invariants:
//! - Every denial carries a human-readable reason.
//! - Threat analysis runs before policy evaluation so its risk score feeds
//!   `RiskScore` conditions.
//! - Audit emission is fire-and-forget and never alters the decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use warden_config::WardenConfig;
use warden_core::AccessControlEngine;
use warden_core::AccessDecision;
use warden_core::AccessRequest;
use warden_core::AuditOutcome;
use warden_core::AuditSink;
use warden_core::Clock;
use warden_core::EventId;
use warden_core::SecurityEvent;
use warden_core::SecurityEventType;
use warden_core::Session;
use warden_core::SessionId;
use warden_core::SessionManager;
use warden_core::Severity;
use warden_core::ThreatAction;
use warden_core::ThreatConfigError;
use warden_core::ThreatDetector;
use warden_core::ThreatResponse;
use warden_core::TokenGenerator;
use warden_core::ValidationFailure;

use crate::audit_log::AuditQuery;
use crate::audit_log::InMemoryAuditLog;
use crate::host::RandomTokenGenerator;
use crate::host::SystemClock;
use crate::host::TracingAuditSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building the gateway.
///
/// # Invariants
/// - Construction fails closed; a gateway is never built over a partially
///   configured detector.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The threat pattern table failed to compile.
    #[error("threat configuration rejected: {0}")]
    Threat(#[from] ThreatConfigError),
}

// ============================================================================
// SECTION: Operation Records
// ============================================================================

/// Input to one authorization pass.
///
/// # Invariants
/// - `request.context.client_ip` is the address checked against the session
///   binding; callers must populate it from the transport.
#[derive(Debug, Clone)]
pub struct AuthorizeInput {
    /// Session presented by the caller.
    pub session_id: SessionId,
    /// Access request under evaluation.
    pub request: AccessRequest,
}

/// Outcome of one authorization pass.
///
/// # Invariants
/// - `authorized` implies `authenticated`.
/// - `reason` is never empty.
/// - `session` reflects rotation: when the manager rotated, it carries the
///   replacement identifier the caller must use from now on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDecision {
    /// Whether the session was valid.
    pub authenticated: bool,
    /// Whether the request is allowed.
    pub authorized: bool,
    /// Human-readable decision reason.
    pub reason: String,
    /// Validated (possibly rotated) session, when authenticated.
    pub session: Option<Session>,
    /// Policy evaluation outcome, when it was reached.
    pub access_decision: Option<AccessDecision>,
    /// Threat analysis outcome, when it was reached.
    pub threat_response: Option<ThreatResponse>,
    /// Whether threat analysis raised at least one indicator.
    pub threat_detected: bool,
}

/// Point-in-time gateway statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStats {
    /// Sessions currently live.
    pub live_sessions: usize,
    /// Sessions stored, including dead ones not yet swept.
    pub total_sessions: usize,
    /// Threat signal counts keyed by type label.
    pub signal_counts: BTreeMap<String, usize>,
    /// Addresses currently blocked.
    pub blocked_ips: usize,
    /// Events retained in the in-memory audit log.
    pub audit_events: usize,
    /// Registered roles.
    pub roles: usize,
    /// Registered policies.
    pub policies: usize,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for the security gateway.
///
/// # Invariants
/// - Unset collaborators fall back to the production adapters.
/// - The in-memory audit log always participates in the fan-out; extra sinks
///   are additive.
#[derive(Default)]
pub struct SecurityGatewayBuilder {
    /// Host configuration; `None` uses defaults.
    config: Option<WardenConfig>,
    /// Injected time source.
    clock: Option<Arc<dyn Clock>>,
    /// Injected session identifier source.
    tokens: Option<Arc<dyn TokenGenerator>>,
    /// Additional audit sinks joining the fan-out.
    sinks: Vec<Arc<dyn AuditSink>>,
    /// Retained audit log capacity override.
    audit_capacity: Option<usize>,
}

impl SecurityGatewayBuilder {
    /// Sets the host configuration.
    #[must_use]
    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the session identifier source.
    #[must_use]
    pub fn tokens(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Adds an audit sink to the fan-out.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Overrides the in-memory audit log capacity.
    #[must_use]
    pub const fn audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = Some(capacity);
        self
    }

    /// Builds the gateway, constructing all three engines.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the threat pattern table is malformed.
    pub fn build(self) -> Result<SecurityGateway, GatewayError> {
        let config = self.config.unwrap_or_default();
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let tokens: Arc<dyn TokenGenerator> = self.tokens.unwrap_or_else(|| Arc::new(RandomTokenGenerator));

        let audit_log = Arc::new(
            self.audit_capacity
                .map_or_else(InMemoryAuditLog::default, InMemoryAuditLog::with_capacity),
        );
        let mut fan_out: Vec<Arc<dyn AuditSink>> = vec![audit_log.clone(), Arc::new(TracingAuditSink)];
        fan_out.extend(self.sinks);
        let audit: Arc<dyn AuditSink> = Arc::new(FanOutSink { sinks: fan_out });

        let sessions = Arc::new(SessionManager::new(
            config.session_config(),
            clock.clone(),
            tokens,
            audit.clone(),
        ));
        let detector = Arc::new(ThreatDetector::new(config.threat_config(), clock.clone(), audit.clone())?);
        let engine = Arc::new(AccessControlEngine::new());

        Ok(SecurityGateway {
            engine,
            sessions,
            detector,
            audit,
            audit_log,
            clock,
            event_seq: AtomicU64::new(0),
        })
    }
}

/// Audit sink delivering each event to every configured sink.
struct FanOutSink {
    /// Participating sinks, in registration order.
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditSink for FanOutSink {
    fn emit(&self, event: SecurityEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Security facade over the three decision engines.
pub struct SecurityGateway {
    /// RBAC and ABAC evaluation.
    engine: Arc<AccessControlEngine>,
    /// Session lifecycle manager.
    sessions: Arc<SessionManager>,
    /// Heuristic threat detector.
    detector: Arc<ThreatDetector>,
    /// Audit fan-out shared with the engines.
    audit: Arc<dyn AuditSink>,
    /// In-memory audit log participating in the fan-out.
    audit_log: Arc<InMemoryAuditLog>,
    /// Injected time source.
    clock: Arc<dyn Clock>,
    /// Monotonic audit event sequence.
    event_seq: AtomicU64,
}

impl SecurityGateway {
    /// Returns a builder for the gateway.
    #[must_use]
    pub fn builder() -> SecurityGatewayBuilder {
        SecurityGatewayBuilder::default()
    }

    /// Returns the access control engine for role and policy registration.
    #[must_use]
    pub fn engine(&self) -> &Arc<AccessControlEngine> {
        &self.engine
    }

    /// Returns the session manager for login and logout flows.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Returns the threat detector for authentication bookkeeping.
    #[must_use]
    pub fn detector(&self) -> &Arc<ThreatDetector> {
        &self.detector
    }

    // ------------------------------------------------------------------
    // Decision path
    // ------------------------------------------------------------------

    /// Runs one full authorization pass over a request.
    ///
    /// Pipeline: session validation, threat analysis, policy evaluation,
    /// then rotation when validation requested it. The first failing stage
    /// short-circuits with its reason.
    #[must_use]
    pub fn authenticate_and_authorize(&self, input: AuthorizeInput) -> GatewayDecision {
        let span = tracing::info_span!(
            "authorize",
            subject = input.request.subject.subject_id.as_str(),
            resource = input.request.resource.resource_type.as_str(),
            action = input.request.action.as_str(),
        );
        let _guard = span.enter();

        // Stage 1: session validation.
        let validation = self
            .sessions
            .validate_session(&input.session_id, Some(input.request.context.client_ip));
        if !validation.valid {
            let reason = validation.reason.unwrap_or_else(|| "session invalid".to_string());
            tracing::info!(reason = %reason, "authentication rejected");
            // Natural expiry is not an attack; only credential misuse feeds
            // the brute-force window.
            if validation.failure.is_some_and(ValidationFailure::suspicious) {
                self.detector.record_auth_failure(
                    input.request.context.client_ip,
                    Some(&input.request.subject.subject_id),
                );
            }
            return GatewayDecision {
                authenticated: false,
                authorized: false,
                reason,
                session: None,
                access_decision: None,
                threat_response: None,
                threat_detected: false,
            };
        }
        let mut session = validation.session;

        // Stage 2: threat analysis; a block never reaches policy evaluation.
        let threat = self.detector.analyze_request(&input.request, session.as_ref());
        let threat_detected = !threat.indicators.is_empty();
        if threat.action == ThreatAction::Block {
            tracing::warn!(reason = %threat.reason, "request blocked by threat analysis");
            self.emit_access_event(&input.request, AuditOutcome::Denied, &threat.reason, Severity::High);
            return GatewayDecision {
                authenticated: true,
                authorized: false,
                reason: threat.reason.clone(),
                session,
                access_decision: None,
                threat_response: Some(threat),
                threat_detected,
            };
        }

        // Stage 3: RBAC then ABAC, with the analysis risk score.
        let decision = self.engine.evaluate(&input.request, threat.risk_score);

        // Stage 4: rotation requested by the manager.
        if decision.allowed
            && validation.should_rotate
            && let Ok(rotated) = self.sessions.rotate_session(&input.session_id)
        {
            session = Some(rotated);
        }

        let outcome = if !decision.allowed {
            AuditOutcome::Denied
        } else if threat.action == ThreatAction::Challenge {
            AuditOutcome::Challenged
        } else {
            AuditOutcome::Success
        };
        if decision.audit_required || !decision.allowed {
            let severity = if decision.allowed { Severity::Info } else { Severity::Medium };
            self.emit_access_event(&input.request, outcome, &decision.reason, severity);
        }
        tracing::info!(
            allowed = decision.allowed,
            reason = %decision.reason,
            risk_score = threat.risk_score,
            "authorization decided"
        );

        GatewayDecision {
            authenticated: true,
            authorized: decision.allowed,
            reason: decision.reason.clone(),
            session,
            access_decision: Some(decision),
            threat_response: Some(threat),
            threat_detected,
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Returns point-in-time statistics across all three engines.
    #[must_use]
    pub fn get_stats(&self) -> GatewayStats {
        let (roles, policies) = self.engine.registry_counts();
        let signal_counts = self
            .detector
            .signal_counts()
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        GatewayStats {
            live_sessions: self.sessions.live_session_count(),
            total_sessions: self.sessions.total_session_count(),
            signal_counts,
            blocked_ips: self.detector.blocked_ip_count(),
            audit_events: self.audit_log.len(),
            roles,
            policies,
        }
    }

    /// Returns audit log events matching the query, newest first.
    #[must_use]
    pub fn get_audit_log(&self, query: &AuditQuery) -> Vec<SecurityEvent> {
        self.audit_log.query(query)
    }

    /// Emits an event through the shared fan-out.
    ///
    /// Exposed for host components that log their own security events.
    pub fn emit_event(&self, event: SecurityEvent) {
        self.audit.emit(event);
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// Emits an access decision event.
    fn emit_access_event(&self, request: &AccessRequest, outcome: AuditOutcome, reason: &str, severity: Severity) {
        let seq = self.event_seq.fetch_add(1, Ordering::Relaxed);
        self.audit.emit(SecurityEvent {
            event_id: EventId::new(format!("access-{seq}")),
            timestamp: self.clock.now(),
            event_type: SecurityEventType::Access,
            severity,
            subject_id: Some(request.subject.subject_id.clone()),
            resource: Some(format!(
                "{}:{}",
                request.resource.resource_type.as_str(),
                request.resource.resource_id
            )),
            action: Some(request.action.as_str().to_string()),
            outcome: Some(outcome),
            ip_address: Some(request.context.client_ip.to_string()),
            request_id: None,
            details: BTreeMap::from([("reason".to_string(), json!(reason))]),
        });
    }
}
