// crates/warden-core/src/runtime/threat.rs
// ============================================================================
// Module: Warden Threat Detector
// Description: Per-request threat analysis over reputation and behavior state.
// Purpose: Classify requests into allow/monitor/challenge/block responses.
// Dependencies: crate::core, crate::runtime::patterns, serde_json
// ============================================================================

//! ## Overview
//! The detector runs six independent checks per request (blocked address,
//! failure rate, brute-force proximity, request rate, suspicious content,
//! session and behavior anomalies) and folds the collected indicators into
//! one [`ThreatAction`] with the fixed confidence thresholds:
//! block at max >= 0.9 (escalating), challenge at max >= 0.7 or mean >= 0.6,
//! monitor at max >= 0.4, otherwise allow.
//!
//! Invariants:
//! - A blocked address alone forces a block; no other check runs.
//! - Sliding windows prune on every access; nothing accumulates unbounded
//!   except the append-only signal log, which the host may drain.
//! - Analysis never errors; patterns are compiled at construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::core::audit::AuditOutcome;
use crate::core::audit::SecurityEvent;
use crate::core::audit::SecurityEventType;
use crate::core::audit::Severity;
use crate::core::identifiers::EventId;
use crate::core::identifiers::SignalId;
use crate::core::identifiers::SubjectId;
use crate::core::request::AccessRequest;
use crate::core::session::Session;
use crate::core::threat::IpReputation;
use crate::core::threat::ThreatAction;
use crate::core::threat::ThreatIndicator;
use crate::core::threat::ThreatResponse;
use crate::core::threat::ThreatSignal;
use crate::core::threat::ThreatSource;
use crate::core::threat::ThreatType;
use crate::core::threat::UserBehaviorProfile;
use crate::core::time::Timestamp;
use crate::interfaces::AuditSink;
use crate::interfaces::Clock;
use crate::runtime::patterns::CompiledThreatPattern;
use crate::runtime::patterns::ThreatConfigError;
use crate::runtime::patterns::ThreatPattern;
use crate::runtime::patterns::compile_patterns;
use crate::runtime::patterns::default_patterns;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Threat detector thresholds and windows.
///
/// # Invariants
/// - Windows are milliseconds and must be non-zero; the config loader rejects
///   zero windows before construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatDetectorConfig {
    /// Sliding window for failed authentications, in milliseconds.
    pub brute_force_window_ms: u64,
    /// Failed authentications within the window that trigger a signal.
    pub brute_force_threshold: usize,
    /// Sliding window for request-rate accounting, in milliseconds.
    pub rate_window_ms: u64,
    /// Requests within the rate window before an indicator is raised.
    pub rate_max_requests: usize,
    /// Failure ratio (failed over total auths) that raises an indicator.
    pub failure_rate_threshold: f64,
    /// Whether reaching the brute-force threshold blocks the address.
    pub auto_block: bool,
    /// Block duration applied by auto-block, in milliseconds.
    pub block_duration_ms: u64,
    /// Suspicious-content pattern table.
    pub patterns: Vec<ThreatPattern>,
}

impl Default for ThreatDetectorConfig {
    fn default() -> Self {
        Self {
            brute_force_window_ms: 15 * 60 * 1_000,
            brute_force_threshold: 5,
            rate_window_ms: 60 * 1_000,
            rate_max_requests: 100,
            failure_rate_threshold: 0.5,
            auto_block: true,
            block_duration_ms: 60 * 60 * 1_000,
            patterns: default_patterns(),
        }
    }
}

// ============================================================================
// SECTION: Detector State
// ============================================================================

/// Interior detector state guarded by one lock.
#[derive(Default)]
struct ThreatState {
    /// Reputation by source address.
    reputation: BTreeMap<IpAddr, IpReputation>,
    /// Behavior profiles by subject.
    profiles: BTreeMap<SubjectId, UserBehaviorProfile>,
    /// Append-only signal log.
    signals: Vec<ThreatSignal>,
}

/// Heuristic threat detector.
pub struct ThreatDetector {
    /// Thresholds and windows.
    config: ThreatDetectorConfig,
    /// Compiled suspicious-content patterns.
    patterns: Vec<CompiledThreatPattern>,
    /// Injected time source.
    clock: Arc<dyn Clock>,
    /// Injected audit sink.
    audit: Arc<dyn AuditSink>,
    /// Detector state.
    state: Mutex<ThreatState>,
    /// Monotonic signal and event sequence.
    seq: AtomicU64,
}

impl ThreatDetector {
    /// Builds a detector, compiling the configured pattern table.
    ///
    /// # Errors
    ///
    /// Returns [`ThreatConfigError`] when a pattern is malformed; analysis
    /// itself never errors.
    pub fn new(
        config: ThreatDetectorConfig,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ThreatConfigError> {
        let patterns = compile_patterns(&config.patterns)?;
        Ok(Self {
            config,
            patterns,
            clock,
            audit,
            state: Mutex::new(ThreatState::default()),
            seq: AtomicU64::new(0),
        })
    }

    /// Returns the detector configuration.
    #[must_use]
    pub const fn config(&self) -> &ThreatDetectorConfig {
        &self.config
    }

    /// Acquires the state lock, recovering from poisoning.
    fn state(&self) -> MutexGuard<'_, ThreatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Request analysis
    // ------------------------------------------------------------------

    /// Analyzes one request and folds all indicators into a response.
    #[must_use]
    pub fn analyze_request(&self, request: &AccessRequest, session: Option<&Session>) -> ThreatResponse {
        let now = self.clock.now();
        let ip = request.context.client_ip;
        let mut state = self.state();

        // Check 1a: an active block short-circuits everything else.
        if is_blocked_mut(state.reputation.entry(ip).or_default(), now) {
            let indicator = ThreatIndicator::new(ThreatType::Blocked, format!("address {ip} is blocked"), 1.0);
            let remaining = state
                .reputation
                .get(&ip)
                .and_then(|rep| rep.block_expires_at)
                .map(|expires| expires.elapsed_since(now));
            let response = ThreatResponse {
                action: ThreatAction::Block,
                reason: "source address is blocked".to_string(),
                indicators: vec![indicator],
                block_duration_ms: remaining,
                escalate: true,
                risk_score: 1.0,
            };
            drop(state);
            return response;
        }

        let mut indicators = Vec::new();

        // Check 1b: failure-rate heuristic over the address reputation.
        let reputation = state.reputation.entry(ip).or_default();
        prune_window(&mut reputation.failed_auths, now, self.config.brute_force_window_ms);
        let failed = reputation.failed_auths.len() as u64;
        let total = failed + reputation.successful_auths;
        if total >= 3 {
            let ratio = failed as f64 / total as f64;
            if ratio > self.config.failure_rate_threshold {
                indicators.push(ThreatIndicator::new(
                    ThreatType::BruteForce,
                    format!("auth failure ratio {ratio:.2}"),
                    0.6,
                ));
            }
        }

        // Check 2: brute-force proximity within the window.
        if self.config.brute_force_threshold > 1
            && reputation.failed_auths.len() >= self.config.brute_force_threshold - 1
        {
            indicators.push(ThreatIndicator::new(
                ThreatType::BruteForce,
                format!("{} failed auths in window", reputation.failed_auths.len()),
                0.85,
            ));
        }

        // Check 3: request rate within the window (this request included).
        reputation.requests.push(now);
        prune_window(&mut reputation.requests, now, self.config.rate_window_ms);
        if reputation.requests.len() > self.config.rate_max_requests {
            indicators.push(ThreatIndicator::new(
                ThreatType::Volume,
                format!("{} requests in window", reputation.requests.len()),
                0.65,
            ));
        }

        // Check 4: suspicious content patterns over the serialized context.
        let content = serde_json::to_string(&request.context.extra).unwrap_or_default();
        for pattern in &self.patterns {
            if pattern.regex.is_match(&content) {
                indicators.push(ThreatIndicator::new(
                    ThreatType::SuspiciousPattern,
                    pattern.name.clone(),
                    pattern.confidence,
                ));
            }
        }

        // Checks 5 and 6: session and behavior anomalies.
        let profile = state.profiles.get(&request.subject.subject_id);
        if let Some(session) = session
            && let Some(profile) = profile
            && !profile.known_ips.is_empty()
            && !profile.known_ips.contains(&session.ip_address)
        {
            indicators.push(ThreatIndicator::new(
                ThreatType::NewIp,
                format!("session address {} not previously seen", session.ip_address),
                0.5,
            ));
        }
        if let Some(profile) = profile
            && profile.active_hours.len() >= 5
            && !profile.active_hours.contains(&request.context.timestamp.hour_of_day())
        {
            indicators.push(ThreatIndicator::new(
                ThreatType::Anomaly,
                format!("activity at hour {}", request.context.timestamp.hour_of_day()),
                0.45,
            ));
        }

        let response = decide(&indicators);
        if !indicators.is_empty() {
            let severity = match response.action {
                ThreatAction::Allow | ThreatAction::Monitor => Severity::Low,
                ThreatAction::Challenge => Severity::Medium,
                ThreatAction::Block => Severity::High,
            };
            let threat_type = dominant_type(&indicators);
            let signal = self.build_signal(
                now,
                threat_type,
                severity,
                ThreatSource::Ip { address: ip },
                Some(request.resource.resource_type.as_str().to_string()),
                indicators,
            );
            state.signals.push(signal.clone());
            drop(state);
            self.emit_signal_event(&signal, Some(request.subject.subject_id.clone()));
        }
        response
    }

    // ------------------------------------------------------------------
    // Authentication bookkeeping
    // ------------------------------------------------------------------

    /// Records a failed authentication from an address.
    ///
    /// Reaching the brute-force threshold emits a high-severity signal and,
    /// when auto-block is enabled, blocks the address.
    pub fn record_auth_failure(&self, ip: IpAddr, subject_id: Option<&SubjectId>) {
        let now = self.clock.now();
        let mut state = self.state();

        let reputation = state.reputation.entry(ip).or_default();
        reputation.failed_auths.push(now);
        prune_window(&mut reputation.failed_auths, now, self.config.brute_force_window_ms);
        let failures = reputation.failed_auths.len();

        if let Some(subject_id) = subject_id {
            let profile = state.profiles.entry(subject_id.clone()).or_default();
            profile.failed_logins += 1;
            profile.last_failure_at = Some(now);
        }

        if failures < self.config.brute_force_threshold {
            return;
        }

        if self.config.auto_block {
            let reputation = state.reputation.entry(ip).or_default();
            reputation.blocked = true;
            reputation.block_expires_at = Some(now.plus_millis(self.config.block_duration_ms));
            reputation.block_reason = Some("brute force threshold reached".to_string());
        }
        let signal = self.build_signal(
            now,
            ThreatType::BruteForce,
            Severity::High,
            ThreatSource::Ip { address: ip },
            subject_id.map(|id| id.as_str().to_string()),
            vec![ThreatIndicator::new(
                ThreatType::BruteForce,
                format!("{failures} failed auths in window"),
                0.9,
            )],
        );
        state.signals.push(signal.clone());
        drop(state);
        self.emit_signal_event(&signal, subject_id.cloned());
    }

    /// Records a successful authentication and learns the subject's address.
    pub fn record_auth_success(&self, ip: IpAddr, subject_id: &SubjectId) {
        let now = self.clock.now();
        let mut state = self.state();

        state.reputation.entry(ip).or_default().successful_auths += 1;

        let profile = state.profiles.entry(subject_id.clone()).or_default();
        profile.last_login_at = Some(now);
        profile.active_hours.insert(now.hour_of_day());
        let first_ip = profile.known_ips.is_empty();
        let new_ip = profile.known_ips.insert(ip);

        if new_ip && !first_ip {
            let signal = self.build_signal(
                now,
                ThreatType::NewIp,
                Severity::Low,
                ThreatSource::Subject {
                    subject_id: subject_id.clone(),
                },
                None,
                vec![ThreatIndicator::new(
                    ThreatType::NewIp,
                    format!("first login from {ip}"),
                    0.5,
                )],
            );
            state.signals.push(signal.clone());
            drop(state);
            self.emit_signal_event(&signal, Some(subject_id.clone()));
        }
    }

    // ------------------------------------------------------------------
    // Address blocks
    // ------------------------------------------------------------------

    /// Blocks an address, optionally for a bounded duration.
    pub fn block_ip(&self, ip: IpAddr, reason: impl Into<String>, duration_ms: Option<u64>) {
        let now = self.clock.now();
        let reason = reason.into();
        let mut state = self.state();
        let reputation = state.reputation.entry(ip).or_default();
        reputation.blocked = true;
        reputation.block_expires_at = duration_ms.map(|ms| now.plus_millis(ms));
        reputation.block_reason = Some(reason.clone());
        drop(state);

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.audit.emit(SecurityEvent {
            event_id: EventId::new(format!("threat-{seq}")),
            timestamp: now,
            event_type: SecurityEventType::Threat,
            severity: Severity::High,
            subject_id: None,
            resource: None,
            action: Some("ip_blocked".to_string()),
            outcome: Some(AuditOutcome::Denied),
            ip_address: Some(ip.to_string()),
            request_id: None,
            details: BTreeMap::from([("reason".to_string(), json!(reason))]),
        });
    }

    /// Clears a block on an address.
    pub fn unblock_ip(&self, ip: IpAddr) {
        let mut state = self.state();
        if let Some(reputation) = state.reputation.get_mut(&ip) {
            reputation.blocked = false;
            reputation.block_expires_at = None;
            reputation.block_reason = None;
        }
    }

    /// Returns whether an address is blocked, lazily clearing expired blocks.
    #[must_use]
    pub fn is_ip_blocked(&self, ip: IpAddr) -> bool {
        let now = self.clock.now();
        let mut state = self.state();
        state
            .reputation
            .get_mut(&ip)
            .is_some_and(|reputation| is_blocked_mut(reputation, now))
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Returns a snapshot of all recorded signals.
    #[must_use]
    pub fn signals(&self) -> Vec<ThreatSignal> {
        self.state().signals.clone()
    }

    /// Returns signal counts keyed by threat type label.
    #[must_use]
    pub fn signal_counts(&self) -> BTreeMap<&'static str, usize> {
        let state = self.state();
        let mut counts = BTreeMap::new();
        for signal in &state.signals {
            *counts.entry(signal.threat_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of currently blocked addresses.
    #[must_use]
    pub fn blocked_ip_count(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state();
        state
            .reputation
            .values_mut()
            .map(|reputation| is_blocked_mut(reputation, now))
            .filter(|blocked| *blocked)
            .count()
    }

    // ------------------------------------------------------------------
    // Signal construction
    // ------------------------------------------------------------------

    /// Builds a signal with a fresh identifier.
    fn build_signal(
        &self,
        now: Timestamp,
        threat_type: ThreatType,
        severity: Severity,
        source: ThreatSource,
        target: Option<String>,
        indicators: Vec<ThreatIndicator>,
    ) -> ThreatSignal {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        ThreatSignal {
            signal_id: SignalId::new(format!("signal-{seq}")),
            timestamp: now,
            threat_type,
            severity,
            source,
            target,
            indicators,
            context: BTreeMap::new(),
            mitigated: false,
            mitigation: None,
        }
    }

    /// Emits an audit event describing a recorded signal.
    fn emit_signal_event(&self, signal: &ThreatSignal, subject_id: Option<SubjectId>) {
        let ip = match &signal.source {
            ThreatSource::Ip { address } => Some(address.to_string()),
            ThreatSource::Subject { .. } => None,
        };
        self.audit.emit(SecurityEvent {
            event_id: EventId::new(format!("threat-{}", signal.signal_id)),
            timestamp: signal.timestamp,
            event_type: SecurityEventType::Threat,
            severity: signal.severity,
            subject_id,
            resource: signal.target.clone(),
            action: Some(signal.threat_type.as_str().to_string()),
            outcome: None,
            ip_address: ip,
            request_id: None,
            details: BTreeMap::from([(
                "indicators".to_string(),
                json!(signal.indicators.len()),
            )]),
        });
    }
}

// ============================================================================
// SECTION: Decision Rule
// ============================================================================

/// Folds indicators into an action using the fixed confidence thresholds.
fn decide(indicators: &[ThreatIndicator]) -> ThreatResponse {
    if indicators.is_empty() {
        return ThreatResponse {
            action: ThreatAction::Allow,
            reason: "no threat indicators".to_string(),
            indicators: Vec::new(),
            block_duration_ms: None,
            escalate: false,
            risk_score: 0.0,
        };
    }

    let max = indicators.iter().map(|i| i.confidence).fold(0.0_f64, f64::max);
    let mean = indicators.iter().map(|i| i.confidence).sum::<f64>() / indicators.len() as f64;
    let top = indicators
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map_or_else(String::new, |i| format!("{} ({})", i.kind.as_str(), i.value));

    let (action, escalate) = if max >= 0.9 {
        (ThreatAction::Block, true)
    } else if max >= 0.7 || mean >= 0.6 {
        (ThreatAction::Challenge, false)
    } else if max >= 0.4 {
        (ThreatAction::Monitor, false)
    } else {
        (ThreatAction::Allow, false)
    };

    ThreatResponse {
        action,
        reason: format!("{}: {top}", action.as_str()),
        indicators: indicators.to_vec(),
        block_duration_ms: None,
        escalate,
        risk_score: mean,
    }
}

/// Returns the threat type of the highest-confidence indicator.
fn dominant_type(indicators: &[ThreatIndicator]) -> ThreatType {
    indicators
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map_or(ThreatType::Anomaly, |i| i.kind)
}

// ============================================================================
// SECTION: Window Helpers
// ============================================================================

/// Discards timestamps older than the window.
fn prune_window(window: &mut Vec<Timestamp>, now: Timestamp, window_ms: u64) {
    window.retain(|ts| now.elapsed_since(*ts) <= window_ms);
}

/// Returns whether the reputation is actively blocked, clearing expired blocks.
fn is_blocked_mut(reputation: &mut IpReputation, now: Timestamp) -> bool {
    if !reputation.blocked {
        return false;
    }
    if let Some(expires) = reputation.block_expires_at
        && now > expires
    {
        reputation.blocked = false;
        reputation.block_expires_at = None;
        reputation.block_reason = None;
        return false;
    }
    true
}
