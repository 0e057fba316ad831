// crates/warden-config/src/lib.rs
// ============================================================================
// Module: Warden Config Library
// Description: TOML configuration model and validation for the Warden engines.
// Purpose: Load, validate, and convert host configuration into core configs.
// Dependencies: warden-core, serde, toml, regex, thiserror
// ============================================================================

//! ## Overview
//! `WardenConfig` is the canonical host configuration: session lifecycle
//! settings, threat detector settings (with optional pattern-table overrides),
//! and engine settings (named address allow-lists for role constraints).
//! Loading is strict and fail-closed: malformed TOML, invalid regular
//! expressions, out-of-range confidences, zero windows, and bad CIDR entries
//! are all rejected before any engine is constructed.
//!
//! Defaults mirror the core engine defaults, so an empty file (or no file at
//! all) yields a working configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use warden_core::IpMatcher;
use warden_core::SessionManagerConfig;
use warden_core::ThreatDetectorConfig;
use warden_core::ThreatPattern;
use warden_core::runtime::patterns::default_patterns;

// ============================================================================
// SECTION: Load Guards
// ============================================================================

/// Maximum accepted config path length, in bytes.
const MAX_PATH_LENGTH: usize = 4_096;

/// Maximum accepted length of a single path component, in bytes.
const MAX_PATH_COMPONENT: usize = 255;

/// Maximum accepted config file size, in bytes.
const MAX_FILE_SIZE: u64 = 1_048_576;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while loading or validating configuration.
///
/// # Invariants
/// - Variants are stable for programmatic handling; messages are suitable for
///   operator-facing logs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config path exceeds the accepted length.
    #[error("config path exceeds max length ({0} > {MAX_PATH_LENGTH} bytes)")]
    PathTooLong(usize),
    /// A single path component exceeds the accepted length.
    #[error("config path component too long ({0} > {MAX_PATH_COMPONENT} bytes)")]
    PathComponentTooLong(usize),
    /// The config file exceeds the accepted size.
    #[error("config file exceeds size limit ({0} > {MAX_FILE_SIZE} bytes)")]
    FileTooLarge(u64),
    /// The config file is not valid UTF-8.
    #[error("config file must be utf-8")]
    NotUtf8,
    /// The config file could not be read.
    #[error("config file could not be read: {0}")]
    Read(#[from] std::io::Error),
    /// The config file is not valid TOML for this model.
    #[error("config file could not be parsed: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation found one or more invalid settings.
    #[error("invalid configuration: {0}")]
    Invalid(ConfigIssues),
}

/// Collected validation issues, reported together.
///
/// # Invariants
/// - Never empty when wrapped in [`ConfigError::Invalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssues(Vec<String>);

impl ConfigIssues {
    /// Returns the individual issue messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ConfigIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

// ============================================================================
// SECTION: Session Settings
// ============================================================================

/// Session lifecycle settings.
///
/// # Invariants
/// - All windows are milliseconds and must be non-zero after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionSettings {
    /// Absolute session lifetime, in milliseconds.
    pub absolute_ttl_ms: u64,
    /// Idle timeout, in milliseconds.
    pub idle_timeout_ms: u64,
    /// Concurrent live sessions allowed per subject.
    pub max_sessions_per_subject: usize,
    /// Whether sessions are bound to their creating address.
    pub bind_to_ip: bool,
    /// Whether session creation requires completed MFA.
    pub require_mfa: bool,
    /// Whether validation requests identifier rotation past the interval.
    pub rotate_on_activity: bool,
    /// Rotation interval, in milliseconds.
    pub rotation_interval_ms: u64,
    /// Background sweep interval, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let core = SessionManagerConfig::default();
        Self {
            absolute_ttl_ms: core.absolute_ttl_ms,
            idle_timeout_ms: core.idle_timeout_ms,
            max_sessions_per_subject: core.max_sessions_per_subject,
            bind_to_ip: core.bind_to_ip,
            require_mfa: core.require_mfa,
            rotate_on_activity: core.rotate_on_activity,
            rotation_interval_ms: core.rotation_interval_ms,
            sweep_interval_ms: core.sweep_interval_ms,
        }
    }
}

impl SessionSettings {
    /// Appends validation issues for these settings.
    fn validate_into(&self, issues: &mut Vec<String>) {
        if self.absolute_ttl_ms == 0 {
            issues.push("session.absolute_ttl_ms must be non-zero".to_string());
        }
        if self.idle_timeout_ms == 0 {
            issues.push("session.idle_timeout_ms must be non-zero".to_string());
        }
        if self.max_sessions_per_subject == 0 {
            issues.push("session.max_sessions_per_subject must be at least 1".to_string());
        }
        if self.rotation_interval_ms == 0 {
            issues.push("session.rotation_interval_ms must be non-zero".to_string());
        }
        if self.sweep_interval_ms == 0 {
            issues.push("session.sweep_interval_ms must be non-zero".to_string());
        }
    }
}

// ============================================================================
// SECTION: Threat Settings
// ============================================================================

/// Threat detector settings.
///
/// # Invariants
/// - Pattern overrides, when present, fully replace the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ThreatSettings {
    /// Sliding window for failed authentications, in milliseconds.
    pub brute_force_window_ms: u64,
    /// Failed authentications within the window that trigger a signal.
    pub brute_force_threshold: usize,
    /// Sliding window for request-rate accounting, in milliseconds.
    pub rate_window_ms: u64,
    /// Requests within the rate window before an indicator is raised.
    pub rate_max_requests: usize,
    /// Failure ratio over recent authentications that raises an indicator.
    pub failure_rate_threshold: f64,
    /// Whether reaching the brute-force threshold blocks the address.
    pub auto_block: bool,
    /// Block duration applied by auto-block, in milliseconds.
    pub block_duration_ms: u64,
    /// Optional pattern-table override; `None` keeps the built-in table.
    pub patterns: Option<Vec<PatternSettings>>,
}

impl Default for ThreatSettings {
    fn default() -> Self {
        let core = ThreatDetectorConfig::default();
        Self {
            brute_force_window_ms: core.brute_force_window_ms,
            brute_force_threshold: core.brute_force_threshold,
            rate_window_ms: core.rate_window_ms,
            rate_max_requests: core.rate_max_requests,
            failure_rate_threshold: core.failure_rate_threshold,
            auto_block: core.auto_block,
            block_duration_ms: core.block_duration_ms,
            patterns: None,
        }
    }
}

impl ThreatSettings {
    /// Appends validation issues for these settings.
    fn validate_into(&self, issues: &mut Vec<String>) {
        if self.brute_force_window_ms == 0 {
            issues.push("threat.brute_force_window_ms must be non-zero".to_string());
        }
        if self.brute_force_threshold == 0 {
            issues.push("threat.brute_force_threshold must be at least 1".to_string());
        }
        if self.rate_window_ms == 0 {
            issues.push("threat.rate_window_ms must be non-zero".to_string());
        }
        if self.rate_max_requests == 0 {
            issues.push("threat.rate_max_requests must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.failure_rate_threshold) {
            issues.push(format!(
                "threat.failure_rate_threshold {} outside [0.0, 1.0]",
                self.failure_rate_threshold
            ));
        }
        if self.block_duration_ms == 0 {
            issues.push("threat.block_duration_ms must be non-zero".to_string());
        }
        if let Some(patterns) = &self.patterns {
            for pattern in patterns {
                pattern.validate_into(issues);
            }
        }
    }
}

/// One configured suspicious-content pattern.
///
/// # Invariants
/// - `pattern` must compile and `confidence` must be within `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSettings {
    /// Stable pattern name used in indicator values.
    pub name: String,
    /// Regular expression source.
    pub pattern: String,
    /// Confidence weight assigned to matches.
    pub confidence: f64,
}

impl PatternSettings {
    /// Appends validation issues for this pattern.
    fn validate_into(&self, issues: &mut Vec<String>) {
        if self.name.is_empty() {
            issues.push("threat.patterns entry has an empty name".to_string());
        }
        if let Err(error) = Regex::new(&self.pattern) {
            issues.push(format!("threat.patterns.{}: invalid pattern: {error}", self.name));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            issues.push(format!(
                "threat.patterns.{}: confidence {} outside [0.0, 1.0]",
                self.name, self.confidence
            ));
        }
    }
}

// ============================================================================
// SECTION: Engine Settings
// ============================================================================

/// Access-control engine settings.
///
/// # Invariants
/// - Every allow-list entry is an exact address or CIDR range accepted by
///   [`IpMatcher::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineSettings {
    /// Named address allow-lists referenced by role constraints.
    pub ip_allow_lists: BTreeMap<String, Vec<String>>,
}

impl EngineSettings {
    /// Appends validation issues for these settings.
    fn validate_into(&self, issues: &mut Vec<String>) {
        for (name, entries) in &self.ip_allow_lists {
            for entry in entries {
                if let Err(error) = IpMatcher::parse(entry) {
                    issues.push(format!("engine.ip_allow_lists.{name}: {entry}: {error}"));
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Canonical Warden host configuration.
///
/// # Invariants
/// - A value returned by the load functions has passed [`WardenConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WardenConfig {
    /// Session lifecycle settings.
    pub session: SessionSettings,
    /// Threat detector settings.
    pub threat: ThreatSettings,
    /// Access-control engine settings.
    pub engine: EngineSettings,
}

impl WardenConfig {
    /// Loads configuration from an optional path; `None` yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is rejected, the file cannot be
    /// read or parsed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is rejected, the file cannot be
    /// read or parsed, or validation fails.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        check_path(path)?;
        let metadata = fs::metadata(path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ConfigError::FileTooLarge(metadata.len()));
        }
        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|_| ConfigError::NotUtf8)?;
        Self::load_from_str(&text)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every setting, collecting all issues before failing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every rejected setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        self.session.validate_into(&mut issues);
        self.threat.validate_into(&mut issues);
        self.engine.validate_into(&mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(ConfigIssues(issues)))
        }
    }

    /// Converts the session settings into the core manager configuration.
    #[must_use]
    pub fn session_config(&self) -> SessionManagerConfig {
        SessionManagerConfig {
            absolute_ttl_ms: self.session.absolute_ttl_ms,
            idle_timeout_ms: self.session.idle_timeout_ms,
            max_sessions_per_subject: self.session.max_sessions_per_subject,
            bind_to_ip: self.session.bind_to_ip,
            require_mfa: self.session.require_mfa,
            rotate_on_activity: self.session.rotate_on_activity,
            rotation_interval_ms: self.session.rotation_interval_ms,
            sweep_interval_ms: self.session.sweep_interval_ms,
        }
    }

    /// Converts the threat settings into the core detector configuration.
    #[must_use]
    pub fn threat_config(&self) -> ThreatDetectorConfig {
        let patterns = self.threat.patterns.as_ref().map_or_else(default_patterns, |patterns| {
            patterns
                .iter()
                .map(|pattern| ThreatPattern::new(&pattern.name, &pattern.pattern, pattern.confidence))
                .collect()
        });
        ThreatDetectorConfig {
            brute_force_window_ms: self.threat.brute_force_window_ms,
            brute_force_threshold: self.threat.brute_force_threshold,
            rate_window_ms: self.threat.rate_window_ms,
            rate_max_requests: self.threat.rate_max_requests,
            failure_rate_threshold: self.threat.failure_rate_threshold,
            auto_block: self.threat.auto_block,
            block_duration_ms: self.threat.block_duration_ms,
            patterns,
        }
    }

    /// Resolves the named address allow-lists into pre-parsed matchers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an entry fails to parse; a value
    /// that passed [`WardenConfig::validate`] never does.
    pub fn ip_allow_lists(&self) -> Result<BTreeMap<String, Vec<IpMatcher>>, ConfigError> {
        let mut issues = Vec::new();
        let mut resolved = BTreeMap::new();
        for (name, entries) in &self.engine.ip_allow_lists {
            let mut matchers = Vec::with_capacity(entries.len());
            for entry in entries {
                match IpMatcher::parse(entry) {
                    Ok(matcher) => matchers.push(matcher),
                    Err(error) => issues.push(format!("engine.ip_allow_lists.{name}: {entry}: {error}")),
                }
            }
            resolved.insert(name.clone(), matchers);
        }
        if issues.is_empty() {
            Ok(resolved)
        } else {
            Err(ConfigError::Invalid(ConfigIssues(issues)))
        }
    }
}

// ============================================================================
// SECTION: Path Guards
// ============================================================================

/// Rejects paths that exceed the accepted length limits.
fn check_path(path: &Path) -> Result<(), ConfigError> {
    let length = path.as_os_str().len();
    if length > MAX_PATH_LENGTH {
        return Err(ConfigError::PathTooLong(length));
    }
    for component in path.components() {
        let component_length = component.as_os_str().len();
        if component_length > MAX_PATH_COMPONENT {
            return Err(ConfigError::PathComponentTooLong(component_length));
        }
    }
    Ok(())
}
