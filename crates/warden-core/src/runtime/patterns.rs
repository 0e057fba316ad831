// crates/warden-core/src/runtime/patterns.rs
// ============================================================================
// Module: Warden Threat Patterns
// Description: Named suspicious-content patterns with confidence weights.
// Purpose: Compile the configurable pattern table once, at detector build time.
// Dependencies: regex, serde, thiserror
// ============================================================================

//! ## Overview
//! The threat detector tests serialized request content against a list of
//! named regular expressions, each carrying a fixed confidence weight. The
//! table is configurable; malformed patterns fail detector construction, so
//! analysis never compiles or errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Pattern Definitions
// ============================================================================

/// Named pattern definition supplied by configuration.
///
/// # Invariants
/// - `confidence` is within `[0.0, 1.0]`; the config loader rejects the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPattern {
    /// Stable pattern name used in indicator values.
    pub name: String,
    /// Regular expression source.
    pub pattern: String,
    /// Confidence weight assigned to matches.
    pub confidence: f64,
}

impl ThreatPattern {
    /// Creates a pattern definition.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            confidence,
        }
    }
}

/// Returns the built-in pattern table.
///
/// Weights follow the reference heuristics: injection-style payloads score
/// higher than markup-based ones.
#[must_use]
pub fn default_patterns() -> Vec<ThreatPattern> {
    vec![
        ThreatPattern::new(
            "sql_injection",
            r"(?i)(\bunion\b[\s\S]+\bselect\b|\bselect\b[\s\S]+\bfrom\b|\binsert\s+into\b|\bdrop\s+table\b|\bdelete\s+from\b|'\s*or\s+'|--)",
            0.8,
        ),
        ThreatPattern::new(
            "xss_script",
            r"(?i)(<script\b|javascript:|\bonerror\s*=|\bonload\s*=|<iframe\b)",
            0.7,
        ),
        ThreatPattern::new(
            "path_traversal",
            r"(?i)(\.\./|\.\.\\|%2e%2e%2f|%2e%2e\\)",
            0.8,
        ),
        ThreatPattern::new(
            "command_injection",
            r"(?i)((;|\||&&)\s*(rm|cat|ls|wget|curl|sh|bash|nc|chmod|powershell)\b|\$\(|`)",
            0.75,
        ),
        ThreatPattern::new(
            "ldap_injection",
            r"(\*\)|\(\||\(&|\)\()",
            0.7,
        ),
    ]
}

// ============================================================================
// SECTION: Compiled Patterns
// ============================================================================

/// Errors raised while compiling the pattern table.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ThreatConfigError {
    /// A pattern failed to compile.
    #[error("threat pattern {name}: invalid pattern: {source}")]
    InvalidPattern {
        /// Offending pattern name.
        name: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// A pattern confidence is outside `[0.0, 1.0]`.
    #[error("threat pattern {name}: confidence {confidence} outside [0.0, 1.0]")]
    InvalidConfidence {
        /// Offending pattern name.
        name: String,
        /// Rejected confidence value.
        confidence: f64,
    },
}

/// Pattern with its regex compiled at construction time.
#[derive(Debug, Clone)]
pub struct CompiledThreatPattern {
    /// Stable pattern name.
    pub name: String,
    /// Compiled expression.
    pub regex: Regex,
    /// Confidence weight assigned to matches.
    pub confidence: f64,
}

/// Compiles a pattern table, rejecting malformed entries.
///
/// # Errors
///
/// Returns [`ThreatConfigError`] on the first malformed pattern.
pub fn compile_patterns(patterns: &[ThreatPattern]) -> Result<Vec<CompiledThreatPattern>, ThreatConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            if !(0.0..=1.0).contains(&pattern.confidence) {
                return Err(ThreatConfigError::InvalidConfidence {
                    name: pattern.name.clone(),
                    confidence: pattern.confidence,
                });
            }
            let regex = Regex::new(&pattern.pattern).map_err(|source| ThreatConfigError::InvalidPattern {
                name: pattern.name.clone(),
                source,
            })?;
            Ok(CompiledThreatPattern {
                name: pattern.name.clone(),
                regex,
                confidence: pattern.confidence,
            })
        })
        .collect()
}
