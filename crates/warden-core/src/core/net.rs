// crates/warden-core/src/core/net.rs
// ============================================================================
// Module: Warden Network Matchers
// Description: Exact and CIDR IP matching for role constraints and policies.
// Purpose: Provide pre-parsed IP matchers that never fail during evaluation.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`IpMatcher`] covers the two address forms accepted by role constraints and
//! ABAC conditions: an exact address and a CIDR range. Matchers are parsed at
//! registration or configuration time so evaluation is infallible; CIDR
//! containment is computed with integer masking (32-bit for IPv4, 128-bit for
//! IPv6). A matcher never matches an address of the other family.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while parsing an IP matcher.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IpMatcherError {
    /// The address portion failed to parse.
    #[error("invalid ip address: {0}")]
    InvalidAddress(String),
    /// The prefix length is missing or not a number.
    #[error("invalid cidr prefix: {0}")]
    InvalidPrefix(String),
    /// The prefix length exceeds the address width.
    #[error("prefix length {prefix} exceeds address width {width}")]
    PrefixTooLong {
        /// Requested prefix length.
        prefix: u8,
        /// Address width in bits (32 or 128).
        width: u8,
    },
}

// ============================================================================
// SECTION: IP Matcher
// ============================================================================

/// Pre-parsed IP matcher for allow-list constraints.
///
/// # Invariants
/// - Parsed once at construction; `matches` is infallible.
/// - A matcher of one address family never matches the other family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IpMatcher {
    /// Exact address match.
    Exact(IpAddr),
    /// IPv4 CIDR range match via 32-bit masking.
    CidrV4 {
        /// Masked network address.
        network: u32,
        /// Network mask.
        mask: u32,
        /// Prefix length retained for display.
        prefix: u8,
    },
    /// IPv6 CIDR range match via 128-bit masking.
    CidrV6 {
        /// Masked network address.
        network: u128,
        /// Network mask.
        mask: u128,
        /// Prefix length retained for display.
        prefix: u8,
    },
}

impl IpMatcher {
    /// Parses a matcher from an exact address or CIDR string.
    ///
    /// # Errors
    ///
    /// Returns [`IpMatcherError`] when the address or prefix is malformed.
    pub fn parse(input: &str) -> Result<Self, IpMatcherError> {
        let Some((addr_part, prefix_part)) = input.split_once('/') else {
            let addr = IpAddr::from_str(input)
                .map_err(|_| IpMatcherError::InvalidAddress(input.to_string()))?;
            return Ok(Self::Exact(addr));
        };

        let addr = IpAddr::from_str(addr_part)
            .map_err(|_| IpMatcherError::InvalidAddress(addr_part.to_string()))?;
        let prefix = u8::from_str(prefix_part)
            .map_err(|_| IpMatcherError::InvalidPrefix(prefix_part.to_string()))?;

        match addr {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return Err(IpMatcherError::PrefixTooLong { prefix, width: 32 });
                }
                let mask = prefix_mask_v4(prefix);
                Ok(Self::CidrV4 {
                    network: u32::from(v4) & mask,
                    mask,
                    prefix,
                })
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return Err(IpMatcherError::PrefixTooLong { prefix, width: 128 });
                }
                let mask = prefix_mask_v6(prefix);
                Ok(Self::CidrV6 {
                    network: u128::from(v6) & mask,
                    mask,
                    prefix,
                })
            }
        }
    }

    /// Returns whether the matcher contains the given address.
    #[must_use]
    pub fn matches(&self, addr: IpAddr) -> bool {
        match (self, addr) {
            (Self::Exact(expected), actual) => *expected == actual,
            (Self::CidrV4 { network, mask, .. }, IpAddr::V4(v4)) => {
                u32::from(v4) & *mask == *network
            }
            (Self::CidrV6 { network, mask, .. }, IpAddr::V6(v6)) => {
                u128::from(v6) & *mask == *network
            }
            _ => false,
        }
    }
}

impl fmt::Display for IpMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(addr) => addr.fmt(f),
            Self::CidrV4 { network, prefix, .. } => {
                write!(f, "{}/{prefix}", Ipv4Addr::from(*network))
            }
            Self::CidrV6 { network, prefix, .. } => {
                write!(f, "{}/{prefix}", Ipv6Addr::from(*network))
            }
        }
    }
}

impl TryFrom<String> for IpMatcher {
    type Error = IpMatcherError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IpMatcher> for String {
    fn from(value: IpMatcher) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Mask Helpers
// ============================================================================

/// Computes a 32-bit network mask for the given prefix length.
const fn prefix_mask_v4(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix as u32)
    }
}

/// Computes a 128-bit network mask for the given prefix length.
const fn prefix_mask_v6(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - prefix as u32)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use std::net::IpAddr;
    use std::str::FromStr;

    use super::IpMatcher;
    use super::IpMatcherError;

    /// Parses an address for assertions.
    fn ip(addr: &str) -> IpAddr {
        IpAddr::from_str(addr).unwrap()
    }

    #[test]
    fn exact_match() {
        let matcher = IpMatcher::parse("10.1.2.3").unwrap();
        assert!(matcher.matches(ip("10.1.2.3")));
        assert!(!matcher.matches(ip("10.1.2.4")));
    }

    #[test]
    fn cidr_containment() {
        let matcher = IpMatcher::parse("192.168.0.0/16").unwrap();
        assert!(matcher.matches(ip("192.168.255.1")));
        assert!(!matcher.matches(ip("192.169.0.1")));
    }

    #[test]
    fn zero_prefix_matches_everything_in_family() {
        let matcher = IpMatcher::parse("0.0.0.0/0").unwrap();
        assert!(matcher.matches(ip("8.8.8.8")));
        assert!(!matcher.matches(ip("::1")));
    }

    #[test]
    fn family_mismatch_never_matches() {
        let matcher = IpMatcher::parse("2001:db8::/32").unwrap();
        assert!(matcher.matches(ip("2001:db8::42")));
        assert!(!matcher.matches(ip("32.1.13.184")));
    }

    #[test]
    fn malformed_inputs_fail_at_parse() {
        assert!(matches!(
            IpMatcher::parse("not-an-ip"),
            Err(IpMatcherError::InvalidAddress(_))
        ));
        assert!(matches!(
            IpMatcher::parse("10.0.0.0/33"),
            Err(IpMatcherError::PrefixTooLong { prefix: 33, width: 32 })
        ));
        assert!(matches!(
            IpMatcher::parse("10.0.0.0/abc"),
            Err(IpMatcherError::InvalidPrefix(_))
        ));
    }
}
