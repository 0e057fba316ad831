// crates/warden-core/tests/proptest_window.rs
// ============================================================================
// Module: Window and Matcher Property-Based Tests
// Description: Property tests for CIDR containment, timestamp arithmetic, and
//              the detector's sliding request window.
// Purpose: Detect panics and invariants across wide input ranges.
// ============================================================================

//! Property-based tests for matcher and window invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::sync::Arc;

use proptest::prelude::*;

use warden_core::ActionKind;
use warden_core::Clock;
use warden_core::IpMatcher;
use warden_core::ManualClock;
use warden_core::NoopAuditSink;
use warden_core::ResourceType;
use warden_core::ThreatAction;
use warden_core::ThreatDetector;
use warden_core::ThreatDetectorConfig;
use warden_core::ThreatType;
use warden_core::Timestamp;

use common::request;
use common::resource;
use common::subject;

/// Reference containment check by integer masking.
fn v4_mask(prefix: u8) -> u32 {
    if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) }
}

/// Reference containment check by integer masking.
fn v6_mask(prefix: u8) -> u128 {
    if prefix == 0 { 0 } else { u128::MAX << (128 - u32::from(prefix)) }
}

proptest! {
    #[test]
    fn cidr_v4_containment_agrees_with_masking(network in any::<u32>(), addr in any::<u32>(), prefix in 0_u8..=32) {
        let cidr = format!("{}/{prefix}", Ipv4Addr::from(network));
        let matcher = IpMatcher::parse(&cidr).unwrap();
        let candidate = IpAddr::V4(Ipv4Addr::from(addr));
        let expected = network & v4_mask(prefix) == addr & v4_mask(prefix);
        prop_assert_eq!(matcher.matches(candidate), expected);
    }

    #[test]
    fn cidr_v6_containment_agrees_with_masking(network in any::<u128>(), addr in any::<u128>(), prefix in 0_u8..=128) {
        let cidr = format!("{}/{prefix}", Ipv6Addr::from(network));
        let matcher = IpMatcher::parse(&cidr).unwrap();
        let candidate = IpAddr::V6(Ipv6Addr::from(addr));
        let expected = network & v6_mask(prefix) == addr & v6_mask(prefix);
        prop_assert_eq!(matcher.matches(candidate), expected);
    }

    #[test]
    fn cidr_never_crosses_address_families(network in any::<u32>(), addr in any::<u128>(), prefix in 0_u8..=32) {
        let cidr = format!("{}/{prefix}", Ipv4Addr::from(network));
        let matcher = IpMatcher::parse(&cidr).unwrap();
        prop_assert!(!matcher.matches(IpAddr::V6(Ipv6Addr::from(addr))));
    }

    #[test]
    fn exact_matcher_matches_only_itself(a in any::<u32>(), b in any::<u32>()) {
        let matcher = IpMatcher::parse(&Ipv4Addr::from(a).to_string()).unwrap();
        let candidate = IpAddr::V4(Ipv4Addr::from(b));
        prop_assert_eq!(matcher.matches(candidate), a == b);
    }

    #[test]
    fn matcher_parse_never_panics(input in ".*") {
        let _ = IpMatcher::parse(&input);
    }

    #[test]
    fn matcher_display_round_trips(network in any::<u32>(), prefix in 0_u8..=32) {
        let cidr = format!("{}/{prefix}", Ipv4Addr::from(network & v4_mask(prefix)));
        let matcher = IpMatcher::parse(&cidr).unwrap();
        prop_assert_eq!(IpMatcher::parse(&matcher.to_string()).unwrap(), matcher);
    }

    #[test]
    fn timestamp_advance_and_elapse_are_consistent(
        base in -1_000_000_000_000_000_i64..1_000_000_000_000_000,
        delta in 0_u64..1_000_000_000_000,
    ) {
        let start = Timestamp::from_unix_millis(base);
        let later = start.plus_millis(delta);
        prop_assert_eq!(later.elapsed_since(start), delta);
        prop_assert_eq!(start.elapsed_since(later), 0);
    }

    #[test]
    fn timestamp_projections_never_panic(millis in any::<i64>()) {
        let ts = Timestamp::from_unix_millis(millis);
        prop_assert!(ts.hour_of_day() < 24);
        prop_assert!(ts.day_of_week() < 7);
    }

    #[test]
    fn rate_window_raises_volume_exactly_past_the_limit(limit in 1_usize..12) {
        let config = ThreatDetectorConfig {
            rate_max_requests: limit,
            ..ThreatDetectorConfig::default()
        };
        let clock = Arc::new(ManualClock::starting_at(Timestamp::from_unix_millis(1_700_000_000_000)));
        let detector = ThreatDetector::new(config, clock.clone(), Arc::new(NoopAuditSink)).unwrap();
        let probe = || {
            request(
                subject("alice", &["viewer"]),
                resource(ResourceType::Tool, "search"),
                ActionKind::Read,
                "1.2.3.4",
                clock.now(),
            )
        };

        // The first `limit` requests stay inside the window.
        for _ in 0..limit {
            prop_assert_eq!(detector.analyze_request(&probe(), None).action, ThreatAction::Allow);
        }
        let over = detector.analyze_request(&probe(), None);
        prop_assert!(over.indicators.iter().any(|i| i.kind == ThreatType::Volume));

        // Sliding the window past every recorded request resets the count.
        clock.advance(60_001);
        prop_assert_eq!(detector.analyze_request(&probe(), None).action, ThreatAction::Allow);
    }
}
