// crates/quota-gate-core/tests/rate_limiter_unit.rs
// ============================================================================
// Module: Rate Limiter Unit Tests
// Description: Sliding-window admission over the in-memory counter store.
// Purpose: Validate window saturation, recovery, and per-principal isolation.
// ============================================================================

//! ## Overview
//! Exercises the sliding-window rate limiter:
//! - Requests up to the cap are admitted; the next one inside the window is not
//! - Admission recovers once old events age past the window
//! - Windows are tracked per principal; denied principals never affect others

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use quota_gate_core::InMemoryRateLimitStore;
use quota_gate_core::PrincipalId;
use quota_gate_core::RateDecision;
use quota_gate_core::RateLimitPolicy;
use quota_gate_core::RateLimiter;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Arbitrary window start, far from zero so subtraction never underflows.
const BASE: i64 = 1_772_668_800;

fn limiter(policy: RateLimitPolicy) -> RateLimiter {
    RateLimiter::new(Arc::new(InMemoryRateLimitStore::new()), policy)
}

fn id(raw: u64) -> PrincipalId {
    PrincipalId::from_raw(raw).expect("nonzero id")
}

// ============================================================================
// SECTION: Window Saturation
// ============================================================================

#[test]
fn default_policy_admits_sixty_then_denies_the_next() {
    let limiter = limiter(RateLimitPolicy::default());
    let caller = id(1);
    for offset in 0..60 {
        let decision = limiter.check(caller, BASE + offset % 5).expect("check");
        assert_eq!(decision, RateDecision::Allowed, "request {offset} should pass");
    }
    let decision = limiter.check(caller, BASE + 5).expect("check");
    assert_eq!(decision, RateDecision::Denied);
}

#[test]
fn denied_requests_do_not_consume_window_slots() {
    let limiter = limiter(RateLimitPolicy {
        max_requests: 2,
        window_seconds: 60,
    });
    let caller = id(1);
    assert_eq!(limiter.check(caller, BASE).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(caller, BASE).expect("check"), RateDecision::Allowed);
    for _ in 0..10 {
        assert_eq!(limiter.check(caller, BASE + 1).expect("check"), RateDecision::Denied);
    }
    // Both admitted events age out together; the denials left no residue.
    assert_eq!(limiter.check(caller, BASE + 61).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(caller, BASE + 61).expect("check"), RateDecision::Allowed);
}

// ============================================================================
// SECTION: Recovery
// ============================================================================

#[test]
fn admission_recovers_as_events_age_past_the_window() {
    let limiter = limiter(RateLimitPolicy {
        max_requests: 3,
        window_seconds: 60,
    });
    let caller = id(1);
    assert_eq!(limiter.check(caller, BASE).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(caller, BASE + 20).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(caller, BASE + 40).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(caller, BASE + 59).expect("check"), RateDecision::Denied);
    // The BASE event leaves the window at BASE + 61; one slot frees up.
    assert_eq!(limiter.check(caller, BASE + 61).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(caller, BASE + 61).expect("check"), RateDecision::Denied);
}

// ============================================================================
// SECTION: Isolation
// ============================================================================

#[test]
fn windows_are_tracked_per_principal() {
    let limiter = limiter(RateLimitPolicy {
        max_requests: 1,
        window_seconds: 60,
    });
    assert_eq!(limiter.check(id(1), BASE).expect("check"), RateDecision::Allowed);
    assert_eq!(limiter.check(id(1), BASE).expect("check"), RateDecision::Denied);
    // A saturated neighbor has no effect on a fresh principal.
    assert_eq!(limiter.check(id(2), BASE).expect("check"), RateDecision::Allowed);
}
