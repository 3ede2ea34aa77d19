// crates/quota-gate-core/src/runtime/rate_limiter.rs
// ============================================================================
// Module: Rate Limiter
// Description: Sliding-window request-frequency limiting per principal.
// Purpose: Bound request rates with counting state in the shared store.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The rate limiter bounds how often a principal may call metered
//! endpoints: once `max_requests` requests fall within the trailing
//! `window_seconds`, further requests are denied until the window slides
//! past them. Counting state lives in the [`crate::RateLimitStore`], which
//! is shared across service instances; per-instance or per-session memory
//! would undercount under load balancing and is deliberately not an
//! option here.
//!
//! A denial is terminal for the request: no usage is charged and nothing
//! else is mutated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PrincipalId;
use crate::interfaces::SharedRateLimitStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Sliding-window rate limit settings.
///
/// # Invariants
/// - Both fields are greater than zero (validated at configuration load).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum requests permitted inside one trailing window.
    pub max_requests: u32,
    /// Trailing window length in seconds.
    pub window_seconds: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_seconds: 60,
        }
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Rate limit decision for one request.
///
/// # Invariants
/// - `Denied` implies no event was recorded for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request recorded and admitted.
    Allowed,
    /// Too many requests inside the trailing window.
    Denied,
}

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Sliding-window rate limiter over the shared counter store.
///
/// # Invariants
/// - The store performs prune, count, and record as one atomic operation,
///   so concurrent requests across instances cannot overshoot the limit
///   by racing the count.
pub struct RateLimiter {
    /// Shared rate-limit counter store.
    store: SharedRateLimitStore,
    /// Window policy applied to every principal.
    policy: RateLimitPolicy,
}

impl RateLimiter {
    /// Creates a rate limiter with the given policy.
    #[must_use]
    pub fn new(store: SharedRateLimitStore, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            policy,
        }
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Checks and records one request for the principal at `now_unix`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the counter store fails; callers must
    /// fail closed rather than admit the request.
    pub fn check(&self, id: PrincipalId, now_unix: i64) -> Result<RateDecision, StoreError> {
        let admitted = self.store.record_request(
            id,
            now_unix,
            self.policy.max_requests,
            self.policy.window_seconds,
        )?;
        if admitted {
            Ok(RateDecision::Allowed)
        } else {
            Ok(RateDecision::Denied)
        }
    }
}
