// crates/quota-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Quota Gate Interfaces
// Description: Backend-agnostic interfaces for principal and rate-limit state.
// Purpose: Define the contract surfaces used by Quota Gate runtime components.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Quota Gate integrates with durable storage without
//! embedding backend-specific details. The only safe shared state across
//! service instances is the store behind these traits, so every mutating
//! operation is specified as a single atomic conditional statement: the
//! store reports whether the condition held, and callers never get a
//! read-then-write window to race through.
//!
//! Implementations must be deterministic for identical store state and
//! must fail closed on missing or corrupt data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::identifiers::ExternalSubscriptionId;
use crate::core::identifiers::PrincipalId;
use crate::core::period::BillingPeriod;
use crate::core::principal::Principal;
use crate::core::tier::MessageLimit;
use crate::core::tier::Tier;
use crate::core::token::TokenDigest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Principal store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never embed raw tokens or digests.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("principal store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails decode checks.
    #[error("principal store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("principal store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("principal store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("principal store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Operation Outcomes
// ============================================================================

/// Outcome of the atomic conditional usage increment.
///
/// # Invariants
/// - `Consumed` implies exactly one unit was added by this call.
/// - `LimitReached` implies the stored counter was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The conditional increment took effect.
    Consumed {
        /// Counter value after this increment.
        messages_used: u64,
    },
    /// The counter was at or above the limit; nothing changed.
    LimitReached {
        /// Stored counter value observed by the rejected attempt.
        messages_used: u64,
    },
    /// No principal row exists for the identifier.
    MissingPrincipal,
}

/// Outcome of the idempotent subscription activation.
///
/// # Invariants
/// - `AlreadyActive` implies no field, including the usage counter, was
///   modified by this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The activation was applied by this call.
    Activated,
    /// The principal was already in the requested state; replay no-op.
    AlreadyActive,
    /// No principal row exists for the identifier.
    MissingPrincipal,
}

// ============================================================================
// SECTION: Signup
// ============================================================================

/// Parameters for enrolling a new principal.
///
/// # Invariants
/// - `credential_hash` is opaque to this core; login mechanics live
///   elsewhere.
/// - Paid tiers enroll as `pending`; the free tier enrolls as `active`.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    /// Unique account email.
    pub email: String,
    /// Opaque one-way credential hash produced by the out-of-scope login
    /// path.
    pub credential_hash: String,
    /// Requested tier at signup.
    pub tier: Tier,
    /// Billing period the fresh usage counter belongs to.
    pub period: BillingPeriod,
}

// ============================================================================
// SECTION: Principal Store
// ============================================================================

/// Durable principal store shared by all service instances.
pub trait PrincipalStore: Send + Sync {
    /// Enrolls a new principal with the given token digest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails, including uniqueness
    /// violations on email or digest.
    fn create(&self, signup: &NewPrincipal, digest: &TokenDigest) -> Result<Principal, StoreError>;

    /// Loads a principal snapshot by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    /// Resolves a principal by token digest equality.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn find_by_token_digest(&self, digest: &TokenDigest)
    -> Result<Option<Principal>, StoreError>;

    /// Replaces the stored token digest wholesale, invalidating the
    /// previous token. Returns false when no principal row exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn replace_token_digest(
        &self,
        id: PrincipalId,
        digest: &TokenDigest,
    ) -> Result<bool, StoreError>;

    /// Atomically zeroes the usage counter and advances the period marker,
    /// if and only if the stored marker is older than `current`. Returns
    /// true when the reset took effect; at most one concurrent caller
    /// observes true per period transition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn reset_usage_if_stale(
        &self,
        id: PrincipalId,
        current: BillingPeriod,
    ) -> Result<bool, StoreError>;

    /// Atomically increments the usage counter by exactly one, if and only
    /// if the current value is strictly below `limit` (unconditionally for
    /// [`MessageLimit::Unlimited`]). The store is the sole arbiter: two
    /// concurrent calls never both succeed on the last unit of quota.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails; the caller must treat
    /// the counter state as unknown in that case.
    fn consume_message(
        &self,
        id: PrincipalId,
        limit: MessageLimit,
    ) -> Result<ConsumeOutcome, StoreError>;

    /// Atomically applies a verified tier activation: sets the tier and
    /// external subscription id, marks the subscription active, and zeroes
    /// the usage counter at `period`. A replay carrying the same plan and
    /// external id against a principal already in that exact state is a
    /// no-op reported as [`ActivationOutcome::AlreadyActive`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn activate_subscription(
        &self,
        id: PrincipalId,
        plan: Tier,
        external_id: &ExternalSubscriptionId,
        period: BillingPeriod,
    ) -> Result<ActivationOutcome, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Shared handle to a principal store.
pub type SharedPrincipalStore = Arc<dyn PrincipalStore>;

// ============================================================================
// SECTION: Rate Limit Store
// ============================================================================

/// Shared request-frequency counter store.
///
/// Counting state must live in storage shared across service instances,
/// never in per-connection or per-instance memory.
pub trait RateLimitStore: Send + Sync {
    /// Atomically prunes events older than the trailing window, counts the
    /// remainder, and records this request when the count is below
    /// `max_requests`. Returns false (denied, nothing recorded) once
    /// `max_requests` events fall within the window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the operation fails.
    fn record_request(
        &self,
        id: PrincipalId,
        now_unix: i64,
        max_requests: u32,
        window_seconds: u32,
    ) -> Result<bool, StoreError>;
}

/// Shared handle to a rate limit store.
pub type SharedRateLimitStore = Arc<dyn RateLimitStore>;
