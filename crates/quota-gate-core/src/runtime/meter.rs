// crates/quota-gate-core/src/runtime/meter.rs
// ============================================================================
// Module: Usage Meter
// Description: Quota-checked message consumption and usage reporting.
// Purpose: Enforce monthly message quotas with atomic conditional updates.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The usage meter owns the tightest concurrency contract in Quota Gate:
//! consuming a message is a single atomic conditional increment that takes
//! effect if and only if the stored counter is strictly below the tier
//! limit. There is no read-then-write window, so N concurrent consumers
//! against L remaining units yield exactly L successes regardless of
//! interleaving or instance count.
//!
//! Before consuming (and before serving a status read), the meter checks
//! whether the stored billing period is stale and, if so, issues the
//! atomic conditional reset. The reset's store-side guard admits at most
//! one reset per period transition, so racing requests across a month
//! boundary neither double-reset nor discard a concurrent successful
//! increment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::period::BillingPeriod;
use crate::core::period::PeriodError;
use crate::core::principal::Principal;
use crate::core::tier::TierPolicy;
use crate::interfaces::ConsumeOutcome;
use crate::interfaces::SharedPrincipalStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Usage meter errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The authenticated principal vanished between auth and metering.
    #[error("unknown principal")]
    UnknownPrincipal,
    /// Supplied timestamp does not map to a billing period.
    #[error(transparent)]
    Period(#[from] PeriodError),
    /// Underlying store failure; counter state must be treated as unknown.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of one quota-checked consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// One message was charged.
    Consumed {
        /// Counter value after the increment.
        messages_used: u64,
        /// Remaining allowance (`-1` when unlimited).
        messages_remaining: i64,
    },
    /// The monthly quota is exhausted; nothing was charged.
    LimitExceeded {
        /// Stored counter value at the time of rejection.
        messages_used: u64,
    },
}

/// Read-only usage snapshot for dashboards.
///
/// # Invariants
/// - `messages_remaining` clamps at zero for limited tiers and is `-1`
///   for unlimited tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    /// Messages consumed in the current period.
    pub messages_used: u64,
    /// Configured monthly limit (`-1` when unlimited).
    pub messages_limit: i64,
    /// Remaining allowance (`-1` when unlimited).
    pub messages_remaining: i64,
}

// ============================================================================
// SECTION: Usage Meter
// ============================================================================

/// Quota-checked monthly message meter.
///
/// # Invariants
/// - The store's conditional increment is the sole arbiter under
///   contention; the meter never pre-checks the counter and acts on the
///   stale read.
pub struct UsageMeter {
    /// Shared principal store.
    store: SharedPrincipalStore,
    /// Tier-to-entitlement lookup.
    policy: TierPolicy,
}

impl UsageMeter {
    /// Creates a usage meter with the given tier policy.
    #[must_use]
    pub fn new(store: SharedPrincipalStore, policy: TierPolicy) -> Self {
        Self {
            store,
            policy,
        }
    }

    /// Returns the tier policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Charges one message against the principal's monthly quota.
    ///
    /// Unlimited tiers bypass the threshold check but still increment for
    /// reporting purposes.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError`] when the period cannot be derived or the
    /// store fails; a store failure leaves the counter state unknown.
    pub fn consume(
        &self,
        principal: &Principal,
        now_unix: i64,
    ) -> Result<Consumption, MeterError> {
        let current = BillingPeriod::from_unix_seconds(now_unix)?;
        if principal.reset_due(current) {
            // Losing the race is fine: some other request already reset.
            let _ = self.store.reset_usage_if_stale(principal.principal_id, current)?;
        }
        let limit = self.policy.limits_for(principal.tier).message_limit();
        match self.store.consume_message(principal.principal_id, limit)? {
            ConsumeOutcome::Consumed {
                messages_used,
            } => Ok(Consumption::Consumed {
                messages_used,
                messages_remaining: limit.remaining(messages_used),
            }),
            ConsumeOutcome::LimitReached {
                messages_used,
            } => Ok(Consumption::LimitExceeded {
                messages_used,
            }),
            ConsumeOutcome::MissingPrincipal => Err(MeterError::UnknownPrincipal),
        }
    }

    /// Reports current usage without charging anything.
    ///
    /// The counter is always re-read from the store; the caller's
    /// `Principal` may be an arbitrarily old snapshot. The monthly-reset
    /// check still runs, so a status read crossing a period boundary
    /// observes a zeroed counter.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError`] when the period cannot be derived or the
    /// store fails.
    pub fn status(
        &self,
        principal: &Principal,
        now_unix: i64,
    ) -> Result<UsageSnapshot, MeterError> {
        let current = BillingPeriod::from_unix_seconds(now_unix)?;
        if principal.reset_due(current) {
            // Losing the race is fine: some other request already reset.
            let _ = self.store.reset_usage_if_stale(principal.principal_id, current)?;
        }
        let snapshot = self
            .store
            .find_by_id(principal.principal_id)?
            .ok_or(MeterError::UnknownPrincipal)?;
        let limit = self.policy.limits_for(snapshot.tier).message_limit();
        Ok(UsageSnapshot {
            messages_used: snapshot.messages_used,
            messages_limit: limit.as_raw(),
            messages_remaining: limit.remaining(snapshot.messages_used),
        })
    }
}
