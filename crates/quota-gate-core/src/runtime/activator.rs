// crates/quota-gate-core/src/runtime/activator.rs
// ============================================================================
// Module: Subscription Activator
// Description: Idempotent application of externally-reported tier activations.
// Purpose: Apply payment-provider activation events exactly once in effect.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The checkout flow reports verified activation events whose timing and
//! delivery count this core does not control: the upstream provider
//! integration delivers at least once. The activator therefore applies
//! events idempotently, keyed by the event's natural identity (external
//! subscription id plus target tier): the first application sets the tier,
//! marks the subscription active, and zeroes the usage counter; a replay
//! against a principal already in that exact state is a no-op that still
//! reports success and never re-zeroes usage accumulated since.
//!
//! This path is reached via an authenticated session, not the bearer-token
//! path; it is a distinct trust boundary from [`crate::TokenAuthenticator`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::ExternalSubscriptionId;
use crate::core::identifiers::PrincipalId;
use crate::core::period::BillingPeriod;
use crate::core::period::PeriodError;
use crate::core::tier::Tier;
use crate::interfaces::ActivationOutcome;
use crate::interfaces::SharedPrincipalStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Subscription activation errors.
///
/// # Invariants
/// - `InvalidPlan` is raised before any store access; rejection never
///   mutates state.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The requested plan is not an activatable paid tier.
    #[error("invalid plan: {0}")]
    InvalidPlan(Tier),
    /// No principal exists for the identifier.
    #[error("unknown principal")]
    UnknownPrincipal,
    /// Supplied timestamp does not map to a billing period.
    #[error(transparent)]
    Period(#[from] PeriodError),
    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Successful activation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// This call applied the state transition.
    Activated,
    /// The principal already carried this exact activation; no-op replay.
    AlreadyActive,
}

// ============================================================================
// SECTION: Subscription Activator
// ============================================================================

/// Idempotent subscription activation component.
///
/// # Invariants
/// - Free-tier activation requests are rejected without mutation.
/// - Replays of an applied event are no-ops reported as success.
pub struct SubscriptionActivator {
    /// Shared principal store.
    store: SharedPrincipalStore,
}

impl SubscriptionActivator {
    /// Creates an activator over the shared store.
    #[must_use]
    pub fn new(store: SharedPrincipalStore) -> Self {
        Self {
            store,
        }
    }

    /// Applies a verified activation event for the principal.
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::InvalidPlan`] for non-paid plans (no
    /// store access is made), [`ActivationError::UnknownPrincipal`] when
    /// the principal does not exist, and [`ActivationError::Store`] when
    /// persistence fails.
    pub fn activate(
        &self,
        id: PrincipalId,
        plan: Tier,
        external_id: &ExternalSubscriptionId,
        now_unix: i64,
    ) -> Result<Activation, ActivationError> {
        if !plan.is_paid() {
            return Err(ActivationError::InvalidPlan(plan));
        }
        let period = BillingPeriod::from_unix_seconds(now_unix)?;
        match self.store.activate_subscription(id, plan, external_id, period)? {
            ActivationOutcome::Activated => Ok(Activation::Activated),
            ActivationOutcome::AlreadyActive => Ok(Activation::AlreadyActive),
            ActivationOutcome::MissingPrincipal => Err(ActivationError::UnknownPrincipal),
        }
    }
}
