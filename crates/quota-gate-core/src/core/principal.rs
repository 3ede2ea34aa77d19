// crates/quota-gate-core/src/core/principal.rs
// ============================================================================
// Module: Principal Model
// Description: Principal records and subscription lifecycle status.
// Purpose: Provide the canonical account snapshot consumed by all components.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Principal`] is the store snapshot of one account: identity, tier,
//! subscription status, and monthly usage counters. Snapshots are read
//! views; every mutation goes through an atomic conditional store
//! operation, never through writes of whole snapshots.
//!
//! Lifecycle: principals are created at signup with `tier = free`
//! (status `active`) or a paid tier awaiting provider confirmation
//! (status `pending`). Usage counters are mutated only by the usage meter;
//! tier, status, and the external subscription id are mutated only by the
//! subscription activator or the out-of-scope downgrade path. Principals
//! are never hard-deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExternalSubscriptionId;
use crate::core::identifiers::PrincipalId;
use crate::core::period::BillingPeriod;
use crate::core::tier::Tier;

// ============================================================================
// SECTION: Subscription Status
// ============================================================================

/// Subscription lifecycle status.
///
/// # Invariants
/// - Labels are stable wire and store forms.
/// - `Pending` is only valid for paid tiers awaiting provider confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Awaiting payment-provider confirmation (paid tiers only).
    Pending,
    /// Entitlements are live.
    Active,
    /// Cancelled by the out-of-scope downgrade path.
    Cancelled,
    /// Expired by the out-of-scope downgrade path.
    Expired,
}

impl SubscriptionStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Parses a stable status label (returns `None` for unknown labels).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Store snapshot of one enrolled account.
///
/// # Invariants
/// - `messages_used` never exceeds the tier limit at the instant a read is
///   served, except transiently inside a rejected conditional increment.
/// - `messages_reset_period` only advances; it is never set backwards.
/// - Raw tokens never appear here; only the store-side digest exists, and
///   the snapshot deliberately omits even that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier.
    pub principal_id: PrincipalId,
    /// Unique account email.
    pub email: String,
    /// Current entitlement tier.
    pub tier: Tier,
    /// Subscription lifecycle status.
    pub subscription_status: SubscriptionStatus,
    /// Messages consumed in the current billing period.
    pub messages_used: u64,
    /// Billing period the usage counter belongs to.
    pub messages_reset_period: BillingPeriod,
    /// Subscription identifier at the external payment provider, when one
    /// has been activated.
    pub external_subscription_id: Option<ExternalSubscriptionId>,
}

impl Principal {
    /// Returns true when the stored period is older than `current` and the
    /// usage counter is due for a monthly reset.
    #[must_use]
    pub fn reset_due(&self, current: BillingPeriod) -> bool {
        self.messages_reset_period < current
    }
}
