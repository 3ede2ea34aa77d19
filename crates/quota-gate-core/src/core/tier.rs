// crates/quota-gate-core/src/core/tier.rs
// ============================================================================
// Module: Tier Policy
// Description: Named entitlement bundles and the tier-to-limits lookup.
// Purpose: Provide a pure, total mapping from tier to entitlement limits.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Tier`] names an entitlement bundle; an [`Entitlement`] is the
//! resolved set of limits and feature flags for that tier. [`TierPolicy`]
//! is a pure lookup with no I/O: unknown or unset tiers fall back to the
//! free entitlement, and `-1` is the unlimited sentinel for countable
//! fields. The table itself is deployment configuration, not computed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel value marking a countable entitlement field as unlimited.
pub const UNLIMITED_SENTINEL: i64 = -1;

// ============================================================================
// SECTION: Tier
// ============================================================================

/// Named entitlement bundle governing feature and quota limits.
///
/// # Invariants
/// - Labels are stable wire and store forms (`free`, `starter`, `pro`).
/// - `Free` is the default and the fallback for unknown labels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Free tier (always active, never pending).
    #[default]
    Free,
    /// Paid starter tier.
    Starter,
    /// Paid pro tier.
    Pro,
}

impl Tier {
    /// Returns the stable label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
        }
    }

    /// Parses a stable tier label (returns `None` for unknown labels).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "free" => Some(Self::Free),
            "starter" => Some(Self::Starter),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }

    /// Returns true for tiers that require payment-provider activation.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        match self {
            Self::Free => false,
            Self::Starter | Self::Pro => true,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Message Limit
// ============================================================================

/// Resolved monthly message limit for quota enforcement.
///
/// # Invariants
/// - `Limited(n)` means strictly fewer than `n` consumed messages permit a
///   further consume; `Unlimited` always permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLimit {
    /// Hard monthly ceiling.
    Limited(u64),
    /// Unlimited sentinel; consumes always succeed but still count.
    Unlimited,
}

impl MessageLimit {
    /// Resolves a raw configured value, treating negatives as unlimited.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Self::Unlimited
        } else {
            Self::Limited(raw.unsigned_abs())
        }
    }

    /// Returns the raw wire value (`-1` for unlimited).
    #[must_use]
    pub const fn as_raw(self) -> i64 {
        match self {
            Self::Limited(value) => {
                // Configured limits fit in i64 by construction (from_raw).
                #[allow(
                    clippy::cast_possible_wrap,
                    reason = "Limited values originate from non-negative i64 config."
                )]
                {
                    value as i64
                }
            }
            Self::Unlimited => UNLIMITED_SENTINEL,
        }
    }

    /// Returns the remaining allowance for a given used count.
    ///
    /// Unlimited tiers report the sentinel `-1`; limited tiers clamp at 0.
    #[must_use]
    pub const fn remaining(self, used: u64) -> i64 {
        match self {
            Self::Limited(limit) => {
                let left = limit.saturating_sub(used);
                #[allow(
                    clippy::cast_possible_wrap,
                    reason = "Remaining allowance never exceeds the configured i64 limit."
                )]
                {
                    left as i64
                }
            }
            Self::Unlimited => UNLIMITED_SENTINEL,
        }
    }
}

// ============================================================================
// SECTION: Entitlement
// ============================================================================

/// Resolved set of limits and feature flags for a tier.
///
/// # Invariants
/// - Countable fields use `-1` as the unlimited sentinel and are otherwise
///   non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Maximum number of bots.
    pub bots: i64,
    /// Monthly message allowance.
    pub messages_per_month: i64,
    /// Maximum number of FAQ entries.
    pub faqs: i64,
    /// Whether bot avatars are available.
    pub avatars: bool,
    /// Whether lead capture is available.
    pub lead_capture: bool,
    /// Whether conversation export is available.
    pub export: bool,
    /// Whether custom system prompts are available.
    pub custom_prompt: bool,
    /// Whether bring-your-own-key is available.
    pub own_api_key: bool,
}

impl Entitlement {
    /// Returns the resolved monthly message limit.
    #[must_use]
    pub const fn message_limit(&self) -> MessageLimit {
        MessageLimit::from_raw(self.messages_per_month)
    }
}

// ============================================================================
// SECTION: Tier Policy
// ============================================================================

/// Pure tier-to-entitlement lookup table.
///
/// # Invariants
/// - Total over [`Tier`]; lookups never fail and have no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Free tier entitlement.
    pub free: Entitlement,
    /// Starter tier entitlement.
    pub starter: Entitlement,
    /// Pro tier entitlement.
    pub pro: Entitlement,
}

impl TierPolicy {
    /// Returns the entitlement for the given tier.
    #[must_use]
    pub const fn limits_for(&self, tier: Tier) -> &Entitlement {
        match tier {
            Tier::Free => &self.free,
            Tier::Starter => &self.starter,
            Tier::Pro => &self.pro,
        }
    }

    /// Returns the entitlement for a raw tier label, falling back to free
    /// for unknown or unset labels.
    #[must_use]
    pub fn limits_for_label(&self, label: Option<&str>) -> &Entitlement {
        label
            .and_then(Tier::from_label)
            .map_or(&self.free, |tier| self.limits_for(tier))
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            free: Entitlement {
                bots: 1,
                messages_per_month: 300,
                faqs: 10,
                avatars: false,
                lead_capture: false,
                export: true,
                custom_prompt: false,
                own_api_key: false,
            },
            starter: Entitlement {
                bots: 3,
                messages_per_month: 1_000,
                faqs: 50,
                avatars: true,
                lead_capture: true,
                export: true,
                custom_prompt: true,
                own_api_key: false,
            },
            pro: Entitlement {
                bots: UNLIMITED_SENTINEL,
                messages_per_month: 10_000,
                faqs: UNLIMITED_SENTINEL,
                avatars: true,
                lead_capture: true,
                export: true,
                custom_prompt: true,
                own_api_key: true,
            },
        }
    }
}
