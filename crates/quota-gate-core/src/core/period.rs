// crates/quota-gate-core/src/core/period.rs
// ============================================================================
// Module: Billing Period
// Description: Calendar year-month markers gating monthly usage resets.
// Purpose: Provide a totally ordered period type with a stable text form.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Monthly quotas reset on calendar-month boundaries. A [`BillingPeriod`]
//! is a `(year, month)` pair whose canonical marker form is `YYYY-MM`;
//! zero-padding makes lexicographic order on markers coincide with
//! chronological order, so stores can express the monotonic-advance guard
//! as a single text comparison.
//!
//! The core never reads wall-clock time; hosts derive the current period
//! via [`BillingPeriod::from_unix_seconds`] with a timestamp they supply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Billing period derivation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// Supplied unix timestamp does not map to a calendar date.
    #[error("timestamp out of calendar range: {0}")]
    OutOfRange(i64),
}

// ============================================================================
// SECTION: Billing Period
// ============================================================================

/// Calendar year-month marker for monthly usage accounting.
///
/// # Invariants
/// - `month` is always in `1..=12`.
/// - Ordering is chronological and matches lexicographic order of
///   [`BillingPeriod::marker`] output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Calendar year.
    year: i32,
    /// Calendar month (1-based).
    month: u8,
}

impl BillingPeriod {
    /// Creates a billing period (returns `None` when the month is invalid).
    #[must_use]
    pub const fn new(year: i32, month: u8) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self {
                year,
                month,
            })
        } else {
            None
        }
    }

    /// Derives the billing period containing the given unix timestamp (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::OutOfRange`] when the timestamp does not map
    /// to a representable calendar date.
    pub fn from_unix_seconds(unix_seconds: i64) -> Result<Self, PeriodError> {
        let date = OffsetDateTime::from_unix_timestamp(unix_seconds)
            .map_err(|_| PeriodError::OutOfRange(unix_seconds))?;
        Ok(Self {
            year: date.year(),
            month: u8::from(date.month()),
        })
    }

    /// Returns the calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Returns the 1-based calendar month.
    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    /// Returns the canonical `YYYY-MM` marker for store persistence.
    #[must_use]
    pub fn marker(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Parses a canonical `YYYY-MM` marker.
    #[must_use]
    pub fn parse_marker(marker: &str) -> Option<Self> {
        let (year_text, month_text) = marker.split_once('-')?;
        if year_text.len() != 4 || month_text.len() != 2 {
            return None;
        }
        let year: i32 = year_text.parse().ok()?;
        let month: u8 = month_text.parse().ok()?;
        Self::new(year, month)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
