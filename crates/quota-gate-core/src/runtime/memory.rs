// crates/quota-gate-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Stores
// Description: Mutex-guarded in-process PrincipalStore and RateLimitStore.
// Purpose: Provide reference store semantics for tests and single-instance use.
// Dependencies: crate::core, crate::interfaces, subtle
// ============================================================================

//! ## Overview
//! In-memory implementations of the store interfaces with the same atomic
//! conditional semantics as the durable backends: each operation holds the
//! map lock for its full read-check-write sequence, so the concurrency
//! contract (exactly-once counting, at-most-one reset per transition,
//! idempotent activation) holds under multi-threaded contention. Digest
//! lookups use constant-time comparison.
//!
//! These stores share nothing across processes and are therefore only
//! suitable for tests and single-instance deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use crate::core::identifiers::ExternalSubscriptionId;
use crate::core::identifiers::PrincipalId;
use crate::core::period::BillingPeriod;
use crate::core::principal::Principal;
use crate::core::principal::SubscriptionStatus;
use crate::core::tier::MessageLimit;
use crate::core::tier::Tier;
use crate::core::token::TokenDigest;
use crate::interfaces::ActivationOutcome;
use crate::interfaces::ConsumeOutcome;
use crate::interfaces::NewPrincipal;
use crate::interfaces::PrincipalStore;
use crate::interfaces::RateLimitStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Internal mutable principal record.
#[derive(Debug, Clone)]
struct PrincipalRecord {
    /// Unique account email.
    email: String,
    /// Stored token digest, when a token is live.
    token_digest: Option<TokenDigest>,
    /// Current tier.
    tier: Tier,
    /// Subscription status.
    subscription_status: SubscriptionStatus,
    /// Messages consumed in the current period.
    messages_used: u64,
    /// Period the counter belongs to.
    messages_reset_period: BillingPeriod,
    /// External subscription id, when activated.
    external_subscription_id: Option<ExternalSubscriptionId>,
}

impl PrincipalRecord {
    /// Builds the read snapshot for this record.
    fn snapshot(&self, id: PrincipalId) -> Principal {
        Principal {
            principal_id: id,
            email: self.email.clone(),
            tier: self.tier,
            subscription_status: self.subscription_status,
            messages_used: self.messages_used,
            messages_reset_period: self.messages_reset_period,
            external_subscription_id: self.external_subscription_id.clone(),
        }
    }
}

// ============================================================================
// SECTION: In-Memory Principal Store
// ============================================================================

/// Mutex-guarded in-process principal store.
///
/// # Invariants
/// - The map lock spans every conditional mutation, matching the atomicity
///   the durable store provides per statement.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    /// Principal records keyed by identifier.
    records: Mutex<BTreeMap<PrincipalId, PrincipalRecord>>,
    /// Next identifier to assign (1-based).
    next_id: Mutex<u64>,
}

impl InMemoryPrincipalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record map, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<PrincipalId, PrincipalRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrincipalStore for InMemoryPrincipalStore {
    fn create(&self, signup: &NewPrincipal, digest: &TokenDigest) -> Result<Principal, StoreError> {
        let mut records = self.lock();
        if records.values().any(|record| record.email == signup.email) {
            return Err(StoreError::Invalid(format!("duplicate email: {}", signup.email)));
        }
        let raw_id = {
            let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        let id = PrincipalId::from_raw(raw_id)
            .ok_or_else(|| StoreError::Invalid("identifier overflow".to_string()))?;
        let status = if signup.tier.is_paid() {
            SubscriptionStatus::Pending
        } else {
            SubscriptionStatus::Active
        };
        let record = PrincipalRecord {
            email: signup.email.clone(),
            token_digest: Some(digest.clone()),
            tier: signup.tier,
            subscription_status: status,
            messages_used: 0,
            messages_reset_period: signup.period,
            external_subscription_id: None,
        };
        let snapshot = record.snapshot(id);
        records.insert(id, record);
        Ok(snapshot)
    }

    fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        Ok(self.lock().get(&id).map(|record| record.snapshot(id)))
    }

    fn find_by_token_digest(
        &self,
        digest: &TokenDigest,
    ) -> Result<Option<Principal>, StoreError> {
        let records = self.lock();
        for (id, record) in records.iter() {
            // TokenDigest equality is constant-time.
            if record.token_digest.as_ref() == Some(digest) {
                return Ok(Some(record.snapshot(*id)));
            }
        }
        Ok(None)
    }

    fn replace_token_digest(
        &self,
        id: PrincipalId,
        digest: &TokenDigest,
    ) -> Result<bool, StoreError> {
        let mut records = self.lock();
        match records.get_mut(&id) {
            Some(record) => {
                record.token_digest = Some(digest.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn reset_usage_if_stale(
        &self,
        id: PrincipalId,
        current: BillingPeriod,
    ) -> Result<bool, StoreError> {
        let mut records = self.lock();
        match records.get_mut(&id) {
            Some(record) if record.messages_reset_period < current => {
                record.messages_used = 0;
                record.messages_reset_period = current;
                Ok(true)
            }
            Some(_) | None => Ok(false),
        }
    }

    fn consume_message(
        &self,
        id: PrincipalId,
        limit: MessageLimit,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&id) else {
            return Ok(ConsumeOutcome::MissingPrincipal);
        };
        let permitted = match limit {
            MessageLimit::Limited(ceiling) => record.messages_used < ceiling,
            MessageLimit::Unlimited => true,
        };
        if permitted {
            record.messages_used += 1;
            Ok(ConsumeOutcome::Consumed {
                messages_used: record.messages_used,
            })
        } else {
            Ok(ConsumeOutcome::LimitReached {
                messages_used: record.messages_used,
            })
        }
    }

    fn activate_subscription(
        &self,
        id: PrincipalId,
        plan: Tier,
        external_id: &ExternalSubscriptionId,
        period: BillingPeriod,
    ) -> Result<ActivationOutcome, StoreError> {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&id) else {
            return Ok(ActivationOutcome::MissingPrincipal);
        };
        let already_applied = record.tier == plan
            && record.subscription_status == SubscriptionStatus::Active
            && record.external_subscription_id.as_ref() == Some(external_id);
        if already_applied {
            return Ok(ActivationOutcome::AlreadyActive);
        }
        record.tier = plan;
        record.subscription_status = SubscriptionStatus::Active;
        record.external_subscription_id = Some(external_id.clone());
        record.messages_used = 0;
        record.messages_reset_period = period;
        Ok(ActivationOutcome::Activated)
    }
}

// ============================================================================
// SECTION: In-Memory Rate Limit Store
// ============================================================================

/// Mutex-guarded in-process sliding-window counter store.
///
/// # Invariants
/// - Prune, count, and record happen under one lock acquisition, matching
///   the atomicity contract of [`RateLimitStore::record_request`].
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    /// Request timestamps keyed by principal.
    events: Mutex<BTreeMap<PrincipalId, Vec<i64>>>,
}

impl InMemoryRateLimitStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn record_request(
        &self,
        id: PrincipalId,
        now_unix: i64,
        max_requests: u32,
        window_seconds: u32,
    ) -> Result<bool, StoreError> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamps = events.entry(id).or_default();
        let horizon = now_unix.saturating_sub(i64::from(window_seconds));
        timestamps.retain(|stamp| *stamp > horizon);
        if timestamps.len() >= max_requests as usize {
            return Ok(false);
        }
        timestamps.push(now_unix);
        Ok(true)
    }
}
