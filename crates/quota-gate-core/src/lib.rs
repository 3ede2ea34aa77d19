// crates/quota-gate-core/src/lib.rs
// ============================================================================
// Module: Quota Gate Core
// Description: Domain model and runtime components for entitlement metering.
// Purpose: Provide store-agnostic authentication, rate limiting, quota
//          metering, and subscription activation logic.
// Dependencies: serde, sha2, subtle, rand, thiserror, time
// ============================================================================

//! ## Overview
//! Quota Gate core defines the entitlement domain model (principals, tiers,
//! billing periods, tokens) and the four runtime components that operate on
//! it: [`TokenAuthenticator`], [`RateLimiter`], [`UsageMeter`], and
//! [`SubscriptionActivator`]. All shared state lives behind the
//! [`PrincipalStore`] and [`RateLimitStore`] interfaces; every quota or
//! rate mutation is expressed as a single atomic conditional store
//! operation so any number of stateless service instances may run
//! concurrently.
//!
//! The core never reads wall-clock time; hosts supply explicit unix
//! timestamps so behavior stays deterministic and testable.

pub mod core;
pub mod interfaces;
pub mod runtime;

pub use core::identifiers::ExternalSubscriptionId;
pub use core::identifiers::PrincipalId;
pub use core::period::BillingPeriod;
pub use core::period::PeriodError;
pub use core::principal::Principal;
pub use core::principal::SubscriptionStatus;
pub use core::tier::Entitlement;
pub use core::tier::MessageLimit;
pub use core::tier::Tier;
pub use core::tier::TierPolicy;
pub use core::token::RawToken;
pub use core::token::TokenDigest;
pub use core::token::generate_raw_token;
pub use interfaces::ActivationOutcome;
pub use interfaces::ConsumeOutcome;
pub use interfaces::NewPrincipal;
pub use interfaces::PrincipalStore;
pub use interfaces::RateLimitStore;
pub use interfaces::SharedPrincipalStore;
pub use interfaces::SharedRateLimitStore;
pub use interfaces::StoreError;
pub use runtime::activator::Activation;
pub use runtime::activator::ActivationError;
pub use runtime::activator::SubscriptionActivator;
pub use runtime::authenticator::AuthError;
pub use runtime::authenticator::TokenAuthenticator;
pub use runtime::memory::InMemoryPrincipalStore;
pub use runtime::memory::InMemoryRateLimitStore;
pub use runtime::meter::Consumption;
pub use runtime::meter::MeterError;
pub use runtime::meter::UsageMeter;
pub use runtime::meter::UsageSnapshot;
pub use runtime::rate_limiter::RateDecision;
pub use runtime::rate_limiter::RateLimitPolicy;
pub use runtime::rate_limiter::RateLimiter;
