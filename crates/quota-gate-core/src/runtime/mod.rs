// crates/quota-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Runtime Components
// Description: The four entitlement components plus in-memory stores.
// Purpose: Group the request-path logic built on the store interfaces.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime components are stateless request-handler logic: each call
//! completes within one request/response cycle, holds no locks across
//! calls, and delegates every mutation to a single atomic store operation.
//! Hosts construct them once with shared store handles and invoke them per
//! request with an explicit `now` timestamp.

pub mod activator;
pub mod authenticator;
pub mod memory;
pub mod meter;
pub mod rate_limiter;
