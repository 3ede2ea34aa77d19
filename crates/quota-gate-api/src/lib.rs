// crates/quota-gate-api/src/lib.rs
// ============================================================================
// Module: Quota Gate API
// Description: HTTP surface for entitlement checks and usage metering.
// Purpose: Expose status, consume, and activation endpoints over axum.
// Dependencies: axum, quota-gate-config, quota-gate-core, quota-gate-store-sqlite
// ============================================================================

//! ## Overview
//! The HTTP surface of Quota Gate. Every request is authenticated with an
//! opaque bearer token, rate limited against the shared store, and then
//! dispatched to the core runtime components. Responses follow the
//! `success` envelope convention: quota exhaustion is a well-formed `200`
//! with `success: false`, while authentication and rate-limit rejections
//! use `401` and `429` respectively.
//!
//! Observability is trait-seamed: deployments plug metrics and audit
//! sinks in through [`telemetry::ApiMetrics`] and [`audit::ApiAuditSink`]
//! without this crate depending on any exporter.

pub mod audit;
pub mod server;
pub mod sessions;
pub mod telemetry;

pub use server::ApiError;
pub use server::AppState;
pub use server::router;
pub use server::serve;
