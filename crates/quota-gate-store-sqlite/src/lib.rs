// crates/quota-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Quota Gate SQLite Store
// Description: Durable principal and rate-limit state backed by SQLite WAL.
// Purpose: Provide the shared-store backend for multi-instance deployments.
// Dependencies: quota-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Durable [`quota_gate_core::PrincipalStore`] and
//! [`quota_gate_core::RateLimitStore`] implementations backed by `SQLite`.
//! All quota-bearing mutations execute as single conditional statements or
//! immediate transactions, so the database remains the sole arbiter of
//! quota and rate-limit state across service instances.

pub mod store;

pub use store::SqlitePrincipalStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
