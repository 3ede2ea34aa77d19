// crates/quota-gate-config/src/lib.rs
// ============================================================================
// Module: Quota Gate Config
// Description: Canonical configuration model and validation.
// Purpose: Load, override, and validate deployment configuration fail-closed.
// Dependencies: quota-gate-core, quota-gate-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Deployment configuration for the Quota Gate service: HTTP server
//! settings, the shared `SQLite` store, rate-limit policy, and the tier
//! entitlement table. Configuration is TOML on disk with a small set of
//! environment overrides; every load path ends in [`QuotaGateConfig::validate`],
//! which rejects anything the service could not run safely with.

pub mod config;

pub use config::ConfigError;
pub use config::QuotaGateConfig;
pub use config::RateLimitConfig;
pub use config::ServerConfig;
