// crates/quota-gate-config/src/config.rs
// ============================================================================
// Module: Configuration Model
// Description: TOML-backed configuration with fail-closed validation.
// Purpose: Define the deployment configuration surface for Quota Gate.
// Dependencies: quota-gate-core, quota-gate-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! The configuration model mirrors the service's moving parts: `[server]`
//! for the HTTP surface and CORS allow-list, `[store]` for the shared
//! `SQLite` database, `[rate_limit]` for the sliding window, and `[tiers]`
//! for the entitlement table. Only the store path is mandatory; everything
//! else has hardened defaults.
//!
//! Environment overrides exist for the settings that differ per host
//! (`QUOTA_GATE_BIND`, `QUOTA_GATE_STORE_PATH`, `QUOTA_GATE_ALLOWED_ORIGINS`);
//! overrides are applied before validation so a bad override fails the
//! load rather than the first request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use quota_gate_core::RateLimitPolicy;
use quota_gate_core::TierPolicy;
use quota_gate_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config path when none is supplied.
const DEFAULT_CONFIG_PATH: &str = "quota-gate.toml";
/// Maximum accepted config file size in bytes.
const MAX_CONFIG_BYTES: u64 = 1_048_576;
/// Maximum length of a single config path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total config path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file could not be parsed as TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config content failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// HTTP server configuration.
///
/// # Invariants
/// - `allowed_origins` is an explicit allow-list; wildcards are rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Browser origins allowed by the CORS layer.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Returns the default bind address (loopback only).
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Returns the default maximum request body size.
const fn default_max_body_bytes() -> usize {
    64 * 1024
}

// ============================================================================
// SECTION: Rate Limit Config
// ============================================================================

/// Sliding-window rate limit configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per principal per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Trailing window length in seconds.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u32,
}

impl RateLimitConfig {
    /// Converts the config into the runtime policy.
    #[must_use]
    pub const fn policy(self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests: self.max_requests,
            window_seconds: self.window_seconds,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
        }
    }
}

/// Returns the default per-window request cap.
const fn default_max_requests() -> u32 {
    60
}

/// Returns the default window length in seconds.
const fn default_window_seconds() -> u32 {
    60
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Canonical Quota Gate deployment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaGateConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Shared `SQLite` store settings.
    pub store: SqliteStoreConfig,
    /// Sliding-window rate limit settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Tier entitlement table.
    #[serde(default)]
    pub tiers: TierPolicy,
}

impl QuotaGateConfig {
    /// Loads configuration from the given path (or the default path).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on unreadable, oversized, non-UTF-8, or
    /// invalid config files.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        validate_config_path(path)?;
        let metadata = std::fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides through the supplied lookup.
    ///
    /// The lookup indirection keeps override behavior testable without
    /// mutating process environment. Callers re-validate after overrides;
    /// [`QuotaGateConfig::load_with_env`] does both.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("QUOTA_GATE_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = lookup("QUOTA_GATE_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(origins) = lookup("QUOTA_GATE_ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect();
        }
    }

    /// Loads configuration, applies process-environment overrides, and
    /// re-validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing, or validation fails.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Validates the full configuration, failing closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid("server.bind must be a socket address".to_string()))?;
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        for origin in &self.server.allowed_origins {
            validate_origin(origin)?;
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_seconds must be greater than zero".to_string(),
            ));
        }
        if self.store.read_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "store.read_pool_size must be greater than zero".to_string(),
            ));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must be non-empty".to_string()));
        }
        validate_tiers(&self.tiers)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates a single CORS origin entry.
fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    if origin.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "server.allowed_origins entries must be non-empty".to_string(),
        ));
    }
    if origin.contains('*') {
        return Err(ConfigError::Invalid(
            "server.allowed_origins must not contain wildcards".to_string(),
        ));
    }
    if !origin.starts_with("http://") && !origin.starts_with("https://") {
        return Err(ConfigError::Invalid(
            "server.allowed_origins entries must be absolute http(s) origins".to_string(),
        ));
    }
    if origin.ends_with('/') {
        return Err(ConfigError::Invalid(
            "server.allowed_origins entries must not carry a trailing slash".to_string(),
        ));
    }
    Ok(())
}

/// Validates the tier entitlement table.
fn validate_tiers(tiers: &TierPolicy) -> Result<(), ConfigError> {
    for entitlement in [&tiers.free, &tiers.starter, &tiers.pro] {
        for value in [entitlement.bots, entitlement.messages_per_month, entitlement.faqs] {
            if value < -1 {
                return Err(ConfigError::Invalid(
                    "tiers limit fields must be -1 (unlimited) or non-negative".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Validates config paths for safety limits.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
