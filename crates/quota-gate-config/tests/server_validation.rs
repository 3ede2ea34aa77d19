//! Server config validation tests for quota-gate-config.
// crates/quota-gate-config/tests/server_validation.rs
// =============================================================================
// Module: Server Config Validation Tests
// Description: Validate bind, CORS origin, rate-limit, and tier constraints.
// Purpose: Ensure server-facing settings fail closed and enforce limits.
// =============================================================================

use quota_gate_config::ConfigError;

mod common;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn bind_must_be_a_socket_address() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.bind = "not-an-address".to_string();
    assert_invalid(config.validate(), "server.bind must be a socket address")?;
    Ok(())
}

#[test]
fn origins_reject_wildcards() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.allowed_origins = vec!["*".to_string()];
    assert_invalid(config.validate(), "must not contain wildcards")?;
    Ok(())
}

#[test]
fn origins_reject_relative_entries() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.allowed_origins = vec!["example.test".to_string()];
    assert_invalid(config.validate(), "absolute http(s) origins")?;
    Ok(())
}

#[test]
fn origins_reject_trailing_slash() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.allowed_origins = vec!["https://app.example.test/".to_string()];
    assert_invalid(config.validate(), "trailing slash")?;
    Ok(())
}

#[test]
fn origins_accept_absolute_entries() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.allowed_origins =
        vec!["https://app.example.test".to_string(), "http://localhost:5173".to_string()];
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn rate_limit_rejects_zero_requests() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rate_limit.max_requests = 0;
    assert_invalid(config.validate(), "rate_limit.max_requests must be greater than zero")?;
    Ok(())
}

#[test]
fn rate_limit_rejects_zero_window() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.rate_limit.window_seconds = 0;
    assert_invalid(config.validate(), "rate_limit.window_seconds must be greater than zero")?;
    Ok(())
}

#[test]
fn max_body_bytes_rejects_zero() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "server.max_body_bytes must be greater than zero")?;
    Ok(())
}

#[test]
fn tier_limits_reject_values_below_sentinel() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.tiers.starter.messages_per_month = -2;
    assert_invalid(config.validate(), "tiers limit fields")?;
    Ok(())
}

#[test]
fn env_overrides_apply_before_validation() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.apply_overrides(|key| match key {
        "QUOTA_GATE_BIND" => Some("0.0.0.0:9090".to_string()),
        "QUOTA_GATE_STORE_PATH" => Some("/var/lib/quota-gate/quota.db3".to_string()),
        "QUOTA_GATE_ALLOWED_ORIGINS" => {
            Some("https://app.example.test, https://admin.example.test".to_string())
        }
        _ => None,
    });
    config.validate().map_err(|err| err.to_string())?;
    if config.server.bind != "0.0.0.0:9090" {
        return Err("bind override not applied".to_string());
    }
    if config.server.allowed_origins.len() != 2 {
        return Err("origin override not applied".to_string());
    }
    if config.store.path.to_string_lossy() != "/var/lib/quota-gate/quota.db3" {
        return Err("store path override not applied".to_string());
    }
    Ok(())
}
