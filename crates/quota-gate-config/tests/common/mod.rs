// crates/quota-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Provide a minimal valid configuration as a mutation baseline.
// =============================================================================

//! Shared config test helpers.

use quota_gate_config::ConfigError;
use quota_gate_config::QuotaGateConfig;

/// Returns a minimal valid configuration for mutation-based tests.
pub fn minimal_config() -> Result<QuotaGateConfig, ConfigError> {
    QuotaGateConfig::from_toml_str(
        r#"
        [store]
        path = "/tmp/quota-gate-test.db3"
        "#,
    )
}
