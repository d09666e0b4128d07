// climate-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for climate-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use climate_gate_config::ClimateGateConfig;
use climate_gate_config::ConfigError;

/// Archive section accepted by validation.
pub const ARCHIVE_SECTION: &str = "[archive]\nbase_url = \"https://archive.example.org/cmip6\"\n";

/// Parses a TOML string into a `ClimateGateConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<ClimateGateConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config that passes validation.
pub fn minimal_config() -> Result<ClimateGateConfig, toml::de::Error> {
    config_from_toml(ARCHIVE_SECTION)
}

/// Parses `extra` appended to the minimal archive section.
pub fn config_with(extra: &str) -> Result<ClimateGateConfig, toml::de::Error> {
    config_from_toml(&format!("{ARCHIVE_SECTION}{extra}"))
}

/// Asserts that validation failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Ok(()) => Err(format!("expected invalid config containing '{needle}'")),
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
    }
}
