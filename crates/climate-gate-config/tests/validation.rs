// climate-gate-config/tests/validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Section-by-section validation of climate-gate.toml.
// Purpose: Ensure invalid configurations fail closed with clear messages.
// Dependencies: climate-gate-config, climate-gate-core, toml
// ============================================================================

//! ## Overview
//! Validates defaults, transport binding rules, archive reachability settings,
//! budget ordering, handle defaults, catalog bounds, and plot hand-off.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use climate_gate_config::ArchiveBackend;
use climate_gate_config::PlotMode;
use climate_gate_config::ServerTransport;
use climate_gate_core::LongitudeConvention;

use crate::common::assert_invalid;
use crate::common::config_from_toml;
use crate::common::config_with;
use crate::common::minimal_config;

type TestResult = Result<(), String>;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn minimal_config_uses_documented_defaults() -> TestResult {
    let config = minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    assert_eq!(config.server.transport, ServerTransport::Stdio);
    assert!(config.server.audit.enabled);
    assert_eq!(config.archive.backend, ArchiveBackend::Http);
    assert_eq!(config.archive.longitude_convention, LongitudeConvention::Unsigned);
    assert_eq!(config.budget.safe_tokens, 70_000);
    assert_eq!(config.budget.max_tokens, 170_000);
    assert_eq!(config.budget.tokens_per_byte, 2.5 / 3.0);
    assert_eq!(config.defaults.scenario, "scenarioSSP5-85");
    assert_eq!(config.defaults.ensemble_member, "r15i1p1f1");
    assert_eq!(config.defaults.frequency, "Amon");
    assert_eq!(config.defaults.grid, "gr3");
    assert_eq!(config.defaults.version, "v20210201");
    assert_eq!(config.plots.mode, PlotMode::Disabled);
    Ok(())
}

#[test]
fn empty_config_requires_archive_location() -> TestResult {
    let config = config_from_toml("").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.base_url must be set")
}

#[test]
fn unknown_transport_fails_to_parse() {
    assert!(config_with("[server]\ntransport = \"sse\"\n").is_err());
}

// ============================================================================
// SECTION: Server
// ============================================================================

#[test]
fn http_transport_requires_bind() -> TestResult {
    let config = config_with("[server]\ntransport = \"http\"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "requires bind address")
}

#[test]
fn http_transport_rejects_non_loopback_bind() -> TestResult {
    let config = config_with("[server]\ntransport = \"http\"\nbind = \"0.0.0.0:8080\"\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "non-loopback bind")
}

#[test]
fn http_transport_accepts_loopback_bind() -> TestResult {
    let config = config_with("[server]\ntransport = \"http\"\nbind = \"127.0.0.1:8765\"\n")
        .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let addr = config.server.bind_addr().map_err(|err| err.to_string())?;
    assert_eq!(addr.port(), 8765);
    Ok(())
}

#[test]
fn zero_body_limit_rejected() -> TestResult {
    let config = config_with("[server]\nmax_body_bytes = 0\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "max_body_bytes")
}

#[test]
fn blank_audit_path_rejected() -> TestResult {
    let config =
        config_with("[server.audit]\npath = \"  \"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "server.audit.path must be non-empty")
}

// ============================================================================
// SECTION: Archive
// ============================================================================

#[test]
fn cleartext_archive_requires_opt_in() -> TestResult {
    let config = config_from_toml("[archive]\nbase_url = \"http://127.0.0.1:9000\"\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "without allow_http")?;
    let config = config_from_toml(
        "[archive]\nbase_url = \"http://127.0.0.1:9000\"\nallow_http = true\n",
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn archive_url_requires_scheme() -> TestResult {
    let config = config_from_toml("[archive]\nbase_url = \"archive.example.org\"\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "must include http:// or https://")
}

#[test]
fn fixture_backend_requires_path() -> TestResult {
    let config =
        config_from_toml("[archive]\nbackend = \"fixture\"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.fixture_path must be set")?;
    let config = config_from_toml(
        "[archive]\nbackend = \"fixture\"\nfixture_path = \"fixtures/archive.json\"\n",
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn signed_convention_parses() -> TestResult {
    let config = config_from_toml(
        "[archive]\nbase_url = \"https://a.example\"\nlongitude_convention = \"signed\"\n",
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.archive.longitude_convention, LongitudeConvention::Signed);
    Ok(())
}

#[test]
fn timeouts_are_bounded_and_ordered() -> TestResult {
    let config = config_with("connect_timeout_ms = 50\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.connect_timeout_ms must be between")?;
    let config = config_with("connect_timeout_ms = 5000\nrequest_timeout_ms = 1000\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "must not exceed request_timeout_ms")?;
    let config =
        config_with("request_timeout_ms = 600000\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.request_timeout_ms must be between")
}

#[test]
fn response_limit_and_backoff_bounded() -> TestResult {
    let config = config_with("max_response_bytes = 10\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.max_response_bytes")?;
    let config = config_with("retry_backoff_ms = 60000\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.retry_backoff_ms")
}

#[test]
fn blank_user_agent_rejected() -> TestResult {
    let config = config_with("user_agent = \" \"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "archive.user_agent")
}

// ============================================================================
// SECTION: Budget
// ============================================================================

#[test]
fn safe_above_max_rejected() -> TestResult {
    let config = config_with("[budget]\nsafe_tokens = 200000\nmax_tokens = 100000\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "budget: safe threshold")
}

#[test]
fn zero_safe_threshold_rejected() -> TestResult {
    let config = config_with("[budget]\nsafe_tokens = 0\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "must be positive")
}

#[test]
fn equal_thresholds_accepted() -> TestResult {
    let config = config_with("[budget]\nsafe_tokens = 5000\nmax_tokens = 5000\n")
        .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let thresholds = config.budget.thresholds().map_err(|err| err.to_string())?;
    assert_eq!(thresholds.safe_tokens(), 5000);
    assert_eq!(thresholds.max_tokens(), 5000);
    Ok(())
}

#[test]
fn non_positive_token_factor_rejected() -> TestResult {
    let config =
        config_with("[budget]\ntokens_per_byte = 0.0\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "budget.tokens_per_byte")?;
    let config =
        config_with("[budget]\ntokens_per_byte = -1.5\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "budget.tokens_per_byte")
}

#[test]
fn overhead_must_fit_below_hard_limit() -> TestResult {
    let config = config_with("[budget]\nmetadata_overhead_tokens = 170000\n")
        .map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "metadata_overhead_tokens")
}

#[test]
fn dtype_widths_are_bounded() -> TestResult {
    let config =
        config_with("[budget.dtype_bytes]\nfloat32 = 0\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "budget.dtype_bytes.float32 must be between 1 and 16")?;
    let config =
        config_with("[budget.dtype_bytes]\ncomplex256 = 32\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "budget.dtype_bytes.complex256")
}

#[test]
fn dtype_overrides_merge_over_builtin_table() -> TestResult {
    let config = config_with("[budget]\ntokens_per_byte = 1.0\n[budget.dtype_bytes]\nFloat32 = 8\n")
        .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let settings = config.budget.estimator_settings();
    assert_eq!(settings.tokens_per_byte, 1.0);
    assert_eq!(settings.dtype_bytes.get("float32"), Some(&8));
    assert_eq!(settings.dtype_bytes.get("int16"), Some(&2));
    assert_eq!(settings.dtype_bytes.get("char"), Some(&1));
    Ok(())
}

// ============================================================================
// SECTION: Defaults, Catalog, Plots
// ============================================================================

#[test]
fn handle_defaults_must_be_single_segments() -> TestResult {
    let config = config_with("[defaults]\ngrid = \"gr3/extra\"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "defaults.grid must be a single path segment")?;
    let config = config_with("[defaults]\nversion = \"..\"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "defaults.version")
}

#[test]
fn catalog_bounds_enforced() -> TestResult {
    let config = config_with("[catalog]\nmax_entries = 0\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "catalog.max_entries")?;
    let config = config_with("[catalog]\nsearch_limit = 5000\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "catalog.search_limit")
}

#[test]
fn directory_plots_require_directory() -> TestResult {
    let config = config_with("[plots]\nmode = \"directory\"\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "plots.directory must be set")?;
    let config = config_with("[plots]\nmode = \"directory\"\ndirectory = \"plots\"\n")
        .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn plot_point_limit_bounded() -> TestResult {
    let config = config_with("[plots]\nmax_points = 0\n").map_err(|err| err.to_string())?;
    assert_invalid(config.validate(), "plots.max_points")
}
