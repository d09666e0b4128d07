// climate-gate-config/tests/load.rs
// ============================================================================
// Module: Config Load Tests
// Description: File loading, size, encoding, and parse error handling.
// Purpose: Ensure config files are read fail-closed before validation.
// Dependencies: climate-gate-config, tempfile
// ============================================================================

//! ## Overview
//! Loads configs from temporary files to exercise the I/O, size limit,
//! UTF-8, and parse error paths of `ClimateGateConfig::load`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::fs;

use climate_gate_config::ClimateGateConfig;
use climate_gate_config::ConfigError;

use crate::common::ARCHIVE_SECTION;

#[test]
fn load_reads_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("climate-gate.toml");
    fs::write(&path, format!("{ARCHIVE_SECTION}[budget]\nsafe_tokens = 1000\n")).unwrap();
    let config = ClimateGateConfig::load(Some(&path)).unwrap();
    assert_eq!(config.budget.safe_tokens, 1000);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = ClimateGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)), "unexpected error: {err}");
}

#[test]
fn oversized_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.toml");
    let padding = "# padding\n".repeat(120_000);
    fs::write(&path, format!("{ARCHIVE_SECTION}{padding}")).unwrap();
    let err = ClimateGateConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("exceeds size limit"));
}

#[test]
fn non_utf8_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).unwrap();
    let err = ClimateGateConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("utf-8"));
}

#[test]
fn malformed_toml_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[archive\nbase_url = 1").unwrap();
    let err = ClimateGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "unexpected error: {err}");
}

#[test]
fn load_runs_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.toml");
    fs::write(&path, format!("{ARCHIVE_SECTION}[budget]\nsafe_tokens = 0\n")).unwrap();
    let err = ClimateGateConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "unexpected error: {err}");
}
