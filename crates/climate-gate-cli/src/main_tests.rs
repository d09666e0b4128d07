// crates/climate-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument reading and offline estimation.
// Purpose: Ensure bounded reads fail closed and estimates reach the gate.
// Dependencies: climate-gate-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Exercises `read_bytes_with_limit`, `read_query_args`, and
//! `estimate_report` against a header-only fixture archive.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use climate_gate_config::ClimateGateConfig;
use climate_gate_core::AdmissionDecision;
use climate_gate_core::Verdict;
use climate_gate_mcp::McpServer;
use serde_json::json;

use super::MAX_ARGS_BYTES;
use super::ReadLimitError;
use super::estimate_report;
use super::read_bytes_with_limit;
use super::read_query_args;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a header-only fixture (ten years, 2 degree grid) and a config for it.
fn fixture_config(dir: &Path) -> ClimateGateConfig {
    let fixture = json!({
        "datasets": [{
            "location": "scenarioSSP5-85/r15i1p1f1/Amon/tas/gr3/v20210201/tas_Amon_TEST_201501-202412.nc",
            "metadata": {
                "dimensions": {
                    "time": {
                        "size": 120,
                        "kind": "time",
                        "grid": { "type": "time", "calendar": "noleap", "frequency": "monthly", "start": "2015-01-16", "size": 120 }
                    },
                    "lat": { "size": 90, "kind": "latitude", "grid": { "type": "regular", "first": -89.0, "step": 2.0 } },
                    "lon": { "size": 180, "kind": "longitude", "grid": { "type": "regular", "first": 1.0, "step": 2.0 } }
                },
                "variables": {
                    "tas": { "dtype": "float32", "dims": ["time", "lat", "lon"], "shape": [120, 90, 180], "units": "K" }
                }
            }
        }]
    });
    let fixture_path = dir.join("archive.json");
    fs::write(&fixture_path, serde_json::to_vec(&fixture).unwrap()).unwrap();
    let config_path = dir.join("climate-gate.toml");
    fs::write(
        &config_path,
        format!(
            "[server.audit]\nenabled = false\n\n[archive]\nbackend = \"fixture\"\nfixture_path = '{}'\n",
            fixture_path.display()
        ),
    )
    .unwrap();
    ClimateGateConfig::load(Some(&config_path)).unwrap()
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.json");
    fs::write(&path, b"{}").unwrap();
    assert_eq!(read_bytes_with_limit(&path, 8).unwrap(), b"{}");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.json");
    fs::write(&path, vec![b' '; 32]).unwrap();
    let err = read_bytes_with_limit(&path, 16).unwrap_err();
    assert!(matches!(err, ReadLimitError::TooLarge { size: 32, limit: 16 }));
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_bytes_with_limit(&dir.path().join("absent.json"), 16).unwrap_err();
    assert!(matches!(err, ReadLimitError::Io(_)));
}

// ============================================================================
// SECTION: Query Arguments
// ============================================================================

#[test]
fn query_args_decode_from_inline_json() {
    let args = read_query_args(Some(r#"{"variable":"tas","lat_range":[0,10]}"#), None).unwrap();
    assert_eq!(args.variable, "tas");
    assert_eq!(args.lat_range, Some([0.0, 10.0]));
}

#[test]
fn query_args_decode_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("args.json");
    fs::write(&path, br#"{"variable":"pr","start_date":"2020-01"}"#).unwrap();
    let args = read_query_args(None, Some(&path)).unwrap();
    assert_eq!(args.variable, "pr");
    assert_eq!(args.start_date.as_deref(), Some("2020-01"));
}

#[test]
fn query_args_require_exactly_one_source() {
    assert!(read_query_args(None, None).is_err());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("args.json");
    assert!(read_query_args(Some("{}"), Some(&path)).is_err());
}

#[test]
fn query_args_reject_unknown_fields_and_oversize_input() {
    let err = read_query_args(Some(r#"{"variable":"tas","chunk":1}"#), None).unwrap_err();
    assert!(err.to_string().starts_with("invalid query arguments"));
    let padded = format!(r#"{{"variable":"{}"}}"#, "x".repeat(MAX_ARGS_BYTES));
    assert!(read_query_args(Some(&padded), None).is_err());
}

// ============================================================================
// SECTION: Estimation
// ============================================================================

#[test]
fn small_region_is_admitted() {
    let dir = tempfile::tempdir().unwrap();
    let server = McpServer::from_config(fixture_config(dir.path())).unwrap();
    let args = read_query_args(
        Some(
            r#"{"variable":"tas","lat_range":[0,10],"lon_range":[0,10],
                "start_date":"2015-01","end_date":"2015-12"}"#,
        ),
        None,
    )
    .unwrap();
    let report = estimate_report(server.router().pipeline(), &args).unwrap();
    assert_eq!(report.verdict, Verdict::Admit);
    assert_eq!(report.decision, AdmissionDecision::Admit);
    assert_eq!(report.estimate.element_count, 12 * 5 * 5);
}

#[test]
fn full_record_is_rejected_with_alternatives() {
    let dir = tempfile::tempdir().unwrap();
    let server = McpServer::from_config(fixture_config(dir.path())).unwrap();
    let args = read_query_args(Some(r#"{"variable":"tas"}"#), None).unwrap();
    let report = estimate_report(server.router().pipeline(), &args).unwrap();
    assert_eq!(report.verdict, Verdict::Reject);
    assert_eq!(report.estimate.element_count, 120 * 90 * 180);
    let AdmissionDecision::Reject {
        alternatives,
        ..
    } = report.decision
    else {
        panic!("expected a rejection");
    };
    assert!(!alternatives.is_empty());
    let rendered = serde_json::to_value(&alternatives[0]).unwrap();
    assert!(rendered["strategy"].is_string());
}

#[test]
fn unknown_variable_fails_to_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let server = McpServer::from_config(fixture_config(dir.path())).unwrap();
    let args = read_query_args(Some(r#"{"variable":"pr"}"#), None).unwrap();
    let err = estimate_report(server.router().pipeline(), &args).unwrap_err();
    assert!(err.to_string().starts_with("estimate failed"));
}
