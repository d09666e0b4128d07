// climate-gate-archive/tests/memory_store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Listing, header, and slice behavior of the fixture store.
// Purpose: Validate hierarchy registration, extraction, and failure modes.
// Dependencies: climate-gate-archive, climate-gate-core, tempfile
// ============================================================================

//! ## Overview
//! Exercises [`InMemoryArchiveStore`] against a coarse encoded dataset so
//! extracted values can be checked by index arithmetic.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::fs;

use climate_gate_archive::InMemoryArchiveStore;
use climate_gate_core::ArchiveError;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::EntryKind;
use climate_gate_core::IndexRange;

use crate::common::LATS;
use crate::common::LONS;
use crate::common::OBJECT;
use crate::common::STEPS;
use crate::common::coarse_store;
use crate::common::location;
use crate::common::selector;

#[test]
fn parents_are_listed_as_directories() {
    let store = coarse_store(STEPS);
    let root = store.list(&ArchivePath::root()).unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].name, "historical");
    assert_eq!(root[0].kind, EntryKind::Directory);
    let version = store.list(&selector().directory().unwrap()).unwrap();
    assert_eq!(version.len(), 1);
    assert_eq!(version[0].name, OBJECT);
    assert_eq!(version[0].kind, EntryKind::Dataset);
    assert_eq!(version[0].size_bytes, Some((STEPS * LATS * LONS * 8) as u64));
}

#[test]
fn missing_directory_is_not_found() {
    let store = coarse_store(STEPS);
    let err = store.list(&ArchivePath::parse("ssp999").unwrap()).unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));
}

#[test]
fn slice_extracts_hyper_rectangle() {
    let store = coarse_store(STEPS);
    let ranges = [IndexRange::new(3, 4), IndexRange::new(1, 2), IndexRange::new(5, 7)];
    let slice = store.read_slice(&location(), "tas", &ranges).unwrap();
    assert_eq!(slice.shape, vec![2, 2, 3]);
    assert_eq!(slice.values.len(), 12);
    assert_eq!(slice.values[0], 315.0);
    assert_eq!(slice.values[2], 317.0);
    assert_eq!(slice.values[3], 325.0);
    assert_eq!(slice.values[11], 427.0);
}

#[test]
fn truncated_array_serves_complete_records_only() {
    let store = coarse_store(10);
    let ranges = [IndexRange::new(8, 12), IndexRange::new(0, 0), IndexRange::new(0, 0)];
    let slice = store.read_slice(&location(), "tas", &ranges).unwrap();
    assert_eq!(slice.shape, vec![2, 1, 1]);
    assert_eq!(slice.values, vec![800.0, 900.0]);
    let ranges = [IndexRange::new(15, 16), IndexRange::new(0, 0), IndexRange::new(0, 0)];
    let slice = store.read_slice(&location(), "tas", &ranges).unwrap();
    assert_eq!(slice.shape, vec![0, 1, 1]);
    assert!(slice.values.is_empty());
}

#[test]
fn out_of_extent_read_is_not_found() {
    let store = coarse_store(STEPS);
    let ranges = [IndexRange::new(0, STEPS), IndexRange::new(0, 0), IndexRange::new(0, 0)];
    let err = store.read_slice(&location(), "tas", &ranges).unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));
}

#[test]
fn unknown_variable_is_not_found() {
    let store = coarse_store(STEPS);
    let err = store.read_slice(&location(), "pr", &[IndexRange::new(0, 0)]).unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));
}

#[test]
fn injected_outages_are_consumed() {
    let store = coarse_store(STEPS);
    store.fail_next(2);
    assert!(matches!(store.header(&location()), Err(ArchiveError::Unreachable(_))));
    assert!(matches!(store.header(&location()), Err(ArchiveError::Unreachable(_))));
    assert!(store.header(&location()).is_ok());
    assert_eq!(store.header_calls(), 3);
}

#[test]
fn fixture_file_round_trips_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.json");
    let fixture = serde_json::json!({
        "datasets": [{
            "location": "historical/r1i1p1f1/Amon/tas/gr3/v1/obj.nc",
            "metadata": {
                "dimensions": {
                    "lat": { "size": 2, "kind": "latitude", "grid": { "type": "regular", "first": -45.0, "step": 90.0 } }
                },
                "variables": {
                    "tas": { "dtype": "float32", "dims": ["lat"], "shape": [2] }
                }
            },
            "arrays": { "tas": [280.5, null] }
        }]
    });
    fs::write(&path, serde_json::to_vec(&fixture).unwrap()).unwrap();
    let store = InMemoryArchiveStore::load(&path).unwrap();
    let location = ArchivePath::parse("historical/r1i1p1f1/Amon/tas/gr3/v1/obj.nc").unwrap();
    let slice = store.read_slice(&location, "tas", &[IndexRange::new(0, 1)]).unwrap();
    assert_eq!(slice.values[0], 280.5);
    assert!(slice.values[1].is_nan());
}

#[test]
fn fixture_with_oversized_array_rejected() {
    let fixture = serde_json::json!({
        "datasets": [{
            "location": "a/b.nc",
            "metadata": {
                "dimensions": { "x": { "size": 1, "kind": "other", "grid": { "type": "index" } } },
                "variables": { "v": { "dtype": "int8", "dims": ["x"], "shape": [1] } }
            },
            "arrays": { "v": [1.0, 2.0] }
        }]
    });
    let err = InMemoryArchiveStore::from_json(&serde_json::to_vec(&fixture).unwrap()).unwrap_err();
    assert!(err.to_string().contains("holds 2 values"));
}
