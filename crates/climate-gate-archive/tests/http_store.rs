// climate-gate-archive/tests/http_store.rs
// ============================================================================
// Module: HTTP Store Tests
// Description: Gateway routes, status mapping, and body limits.
// Purpose: Ensure the HTTP store classifies every failure fail-closed.
// Dependencies: climate-gate-archive, climate-gate-core, tiny_http
// ============================================================================

//! ## Overview
//! Runs the HTTP store against a scripted local gateway:
//! - Route and query construction for list, header, and slice.
//! - 404 to not-found, 5xx and connect failures to unreachable.
//! - Malformed, oversized, and inconsistent bodies to corrupt.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::io::Read;
use std::net::SocketAddr;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use climate_gate_archive::HttpArchiveConfig;
use climate_gate_archive::HttpArchiveStore;
use climate_gate_archive::HttpStoreError;
use climate_gate_core::ArchiveError;
use climate_gate_core::ArchiveStore;
use climate_gate_core::EntryKind;
use climate_gate_core::IndexRange;

use crate::common::Scripted;
use crate::common::coarse_metadata;
use crate::common::location;
use crate::common::selector;
use crate::common::spawn_gateway;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn local_store(addr: SocketAddr) -> HttpArchiveStore {
    HttpArchiveStore::new(&HttpArchiveConfig {
        base_url: format!("http://{addr}/archive"),
        allow_http: true,
        request_timeout_ms: 2_000,
        ..HttpArchiveConfig::default()
    })
    .unwrap()
}

fn slice_ranges() -> [IndexRange; 3] {
    [IndexRange::new(0, 1), IndexRange::new(0, 0), IndexRange::new(2, 3)]
}

// ============================================================================
// SECTION: Routes
// ============================================================================

#[test]
fn list_uses_list_route() {
    let (addr, handle) = spawn_gateway(1, |_| {
        Scripted::ok(
            r#"{"entries":[{"name":"v20210201","kind":"directory"},{"name":"x.nc","kind":"dataset","size_bytes":42}]}"#,
        )
    });
    let store = local_store(addr);
    let path = selector().directory().unwrap();
    let entries = store.list(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, EntryKind::Directory);
    assert_eq!(entries[1].size_bytes, Some(42));
    let seen = handle.join().unwrap();
    assert_eq!(seen[0], "/archive/list/historical/r1i1p1f1/Amon/tas/gr3/v20210201");
}

#[test]
fn listing_with_traversal_name_is_corrupt() {
    let (addr, handle) =
        spawn_gateway(1, |_| Scripted::ok(r#"{"entries":[{"name":"..","kind":"directory"}]}"#));
    let err = local_store(addr).list(&selector().directory().unwrap()).unwrap_err();
    assert!(matches!(err, ArchiveError::Corrupt(_)), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn header_decodes_metadata() {
    let body = serde_json::to_string(&coarse_metadata()).unwrap();
    let (addr, handle) = spawn_gateway(1, move |_| Scripted::ok(body.clone()));
    let metadata = local_store(addr).header(&location()).unwrap();
    assert_eq!(metadata, coarse_metadata());
    let seen = handle.join().unwrap();
    assert!(seen[0].starts_with("/archive/header/historical/"));
    assert!(seen[0].ends_with("tas_Amon_TEST_gr3_200001-200112.nc"));
}

#[test]
fn slice_encodes_variable_and_ranges() {
    let (addr, handle) = spawn_gateway(1, |_| {
        Scripted::ok(r#"{"variable":"tas","shape":[2,1,2],"values":[1.0,2.0,null,4.0]}"#)
    });
    let slice = local_store(addr).read_slice(&location(), "tas", &slice_ranges()).unwrap();
    assert_eq!(slice.shape, vec![2, 1, 2]);
    assert_eq!(slice.values[0], 1.0);
    assert!(slice.values[2].is_nan());
    let seen = handle.join().unwrap();
    assert!(seen[0].contains("/archive/slice/historical/"));
    assert!(seen[0].contains("variable=tas"));
    assert!(seen[0].contains("index=0%3A1%2C0%3A0%2C2%3A3"));
}

// ============================================================================
// SECTION: Status Mapping
// ============================================================================

#[test]
fn not_found_status_maps_to_not_found() {
    let (addr, handle) = spawn_gateway(1, |_| Scripted::status(404));
    let err = local_store(addr).header(&location()).unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn server_error_maps_to_unreachable() {
    let (addr, handle) = spawn_gateway(1, |_| Scripted::status(503));
    let err = local_store(addr).header(&location()).unwrap_err();
    assert!(matches!(err, ArchiveError::Unreachable(_)), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn unexpected_client_error_maps_to_corrupt() {
    let (addr, handle) = spawn_gateway(1, |_| Scripted::status(400));
    let err = local_store(addr).header(&location()).unwrap_err();
    assert!(matches!(err, ArchiveError::Corrupt(_)), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn refused_connection_maps_to_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = local_store(addr).header(&location()).unwrap_err();
    assert!(matches!(err, ArchiveError::Unreachable(_)), "unexpected: {err}");
}

#[test]
fn stalled_gateway_times_out_as_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0_u8; 1024];
            let _ = stream.read(&mut buf);
            thread::sleep(Duration::from_millis(1_500));
        }
    });
    let store = HttpArchiveStore::new(&HttpArchiveConfig {
        base_url: format!("http://{addr}"),
        allow_http: true,
        request_timeout_ms: 500,
        connect_timeout_ms: 200,
        ..HttpArchiveConfig::default()
    })
    .unwrap();
    let err = store.header(&location()).unwrap_err();
    assert!(matches!(err, ArchiveError::Unreachable(_)), "unexpected: {err}");
    handle.join().unwrap();
}

// ============================================================================
// SECTION: Payload Validation
// ============================================================================

#[test]
fn malformed_json_maps_to_corrupt() {
    let (addr, handle) = spawn_gateway(1, |_| Scripted::ok("{not json"));
    let err = local_store(addr).header(&location()).unwrap_err();
    assert!(matches!(err, ArchiveError::Corrupt(_)), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn oversized_body_maps_to_corrupt() {
    let body = serde_json::to_string(&coarse_metadata()).unwrap();
    let (addr, handle) = spawn_gateway(1, move |_| Scripted::ok(body.clone()));
    let store = HttpArchiveStore::new(&HttpArchiveConfig {
        base_url: format!("http://{addr}"),
        allow_http: true,
        max_response_bytes: 64,
        ..HttpArchiveConfig::default()
    })
    .unwrap();
    let err = store.header(&location()).unwrap_err();
    assert!(err.to_string().contains("exceeds size limit"), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn slice_value_count_mismatch_maps_to_corrupt() {
    let (addr, handle) = spawn_gateway(1, |_| {
        Scripted::ok(r#"{"variable":"tas","shape":[2,1,2],"values":[1.0,2.0,3.0]}"#)
    });
    let err = local_store(addr).read_slice(&location(), "tas", &slice_ranges()).unwrap_err();
    assert!(matches!(err, ArchiveError::Corrupt(_)), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn slice_extent_mismatch_maps_to_corrupt() {
    let (addr, handle) = spawn_gateway(1, |_| {
        Scripted::ok(r#"{"variable":"tas","shape":[2,1,3],"values":[1,2,3,4,5,6]}"#)
    });
    let err = local_store(addr).read_slice(&location(), "tas", &slice_ranges()).unwrap_err();
    assert!(err.to_string().contains("dimension 2"), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn slice_for_other_variable_maps_to_corrupt() {
    let (addr, handle) = spawn_gateway(1, |_| {
        Scripted::ok(r#"{"variable":"pr","shape":[2,1,2],"values":[1,2,3,4]}"#)
    });
    let err = local_store(addr).read_slice(&location(), "tas", &slice_ranges()).unwrap_err();
    assert!(err.to_string().contains("variable 'pr'"), "unexpected: {err}");
    handle.join().unwrap();
}

#[test]
fn short_leading_dimension_is_accepted() {
    let (addr, handle) = spawn_gateway(1, |_| {
        Scripted::ok(r#"{"variable":"tas","shape":[1,1,2],"values":[1,2]}"#)
    });
    let slice = local_store(addr).read_slice(&location(), "tas", &slice_ranges()).unwrap();
    assert_eq!(slice.shape, vec![1, 1, 2]);
    handle.join().unwrap();
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn cleartext_base_requires_opt_in() {
    let result = HttpArchiveStore::new(&HttpArchiveConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        ..HttpArchiveConfig::default()
    });
    assert!(matches!(result, Err(HttpStoreError::InvalidBaseUrl(_))));
}

#[test]
fn credentials_in_base_rejected() {
    let result = HttpArchiveStore::new(&HttpArchiveConfig {
        base_url: "https://user:pw@archive.example.org".to_string(),
        ..HttpArchiveConfig::default()
    });
    assert!(matches!(result, Err(HttpStoreError::InvalidBaseUrl(_))));
}
