// climate-gate-archive/tests/common/mod.rs
// ============================================================================
// Module: Archive Test Fixtures
// Description: Small coarse-grid datasets and a scripted gateway.
// ============================================================================
//! ## Overview
//! Builds a two-year monthly dataset on a 4 x 8 grid whose values encode
//! their own indices (`t * 100 + lat * 10 + lon`), plus a `tiny_http`
//! gateway that answers from a route table.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers.")]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use climate_gate_core::ArchivePath;
use climate_gate_core::AxisGrid;
use climate_gate_core::Calendar;
use climate_gate_core::CalendarDate;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::DatasetSelector;
use climate_gate_core::Dimension;
use climate_gate_core::DimensionKind;
use climate_gate_core::Frequency;
use climate_gate_core::TimeAxis;
use climate_gate_core::VariableInfo;
use climate_gate_archive::InMemoryArchiveStore;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

pub const STEPS: usize = 24;
pub const LATS: usize = 4;
pub const LONS: usize = 8;
pub const OBJECT: &str = "tas_Amon_TEST_gr3_200001-200112.nc";

pub fn selector() -> DatasetSelector {
    DatasetSelector {
        scenario: "historical".to_string(),
        ensemble_member: "r1i1p1f1".to_string(),
        frequency: "Amon".to_string(),
        variable: "tas".to_string(),
        grid: "gr3".to_string(),
        version: "v20210201".to_string(),
    }
}

pub fn location() -> ArchivePath {
    selector().directory().unwrap().join(OBJECT).unwrap()
}

pub fn coarse_metadata() -> DatasetMetadata {
    let mut dimensions = BTreeMap::new();
    dimensions.insert(
        "time".to_string(),
        Dimension {
            size: STEPS,
            kind: DimensionKind::Time,
            grid: AxisGrid::Time(TimeAxis {
                calendar: Calendar::NoLeap,
                frequency: Frequency::Monthly,
                start: CalendarDate::new(2000, 1, 16).unwrap(),
                size: STEPS,
            }),
        },
    );
    dimensions.insert(
        "lat".to_string(),
        Dimension {
            size: LATS,
            kind: DimensionKind::Latitude,
            grid: AxisGrid::Regular {
                first: -67.5,
                step: 45.0,
            },
        },
    );
    dimensions.insert(
        "lon".to_string(),
        Dimension {
            size: LONS,
            kind: DimensionKind::Longitude,
            grid: AxisGrid::Regular {
                first: 22.5,
                step: 45.0,
            },
        },
    );
    let mut variables = BTreeMap::new();
    variables.insert(
        "tas".to_string(),
        VariableInfo {
            dtype: "float32".to_string(),
            dims: vec!["time".to_string(), "lat".to_string(), "lon".to_string()],
            shape: vec![STEPS, LATS, LONS],
            units: Some("K".to_string()),
            long_name: Some("Near-Surface Air Temperature".to_string()),
        },
    );
    DatasetMetadata {
        dimensions,
        variables,
        attributes: BTreeMap::new(),
    }
}

/// Row-major values encoding their indices, truncated to `steps` records.
pub fn encoded_values(steps: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(steps * LATS * LONS);
    for t in 0 .. steps {
        for i in 0 .. LATS {
            for j in 0 .. LONS {
                values.push((t * 100 + i * 10 + j) as f64);
            }
        }
    }
    values
}

pub fn coarse_store(steps: usize) -> InMemoryArchiveStore {
    let mut store = InMemoryArchiveStore::new();
    let mut arrays = BTreeMap::new();
    arrays.insert("tas".to_string(), encoded_values(steps));
    store.insert_dataset(location(), coarse_metadata(), arrays).unwrap();
    store
}

/// Scripted gateway response.
#[derive(Clone)]
pub struct Scripted {
    pub status: u16,
    pub body: String,
}

impl Scripted {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "{}".to_string(),
        }
    }
}

/// Spawns a gateway answering `count` requests; the responder sees the raw URL.
pub fn spawn_gateway<F>(count: usize, responder: F) -> (SocketAddr, thread::JoinHandle<Vec<String>>)
where
    F: Fn(&str) -> Scripted + Send + Sync + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let responder = Arc::new(responder);
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for _ in 0 .. count {
            let Ok(request) = server.recv() else {
                break;
            };
            let url = request.url().to_string();
            let scripted = responder(&url);
            seen.push(url);
            let header = Header::from_bytes("Content-Type", "application/json").unwrap();
            let response = Response::from_string(scripted.body)
                .with_status_code(scripted.status)
                .with_header(header);
            let _ = request.respond(response);
        }
        seen
    });
    (addr, handle)
}
