// climate-gate-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared archive fixtures and router builders for MCP tests.
// Purpose: Provide one realistic monthly dataset across integration suites.
// Dependencies: climate-gate-archive, climate-gate-config, climate-gate-core, climate-gate-mcp
// ============================================================================

//! ## Overview
//! The fixture is a coarse 20 degree `tas` grid (9 x 18 cells) with 3012
//! monthly `noleap` steps from 1850-01 to 2100-12, stored under the default
//! handle. Values encode their own indices as `t * 1000 + i * 100 + j` so
//! fetched slices can be checked cell by cell.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use climate_gate_archive::InMemoryArchiveStore;
use climate_gate_config::ClimateGateConfig;
use climate_gate_config::HandleDefaults;
use climate_gate_core::ArchivePath;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::DatasetSelector;
use climate_gate_mcp::QueryPipeline;
use climate_gate_mcp::QueryPipelineConfig;
use climate_gate_mcp::ToolRouter;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixture Dataset
// ============================================================================

/// Object name of the fixture dataset.
pub const OBJECT: &str = "tas_Amon_TEST_ssp585_r15i1p1f1_gr3_185001-210012.nc";

/// Monthly steps from 1850-01 through 2100-12.
pub const STEPS: usize = 3012;

/// Latitude cells, centers -80 ..= 80.
pub const LATS: usize = 9;

/// Longitude cells, centers 10 ..= 350.
pub const LONS: usize = 18;

/// Fixture value at step `t`, latitude index `i`, longitude index `j`.
#[must_use]
pub fn value_at(t: usize, i: usize, j: usize) -> f64 {
    let encoded = t * 1000 + i * 100 + j;
    f64::from(u32::try_from(encoded).unwrap_or(u32::MAX))
}

/// Default handle selector for `variable`.
#[must_use]
pub fn selector(variable: &str) -> DatasetSelector {
    let defaults = HandleDefaults::default();
    DatasetSelector {
        scenario: defaults.scenario,
        ensemble_member: defaults.ensemble_member,
        frequency: defaults.frequency,
        variable: variable.to_string(),
        grid: defaults.grid,
        version: defaults.version,
    }
}

/// Storage location of the fixture dataset.
#[must_use]
pub fn location() -> ArchivePath {
    selector("tas").directory().unwrap().join(OBJECT).unwrap()
}

/// Header of the fixture dataset.
#[must_use]
pub fn header() -> DatasetMetadata {
    serde_json::from_value(header_json()).unwrap()
}

/// Header JSON as served by the archive.
#[must_use]
pub fn header_json() -> Value {
    json!({
        "dimensions": {
            "time": {
                "size": STEPS,
                "kind": "time",
                "grid": {
                    "type": "time",
                    "calendar": "noleap",
                    "frequency": "monthly",
                    "start": "1850-01-16",
                    "size": STEPS
                }
            },
            "lat": { "size": LATS, "kind": "latitude", "grid": { "type": "regular", "first": -80.0, "step": 20.0 } },
            "lon": { "size": LONS, "kind": "longitude", "grid": { "type": "regular", "first": 10.0, "step": 20.0 } }
        },
        "variables": {
            "tas": {
                "dtype": "float32",
                "dims": ["time", "lat", "lon"],
                "shape": [STEPS, LATS, LONS],
                "units": "K"
            }
        },
        "attributes": { "source_id": "TEST" }
    })
}

/// Row-major `tas` values for the first `steps` steps.
#[must_use]
pub fn values(steps: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(steps * LATS * LONS);
    for t in 0 .. steps {
        for i in 0 .. LATS {
            for j in 0 .. LONS {
                out.push(value_at(t, i, j));
            }
        }
    }
    out
}

/// Store holding the fixture with `steps` steps of data actually present.
#[must_use]
pub fn store_with_steps(steps: usize) -> Arc<InMemoryArchiveStore> {
    let mut store = InMemoryArchiveStore::new();
    store
        .insert_dataset(location(), header(), BTreeMap::from([("tas".to_string(), values(steps))]))
        .unwrap();
    Arc::new(store)
}

/// Store holding the complete fixture.
#[must_use]
pub fn full_store() -> Arc<InMemoryArchiveStore> {
    store_with_steps(STEPS)
}

// ============================================================================
// SECTION: Routers
// ============================================================================

/// Router over `store` with default configuration.
#[must_use]
pub fn router_over(store: Arc<InMemoryArchiveStore>) -> ToolRouter {
    let mut config = ClimateGateConfig::default();
    config.archive.retry_backoff_ms = 0;
    let pipeline_config = QueryPipelineConfig::from_config(&config, store).unwrap();
    ToolRouter::new(Arc::new(QueryPipeline::new(pipeline_config)), Duration::from_secs(30))
}

/// Router over the complete fixture.
#[must_use]
pub fn router() -> ToolRouter {
    router_over(full_store())
}

/// Calls a tool that must exist and returns its envelope.
pub async fn call(router: &ToolRouter, tool: &str, arguments: Value) -> Value {
    router.handle_tool_call(None, tool, arguments).await.unwrap()
}

/// Fixture file content in the layout the fixture backend loads.
#[must_use]
pub fn fixture_file(steps: usize) -> Value {
    json!({
        "datasets": [{
            "location": location().to_string(),
            "metadata": header_json(),
            "arrays": { "tas": values(steps) }
        }]
    })
}
