// crates/climate-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Shared dataset headers and request builders.
// ============================================================================
//! ## Overview
//! Builds a header shaped like a 1-degree by 0.625-degree monthly model run
//! on a `noleap` calendar from 1850 through 2100.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers.")]

use std::collections::BTreeMap;

use climate_gate_core::AxisGrid;
use climate_gate_core::Calendar;
use climate_gate_core::CalendarDate;
use climate_gate_core::DatasetHandle;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::DatasetSelector;
use climate_gate_core::Dimension;
use climate_gate_core::DimensionKind;
use climate_gate_core::Frequency;
use climate_gate_core::LongitudeConvention;
use climate_gate_core::QueryRequest;
use climate_gate_core::SpatialBox;
use climate_gate_core::TimeAxis;
use climate_gate_core::TimeRange;
use climate_gate_core::VariableInfo;

/// Months from 1850-01 through 2100-12.
pub const MONTHS: usize = 251 * 12;

pub fn monthly_axis() -> TimeAxis {
    TimeAxis {
        calendar: Calendar::NoLeap,
        frequency: Frequency::Monthly,
        start: CalendarDate::new(1850, 1, 16).unwrap(),
        size: MONTHS,
    }
}

pub fn grid_metadata(time: TimeAxis) -> DatasetMetadata {
    let mut dimensions = BTreeMap::new();
    dimensions.insert(
        "time".to_string(),
        Dimension {
            size: time.size,
            kind: DimensionKind::Time,
            grid: AxisGrid::Time(time),
        },
    );
    dimensions.insert(
        "lat".to_string(),
        Dimension {
            size: 180,
            kind: DimensionKind::Latitude,
            grid: AxisGrid::Regular {
                first: -89.5,
                step: 1.0,
            },
        },
    );
    dimensions.insert(
        "lon".to_string(),
        Dimension {
            size: 576,
            kind: DimensionKind::Longitude,
            grid: AxisGrid::Regular {
                first: 0.3125,
                step: 0.625,
            },
        },
    );
    dimensions.insert(
        "bnds".to_string(),
        Dimension {
            size: 2,
            kind: DimensionKind::Other,
            grid: AxisGrid::Index,
        },
    );
    let mut variables = BTreeMap::new();
    variables.insert(
        "tas".to_string(),
        VariableInfo {
            dtype: "float32".to_string(),
            dims: vec!["time".to_string(), "lat".to_string(), "lon".to_string()],
            shape: vec![time.size, 180, 576],
            units: Some("K".to_string()),
            long_name: Some("Near-Surface Air Temperature".to_string()),
        },
    );
    variables.insert(
        "time_bnds".to_string(),
        VariableInfo {
            dtype: "float64".to_string(),
            dims: vec!["time".to_string(), "bnds".to_string()],
            shape: vec![time.size, 2],
            units: None,
            long_name: None,
        },
    );
    DatasetMetadata {
        dimensions,
        variables,
        attributes: BTreeMap::new(),
    }
}

pub fn tas_metadata() -> DatasetMetadata {
    grid_metadata(monthly_axis())
}

pub fn handle() -> DatasetHandle {
    DatasetHandle {
        selector: DatasetSelector {
            scenario: "scenarioSSP5-85".to_string(),
            ensemble_member: "r15i1p1f1".to_string(),
            frequency: "Amon".to_string(),
            variable: "tas".to_string(),
            grid: "gr3".to_string(),
            version: "v20210201".to_string(),
        },
        object: "tas_Amon_GFDL-SPEAR-MED_gr3_185001-210012.nc".to_string(),
    }
}

pub fn tas_request(region: SpatialBox, start: &str, end: &str) -> QueryRequest {
    QueryRequest::new(
        handle(),
        ["tas".to_string()],
        region,
        Some(TimeRange::parse(start, end).unwrap()),
    )
    .unwrap()
}

pub fn tropics() -> SpatialBox {
    SpatialBox::new(-40.0, 40.0, 0.0, 360.0, LongitudeConvention::Unsigned).unwrap()
}
