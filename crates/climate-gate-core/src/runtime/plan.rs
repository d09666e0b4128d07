// climate-gate-core/src/runtime/plan.rs
// ============================================================================
// Module: Climate Gate Slice Planning
// Description: Translation of a request into per-variable index selections.
// Purpose: Share one selection between the estimator and the fetcher.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A [`SlicePlan`] records, for every requested variable, which indices are
//! selected along each of its dimensions. The estimator counts elements from
//! the plan and the fetcher reads exactly the plan, so a fetch can never
//! return more elements than were admitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::AxisGrid;
use crate::core::DatasetMetadata;
use crate::core::Dimension;
use crate::core::DimensionKind;
use crate::core::IndexRange;
use crate::core::PipelineError;
use crate::core::QueryRequest;
use crate::core::metadata::merge_ranges;

// ============================================================================
// SECTION: Plan Types
// ============================================================================

/// Selected indices along one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimSelection {
    /// Dimension name.
    pub name: String,
    /// Dimension role.
    pub kind: DimensionKind,
    /// Disjoint index ranges in read order; seam segments run west to east.
    pub ranges: Vec<IndexRange>,
}

impl DimSelection {
    /// Number of selected indices.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.ranges.iter().map(|range| range.len() as u64).sum()
    }
}

/// Selection for one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePlan {
    /// Variable name.
    pub variable: String,
    /// Storage type name from the header.
    pub dtype: String,
    /// Selection per dimension, in storage order.
    pub dims: Vec<DimSelection>,
}

impl VariablePlan {
    /// Number of selected elements.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.dims.iter().map(DimSelection::count).fold(1_u64, u64::saturating_mul)
    }

    /// Index of the dimension split into several ranges, if any.
    #[must_use]
    pub fn split_axis(&self) -> Option<usize> {
        self.dims.iter().position(|dim| dim.ranges.len() > 1)
    }

    /// Individual reads needed to cover the selection, one range per dimension.
    ///
    /// At most one dimension (longitude) is split, so the reads are ordered
    /// along that dimension and concatenate back in order.
    #[must_use]
    pub fn reads(&self) -> Vec<Vec<IndexRange>> {
        let base: Vec<IndexRange> =
            self.dims.iter().filter_map(|dim| dim.ranges.first().copied()).collect();
        match self.split_axis() {
            Some(axis) => self.dims[axis]
                .ranges
                .iter()
                .map(|range| {
                    let mut read = base.clone();
                    read[axis] = *range;
                    read
                })
                .collect(),
            None => vec![base],
        }
    }
}

/// Selections for every requested variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    /// Per-variable plans in request order.
    pub variables: Vec<VariablePlan>,
}

impl SlicePlan {
    /// Total selected elements across variables.
    #[must_use]
    pub fn element_count(&self) -> u64 {
        self.variables.iter().map(VariablePlan::element_count).fold(0_u64, u64::saturating_add)
    }

    /// Selected time steps of the first variable with a time dimension.
    #[must_use]
    pub fn time_steps(&self) -> Option<IndexRange> {
        self.variables.iter().find_map(|plan| {
            plan.dims
                .iter()
                .find(|dim| dim.kind == DimensionKind::Time)
                .and_then(|dim| dim.ranges.first().copied())
        })
    }
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Resolves a request against a header into index selections.
///
/// # Errors
///
/// Returns [`PipelineError::NotFound`] for a variable absent from the header,
/// [`PipelineError::InvalidRequest`] when the time range lies outside the
/// dataset's extent or the region selects no grid cells, and
/// [`PipelineError::CorruptPayload`] when the header is inconsistent.
pub fn plan_slices(
    request: &QueryRequest,
    metadata: &DatasetMetadata,
) -> Result<SlicePlan, PipelineError> {
    check_time_extent(request, metadata)?;
    let mut variables = Vec::with_capacity(request.variables().len());
    for name in request.variables() {
        let Some(info) = metadata.variables.get(name) else {
            let known = metadata.data_variables().join(", ");
            return Err(PipelineError::NotFound(format!(
                "variable '{name}' is not in {} (available: {known})",
                request.handle()
            )));
        };
        let mut dims = Vec::with_capacity(info.dims.len());
        for dim_name in &info.dims {
            let Some(dimension) = metadata.dimensions.get(dim_name) else {
                return Err(PipelineError::CorruptPayload(format!(
                    "variable '{name}' references unknown dimension '{dim_name}'"
                )));
            };
            let ranges = select_dimension(request, dim_name, dimension)?;
            dims.push(DimSelection {
                name: dim_name.clone(),
                kind: dimension.kind,
                ranges,
            });
        }
        variables.push(VariablePlan {
            variable: name.clone(),
            dtype: info.dtype.clone(),
            dims,
        });
    }
    Ok(SlicePlan {
        variables,
    })
}

/// Rejects time ranges that are not fully inside the dataset's time axis.
fn check_time_extent(
    request: &QueryRequest,
    metadata: &DatasetMetadata,
) -> Result<(), PipelineError> {
    let (Some(range), Some(axis)) = (request.time(), metadata.time_axis()) else {
        return Ok(());
    };
    if axis.covers(range) {
        return Ok(());
    }
    let extent = axis.extent().map_or_else(|| "empty".to_string(), |extent| extent.to_string());
    Err(PipelineError::InvalidRequest(format!(
        "time range {range} lies outside the dataset extent {extent}"
    )))
}

/// Index ranges selected along one dimension.
fn select_dimension(
    request: &QueryRequest,
    name: &str,
    dimension: &Dimension,
) -> Result<Vec<IndexRange>, PipelineError> {
    let empty = |what: &str| {
        PipelineError::InvalidRequest(format!(
            "{what} selects no grid cells along '{name}'; widen the request"
        ))
    };
    let ranges = match dimension.kind {
        DimensionKind::Latitude => {
            let region = request.region();
            let range = dimension
                .index_range(region.lat_min(), region.lat_max())
                .ok_or_else(|| empty("latitude range"))?;
            vec![range]
        }
        DimensionKind::Longitude => {
            let ranges: Vec<IndexRange> = request
                .region()
                .lon_segments()
                .iter()
                .filter_map(|segment| dimension.index_range(segment.min, segment.max))
                .collect();
            if ranges.is_empty() {
                return Err(empty("longitude range"));
            }
            order_lon_ranges(ranges)
        }
        DimensionKind::Time => match (&dimension.grid, request.time()) {
            (AxisGrid::Time(axis), Some(range)) => {
                let (start, end) = axis.step_range(range).ok_or_else(|| empty("time range"))?;
                vec![IndexRange::new(start, end)]
            }
            _ => full_range(dimension)?,
        },
        DimensionKind::Vertical | DimensionKind::Other => full_range(dimension)?,
    };
    Ok(ranges)
}

/// Keeps seam segments in box order unless they overlap or touch.
///
/// Touching segments cover the whole axis and collapse into one range.
fn order_lon_ranges(ranges: Vec<IndexRange>) -> Vec<IndexRange> {
    let merged = merge_ranges(ranges.clone());
    if merged.len() == 1 { merged } else { ranges }
}

/// Whole-axis selection.
fn full_range(dimension: &Dimension) -> Result<Vec<IndexRange>, PipelineError> {
    IndexRange::full(dimension.size)
        .map(|range| vec![range])
        .ok_or_else(|| PipelineError::CorruptPayload("dimension of size zero".to_string()))
}
