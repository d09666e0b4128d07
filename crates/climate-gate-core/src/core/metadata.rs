// climate-gate-core/src/core/metadata.rs
// ============================================================================
// Module: Climate Gate Dataset Metadata
// Description: Header-level description of an archive object.
// Purpose: Give the estimator and fetcher shapes, types, and axes without payloads.
// Dependencies: serde, crate::core::calendar
// ============================================================================

//! ## Overview
//! [`DatasetMetadata`] is the result of probing an archive object's header:
//! dimension sizes and axis descriptions, per-variable dtypes and shapes, and
//! an optional calendar-aware time axis. Axis grids translate coordinate
//! bounds into inclusive index ranges. When the grid resolution is unknown the
//! whole axis is selected, so counts derived from headers never undercount.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::calendar::TimeAxis;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tolerance applied to coordinate comparisons so edge cells are kept.
const COORD_EPSILON: f64 = 1e-9;

// ============================================================================
// SECTION: Index Range
// ============================================================================

/// Inclusive range of indices along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    /// First index.
    pub start: usize,
    /// Last index, inclusive.
    pub end: usize,
}

impl IndexRange {
    /// Builds a range, swapping inverted bounds.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self {
                start,
                end,
            }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Range covering a whole dimension of `size` elements.
    ///
    /// Returns `None` for an empty dimension.
    #[must_use]
    pub const fn full(size: usize) -> Option<Self> {
        if size == 0 {
            None
        } else {
            Some(Self {
                start: 0,
                end: size - 1,
            })
        }
    }

    /// Number of indices in the range.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Ranges always hold at least one index.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Sorts ranges and merges overlapping or adjacent ones.
#[must_use]
pub fn merge_ranges(mut ranges: Vec<IndexRange>) -> Vec<IndexRange> {
    ranges.sort_by_key(|range| range.start);
    let mut merged: Vec<IndexRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

// ============================================================================
// SECTION: Dimensions
// ============================================================================

/// Semantic role of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    /// Time axis.
    Time,
    /// Latitude axis.
    Latitude,
    /// Longitude axis.
    Longitude,
    /// Vertical levels.
    Vertical,
    /// Any other dimension (bounds, ensemble, ...).
    Other,
}

/// Coordinate description for a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisGrid {
    /// Evenly spaced coordinates `first + i * step`.
    Regular {
        /// Coordinate of index 0.
        first: f64,
        /// Spacing between neighbors; negative for descending axes.
        step: f64,
    },
    /// Explicit coordinate list, one value per index.
    Irregular {
        /// Coordinate values.
        values: Vec<f64>,
    },
    /// Only the coordinate extent is known.
    Extent {
        /// Smallest coordinate.
        min: f64,
        /// Largest coordinate.
        max: f64,
    },
    /// Calendar-aware time coordinates.
    Time(TimeAxis),
    /// Bare index dimension without coordinates.
    Index,
}

/// One dimension of an archive object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Number of indices.
    pub size: usize,
    /// Semantic role.
    pub kind: DimensionKind,
    /// Coordinate description.
    pub grid: AxisGrid,
}

impl Dimension {
    /// Inclusive index range whose coordinates fall within `[lo, hi]`.
    ///
    /// Grids with unknown resolution select the whole axis whenever the bounds
    /// overlap its extent. Returns `None` when no index falls inside.
    #[must_use]
    pub fn index_range(&self, lo: f64, hi: f64) -> Option<IndexRange> {
        if self.size == 0 {
            return None;
        }
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        match &self.grid {
            AxisGrid::Regular {
                first,
                step,
            } => regular_range(self.size, *first, *step, lo, hi),
            AxisGrid::Irregular {
                values,
            } => {
                let mut hits = values
                    .iter()
                    .take(self.size)
                    .enumerate()
                    .filter(|(_, v)| **v >= lo - COORD_EPSILON && **v <= hi + COORD_EPSILON)
                    .map(|(index, _)| index);
                let first = hits.next()?;
                let last = hits.last().unwrap_or(first);
                Some(IndexRange::new(first, last))
            }
            AxisGrid::Extent {
                min,
                max,
            } => {
                if hi + COORD_EPSILON < *min || lo - COORD_EPSILON > *max {
                    None
                } else {
                    IndexRange::full(self.size)
                }
            }
            AxisGrid::Time(_) | AxisGrid::Index => IndexRange::full(self.size),
        }
    }

    /// Coordinate labels for the indices in `range`, when known.
    #[must_use]
    pub fn coordinates(&self, range: IndexRange) -> Option<CoordinateValues> {
        match &self.grid {
            AxisGrid::Regular {
                first,
                step,
            } => Some(CoordinateValues::Numeric(
                (range.start ..= range.end).map(|i| regular_value(*first, *step, i)).collect(),
            )),
            AxisGrid::Irregular {
                values,
            } => values.get(range.start ..= range.end).map(|v| CoordinateValues::Numeric(v.to_vec())),
            AxisGrid::Time(axis) => Some(CoordinateValues::Labels(
                (range.start ..= range.end).map(|i| axis.label_at(i)).collect(),
            )),
            AxisGrid::Extent {
                ..
            }
            | AxisGrid::Index => None,
        }
    }
}

/// Coordinate value of index `i` on a regular grid.
#[allow(clippy::cast_precision_loss, reason = "Grid indices are far below 2^52.")]
fn regular_value(first: f64, step: f64, index: usize) -> f64 {
    step.mul_add(index as f64, first)
}

/// Index range on a regular grid, widened by a small epsilon.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Values are clamped to [0, size - 1] before conversion."
)]
fn regular_range(size: usize, first: f64, step: f64, lo: f64, hi: f64) -> Option<IndexRange> {
    if step == 0.0 || !step.is_finite() || !first.is_finite() {
        return IndexRange::full(size);
    }
    let (from, to) = if step > 0.0 {
        ((lo - first) / step, (hi - first) / step)
    } else {
        ((hi - first) / step, (lo - first) / step)
    };
    let start = (from - COORD_EPSILON).ceil().max(0.0);
    let end = (to + COORD_EPSILON).floor().min((size - 1) as f64);
    if start > end || end < 0.0 {
        return None;
    }
    Some(IndexRange::new(start as usize, end as usize))
}

/// Coordinate labels attached to a fetched slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateValues {
    /// Numeric coordinates.
    Numeric(Vec<f64>),
    /// Text labels such as dates.
    Labels(Vec<String>),
}

impl CoordinateValues {
    /// Appends another run of coordinates of the same flavor.
    pub fn extend(&mut self, other: Self) {
        match (self, other) {
            (Self::Numeric(values), Self::Numeric(more)) => values.extend(more),
            (Self::Labels(values), Self::Labels(more)) => values.extend(more),
            (Self::Numeric(_), Self::Labels(_)) | (Self::Labels(_), Self::Numeric(_)) => {}
        }
    }
}

// ============================================================================
// SECTION: Variables
// ============================================================================

/// Header entry for one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Storage type name (`float32`, `float64`, `int16`, ...).
    pub dtype: String,
    /// Dimension names in storage order.
    pub dims: Vec<String>,
    /// Extent along each dimension.
    pub shape: Vec<usize>,
    /// Physical units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Descriptive name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
}

// ============================================================================
// SECTION: Dataset Metadata
// ============================================================================

/// Header-level description of an archive object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Dimensions keyed by name.
    pub dimensions: BTreeMap<String, Dimension>,
    /// Variables keyed by name.
    pub variables: BTreeMap<String, VariableInfo>,
    /// Global attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl DatasetMetadata {
    /// Checks internal consistency between variables and dimensions.
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistency found.
    pub fn validate(&self) -> Result<(), String> {
        for (name, dimension) in &self.dimensions {
            if let AxisGrid::Irregular {
                values,
            } = &dimension.grid
                && values.len() != dimension.size
            {
                return Err(format!(
                    "dimension '{name}' lists {} coordinates for size {}",
                    values.len(),
                    dimension.size
                ));
            }
            if let AxisGrid::Time(axis) = &dimension.grid {
                if axis.size != dimension.size {
                    return Err(format!(
                        "time axis '{name}' declares {} steps for size {}",
                        axis.size, dimension.size
                    ));
                }
                if !axis.frequency.is_valid() {
                    return Err(format!("time axis '{name}' has an invalid frequency"));
                }
            }
        }
        for (name, variable) in &self.variables {
            if variable.dims.len() != variable.shape.len() {
                return Err(format!("variable '{name}' has mismatched dims and shape"));
            }
            for (dim, extent) in variable.dims.iter().zip(&variable.shape) {
                let Some(dimension) = self.dimensions.get(dim) else {
                    return Err(format!("variable '{name}' references unknown dimension '{dim}'"));
                };
                if dimension.size != *extent {
                    return Err(format!(
                        "variable '{name}' declares {extent} along '{dim}' but the dimension has {}",
                        dimension.size
                    ));
                }
            }
        }
        Ok(())
    }

    /// First time axis found among the dimensions.
    #[must_use]
    pub fn time_axis(&self) -> Option<&TimeAxis> {
        self.dimensions.values().find_map(|dimension| match &dimension.grid {
            AxisGrid::Time(axis) => Some(axis),
            _ => None,
        })
    }

    /// Names of variables that span at least one non-bounds dimension.
    #[must_use]
    pub fn data_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(name, variable)| {
                !self.dimensions.contains_key(name.as_str())
                    && !name.ends_with("_bnds")
                    && !name.ends_with("_bounds")
                    && !variable.dims.is_empty()
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
