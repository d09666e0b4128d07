// climate-gate-core/src/core/result.rs
// ============================================================================
// Module: Climate Gate Query Results
// Description: Fetched slices, provenance, and degradation records.
// Purpose: Return data together with enough context to reproduce the query.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A [`QueryResult`] carries the fetched [`ArraySlice`] values, the
//! [`Provenance`] of the request that produced them, the admission-time
//! [`SizeEstimate`], and any [`DataGap`] recorded when the archive delivered
//! less than its header promised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde::Serializer;

use crate::core::calendar::TimeRange;
use crate::core::geo::SpatialBox;
use crate::core::handle::DatasetHandle;
use crate::core::metadata::CoordinateValues;
use crate::runtime::estimator::SizeEstimate;

// ============================================================================
// SECTION: Array Slice
// ============================================================================

/// Row-major values of one variable over the selected region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArraySlice {
    /// Variable name.
    pub variable: String,
    /// Dimension names in storage order.
    pub dims: Vec<String>,
    /// Extent along each dimension.
    pub shape: Vec<usize>,
    /// Physical units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Values in row-major order; missing values serialize as `null`.
    #[serde(serialize_with = "serialize_values")]
    pub values: Vec<f64>,
    /// Coordinate labels per dimension, where the header provides them.
    pub coordinates: BTreeMap<String, CoordinateValues>,
}

/// Serializes non-finite values as JSON `null`.
fn serialize_values<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(values.iter().map(|v| if v.is_finite() { Some(*v) } else { None }))
}

// ============================================================================
// SECTION: Provenance
// ============================================================================

/// Context sufficient to reproduce a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    /// Dataset the values came from.
    pub dataset: DatasetHandle,
    /// Variables requested.
    pub variables: Vec<String>,
    /// Region in the archive's convention.
    pub region: SpatialBox,
    /// Time range requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeRange>,
    /// RFC 3339 timestamp of the fetch.
    pub fetch_time: String,
}

// ============================================================================
// SECTION: Data Gaps
// ============================================================================

/// Shortfall between what the header promised and what was delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataGap {
    /// Variable affected.
    pub variable: String,
    /// Description of what is missing.
    pub detail: String,
}

// ============================================================================
// SECTION: Query Result
// ============================================================================

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Fetched slices, one per delivered variable.
    pub slices: Vec<ArraySlice>,
    /// Request provenance.
    pub provenance: Provenance,
    /// Estimate the request was admitted under.
    pub size_estimate: SizeEstimate,
    /// Gaps recorded during the fetch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<DataGap>,
}

impl QueryResult {
    /// Returns true when the archive delivered less than requested.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.gaps.is_empty()
    }
}
