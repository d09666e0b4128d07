// climate-gate-mcp/src/fetcher.rs
// ============================================================================
// Module: Data Fetcher
// Description: Bounded array reads for admitted requests.
// Purpose: Materialize exactly the admitted selection with provenance.
// Dependencies: climate-gate-core, time
// ============================================================================

//! ## Overview
//! [`DataFetcher`] executes the reads of an [`AdmittedRequest`]'s slice plan
//! and nothing else: every read is index-addressed and bounded by the plan the
//! estimate was computed from. A region crossing the longitude seam is read in
//! two parts and concatenated back along that dimension.
//!
//! Shortfalls are reported, not hidden. Fewer time steps than the header
//! promised, or a requested variable the object cannot serve, become
//! [`DataGap`] entries on a still-successful [`QueryResult`]. Values that do
//! not fit the requested shape are [`PipelineError::CorruptPayload`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use climate_gate_core::AdmittedRequest;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::ArraySlice;
use climate_gate_core::AxisGrid;
use climate_gate_core::CoordinateValues;
use climate_gate_core::DataGap;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::DimensionKind;
use climate_gate_core::IndexRange;
use climate_gate_core::PipelineError;
use climate_gate_core::Provenance;
use climate_gate_core::QueryResult;
use climate_gate_core::RawSlice;
use climate_gate_core::runtime::VariablePlan;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::probe::retry_once;

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Executes admitted reads against the archive.
pub struct DataFetcher {
    /// Archive store.
    store: Arc<dyn ArchiveStore>,
    /// Delay before retrying an unreachable read.
    retry_backoff: Duration,
}

impl DataFetcher {
    /// Builds a fetcher over `store`.
    #[must_use]
    pub const fn new(store: Arc<dyn ArchiveStore>, retry_backoff: Duration) -> Self {
        Self {
            store,
            retry_backoff,
        }
    }

    /// Reads the admitted selection.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Unreachable`] when a read keeps failing after
    /// one retry, [`PipelineError::CorruptPayload`] when returned values do
    /// not match the requested shape, and [`PipelineError::NotFound`] when no
    /// requested variable could be read at all.
    pub fn fetch(
        &self,
        admitted: &AdmittedRequest,
        metadata: &DatasetMetadata,
    ) -> Result<QueryResult, PipelineError> {
        let request = admitted.request();
        let location = request.handle().location()?;
        let mut slices = Vec::with_capacity(admitted.plan().variables.len());
        let mut gaps = Vec::new();
        for plan in &admitted.plan().variables {
            match self.fetch_variable(&location, plan, metadata) {
                Ok((slice, gap)) => {
                    slices.push(slice);
                    gaps.extend(gap);
                }
                Err(PipelineError::NotFound(detail)) => gaps.push(DataGap {
                    variable: plan.variable.clone(),
                    detail: format!("variable could not be read: {detail}"),
                }),
                Err(err) => return Err(err),
            }
        }
        if slices.is_empty() {
            let details: Vec<String> = gaps.iter().map(|gap| gap.detail.clone()).collect();
            return Err(PipelineError::NotFound(format!(
                "no requested variable could be read from {}: {}",
                request.handle(),
                details.join("; ")
            )));
        }
        let fetch_time = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        Ok(QueryResult {
            slices,
            provenance: Provenance {
                dataset: request.handle().clone(),
                variables: request.variables().iter().cloned().collect(),
                region: *request.region(),
                time: request.time().copied(),
                fetch_time,
            },
            size_estimate: admitted.estimate().clone(),
            gaps,
        })
    }

    /// Reads one variable, concatenating split reads in order.
    fn fetch_variable(
        &self,
        location: &ArchivePath,
        plan: &VariablePlan,
        metadata: &DatasetMetadata,
    ) -> Result<(ArraySlice, Option<DataGap>), PipelineError> {
        let leading_is_time = plan.dims.first().is_some_and(|dim| dim.kind == DimensionKind::Time);
        let mut parts = Vec::new();
        for ranges in plan.reads() {
            let part = retry_once(self.retry_backoff, || {
                self.store.read_slice(location, &plan.variable, &ranges).map_err(PipelineError::from)
            })?;
            check_part(&plan.variable, &part, &ranges, leading_is_time)?;
            parts.push(part);
        }
        let raw = concat(&plan.variable, parts, plan.split_axis())?;
        let delivered = if leading_is_time { raw.shape.first().copied() } else { None };
        let gap = delivered.and_then(|steps| time_gap(plan, metadata, steps));
        let coordinates = coordinates(plan, metadata, delivered)?;
        let units = metadata.variables.get(&plan.variable).and_then(|info| info.units.clone());
        Ok((
            ArraySlice {
                variable: plan.variable.clone(),
                dims: plan.dims.iter().map(|dim| dim.name.clone()).collect(),
                shape: raw.shape,
                units,
                values: raw.values,
                coordinates,
            },
            gap,
        ))
    }
}

// ============================================================================
// SECTION: Shape Checks
// ============================================================================

/// Verifies that a read returned the requested hyper-rectangle.
///
/// A leading time dimension may be shorter than requested.
fn check_part(
    variable: &str,
    part: &RawSlice,
    ranges: &[IndexRange],
    leading_is_time: bool,
) -> Result<(), PipelineError> {
    if part.shape.len() != ranges.len() {
        return Err(PipelineError::CorruptPayload(format!(
            "read of '{variable}' returned {} dimensions, expected {}",
            part.shape.len(),
            ranges.len()
        )));
    }
    for (axis, (got, range)) in part.shape.iter().zip(ranges).enumerate() {
        let short_time = axis == 0 && leading_is_time && *got <= range.len();
        if *got != range.len() && !short_time {
            return Err(PipelineError::CorruptPayload(format!(
                "read of '{variable}' returned extent {got} along axis {axis}, expected {}",
                range.len()
            )));
        }
    }
    let expected = part.shape.iter().product::<usize>();
    if part.values.len() != expected {
        return Err(PipelineError::CorruptPayload(format!(
            "read of '{variable}' returned {} values for {expected} cells",
            part.values.len()
        )));
    }
    Ok(())
}

/// Concatenates row-major parts along `axis`.
fn concat(
    variable: &str,
    mut parts: Vec<RawSlice>,
    axis: Option<usize>,
) -> Result<RawSlice, PipelineError> {
    let (Some(axis), true) = (axis, parts.len() > 1) else {
        return parts.pop().ok_or_else(|| {
            PipelineError::CorruptPayload(format!("no reads planned for '{variable}'"))
        });
    };
    let Some(first) = parts.first() else {
        return Err(PipelineError::CorruptPayload(format!("no reads planned for '{variable}'")));
    };
    let mut shape = first.shape.clone();
    for part in &parts {
        let agrees = part.shape.len() == shape.len()
            && part.shape.iter().zip(&shape).enumerate().all(|(i, (a, b))| i == axis || a == b);
        if !agrees {
            return Err(PipelineError::CorruptPayload(format!(
                "split reads of '{variable}' disagree on shape"
            )));
        }
    }
    let outer = shape[.. axis].iter().product::<usize>();
    let inner = shape[axis + 1 ..].iter().product::<usize>();
    shape[axis] = parts.iter().map(|part| part.shape[axis]).sum();
    let mut values = Vec::with_capacity(shape.iter().product());
    for row in 0 .. outer {
        for part in &parts {
            let block = part.shape[axis] * inner;
            values.extend_from_slice(&part.values[row * block .. (row + 1) * block]);
        }
    }
    Ok(RawSlice {
        shape,
        values,
    })
}

// ============================================================================
// SECTION: Gaps and Coordinates
// ============================================================================

/// Gap describing time steps the archive did not deliver.
fn time_gap(plan: &VariablePlan, metadata: &DatasetMetadata, delivered: usize) -> Option<DataGap> {
    let dim = plan.dims.first()?;
    let range = dim.ranges.first()?;
    let requested = range.len();
    if delivered >= requested {
        return None;
    }
    let first_missing = range.start + delivered;
    let missing = match metadata.dimensions.get(&dim.name).map(|d| &d.grid) {
        Some(AxisGrid::Time(axis)) => {
            format!("{}..{}", axis.label_at(first_missing), axis.label_at(range.end))
        }
        _ => format!("steps {first_missing}..{}", range.end),
    };
    Some(DataGap {
        variable: plan.variable.clone(),
        detail: format!(
            "received {delivered} of {requested} time steps; {missing} is missing from the archive"
        ),
    })
}

/// Coordinate labels per dimension for the delivered selection.
fn coordinates(
    plan: &VariablePlan,
    metadata: &DatasetMetadata,
    delivered_time: Option<usize>,
) -> Result<BTreeMap<String, CoordinateValues>, PipelineError> {
    let mut coordinates = BTreeMap::new();
    for (axis, dim) in plan.dims.iter().enumerate() {
        let Some(dimension) = metadata.dimensions.get(&dim.name) else {
            return Err(PipelineError::CorruptPayload(format!(
                "variable '{}' references unknown dimension '{}'",
                plan.variable, dim.name
            )));
        };
        let mut labels: Option<CoordinateValues> = None;
        for range in &dim.ranges {
            let range = match (axis, delivered_time) {
                (0, Some(0)) => continue,
                (0, Some(steps)) if steps < range.len() => {
                    IndexRange::new(range.start, range.start + steps - 1)
                }
                _ => *range,
            };
            let Some(values) = dimension.coordinates(range) else {
                continue;
            };
            match labels.as_mut() {
                Some(existing) => existing.extend(values),
                None => labels = Some(values),
            }
        }
        if let Some(labels) = labels {
            coordinates.insert(dim.name.clone(), labels);
        }
    }
    Ok(coordinates)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
