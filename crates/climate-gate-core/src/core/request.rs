// climate-gate-core/src/core/request.rs
// ============================================================================
// Module: Climate Gate Query Requests
// Description: Immutable, validated description of a bounded data query.
// Purpose: Carry one tool call's selection through estimation and fetching.
// Dependencies: serde, crate::core::{calendar, error, geo, handle}
// ============================================================================

//! ## Overview
//! A [`QueryRequest`] is built once per tool call, after the region has been
//! normalized and the dataset resolved, and is never mutated afterwards.
//! Alternatives proposed by the admission gate are new requests derived with
//! [`QueryRequest::with_time`] and [`QueryRequest::with_region`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::calendar::TimeRange;
use crate::core::error::RequestError;
use crate::core::geo::SpatialBox;
use crate::core::handle::DatasetHandle;

// ============================================================================
// SECTION: Query Request
// ============================================================================

/// Validated request for a bounded slice of one archive object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    /// Resolved dataset handle.
    handle: DatasetHandle,
    /// Requested variables, sorted and deduplicated.
    variables: BTreeSet<String>,
    /// Region in the archive's longitude convention.
    region: SpatialBox,
    /// Inclusive time range; `None` for datasets without a time axis.
    time: Option<TimeRange>,
}

impl QueryRequest {
    /// Builds a request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::NoVariables`] when `variables` is empty.
    pub fn new<I>(
        handle: DatasetHandle,
        variables: I,
        region: SpatialBox,
        time: Option<TimeRange>,
    ) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = String>,
    {
        let variables: BTreeSet<String> =
            variables.into_iter().filter(|name| !name.trim().is_empty()).collect();
        if variables.is_empty() {
            return Err(RequestError::NoVariables);
        }
        Ok(Self {
            handle,
            variables,
            region,
            time,
        })
    }

    /// Dataset handle.
    #[must_use]
    pub const fn handle(&self) -> &DatasetHandle {
        &self.handle
    }

    /// Requested variables in sorted order.
    #[must_use]
    pub const fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// Requested region.
    #[must_use]
    pub const fn region(&self) -> &SpatialBox {
        &self.region
    }

    /// Requested time range.
    #[must_use]
    pub const fn time(&self) -> Option<&TimeRange> {
        self.time.as_ref()
    }

    /// Copy of this request with a different time range.
    #[must_use]
    pub fn with_time(&self, time: TimeRange) -> Self {
        Self {
            time: Some(time),
            ..self.clone()
        }
    }

    /// Copy of this request with a different region.
    #[must_use]
    pub fn with_region(&self, region: SpatialBox) -> Self {
        Self {
            region,
            ..self.clone()
        }
    }
}
