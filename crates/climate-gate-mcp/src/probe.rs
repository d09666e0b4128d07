// climate-gate-mcp/src/probe.rs
// ============================================================================
// Module: Metadata Probe
// Description: Header-only dataset inspection with one bounded retry.
// Purpose: Resolve dataset handles and read structure without bulk transfer.
// Dependencies: climate-gate-archive, climate-gate-core
// ============================================================================

//! ## Overview
//! [`MetadataProbe`] resolves a [`DatasetSelector`] through the listing cache
//! and reads the object's header. Only listings and headers cross the wire;
//! array payloads are never requested here. Unreachable failures are retried
//! once after the configured backoff, then surfaced as
//! [`PipelineError::Unreachable`] so callers can offer a retry instead of a
//! correction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use climate_gate_archive::DatasetCatalog;
use climate_gate_core::DatasetHandle;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::DatasetSelector;
use climate_gate_core::ErrorKind;
use climate_gate_core::PipelineError;

// ============================================================================
// SECTION: Retry
// ============================================================================

/// Runs `op`, retrying once after `backoff` when it fails as unreachable.
pub(crate) fn retry_once<T>(
    backoff: Duration,
    mut op: impl FnMut() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    match op() {
        Err(err) if err.kind() == ErrorKind::Unreachable => {
            if !backoff.is_zero() {
                thread::sleep(backoff);
            }
            op()
        }
        outcome => outcome,
    }
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Header-only view of archive datasets.
pub struct MetadataProbe {
    /// Listing cache over the archive store.
    catalog: Arc<DatasetCatalog>,
    /// Delay before retrying an unreachable archive.
    retry_backoff: Duration,
}

impl MetadataProbe {
    /// Builds a probe over `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<DatasetCatalog>, retry_backoff: Duration) -> Self {
        Self {
            catalog,
            retry_backoff,
        }
    }

    /// Listing cache used for resolution.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<DatasetCatalog> {
        &self.catalog
    }

    /// Resolves a selector to a dataset handle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] when the directory or object does
    /// not exist and [`PipelineError::Unreachable`] when the archive stays
    /// unreachable after one retry.
    pub fn resolve(
        &self,
        selector: &DatasetSelector,
        object: Option<&str>,
    ) -> Result<DatasetHandle, PipelineError> {
        retry_once(self.retry_backoff, || self.catalog.resolve(selector, object))
    }

    /// Reads and validates the header of `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] when the object does not exist,
    /// [`PipelineError::Unreachable`] when the archive stays unreachable after
    /// one retry, and [`PipelineError::CorruptPayload`] when the header is
    /// internally inconsistent.
    pub fn probe(&self, handle: &DatasetHandle) -> Result<DatasetMetadata, PipelineError> {
        let location = handle.location()?;
        let metadata = retry_once(self.retry_backoff, || {
            self.catalog.store().header(&location).map_err(PipelineError::from)
        })?;
        metadata
            .validate()
            .map_err(|err| PipelineError::CorruptPayload(format!("header of {handle}: {err}")))?;
        Ok(metadata)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
