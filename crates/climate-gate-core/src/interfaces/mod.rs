// climate-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Climate Gate Interfaces
// Description: Backend-agnostic archive access contract.
// Purpose: Define the storage surface used by the probe, fetcher, and catalog.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! [`ArchiveStore`] abstracts the remote archive: directory listings, object
//! headers, and index-addressed reads of a single variable. Implementations
//! must classify failures precisely so the pipeline can separate missing data
//! from transient outages and inconsistent payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ArchivePath;
use crate::core::DatasetMetadata;
use crate::core::IndexRange;
use crate::core::PipelineError;

// ============================================================================
// SECTION: Listings
// ============================================================================

/// Kind of entry in a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Sub-directory.
    Directory,
    /// Data object.
    Dataset,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Entry name (single path segment).
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Object size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

// ============================================================================
// SECTION: Slices
// ============================================================================

/// Raw values returned by an index-addressed read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSlice {
    /// Extent along each dimension of the variable.
    pub shape: Vec<usize>,
    /// Row-major values; missing values are NaN.
    #[serde(with = "nullable_values")]
    pub values: Vec<f64>,
}

/// Serde helpers mapping JSON `null` to NaN and back.
mod nullable_values {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    /// Serializes non-finite values as `null`.
    pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(values.iter().map(|v| if v.is_finite() { Some(*v) } else { None }))
    }

    /// Deserializes `null` entries as NaN.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

// ============================================================================
// SECTION: Archive Store
// ============================================================================

/// Archive access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// Path, object, or variable does not exist.
    #[error("archive object not found: {0}")]
    NotFound(String),
    /// Archive could not be reached or answered with a server error.
    #[error("archive unreachable: {0}")]
    Unreachable(String),
    /// Archive answered with a malformed or oversized payload.
    #[error("archive payload corrupt: {0}")]
    Corrupt(String),
}

impl From<ArchiveError> for PipelineError {
    fn from(error: ArchiveError) -> Self {
        match error {
            ArchiveError::NotFound(detail) => Self::NotFound(detail),
            ArchiveError::Unreachable(detail) => Self::Unreachable(detail),
            ArchiveError::Corrupt(detail) => Self::CorruptPayload(detail),
        }
    }
}

/// Read-only access to the climate archive.
pub trait ArchiveStore: Send + Sync {
    /// Lists the entries of a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the directory is missing or the archive fails.
    fn list(&self, path: &ArchivePath) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    /// Reads an object's header without touching array payloads.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the object is missing or the header is unreadable.
    fn header(&self, location: &ArchivePath) -> Result<DatasetMetadata, ArchiveError>;

    /// Reads one variable restricted to inclusive index ranges, one per dimension.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the variable is missing or the read fails.
    fn read_slice(
        &self,
        location: &ArchivePath,
        variable: &str,
        ranges: &[IndexRange],
    ) -> Result<RawSlice, ArchiveError>;
}
