// climate-gate-archive/src/memory.rs
// ============================================================================
// Module: In-Memory Archive Store
// Description: Archive store backed by in-process datasets.
// Purpose: Serve fixtures for offline estimation, demos, and tests.
// Dependencies: climate-gate-core, serde_json
// ============================================================================

//! ## Overview
//! [`InMemoryArchiveStore`] holds dataset headers and full row-major arrays.
//! Inserting a dataset registers every parent directory so listings behave
//! like the remote hierarchy. Arrays shorter than the declared shape are
//! served up to the last complete leading-dimension record, which mimics an
//! archive object truncated along time. Injected outages let callers exercise
//! retry and error paths without a network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use climate_gate_core::ArchiveEntry;
use climate_gate_core::ArchiveError;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::EntryKind;
use climate_gate_core::IndexRange;
use climate_gate_core::RawSlice;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum fixture file size in bytes.
const MAX_FIXTURE_BYTES: u64 = 256 * 1024 * 1024;

// ============================================================================
// SECTION: Fixture Format
// ============================================================================

/// Fixture loading errors.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Fixture file could not be read.
    #[error("fixture io error: {0}")]
    Io(String),
    /// Fixture content is malformed.
    #[error("invalid fixture: {0}")]
    Invalid(String),
}

/// Fixture file layout.
#[derive(Debug, Deserialize)]
struct FixtureFile {
    /// Datasets to register.
    datasets: Vec<FixtureDataset>,
}

/// One dataset in a fixture file.
#[derive(Debug, Deserialize)]
struct FixtureDataset {
    /// Full object path.
    location: ArchivePath,
    /// Dataset header.
    metadata: DatasetMetadata,
    /// Row-major arrays keyed by variable; `null` entries are missing values.
    #[serde(default)]
    arrays: BTreeMap<String, NullableArray>,
}

/// Array whose `null` entries deserialize as NaN.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct NullableArray(Vec<Option<f64>>);

// ============================================================================
// SECTION: Store
// ============================================================================

/// Stored dataset.
#[derive(Debug, Clone)]
struct StoredDataset {
    /// Dataset header.
    metadata: DatasetMetadata,
    /// Row-major arrays keyed by variable.
    arrays: BTreeMap<String, Vec<f64>>,
}

/// Archive store holding datasets in memory.
#[derive(Debug, Default)]
pub struct InMemoryArchiveStore {
    /// Directory listings keyed by directory path.
    directories: BTreeMap<ArchivePath, BTreeMap<String, ArchiveEntry>>,
    /// Datasets keyed by object path.
    datasets: BTreeMap<ArchivePath, StoredDataset>,
    /// Remaining calls that fail as unreachable.
    outages: AtomicUsize,
    /// Listing calls served.
    list_calls: AtomicUsize,
    /// Header calls served.
    header_calls: AtomicUsize,
}

impl InMemoryArchiveStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the file cannot be read or is malformed.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let size = fs::metadata(path).map_err(|err| FixtureError::Io(err.to_string()))?.len();
        if size > MAX_FIXTURE_BYTES {
            return Err(FixtureError::Invalid("fixture file exceeds size limit".to_string()));
        }
        let bytes = fs::read(path).map_err(|err| FixtureError::Io(err.to_string()))?;
        Self::from_json(&bytes)
    }

    /// Parses fixture JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Invalid`] when the JSON or any dataset is malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, FixtureError> {
        let file: FixtureFile =
            serde_json::from_slice(bytes).map_err(|err| FixtureError::Invalid(err.to_string()))?;
        let mut store = Self::new();
        for dataset in file.datasets {
            let arrays = dataset
                .arrays
                .into_iter()
                .map(|(name, NullableArray(values))| {
                    (name, values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
                })
                .collect();
            store.insert_dataset(dataset.location, dataset.metadata, arrays)?;
        }
        Ok(store)
    }

    /// Registers a dataset and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Invalid`] when the location is the root, the
    /// header is inconsistent, or an array is longer than its variable's shape.
    pub fn insert_dataset(
        &mut self,
        location: ArchivePath,
        metadata: DatasetMetadata,
        arrays: BTreeMap<String, Vec<f64>>,
    ) -> Result<(), FixtureError> {
        let Some(name) = location.name().map(str::to_string) else {
            return Err(FixtureError::Invalid("dataset location must not be the root".to_string()));
        };
        metadata.validate().map_err(|err| FixtureError::Invalid(format!("{location}: {err}")))?;
        for (variable, values) in &arrays {
            let Some(info) = metadata.variables.get(variable) else {
                return Err(FixtureError::Invalid(format!(
                    "{location}: array for undeclared variable '{variable}'"
                )));
            };
            let declared = info.shape.iter().product::<usize>();
            if values.len() > declared {
                return Err(FixtureError::Invalid(format!(
                    "{location}: array '{variable}' holds {} values for shape {}",
                    values.len(),
                    shape_label(&info.shape)
                )));
            }
        }
        let size_bytes = arrays.values().map(|values| values.len() as u64 * 8).sum::<u64>();
        self.register_parents(&location);
        let parent = parent_of(&location);
        self.directories.entry(parent).or_default().insert(
            name.clone(),
            ArchiveEntry {
                name,
                kind: EntryKind::Dataset,
                size_bytes: Some(size_bytes),
            },
        );
        self.datasets.insert(
            location,
            StoredDataset {
                metadata,
                arrays,
            },
        );
        Ok(())
    }

    /// Makes the next `count` calls fail as unreachable.
    pub fn fail_next(&self, count: usize) {
        self.outages.store(count, Ordering::SeqCst);
    }

    /// Number of listing calls served.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of header calls served.
    #[must_use]
    pub fn header_calls(&self) -> usize {
        self.header_calls.load(Ordering::SeqCst)
    }

    /// Registers directory entries for every ancestor of `location`.
    fn register_parents(&mut self, location: &ArchivePath) {
        let segments = location.segments();
        let mut current = ArchivePath::root();
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            let Ok(child) = current.join(segment) else {
                return;
            };
            self.directories.entry(current.clone()).or_default().insert(
                segment.clone(),
                ArchiveEntry {
                    name: segment.clone(),
                    kind: EntryKind::Directory,
                    size_bytes: None,
                },
            );
            self.directories.entry(child.clone()).or_default();
            current = child;
        }
    }

    /// Consumes one injected outage, if any.
    fn check_outage(&self, what: &str) -> Result<(), ArchiveError> {
        let consumed = self
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(ArchiveError::Unreachable(format!("{what}: injected outage")));
        }
        Ok(())
    }

    /// Looks up a stored dataset.
    fn dataset(&self, location: &ArchivePath) -> Result<&StoredDataset, ArchiveError> {
        self.datasets
            .get(location)
            .ok_or_else(|| ArchiveError::NotFound(format!("no dataset at '{location}'")))
    }
}

impl ArchiveStore for InMemoryArchiveStore {
    fn list(&self, path: &ArchivePath) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_outage(&format!("listing of '{path}'"))?;
        self.directories
            .get(path)
            .map(|entries| entries.values().cloned().collect())
            .ok_or_else(|| ArchiveError::NotFound(format!("no directory at '{path}'")))
    }

    fn header(&self, location: &ArchivePath) -> Result<DatasetMetadata, ArchiveError> {
        self.header_calls.fetch_add(1, Ordering::SeqCst);
        self.check_outage(&format!("header of '{location}'"))?;
        Ok(self.dataset(location)?.metadata.clone())
    }

    fn read_slice(
        &self,
        location: &ArchivePath,
        variable: &str,
        ranges: &[IndexRange],
    ) -> Result<RawSlice, ArchiveError> {
        self.check_outage(&format!("slice of '{variable}' from '{location}'"))?;
        let dataset = self.dataset(location)?;
        let (Some(info), Some(values)) =
            (dataset.metadata.variables.get(variable), dataset.arrays.get(variable))
        else {
            return Err(ArchiveError::NotFound(format!(
                "variable '{variable}' has no data at '{location}'"
            )));
        };
        if ranges.len() != info.shape.len() {
            return Err(ArchiveError::NotFound(format!(
                "variable '{variable}' has {} dimensions, read asked for {}",
                info.shape.len(),
                ranges.len()
            )));
        }
        for (range, extent) in ranges.iter().zip(&info.shape) {
            if range.end >= *extent {
                return Err(ArchiveError::NotFound(format!(
                    "index {} is outside '{variable}' extent {extent}",
                    range.end
                )));
            }
        }
        Ok(extract(values, &info.shape, ranges))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Directory containing `location`.
fn parent_of(location: &ArchivePath) -> ArchivePath {
    let segments = location.segments();
    let mut parent = ArchivePath::root();
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        if let Ok(next) = parent.join(segment) {
            parent = next;
        }
    }
    parent
}

/// Copies the hyper-rectangle selected by `ranges` out of a row-major array.
///
/// Only complete leading-dimension records present in `values` are returned.
fn extract(values: &[f64], shape: &[usize], ranges: &[IndexRange]) -> RawSlice {
    let record = shape.iter().skip(1).product::<usize>().max(1);
    let available = values.len() / record;
    let mut out_shape: Vec<usize> = ranges.iter().map(IndexRange::len).collect();
    let Some(first) = ranges.first() else {
        return RawSlice {
            shape: Vec::new(),
            values: values.first().copied().into_iter().collect(),
        };
    };
    let leading = if first.start >= available {
        0
    } else {
        first.end.min(available - 1) - first.start + 1
    };
    out_shape[0] = leading;
    let total = out_shape.iter().product::<usize>();
    let mut out = Vec::with_capacity(total);
    let mut index = vec![0_usize; ranges.len()];
    for _ in 0 .. total {
        let mut offset = 0;
        for (axis, range) in ranges.iter().enumerate() {
            offset = offset * shape[axis] + range.start + index[axis];
        }
        out.push(values.get(offset).copied().unwrap_or(f64::NAN));
        for axis in (0 .. ranges.len()).rev() {
            index[axis] += 1;
            if index[axis] < out_shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    RawSlice {
        shape: out_shape,
        values: out,
    }
}

/// Renders a shape as `[a, b, c]`.
fn shape_label(shape: &[usize]) -> String {
    let parts: Vec<String> = shape.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}
