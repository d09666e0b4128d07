// climate-gate-archive/src/catalog.rs
// ============================================================================
// Module: Dataset Catalog
// Description: Read-through cache of archive directory listings.
// Purpose: Avoid repeated remote listings and resolve dataset handles.
// Dependencies: climate-gate-core
// ============================================================================

//! ## Overview
//! [`DatasetCatalog`] wraps an [`ArchiveStore`] and memoizes directory
//! listings in an immutable snapshot behind an `RwLock<Arc<_>>`. Readers clone
//! the `Arc` and release the lock immediately; writers copy the snapshot,
//! insert, and swap it wholesale. No lock is held across a remote call, so a
//! slow listing never blocks concurrent readers.
//!
//! The cache is bounded by entry count. When full, the lexically smallest
//! path is evicted before inserting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use climate_gate_core::ArchiveEntry;
use climate_gate_core::ArchiveError;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::DatasetHandle;
use climate_gate_core::DatasetSelector;
use climate_gate_core::EntryKind;
use climate_gate_core::PipelineError;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable set of cached listings.
type Snapshot = BTreeMap<ArchivePath, Arc<Vec<ArchiveEntry>>>;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Read-through cache of directory listings over an archive store.
pub struct DatasetCatalog {
    /// Underlying store.
    store: Arc<dyn ArchiveStore>,
    /// Maximum cached listings.
    max_entries: usize,
    /// Current snapshot.
    cache: RwLock<Arc<Snapshot>>,
}

impl DatasetCatalog {
    /// Creates a catalog over `store` caching at most `max_entries` listings.
    #[must_use]
    pub fn new(store: Arc<dyn ArchiveStore>, max_entries: usize) -> Self {
        Self {
            store,
            max_entries: max_entries.max(1),
            cache: RwLock::new(Arc::new(Snapshot::new())),
        }
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    /// Lists a directory, serving repeated calls from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the store fails. Failures are not cached.
    pub fn list(&self, path: &ArchivePath) -> Result<Arc<Vec<ArchiveEntry>>, ArchiveError> {
        if let Some(entries) = self.snapshot()?.get(path) {
            return Ok(Arc::clone(entries));
        }
        let mut entries = self.store.list(path)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let entries = Arc::new(entries);
        self.insert(path.clone(), Arc::clone(&entries))?;
        Ok(entries)
    }

    /// Number of cached listings.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Unreachable`] when the cache lock is poisoned.
    pub fn cached_len(&self) -> Result<usize, ArchiveError> {
        Ok(self.snapshot()?.len())
    }

    /// Drops every cached listing.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Unreachable`] when the cache lock is poisoned.
    pub fn invalidate(&self) -> Result<(), ArchiveError> {
        let mut guard = self.cache.write().map_err(|_| poisoned())?;
        *guard = Arc::new(Snapshot::new());
        drop(guard);
        Ok(())
    }

    /// Resolves a selector to one dataset object.
    ///
    /// With `object` set, the named dataset must exist in the version
    /// directory. Otherwise the first dataset in lexical order is chosen.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for malformed selector
    /// segments, [`PipelineError::NotFound`] when the directory or object is
    /// missing, and the mapped store error otherwise.
    pub fn resolve(
        &self,
        selector: &DatasetSelector,
        object: Option<&str>,
    ) -> Result<DatasetHandle, PipelineError> {
        let directory = selector.directory()?;
        let entries = self.list(&directory)?;
        let mut datasets = entries.iter().filter(|entry| entry.kind == EntryKind::Dataset);
        let chosen = match object {
            Some(name) => datasets.find(|entry| entry.name == name).ok_or_else(|| {
                let available: Vec<&str> = entries
                    .iter()
                    .filter(|entry| entry.kind == EntryKind::Dataset)
                    .map(|entry| entry.name.as_str())
                    .collect();
                PipelineError::NotFound(format!(
                    "object '{name}' is not in {directory} (available: {})",
                    available.join(", ")
                ))
            })?,
            None => datasets.next().ok_or_else(|| {
                PipelineError::NotFound(format!("no dataset objects under {directory}"))
            })?,
        };
        Ok(DatasetHandle {
            selector: selector.clone(),
            object: chosen.name.clone(),
        })
    }

    /// Current snapshot.
    fn snapshot(&self) -> Result<Arc<Snapshot>, ArchiveError> {
        let guard = self.cache.read().map_err(|_| poisoned())?;
        Ok(Arc::clone(&guard))
    }

    /// Copies the snapshot with `path` inserted and swaps it in.
    fn insert(&self, path: ArchivePath, entries: Arc<Vec<ArchiveEntry>>) -> Result<(), ArchiveError> {
        let mut guard = self.cache.write().map_err(|_| poisoned())?;
        let mut next = Snapshot::clone(&guard);
        if !next.contains_key(&path) && next.len() >= self.max_entries {
            next.pop_first();
        }
        next.insert(path, entries);
        *guard = Arc::new(next);
        drop(guard);
        Ok(())
    }
}

/// Error for a poisoned cache lock.
fn poisoned() -> ArchiveError {
    ArchiveError::Unreachable("listing cache lock poisoned".to_string())
}
