// climate-gate-core/src/core/handle.rs
// ============================================================================
// Module: Climate Gate Dataset Handles
// Description: Archive paths, dataset selectors, and resolved handles.
// Purpose: Address archive objects through a validated directory hierarchy.
// Dependencies: serde, crate::core::error
// ============================================================================

//! ## Overview
//! The archive is organized as
//! `scenario/ensemble_member/frequency/variable/grid/version/<object>`.
//! [`ArchivePath`] validates each segment so no caller text can escape the
//! hierarchy. A [`DatasetSelector`] names a version directory and an optional
//! object, and a [`DatasetHandle`] is the fully resolved object location.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::RequestError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single path segment.
const MAX_SEGMENT_LEN: usize = 128;

/// Maximum number of path segments.
const MAX_SEGMENTS: usize = 8;

// ============================================================================
// SECTION: Archive Path
// ============================================================================

/// Validated relative path inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArchivePath {
    /// Path segments from the archive root.
    segments: Vec<String>,
}

impl ArchivePath {
    /// Archive root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a slash-separated path; leading, trailing, and repeated slashes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPathSegment`] when a segment is empty after
    /// trimming, is `.` or `..`, is too long, or contains characters outside
    /// `[A-Za-z0-9_.+-]`, or when the path is too deep.
    pub fn parse(text: &str) -> Result<Self, RequestError> {
        let mut path = Self::root();
        for segment in text.split('/').filter(|segment| !segment.is_empty()) {
            path = path.join(segment)?;
        }
        Ok(path)
    }

    /// Returns a new path with `segment` appended.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPathSegment`] when the segment is not allowed.
    pub fn join(&self, segment: &str) -> Result<Self, RequestError> {
        validate_segment(segment)?;
        if self.segments.len() >= MAX_SEGMENTS {
            return Err(RequestError::InvalidPathSegment(segment.to_string()));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self {
            segments,
        })
    }

    /// Path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final segment, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns true for the archive root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Checks a single path segment.
fn validate_segment(segment: &str) -> Result<(), RequestError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+');
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.len() > MAX_SEGMENT_LEN
        || !segment.chars().all(allowed)
    {
        return Err(RequestError::InvalidPathSegment(segment.to_string()));
    }
    Ok(())
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl TryFrom<String> for ArchivePath {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArchivePath> for String {
    fn from(path: ArchivePath) -> Self {
        path.to_string()
    }
}

// ============================================================================
// SECTION: Dataset Selector
// ============================================================================

/// Caller-supplied coordinates of a dataset version directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetSelector {
    /// Experiment or scenario (`historical`, `scenarioSSP5-85`, ...).
    pub scenario: String,
    /// Ensemble member label (`r1i1p1f1`).
    pub ensemble_member: String,
    /// CMIP table identifier (`Amon`, `day`, ...).
    pub frequency: String,
    /// Variable directory (`tas`, `pr`, ...).
    pub variable: String,
    /// Grid label (`gr3`).
    pub grid: String,
    /// Dataset version (`v20210201`).
    pub version: String,
}

impl DatasetSelector {
    /// Version directory holding the dataset's objects.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPathSegment`] when any component is not a
    /// valid path segment.
    pub fn directory(&self) -> Result<ArchivePath, RequestError> {
        ArchivePath::root()
            .join(&self.scenario)?
            .join(&self.ensemble_member)?
            .join(&self.frequency)?
            .join(&self.variable)?
            .join(&self.grid)?
            .join(&self.version)
    }
}

// ============================================================================
// SECTION: Dataset Handle
// ============================================================================

/// Resolved location of one archive object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHandle {
    /// Directory coordinates.
    #[serde(flatten)]
    pub selector: DatasetSelector,
    /// Object name within the version directory.
    pub object: String,
}

impl DatasetHandle {
    /// Full object path.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPathSegment`] when any component is not a
    /// valid path segment.
    pub fn location(&self) -> Result<ArchivePath, RequestError> {
        self.selector.directory()?.join(&self.object)
    }
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.selector;
        write!(
            f,
            "{}/{}/{}/{}/{}/{}/{}",
            s.scenario, s.ensemble_member, s.frequency, s.variable, s.grid, s.version, self.object
        )
    }
}
