// climate-gate-core/src/core/error.rs
// ============================================================================
// Module: Climate Gate Pipeline Errors
// Description: Error taxonomy shared by every pipeline stage.
// Purpose: Classify failures so callers can tell user mistakes from remote faults.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every stage of the query pipeline reports failures as a [`PipelineError`].
//! The variant is the classification surfaced to agents: invalid requests are
//! the caller's to fix, missing datasets are terminal, unreachable archives
//! are retryable, and corrupt payloads are surfaced verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Stable, serializable classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range request parameters.
    InvalidRequest,
    /// Dataset, object, or variable absent from the archive.
    NotFound,
    /// Transient remote failure.
    Unreachable,
    /// Archive returned data inconsistent with its own header.
    CorruptPayload,
}

impl ErrorKind {
    /// Returns the wire label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::Unreachable => "unreachable",
            Self::CorruptPayload => "corrupt_payload",
        }
    }

    /// Returns true when a caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

// ============================================================================
// SECTION: Pipeline Error
// ============================================================================

/// Failure raised by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Request parameters are malformed or out of range.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested dataset, object, or variable does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Remote archive could not be reached after retrying.
    #[error("archive unreachable: {0}")]
    Unreachable(String),
    /// Archive returned data inconsistent with its header.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
}

impl PipelineError {
    /// Returns the classification for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::CorruptPayload(_) => ErrorKind::CorruptPayload,
        }
    }

    /// Returns the human-readable detail without the classification prefix.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidRequest(detail)
            | Self::NotFound(detail)
            | Self::Unreachable(detail)
            | Self::CorruptPayload(detail) => detail,
        }
    }
}

// ============================================================================
// SECTION: Request Validation Errors
// ============================================================================

/// Validation failures raised while constructing request values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A coordinate was NaN or infinite.
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    /// Latitude outside [-90, 90].
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(String),
    /// Latitude bounds are inverted.
    #[error("lat_min {min} must not exceed lat_max {max}")]
    LatitudeOrder {
        /// Lower bound as supplied.
        min: String,
        /// Upper bound as supplied.
        max: String,
    },
    /// Longitude outside the declared convention's range.
    #[error("longitude {value} is outside {convention} range {range}")]
    LongitudeOutOfRange {
        /// Offending value.
        value: String,
        /// Convention label.
        convention: &'static str,
        /// Human-readable valid range.
        range: &'static str,
    },
    /// Time bound text could not be parsed.
    #[error("invalid date '{0}': expected YYYY-MM or YYYY-MM-DD")]
    InvalidDate(String),
    /// Time range start falls after its end.
    #[error("time range start {start} is after end {end}")]
    TimeOrder {
        /// Start bound as supplied.
        start: String,
        /// End bound as supplied.
        end: String,
    },
    /// No variables were requested.
    #[error("at least one variable must be requested")]
    NoVariables,
    /// An archive path segment is not allowed.
    #[error("invalid archive path segment '{0}'")]
    InvalidPathSegment(String),
}

impl From<RequestError> for PipelineError {
    fn from(error: RequestError) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}
