// climate-gate-mcp/src/envelope.rs
// ============================================================================
// Module: Tool Envelope
// Description: Uniform response shape shared by every tool.
// Purpose: Map pipeline outcomes onto one serializable envelope.
// Dependencies: climate-gate-core, serde
// ============================================================================

//! ## Overview
//! Every known tool answers with a [`ToolEnvelope`]:
//! `{status, data?, message?, alternatives?, error_kind?, retryable?}`.
//! Rejections carry their alternatives; failures carry a stable
//! [`FailureKind`] label and whether a retry may succeed. Internal error types
//! never reach the caller in any other form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use climate_gate_core::ErrorKind;
use climate_gate_core::PipelineError;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// Completed within budget.
    Ok,
    /// Completed, with a caveat in `message`.
    Warning,
    /// Over budget; nothing fetched.
    Rejected,
    /// Failed; see `error_kind`.
    Error,
}

impl EnvelopeStatus {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// SECTION: Failure Kinds
// ============================================================================

/// Failure classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Caller-correctable parameter problem.
    InvalidRequest,
    /// Dataset, object, or variable does not exist.
    NotFound,
    /// Archive could not be reached in time.
    Unreachable,
    /// Archive returned inconsistent data.
    CorruptPayload,
    /// No plot renderer is configured.
    PlotUnavailable,
    /// Unexpected server-side failure.
    Internal,
}

impl FailureKind {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::Unreachable => "unreachable",
            Self::CorruptPayload => "corrupt_payload",
            Self::PlotUnavailable => "plot_unavailable",
            Self::Internal => "internal",
        }
    }

    /// Whether repeating the identical call may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

impl From<ErrorKind> for FailureKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidRequest => Self::InvalidRequest,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Unreachable => Self::Unreachable,
            ErrorKind::CorruptPayload => Self::CorruptPayload,
        }
    }
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Uniform tool response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolEnvelope {
    /// Outcome status.
    pub status: EnvelopeStatus,
    /// Result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable summary, warning, or failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Admissible alternatives attached to a rejection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Value>,
    /// Failure label for error envelopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    /// Whether an error may clear on retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ToolEnvelope {
    /// Successful envelope.
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            status: EnvelopeStatus::Ok,
            data: Some(data),
            message: None,
            alternatives: Vec::new(),
            error_kind: None,
            retryable: None,
        }
    }

    /// Successful envelope with a caveat.
    #[must_use]
    pub fn warning(data: Value, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Warning,
            data: Some(data),
            message: Some(message.into()),
            alternatives: Vec::new(),
            error_kind: None,
            retryable: None,
        }
    }

    /// Over-budget rejection.
    #[must_use]
    pub fn rejected(data: Value, reason: impl Into<String>, alternatives: Vec<Value>) -> Self {
        Self {
            status: EnvelopeStatus::Rejected,
            data: Some(data),
            message: Some(reason.into()),
            alternatives,
            error_kind: None,
            retryable: None,
        }
    }

    /// Failure envelope.
    #[must_use]
    pub fn error(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            data: None,
            message: Some(message.into()),
            alternatives: Vec::new(),
            error_kind: Some(kind),
            retryable: Some(kind.is_retryable()),
        }
    }

    /// Attaches a note to `message`, appending when one exists.
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.message = Some(match self.message.take() {
            Some(existing) => format!("{existing}; {note}"),
            None => note.to_string(),
        });
        self
    }
}

impl From<PipelineError> for ToolEnvelope {
    fn from(err: PipelineError) -> Self {
        Self::error(FailureKind::from(err.kind()), err.to_string())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
