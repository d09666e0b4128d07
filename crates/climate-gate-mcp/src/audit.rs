// climate-gate-mcp/src/audit.rs
// ============================================================================
// Module: Tool Audit Logging
// Description: Structured audit events for tool invocations.
// Purpose: Emit one JSON line per tool call and per coordinate rewrite.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are flat, serializable records written as JSON lines. A
//! `tool_call` event summarizes every invocation (status, error kind, token
//! estimate, verdict, latency). A `coordinate_conversion` event records the
//! box a caller supplied next to the box that was actually queried whenever
//! the normalizer rewrote longitudes. Sinks decide where lines go; the
//! dispatcher never blocks on a sink failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use climate_gate_core::SpatialBox;
use serde::Serialize;

use crate::tools::ToolName;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Audit record for one tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Tool invoked.
    pub tool: ToolName,
    /// JSON-RPC request identifier when provided.
    pub request_id: Option<String>,
    /// Envelope status label.
    pub status: &'static str,
    /// Failure label for error envelopes.
    pub error_kind: Option<&'static str>,
    /// Token estimate when the call was admission-checked.
    pub token_estimate: Option<u64>,
    /// Admission verdict label when the call was admission-checked.
    pub verdict: Option<&'static str>,
    /// Wall-clock latency of the call.
    pub latency_ms: u128,
}

/// Inputs required to construct a [`ToolCallEvent`].
pub struct ToolCallEventParams {
    /// Tool invoked.
    pub tool: ToolName,
    /// JSON-RPC request identifier when provided.
    pub request_id: Option<String>,
    /// Envelope status label.
    pub status: &'static str,
    /// Failure label for error envelopes.
    pub error_kind: Option<&'static str>,
    /// Token estimate when the call was admission-checked.
    pub token_estimate: Option<u64>,
    /// Admission verdict label.
    pub verdict: Option<&'static str>,
    /// Wall-clock latency of the call.
    pub latency_ms: u128,
}

impl ToolCallEvent {
    /// Stamps a tool-call event.
    #[must_use]
    pub fn new(params: ToolCallEventParams) -> Self {
        Self {
            event: "tool_call",
            timestamp_ms: now_ms(),
            tool: params.tool,
            request_id: params.request_id,
            status: params.status,
            error_kind: params.error_kind,
            token_estimate: params.token_estimate,
            verdict: params.verdict,
            latency_ms: params.latency_ms,
        }
    }
}

/// Audit record for a longitude convention rewrite.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinateConversionEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Box as supplied by the caller.
    pub original: SpatialBox,
    /// Box in the archive's convention.
    pub normalized: SpatialBox,
}

impl CoordinateConversionEvent {
    /// Stamps a conversion event.
    #[must_use]
    pub fn new(original: SpatialBox, normalized: SpatialBox) -> Self {
        Self {
            event: "coordinate_conversion",
            timestamp_ms: now_ms(),
            original,
            normalized,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit events.
pub trait ToolAuditSink: Send + Sync {
    /// Records a tool-call event.
    fn record_tool_call(&self, event: &ToolCallEvent);

    /// Records a coordinate conversion event.
    fn record_conversion(&self, _event: &CoordinateConversionEvent) {}
}

/// Audit sink writing JSON lines to stderr.
pub struct ToolStderrAuditSink;

impl ToolStderrAuditSink {
    /// Writes one serialized event line.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl ToolAuditSink for ToolStderrAuditSink {
    fn record_tool_call(&self, event: &ToolCallEvent) {
        Self::emit(event);
    }

    fn record_conversion(&self, event: &CoordinateConversionEvent) {
        Self::emit(event);
    }
}

/// Audit sink appending JSON lines to a file.
pub struct ToolFileAuditSink {
    /// Append-only log handle.
    file: Mutex<std::fs::File>,
}

impl ToolFileAuditSink {
    /// Opens (or creates) the log at `path` in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event line.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ToolAuditSink for ToolFileAuditSink {
    fn record_tool_call(&self, event: &ToolCallEvent) {
        self.emit(event);
    }

    fn record_conversion(&self, event: &CoordinateConversionEvent) {
        self.emit(event);
    }
}

/// Audit sink that drops every event.
pub struct ToolNoopAuditSink;

impl ToolAuditSink for ToolNoopAuditSink {
    fn record_tool_call(&self, _event: &ToolCallEvent) {}
}
