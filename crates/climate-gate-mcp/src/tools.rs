// climate-gate-mcp/src/tools.rs
// ============================================================================
// Module: Tool Dispatcher
// Description: Closed tool set, typed requests, and the async router.
// Purpose: Route named tool calls through the pipeline with a time bound.
// Dependencies: serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! Callers name a tool by string and pass a loosely typed argument object.
//! [`ToolName::parse`] closes that set at the boundary: an unknown name is a
//! [`ToolError`], never a pipeline concern. Arguments decode into one
//! statically typed [`ToolRequest`] variant per tool; decode failures are
//! answered with an `invalid_request` envelope like any other caller error.
//!
//! The pipeline is blocking. [`ToolRouter`] runs it on the blocking pool under
//! a deadline; a call that outlives the deadline is answered as `unreachable`
//! and its worker finishes in the background without touching shared state.
//! The deadline grows with the array reads a request may plan, so a
//! multi-variable query crossing the longitude seam is not cut off early.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::audit::ToolCallEvent;
use crate::audit::ToolCallEventParams;
use crate::envelope::FailureKind;
use crate::envelope::ToolEnvelope;
use crate::pipeline::BrowseArgs;
use crate::pipeline::MetadataArgs;
use crate::pipeline::QueryDataArgs;
use crate::pipeline::QueryPipeline;
use crate::pipeline::SearchArgs;
use crate::pipeline::ToolOutcome;
use crate::plots::PlotSpec;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Most reads one variable needs: a box crossing the seam is read in two parts.
const MAX_READS_PER_VARIABLE: usize = 2;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Tools exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// List one archive directory.
    BrowseDirectory,
    /// Find variables by name or concept.
    SearchVariables,
    /// Read a dataset header without array data.
    GetMetadata,
    /// Admission-controlled bounded data query.
    QueryData,
    /// Hand a plot specification to the renderer.
    CreatePlot,
}

impl ToolName {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BrowseDirectory => "browse_directory",
            Self::SearchVariables => "search_variables",
            Self::GetMetadata => "get_metadata",
            Self::QueryData => "query_data",
            Self::CreatePlot => "create_plot",
        }
    }

    /// Every tool in listing order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::BrowseDirectory,
            Self::SearchVariables,
            Self::GetMetadata,
            Self::QueryData,
            Self::CreatePlot,
        ]
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: ToolName,
    /// Description shown to the calling agent.
    pub description: String,
    /// JSON Schema of the arguments.
    pub input_schema: Value,
}

/// Schema fragment for optional handle fields.
fn handle_properties() -> Value {
    json!({
        "scenario": { "type": "string", "description": "Scenario directory, e.g. scenarioSSP5-85." },
        "ensemble_member": { "type": "string", "description": "Ensemble member, e.g. r15i1p1f1." },
        "frequency": { "type": "string", "description": "Table id: Amon, Omon, day, 6hr, 3hr." },
        "grid": { "type": "string", "description": "Grid label, e.g. gr3." },
        "version": { "type": "string", "description": "Version directory, e.g. v20210201." },
        "object": { "type": "string", "description": "Object name; first dataset when omitted." }
    })
}

/// Merges extra properties into a schema fragment.
fn with_properties(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

/// Definitions of every tool.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::all().iter().map(|tool| definition(*tool)).collect()
}

/// Definition of one tool.
fn definition(tool: ToolName) -> ToolDefinition {
    let (description, input_schema) = match tool {
        ToolName::BrowseDirectory => (
            "List the entries of one archive directory. Omit path for the archive root.",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Slash-separated archive path." }
                },
                "additionalProperties": false
            }),
        ),
        ToolName::SearchVariables => (
            "Find variables in a scenario/ensemble/frequency directory by name fragment or \
             concept (for example 'temperature').",
            json!({
                "type": "object",
                "properties": {
                    "keyword": { "type": "string" },
                    "scenario": { "type": "string" },
                    "ensemble_member": { "type": "string" },
                    "frequency": { "type": "string" }
                },
                "additionalProperties": false
            }),
        ),
        ToolName::GetMetadata => (
            "Read a dataset header (dimensions, variables, time extent) without array data, \
             plus the estimated cost of its full record.",
            json!({
                "type": "object",
                "properties": with_properties(
                    json!({ "variable": { "type": "string" } }),
                    handle_properties(),
                ),
                "required": ["variable"],
                "additionalProperties": false
            }),
        ),
        ToolName::QueryData => (
            "Fetch a bounded slice. Requests over the token budget are rejected with \
             resubmittable alternatives instead of being fetched.",
            json!({
                "type": "object",
                "properties": with_properties(
                    json!({
                        "variable": { "type": "string" },
                        "variables": { "type": "array", "items": { "type": "string" } },
                        "start_date": { "type": ["string", "null"], "description": "YYYY-MM or YYYY-MM-DD." },
                        "end_date": { "type": ["string", "null"], "description": "YYYY-MM or YYYY-MM-DD." },
                        "lat_range": {
                            "type": ["array", "null"],
                            "items": { "type": "number" },
                            "minItems": 2,
                            "maxItems": 2
                        },
                        "lon_range": {
                            "type": ["array", "null"],
                            "items": { "type": "number" },
                            "minItems": 2,
                            "maxItems": 2,
                            "description": "[min, max] in -180..180 or 0..360; min > max crosses the seam."
                        },
                        "lon_convention": { "type": "string", "enum": ["signed", "unsigned"] }
                    }),
                    handle_properties(),
                ),
                "required": ["variable"],
                "additionalProperties": false
            }),
        ),
        ToolName::CreatePlot => (
            "Validate a plot specification and hand it to the plot renderer.",
            json!({
                "type": "object",
                "properties": {
                    "plot_type": { "type": "string", "enum": ["line", "bar", "scatter", "heatmap", "contour"] },
                    "data": {
                        "type": "object",
                        "properties": {
                            "x": { "type": "array" },
                            "y": { "type": "array" },
                            "z": { "type": "array", "items": { "type": "array" } }
                        },
                        "additionalProperties": false
                    },
                    "title": { "type": "string" },
                    "xlabel": { "type": "string" },
                    "ylabel": { "type": "string" },
                    "style": { "type": "object" },
                    "provenance": { "type": "object" }
                },
                "required": ["plot_type", "data"],
                "additionalProperties": false
            }),
        ),
    };
    ToolDefinition {
        name: tool,
        description: description.to_string(),
        input_schema,
    }
}

// ============================================================================
// SECTION: Typed Requests
// ============================================================================

/// Decoded tool request, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    /// `browse_directory` arguments.
    BrowseDirectory(BrowseArgs),
    /// `search_variables` arguments.
    SearchVariables(SearchArgs),
    /// `get_metadata` arguments.
    GetMetadata(MetadataArgs),
    /// `query_data` arguments.
    QueryData(QueryDataArgs),
    /// `create_plot` arguments.
    CreatePlot(PlotSpec),
}

impl ToolRequest {
    /// Decodes arguments for `tool`; a JSON `null` counts as no arguments.
    ///
    /// # Errors
    ///
    /// Returns the decoder's message when the arguments do not match the
    /// tool's parameter record.
    pub fn decode(tool: ToolName, payload: Value) -> Result<Self, String> {
        let payload = if payload.is_null() { json!({}) } else { payload };
        let request = match tool {
            ToolName::BrowseDirectory => Self::BrowseDirectory(decode(payload)?),
            ToolName::SearchVariables => Self::SearchVariables(decode(payload)?),
            ToolName::GetMetadata => Self::GetMetadata(decode(payload)?),
            ToolName::QueryData => Self::QueryData(decode(payload)?),
            ToolName::CreatePlot => Self::CreatePlot(decode(payload)?),
        };
        Ok(request)
    }

    /// Upper bound on the array reads the request can plan.
    ///
    /// Only `query_data` reads arrays: each distinct variable costs at most
    /// one read per side of the longitude seam.
    #[must_use]
    pub fn planned_reads(&self) -> usize {
        let Self::QueryData(args) = self else {
            return 0;
        };
        let variables: BTreeSet<&str> = std::iter::once(args.variable.as_str())
            .chain(args.variables.iter().map(String::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        variables.len().saturating_mul(MAX_READS_PER_VARIABLE)
    }

    /// Runs the request to completion on the calling thread.
    #[must_use]
    pub fn execute(&self, pipeline: &QueryPipeline) -> ToolOutcome {
        match self {
            Self::BrowseDirectory(args) => pipeline.browse_directory(args),
            Self::SearchVariables(args) => pipeline.search_variables(args),
            Self::GetMetadata(args) => pipeline.get_metadata(args),
            Self::QueryData(args) => pipeline.query_data(args),
            Self::CreatePlot(spec) => pipeline.create_plot(spec),
        }
    }
}

/// Decodes a tool payload into a typed argument record.
fn decode<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|err| format!("invalid arguments: {err}"))
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Async entry point for tool calls.
#[derive(Clone)]
pub struct ToolRouter {
    /// Shared pipeline.
    pipeline: Arc<QueryPipeline>,
    /// Deadline for one tool call before any array read.
    call_timeout: Duration,
    /// Extra time granted per planned array read.
    read_allowance: Duration,
}

impl ToolRouter {
    /// Builds a router over `pipeline` with a fixed per-call deadline.
    #[must_use]
    pub const fn new(pipeline: Arc<QueryPipeline>, call_timeout: Duration) -> Self {
        Self {
            pipeline,
            call_timeout,
            read_allowance: Duration::ZERO,
        }
    }

    /// Grants `allowance` on top of the base deadline for every planned read.
    #[must_use]
    pub const fn with_read_allowance(mut self, allowance: Duration) -> Self {
        self.read_allowance = allowance;
        self
    }

    /// Deadline applied to `request`.
    #[must_use]
    pub fn deadline(&self, request: &ToolRequest) -> Duration {
        let reads = u32::try_from(request.planned_reads()).unwrap_or(u32::MAX);
        self.call_timeout.saturating_add(self.read_allowance.saturating_mul(reads))
    }

    /// Shared pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<QueryPipeline> {
        &self.pipeline
    }

    /// Tools advertised by this server.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    /// Handles a tool call by name and returns the serialized envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for names outside the tool set and
    /// [`ToolError::Serialization`] when the envelope cannot be encoded.
    pub async fn handle_tool_call(
        &self,
        request_id: Option<String>,
        name: &str,
        payload: Value,
    ) -> Result<Value, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let started = Instant::now();
        let outcome = match ToolRequest::decode(tool, payload) {
            Ok(request) => self.run(request).await,
            Err(message) => ToolEnvelope::error(FailureKind::InvalidRequest, message).into(),
        };
        self.pipeline.audit().record_tool_call(&ToolCallEvent::new(ToolCallEventParams {
            tool,
            request_id,
            status: outcome.envelope.status.as_str(),
            error_kind: outcome.envelope.error_kind.map(FailureKind::as_str),
            token_estimate: outcome.token_estimate,
            verdict: outcome.verdict.map(|verdict| verdict.as_str()),
            latency_ms: started.elapsed().as_millis(),
        }));
        serde_json::to_value(&outcome.envelope).map_err(|_| ToolError::Serialization)
    }

    /// Runs a decoded request on the blocking pool under the call deadline.
    async fn run(&self, request: ToolRequest) -> ToolOutcome {
        let deadline = self.deadline(&request);
        let pipeline = Arc::clone(&self.pipeline);
        let task = tokio::task::spawn_blocking(move || request.execute(&pipeline));
        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                ToolEnvelope::error(FailureKind::Internal, format!("tool task failed: {err}")).into()
            }
            Err(_) => ToolEnvelope::error(
                FailureKind::Unreachable,
                format!(
                    "archive did not answer within {} ms; retry later",
                    deadline.as_millis()
                ),
            )
            .into(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Protocol-level routing failures.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// `tools/call` parameters are malformed.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Envelope serialization failed.
    #[error("serialization failure")]
    Serialization,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
