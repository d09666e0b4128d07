// climate-gate-mcp/src/lib.rs
// ============================================================================
// Module: Climate Gate MCP
// Description: MCP server and tool pipeline for Climate Gate.
// Purpose: Expose archive browsing and admission-controlled queries as tools.
// Dependencies: climate-gate-core, climate-gate-archive, axum, tokio
// ============================================================================

//! ## Overview
//! Climate Gate MCP exposes a closed set of five tools over JSON-RPC 2.0.
//! Every data query flows through the same stages: normalize the region,
//! probe the dataset header, estimate the response, admit or reject, and only
//! then fetch. Each tool answers with a uniform [`ToolEnvelope`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod envelope;
pub mod fetcher;
pub mod glossary;
pub mod pipeline;
pub mod plots;
pub mod probe;
pub mod server;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::CoordinateConversionEvent;
pub use audit::ToolAuditSink;
pub use audit::ToolCallEvent;
pub use audit::ToolCallEventParams;
pub use audit::ToolFileAuditSink;
pub use audit::ToolNoopAuditSink;
pub use audit::ToolStderrAuditSink;
pub use envelope::EnvelopeStatus;
pub use envelope::FailureKind;
pub use envelope::ToolEnvelope;
pub use fetcher::DataFetcher;
pub use pipeline::BrowseArgs;
pub use pipeline::MetadataArgs;
pub use pipeline::QueryDataArgs;
pub use pipeline::QueryPipeline;
pub use pipeline::QueryPipelineConfig;
pub use pipeline::SearchArgs;
pub use pipeline::ToolOutcome;
pub use plots::DirectoryPlotSink;
pub use plots::PlotData;
pub use plots::PlotError;
pub use plots::PlotReceipt;
pub use plots::PlotSink;
pub use plots::PlotSpec;
pub use plots::PlotType;
pub use probe::MetadataProbe;
pub use server::McpServer;
pub use server::McpServerError;
pub use tools::ToolDefinition;
pub use tools::ToolError;
pub use tools::ToolName;
pub use tools::ToolRequest;
pub use tools::ToolRouter;
pub use tools::tool_definitions;
