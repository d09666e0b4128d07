// climate-gate-mcp/src/tools/tests.rs
// ============================================================================
// Module: Tool Dispatcher Unit Tests
// Description: Tool name parsing, argument decoding, and the async router.
// Purpose: Ensure the tool set is closed and every known tool answers with an envelope.
// Dependencies: climate-gate-archive, climate-gate-config, climate-gate-core, tokio
// ============================================================================

//! ## Overview
//! Exercises the dispatcher boundary: unknown names are protocol errors,
//! malformed arguments become `invalid_request` envelopes, slow archives are
//! cut off at the call deadline, and each call leaves one audit event.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use climate_gate_archive::InMemoryArchiveStore;
use climate_gate_config::ClimateGateConfig;
use climate_gate_core::ArchiveEntry;
use climate_gate_core::ArchiveError;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::IndexRange;
use climate_gate_core::RawSlice;
use serde_json::Value;
use serde_json::json;

use super::ToolError;
use super::ToolName;
use super::ToolRequest;
use super::ToolRouter;
use super::tool_definitions;
use crate::audit::ToolAuditSink;
use crate::audit::ToolCallEvent;
use crate::pipeline::QueryPipeline;
use crate::pipeline::QueryPipelineConfig;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Sink keeping tool-call events for inspection.
#[derive(Default)]
struct RecordingSink {
    /// Events in arrival order.
    calls: Mutex<Vec<ToolCallEvent>>,
}

impl ToolAuditSink for RecordingSink {
    fn record_tool_call(&self, event: &ToolCallEvent) {
        self.calls.lock().unwrap().push(event.clone());
    }
}

/// Store that answers every call late.
struct SlowStore {
    /// Delay before answering.
    delay: Duration,
}

impl ArchiveStore for SlowStore {
    fn list(&self, path: &ArchivePath) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        thread::sleep(self.delay);
        Err(ArchiveError::NotFound(format!("no directory at '{path}'")))
    }

    fn header(&self, location: &ArchivePath) -> Result<DatasetMetadata, ArchiveError> {
        thread::sleep(self.delay);
        Err(ArchiveError::NotFound(format!("no dataset at '{location}'")))
    }

    fn read_slice(
        &self,
        location: &ArchivePath,
        _variable: &str,
        _ranges: &[IndexRange],
    ) -> Result<RawSlice, ArchiveError> {
        thread::sleep(self.delay);
        Err(ArchiveError::NotFound(format!("no dataset at '{location}'")))
    }
}

fn router_over(
    store: Arc<dyn ArchiveStore>,
    timeout: Duration,
) -> (ToolRouter, Arc<RecordingSink>) {
    let audit = Arc::new(RecordingSink::default());
    let mut config = QueryPipelineConfig::from_config(&ClimateGateConfig::default(), store).unwrap();
    config.audit = audit.clone();
    (ToolRouter::new(Arc::new(QueryPipeline::new(config)), timeout), audit)
}

fn router() -> (ToolRouter, Arc<RecordingSink>) {
    router_over(Arc::new(InMemoryArchiveStore::new()), Duration::from_secs(5))
}

// ============================================================================
// SECTION: Tool Names and Definitions
// ============================================================================

#[test]
fn tool_names_round_trip_through_wire_form() {
    for tool in ToolName::all() {
        assert_eq!(ToolName::parse(tool.as_str()), Some(*tool));
        assert_eq!(tool.to_string(), tool.as_str());
    }
    assert_eq!(ToolName::parse("Query_Data"), None);
    assert_eq!(ToolName::parse(""), None);
}

#[test]
fn every_tool_has_an_object_schema() {
    let definitions = tool_definitions();
    assert_eq!(definitions.len(), ToolName::all().len());
    for definition in &definitions {
        assert_eq!(definition.input_schema["type"], "object");
        assert_eq!(definition.input_schema["additionalProperties"], false);
        assert!(!definition.description.is_empty());
    }
    let query = definitions.iter().find(|d| d.name == ToolName::QueryData).unwrap();
    assert_eq!(query.input_schema["required"], json!(["variable"]));
    assert!(query.input_schema["properties"]["scenario"].is_object());
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

#[test]
fn null_arguments_decode_as_empty() {
    let request = ToolRequest::decode(ToolName::BrowseDirectory, Value::Null).unwrap();
    assert!(matches!(request, ToolRequest::BrowseDirectory(args) if args.path.is_none()));
}

#[test]
fn unknown_fields_are_refused() {
    let err = ToolRequest::decode(
        ToolName::QueryData,
        json!({ "variable": "tas", "chunk_index": 2 }),
    )
    .unwrap_err();
    assert!(err.starts_with("invalid arguments"));
    assert!(err.contains("chunk_index"));
}

#[test]
fn query_requires_a_variable() {
    assert!(ToolRequest::decode(ToolName::QueryData, json!({})).is_err());
    assert!(ToolRequest::decode(ToolName::GetMetadata, json!({ "object": "x.nc" })).is_err());
}

#[test]
fn ranges_must_be_pairs() {
    let err = ToolRequest::decode(
        ToolName::QueryData,
        json!({ "variable": "tas", "lat_range": [10.0, 20.0, 30.0] }),
    );
    assert!(err.is_err());
    let ok = ToolRequest::decode(
        ToolName::QueryData,
        json!({ "variable": "tas", "lon_range": [350.0, 10.0], "lon_convention": "unsigned" }),
    )
    .unwrap();
    assert!(matches!(ok, ToolRequest::QueryData(args) if args.lon_range == Some([350.0, 10.0])));
}

// ============================================================================
// SECTION: Router
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn unknown_tool_is_a_routing_error() {
    let (router, audit) = router();
    let err = router.handle_tool_call(None, "drop_tables", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(name) if name == "drop_tables"));
    assert!(audit.calls.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_arguments_answer_with_an_envelope() {
    let (router, audit) = router();
    let envelope = router
        .handle_tool_call(Some("req-1".to_string()), "get_metadata", json!({ "variable": 5 }))
        .await
        .unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["error_kind"], "invalid_request");
    assert_eq!(envelope["retryable"], false);
    let calls = audit.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool, ToolName::GetMetadata);
    assert_eq!(calls[0].request_id.as_deref(), Some("req-1"));
    assert_eq!(calls[0].error_kind, Some("invalid_request"));
}

#[tokio::test(flavor = "multi_thread")]
async fn every_tool_answers_with_an_envelope() {
    let (router, audit) = router();
    let calls = [
        ("browse_directory", json!({})),
        ("search_variables", json!({ "keyword": "rain" })),
        ("get_metadata", json!({ "variable": "pr" })),
        ("query_data", json!({ "variable": "pr" })),
        ("create_plot", json!({ "plot_type": "bar", "data": { "y": [1.0] } })),
    ];
    for (name, arguments) in calls {
        let envelope = router.handle_tool_call(None, name, arguments).await.unwrap();
        assert!(envelope["status"].is_string(), "{name} lacks a status");
        assert_eq!(envelope["status"], "error", "{name} should fail on an empty archive");
        assert!(envelope["error_kind"].is_string());
    }
    assert_eq!(audit.calls.lock().unwrap().len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_archive_is_reported_unreachable() {
    let store = Arc::new(SlowStore {
        delay: Duration::from_millis(300),
    });
    let (router, audit) = router_over(store, Duration::from_millis(20));
    let envelope = router
        .handle_tool_call(None, "browse_directory", json!({ "path": "scenarioSSP5-85" }))
        .await
        .unwrap();
    assert_eq!(envelope["error_kind"], "unreachable");
    assert_eq!(envelope["retryable"], true);
    assert_eq!(audit.calls.lock().unwrap()[0].status, "error");
}

#[test]
fn deadline_grows_with_planned_reads() {
    let (router, _) = router_over(Arc::new(InMemoryArchiveStore::new()), Duration::from_secs(1));
    let router = router.with_read_allowance(Duration::from_secs(2));
    let browse = ToolRequest::decode(ToolName::BrowseDirectory, json!({})).unwrap();
    assert_eq!(browse.planned_reads(), 0);
    assert_eq!(router.deadline(&browse), Duration::from_secs(1));

    let query = ToolRequest::decode(
        ToolName::QueryData,
        json!({ "variable": "tas", "variables": ["uas", "tas", " "] }),
    )
    .unwrap();
    // Two distinct variables, each possibly split at the seam.
    assert_eq!(query.planned_reads(), 4);
    assert_eq!(router.deadline(&query), Duration::from_secs(9));
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_message_reports_the_applied_deadline() {
    let store = Arc::new(SlowStore {
        delay: Duration::from_millis(300),
    });
    let (router, _) = router_over(store, Duration::from_millis(10));
    let router = router.with_read_allowance(Duration::from_millis(5));
    let envelope = router.handle_tool_call(None, "query_data", json!({ "variable": "tas" })).await.unwrap();
    assert_eq!(envelope["error_kind"], "unreachable");
    assert!(envelope["message"].as_str().unwrap().contains("within 20 ms"));
}
