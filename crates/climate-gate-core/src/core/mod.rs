// climate-gate-core/src/core/mod.rs
// ============================================================================
// Module: Climate Gate Core Types
// Description: Canonical request, metadata, and result structures.
// Purpose: Provide stable, serializable types shared by every pipeline stage.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types describe what a caller asks for (regions, time ranges, dataset
//! handles), what an archive object contains (dimensions, axes, variables),
//! and what the pipeline returns (slices and provenance). These types are the
//! source of truth for the MCP tool surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod calendar;
pub mod error;
pub mod geo;
pub mod handle;
pub mod metadata;
pub mod request;
pub mod result;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use calendar::Calendar;
pub use calendar::CalendarDate;
pub use calendar::Frequency;
pub use calendar::TimeAxis;
pub use calendar::TimeBound;
pub use calendar::TimeRange;
pub use error::ErrorKind;
pub use error::PipelineError;
pub use error::RequestError;
pub use geo::LonSpan;
pub use geo::LongitudeConvention;
pub use geo::SpatialBox;
pub use handle::ArchivePath;
pub use handle::DatasetHandle;
pub use handle::DatasetSelector;
pub use metadata::AxisGrid;
pub use metadata::CoordinateValues;
pub use metadata::DatasetMetadata;
pub use metadata::Dimension;
pub use metadata::DimensionKind;
pub use metadata::IndexRange;
pub use metadata::VariableInfo;
pub use request::QueryRequest;
pub use result::ArraySlice;
pub use result::DataGap;
pub use result::Provenance;
pub use result::QueryResult;
