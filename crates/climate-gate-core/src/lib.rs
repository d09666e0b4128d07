// climate-gate-core/src/lib.rs
// ============================================================================
// Module: Climate Gate Core Library
// Description: Public API surface for the Climate Gate core.
// Purpose: Expose core types, the archive interface, and pipeline stages.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Climate Gate core decides whether a request against a large gridded
//! climate archive may be answered in full. It normalizes regions, estimates
//! response size from headers alone, and admits, warns, or rejects with
//! concrete alternatives. It performs no I/O; archive access goes through the
//! [`ArchiveStore`] interface.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ArchiveEntry;
pub use interfaces::ArchiveError;
pub use interfaces::ArchiveStore;
pub use interfaces::EntryKind;
pub use interfaces::RawSlice;
pub use runtime::Admission;
pub use runtime::AdmissionDecision;
pub use runtime::AdmissionGate;
pub use runtime::AdmittedRequest;
pub use runtime::Alternative;
pub use runtime::AlternativeStrategy;
pub use runtime::CoordinateNormalizer;
pub use runtime::CostEstimator;
pub use runtime::EstimatorSettings;
pub use runtime::SizeEstimate;
pub use runtime::SlicePlan;
pub use runtime::SuggestedRequest;
pub use runtime::Thresholds;
pub use runtime::Verdict;
