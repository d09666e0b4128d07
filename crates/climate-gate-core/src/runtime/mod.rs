// climate-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Climate Gate Runtime
// Description: Normalization, planning, estimation, and admission.
// Purpose: Provide the pure decision stages of the query pipeline.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Runtime stages are deterministic functions of a request and a dataset
//! header. None of them touch the archive; I/O lives behind
//! [`crate::interfaces::ArchiveStore`] and is driven by the host.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod estimator;
pub mod gate;
pub mod normalizer;
pub mod plan;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use estimator::CostEstimator;
pub use estimator::EstimatorSettings;
pub use estimator::SizeEstimate;
pub use estimator::VariableEstimate;
pub use gate::Admission;
pub use gate::AdmissionDecision;
pub use gate::AdmissionGate;
pub use gate::AdmittedRequest;
pub use gate::Alternative;
pub use gate::AlternativeStrategy;
pub use gate::SuggestedRequest;
pub use gate::ThresholdError;
pub use gate::Thresholds;
pub use gate::Verdict;
pub use normalizer::CoordinateNormalizer;
pub use normalizer::Normalized;
pub use plan::DimSelection;
pub use plan::SlicePlan;
pub use plan::VariablePlan;
pub use plan::plan_slices;
