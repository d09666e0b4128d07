// climate-gate-core/src/runtime/estimator.rs
// ============================================================================
// Module: Climate Gate Cost Estimator
// Description: Header-only element, byte, and token estimates.
// Purpose: Predict response size before any payload is read.
// Dependencies: serde, crate::core, crate::runtime::plan
// ============================================================================

//! ## Overview
//! The estimator multiplies the per-dimension selection counts of a
//! [`SlicePlan`] into element counts, converts them to bytes with per-dtype
//! widths, and converts bytes to tokens with a configurable ratio plus a fixed
//! envelope overhead. Unknown dtypes use the widest configured width, so the
//! estimate never falls below what a fetch can return.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::DatasetMetadata;
use crate::core::PipelineError;
use crate::core::QueryRequest;
use crate::runtime::plan::SlicePlan;
use crate::runtime::plan::plan_slices;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default serialized tokens per raw byte.
pub const DEFAULT_TOKENS_PER_BYTE: f64 = 2.5 / 3.0;

/// Default fixed token overhead for the response envelope and metadata.
pub const DEFAULT_METADATA_OVERHEAD_TOKENS: u64 = 1_667;

/// Width used for dtypes missing from the table.
pub const FALLBACK_DTYPE_BYTES: u32 = 8;

// ============================================================================
// SECTION: Size Estimate
// ============================================================================

/// Estimated size of one variable's selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEstimate {
    /// Variable name.
    pub variable: String,
    /// Selected elements.
    pub element_count: u64,
    /// Raw bytes at the variable's dtype width.
    pub byte_estimate: u64,
}

/// Estimated response size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEstimate {
    /// Selected elements across variables.
    pub element_count: u64,
    /// Raw bytes across variables.
    pub byte_estimate: u64,
    /// Serialized tokens including envelope overhead.
    pub token_estimate: u64,
    /// Per-variable breakdown.
    pub variables: Vec<VariableEstimate>,
}

// ============================================================================
// SECTION: Estimator Configuration
// ============================================================================

/// Conversion factors used by the estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorSettings {
    /// Serialized tokens per raw byte.
    pub tokens_per_byte: f64,
    /// Fixed token overhead added to every non-empty estimate.
    pub metadata_overhead_tokens: u64,
    /// Bytes per element keyed by dtype name.
    pub dtype_bytes: BTreeMap<String, u32>,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            tokens_per_byte: DEFAULT_TOKENS_PER_BYTE,
            metadata_overhead_tokens: DEFAULT_METADATA_OVERHEAD_TOKENS,
            dtype_bytes: default_dtype_bytes(),
        }
    }
}

/// Standard dtype widths.
#[must_use]
pub fn default_dtype_bytes() -> BTreeMap<String, u32> {
    [
        ("float64", 8),
        ("float32", 4),
        ("float16", 2),
        ("int64", 8),
        ("int32", 4),
        ("int16", 2),
        ("int8", 1),
        ("uint64", 8),
        ("uint32", 4),
        ("uint16", 2),
        ("uint8", 1),
        ("char", 1),
    ]
    .into_iter()
    .map(|(name, width)| (name.to_string(), width))
    .collect()
}

// ============================================================================
// SECTION: Cost Estimator
// ============================================================================

/// Header-only response size estimator.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    /// Conversion factors.
    settings: EstimatorSettings,
    /// Width applied to unknown dtypes.
    fallback_width: u32,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(EstimatorSettings::default())
    }
}

impl CostEstimator {
    /// Builds an estimator from settings.
    #[must_use]
    pub fn new(settings: EstimatorSettings) -> Self {
        let fallback_width =
            settings.dtype_bytes.values().copied().max().unwrap_or(0).max(FALLBACK_DTYPE_BYTES);
        Self {
            settings,
            fallback_width,
        }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &EstimatorSettings {
        &self.settings
    }

    /// Bytes per element for `dtype`.
    #[must_use]
    pub fn dtype_width(&self, dtype: &str) -> u32 {
        let key = dtype.trim().to_ascii_lowercase();
        let key = match key.as_str() {
            "float" | "f8" | "double" => "float64",
            "f4" | "single" => "float32",
            other => other,
        };
        self.settings.dtype_bytes.get(key).copied().unwrap_or(self.fallback_width)
    }

    /// Estimates the response size of `request` against `metadata`.
    ///
    /// # Errors
    ///
    /// Propagates planning errors from [`plan_slices`].
    pub fn estimate(
        &self,
        request: &QueryRequest,
        metadata: &DatasetMetadata,
    ) -> Result<SizeEstimate, PipelineError> {
        let plan = plan_slices(request, metadata)?;
        Ok(self.estimate_plan(&plan))
    }

    /// Estimates the response size of an already computed plan.
    #[must_use]
    pub fn estimate_plan(&self, plan: &SlicePlan) -> SizeEstimate {
        let variables: Vec<VariableEstimate> = plan
            .variables
            .iter()
            .map(|variable| {
                let element_count = variable.element_count();
                VariableEstimate {
                    variable: variable.variable.clone(),
                    element_count,
                    byte_estimate: element_count
                        .saturating_mul(u64::from(self.dtype_width(&variable.dtype))),
                }
            })
            .collect();
        let element_count =
            variables.iter().map(|v| v.element_count).fold(0_u64, u64::saturating_add);
        let byte_estimate =
            variables.iter().map(|v| v.byte_estimate).fold(0_u64, u64::saturating_add);
        SizeEstimate {
            element_count,
            byte_estimate,
            token_estimate: self.tokens_for_bytes(byte_estimate),
            variables,
        }
    }

    /// Tokens needed to serialize `bytes` of raw data, including overhead.
    #[must_use]
    pub fn tokens_for_bytes(&self, bytes: u64) -> u64 {
        if bytes == 0 {
            return 0;
        }
        ceil_to_u64(bytes_as_f64(bytes) * self.settings.tokens_per_byte)
            .saturating_add(self.settings.metadata_overhead_tokens)
    }
}

/// Lossy widening used only for token arithmetic.
#[allow(clippy::cast_precision_loss, reason = "Token estimates tolerate rounding above 2^53.")]
const fn bytes_as_f64(bytes: u64) -> f64 {
    bytes as f64
}

/// Rounds up and saturates into `u64`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Value is finite, non-negative, and clamped below u64::MAX."
)]
fn ceil_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value >= u64::MAX as f64 {
        return u64::MAX;
    }
    value.ceil().max(0.0) as u64
}
