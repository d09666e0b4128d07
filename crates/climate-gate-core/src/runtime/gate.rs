// climate-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Climate Gate Admission Gate
// Description: Threshold classification and alternative generation.
// Purpose: Decide whether a request may be fetched and propose admissible variants.
// Dependencies: serde, thiserror, crate::core, crate::runtime::{estimator, plan}
// ============================================================================

//! ## Overview
//! The gate compares a [`SizeEstimate`] against two thresholds. Estimates at
//! or below the safe threshold are admitted, estimates up to and including
//! the hard maximum are admitted with a warning, and anything larger is
//! rejected. Rejections carry alternatives; every alternative that names a
//! concrete request has been re-estimated and fits under the hard maximum.
//!
//! Only the gate can mint an [`AdmittedRequest`], which is what the fetcher
//! consumes, so no payload read happens without an admission decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::DatasetMetadata;
use crate::core::Frequency;
use crate::core::PipelineError;
use crate::core::QueryRequest;
use crate::core::SpatialBox;
use crate::core::TimeAxis;
use crate::core::TimeRange;
use crate::core::metadata::IndexRange;
use crate::runtime::estimator::CostEstimator;
use crate::runtime::estimator::SizeEstimate;
use crate::runtime::plan::SlicePlan;
use crate::runtime::plan::plan_slices;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default safe threshold in tokens.
pub const DEFAULT_SAFE_TOKENS: u64 = 70_000;

/// Default hard maximum in tokens.
pub const DEFAULT_MAX_TOKENS: u64 = 170_000;

/// Upper bound on the number of concrete sub-requests in a split alternative.
pub const MAX_SPLIT_PARTS: usize = 24;

/// Bisection steps used when shrinking a region.
const REGION_SEARCH_STEPS: usize = 24;

/// Bytes per element assumed for aggregated series.
const AGGREGATE_ELEMENT_BYTES: u64 = 8;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// Threshold configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    /// Safe threshold is zero or exceeds the maximum.
    #[error("safe threshold {safe} must be positive and not exceed max threshold {max}")]
    Ordering {
        /// Safe threshold.
        safe: u64,
        /// Max threshold.
        max: u64,
    },
}

/// Safe and hard token thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    /// Largest estimate admitted without warning.
    safe_tokens: u64,
    /// Largest estimate admitted at all.
    max_tokens: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            safe_tokens: DEFAULT_SAFE_TOKENS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Thresholds {
    /// Builds thresholds, requiring `0 < safe_tokens <= max_tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError::Ordering`] when the thresholds are out of order.
    pub const fn new(safe_tokens: u64, max_tokens: u64) -> Result<Self, ThresholdError> {
        if safe_tokens == 0 || safe_tokens > max_tokens {
            return Err(ThresholdError::Ordering {
                safe: safe_tokens,
                max: max_tokens,
            });
        }
        Ok(Self {
            safe_tokens,
            max_tokens,
        })
    }

    /// Safe threshold.
    #[must_use]
    pub const fn safe_tokens(&self) -> u64 {
        self.safe_tokens
    }

    /// Hard maximum.
    #[must_use]
    pub const fn max_tokens(&self) -> u64 {
        self.max_tokens
    }
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Threshold classification of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// At or below the safe threshold.
    Admit,
    /// Above the safe threshold, at or below the maximum.
    AdmitWithWarning,
    /// Above the maximum.
    Reject,
}

impl Verdict {
    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::AdmitWithWarning => "admit_with_warning",
            Self::Reject => "reject",
        }
    }
}

/// Shape of a proposed alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeStrategy {
    /// Shorter time range from the same start.
    NarrowTime,
    /// Smaller region around the same center.
    NarrowRegion,
    /// Spatial or temporal aggregation; advisory only.
    Aggregate,
    /// Sequential sub-requests covering the original range.
    Split,
}

/// Concrete request proposed by the gate together with its estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedRequest {
    /// Proposed request.
    pub request: QueryRequest,
    /// Estimate of the proposed request.
    pub estimate: SizeEstimate,
}

/// Alternative offered with a rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    /// Strategy.
    pub strategy: AlternativeStrategy,
    /// Human-readable summary.
    pub description: String,
    /// Concrete requests; empty for advisory alternatives.
    pub requests: Vec<SuggestedRequest>,
}

/// Outcome of the admission decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AdmissionDecision {
    /// Fetch may proceed.
    Admit,
    /// Fetch may proceed; the caller is told how close it came to the limit.
    AdmitWithWarning {
        /// Estimate and remaining margin.
        message: String,
    },
    /// Fetch must not proceed.
    Reject {
        /// Why the request was rejected.
        reason: String,
        /// Admissible alternatives.
        alternatives: Vec<Alternative>,
    },
}

/// Request cleared for fetching.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedRequest {
    /// Request as admitted.
    request: QueryRequest,
    /// Selection the estimate was computed from.
    plan: SlicePlan,
    /// Admission-time estimate.
    estimate: SizeEstimate,
    /// Warning when admitted above the safe threshold.
    warning: Option<String>,
}

impl AdmittedRequest {
    /// Admitted request.
    #[must_use]
    pub const fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Selection to read.
    #[must_use]
    pub const fn plan(&self) -> &SlicePlan {
        &self.plan
    }

    /// Admission-time estimate.
    #[must_use]
    pub const fn estimate(&self) -> &SizeEstimate {
        &self.estimate
    }

    /// Warning attached at admission, if any.
    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

/// Gate outcome: a fetchable request or a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Cleared for fetching.
    Admitted(AdmittedRequest),
    /// Rejected with alternatives.
    Rejected {
        /// Estimate of the rejected request.
        estimate: SizeEstimate,
        /// Why the request was rejected.
        reason: String,
        /// Admissible alternatives.
        alternatives: Vec<Alternative>,
    },
}

impl Admission {
    /// Decision view of the outcome.
    #[must_use]
    pub fn decision(&self) -> AdmissionDecision {
        match self {
            Self::Admitted(admitted) => admitted.warning.as_ref().map_or(
                AdmissionDecision::Admit,
                |message| AdmissionDecision::AdmitWithWarning {
                    message: message.clone(),
                },
            ),
            Self::Rejected {
                reason,
                alternatives,
                ..
            } => AdmissionDecision::Reject {
                reason: reason.clone(),
                alternatives: alternatives.clone(),
            },
        }
    }

    /// Estimate the decision was based on.
    #[must_use]
    pub const fn estimate(&self) -> &SizeEstimate {
        match self {
            Self::Admitted(admitted) => &admitted.estimate,
            Self::Rejected {
                estimate,
                ..
            } => estimate,
        }
    }

    /// Verdict the decision was based on.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        match self {
            Self::Admitted(AdmittedRequest {
                warning: None,
                ..
            }) => Verdict::Admit,
            Self::Admitted(_) => Verdict::AdmitWithWarning,
            Self::Rejected {
                ..
            } => Verdict::Reject,
        }
    }
}

// ============================================================================
// SECTION: Admission Gate
// ============================================================================

/// Threshold gate in front of the fetcher.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    /// Estimator used for the request and for re-estimating alternatives.
    estimator: CostEstimator,
    /// Thresholds.
    thresholds: Thresholds,
}

impl AdmissionGate {
    /// Builds a gate.
    #[must_use]
    pub const fn new(estimator: CostEstimator, thresholds: Thresholds) -> Self {
        Self {
            estimator,
            thresholds,
        }
    }

    /// Estimator in use.
    #[must_use]
    pub const fn estimator(&self) -> &CostEstimator {
        &self.estimator
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Classifies an estimate against the thresholds.
    #[must_use]
    pub const fn classify(&self, estimate: &SizeEstimate) -> Verdict {
        if estimate.token_estimate <= self.thresholds.safe_tokens {
            Verdict::Admit
        } else if estimate.token_estimate <= self.thresholds.max_tokens {
            Verdict::AdmitWithWarning
        } else {
            Verdict::Reject
        }
    }

    /// Plans, estimates, and decides a request.
    ///
    /// # Errors
    ///
    /// Propagates planning errors; see [`plan_slices`].
    pub fn admit(
        &self,
        request: QueryRequest,
        metadata: &DatasetMetadata,
    ) -> Result<Admission, PipelineError> {
        let plan = plan_slices(&request, metadata)?;
        let estimate = self.estimator.estimate_plan(&plan);
        let admission = match self.classify(&estimate) {
            Verdict::Admit => Admission::Admitted(AdmittedRequest {
                request,
                plan,
                estimate,
                warning: None,
            }),
            Verdict::AdmitWithWarning => {
                let warning = self.warning_message(&estimate);
                Admission::Admitted(AdmittedRequest {
                    request,
                    plan,
                    estimate,
                    warning: Some(warning),
                })
            }
            Verdict::Reject => {
                let alternatives = self.alternatives(&request, metadata, &plan, &estimate);
                Admission::Rejected {
                    reason: self.reject_reason(&estimate),
                    estimate,
                    alternatives,
                }
            }
        };
        Ok(admission)
    }

    /// Message attached to warned admissions.
    fn warning_message(&self, estimate: &SizeEstimate) -> String {
        let over = estimate.token_estimate - self.thresholds.safe_tokens;
        let margin = self.thresholds.max_tokens - estimate.token_estimate;
        format!(
            "estimated {} tokens exceeds the safe threshold of {} by {over}; {margin} tokens \
             remain below the hard limit of {}",
            estimate.token_estimate, self.thresholds.safe_tokens, self.thresholds.max_tokens
        )
    }

    /// Reason attached to rejections.
    fn reject_reason(&self, estimate: &SizeEstimate) -> String {
        format!(
            "estimated {} tokens ({} elements, {} bytes) exceeds the hard limit of {} tokens",
            estimate.token_estimate,
            estimate.element_count,
            estimate.byte_estimate,
            self.thresholds.max_tokens
        )
    }

    /// Estimates a candidate and keeps it only when it fits under the maximum.
    fn fitting(&self, candidate: QueryRequest, metadata: &DatasetMetadata) -> Option<SuggestedRequest> {
        let estimate = self.estimator.estimate(&candidate, metadata).ok()?;
        if estimate.element_count == 0 || estimate.token_estimate > self.thresholds.max_tokens {
            return None;
        }
        Some(SuggestedRequest {
            request: candidate,
            estimate,
        })
    }

    /// Builds alternatives for a rejected request.
    fn alternatives(
        &self,
        request: &QueryRequest,
        metadata: &DatasetMetadata,
        plan: &SlicePlan,
        estimate: &SizeEstimate,
    ) -> Vec<Alternative> {
        let mut alternatives = Vec::new();
        let window = TimeWindow::for_request(request, metadata, plan);
        let narrowed = window.as_ref().and_then(|window| self.narrow_time(request, metadata, window));
        if let (Some(window), Some((units, suggestion))) = (&window, &narrowed) {
            alternatives.push(Alternative {
                strategy: AlternativeStrategy::NarrowTime,
                description: format!(
                    "request the first {units} of {} {} ({}) instead of the full range",
                    window.units,
                    window.unit_label(),
                    suggestion.request.time().map_or_else(String::new, ToString::to_string),
                ),
                requests: vec![suggestion.clone()],
            });
        }
        if let Some(alternative) = self.narrow_region(request, metadata, estimate) {
            alternatives.push(alternative);
        }
        alternatives.push(self.aggregate_hint(request, metadata, plan));
        if let (Some(window), Some((units, _))) = (&window, &narrowed) {
            alternatives.push(self.split(request, metadata, window, *units));
        }
        alternatives
    }

    /// Largest prefix of the time window that fits, in bound units.
    fn narrow_time(
        &self,
        request: &QueryRequest,
        metadata: &DatasetMetadata,
        window: &TimeWindow<'_>,
    ) -> Option<(usize, SuggestedRequest)> {
        if window.units < 2 {
            return None;
        }
        let candidate = |units: usize| {
            window
                .range(0, units)
                .and_then(|range| self.fitting(request.with_time(range), metadata))
        };
        let mut best = (1, candidate(1)?);
        let (mut lo, mut hi) = (1_usize, window.units);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if let Some(suggestion) = candidate(mid) {
                best = (mid, suggestion);
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(best)
    }

    /// Region shrunk about its center until it fits.
    fn narrow_region(
        &self,
        request: &QueryRequest,
        metadata: &DatasetMetadata,
        estimate: &SizeEstimate,
    ) -> Option<Alternative> {
        let region = request.region();
        let lat_extent = region.lat_max() - region.lat_min();
        let lon_extent = region.lon_extent();
        let shrink = |factor: f64| {
            let candidate = SpatialBox::around(
                region.lat_center(),
                lat_extent * factor,
                region.lon_center(),
                lon_extent * factor,
                region.convention(),
            );
            self.fitting(request.with_region(candidate), metadata)
        };
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        let mut best: Option<SuggestedRequest> = None;
        for _ in 0 .. REGION_SEARCH_STEPS {
            let mid = f64::midpoint(lo, hi);
            if let Some(suggestion) = shrink(mid) {
                best = Some(suggestion);
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let suggestion = best?;
        if suggestion.estimate.element_count >= estimate.element_count {
            return None;
        }
        let shrunk = suggestion.request.region();
        let description = format!(
            "request a smaller region of lat {:.2}..{:.2}, lon {:.2}..{:.2} around the same center",
            shrunk.lat_min(),
            shrunk.lat_max(),
            shrunk.lon_min(),
            shrunk.lon_max()
        );
        Some(Alternative {
            strategy: AlternativeStrategy::NarrowRegion,
            description,
            requests: vec![suggestion],
        })
    }

    /// Advisory aggregation alternative.
    fn aggregate_hint(
        &self,
        request: &QueryRequest,
        metadata: &DatasetMetadata,
        plan: &SlicePlan,
    ) -> Alternative {
        let steps = plan.time_steps().map_or(1, |range| range.len() as u64);
        let series_bytes =
            steps.saturating_mul(request.variables().len() as u64).saturating_mul(AGGREGATE_ELEMENT_BYTES);
        let tokens = self.estimator.tokens_for_bytes(series_bytes);
        let mut description = format!(
            "request an area-averaged time series over the region instead of the full grid \
             (about {tokens} tokens)"
        );
        if metadata.time_axis().is_some_and(|axis| axis.frequency != Frequency::Monthly) {
            description.push_str(", or use monthly means instead of the native sampling");
        }
        Alternative {
            strategy: AlternativeStrategy::Aggregate,
            description,
            requests: Vec::new(),
        }
    }

    /// Sequential chunks of `units` covering the whole window.
    fn split(
        &self,
        request: &QueryRequest,
        metadata: &DatasetMetadata,
        window: &TimeWindow<'_>,
        units: usize,
    ) -> Alternative {
        let parts = window.units.div_ceil(units.max(1));
        let description = format!(
            "fetch the full range as {parts} sequential requests of at most {units} {} each",
            window.unit_label()
        );
        let mut requests = Vec::new();
        if parts <= MAX_SPLIT_PARTS {
            for part in 0 .. parts {
                let first = part * units;
                let count = units.min(window.units - first);
                let Some(suggestion) = window
                    .range(first, count)
                    .and_then(|range| self.fitting(request.with_time(range), metadata))
                else {
                    requests.clear();
                    break;
                };
                requests.push(suggestion);
            }
        }
        Alternative {
            strategy: AlternativeStrategy::Split,
            description,
            requests,
        }
    }
}

// ============================================================================
// SECTION: Time Window
// ============================================================================

/// Selected time steps of a request expressed in whole bound units.
struct TimeWindow<'a> {
    /// Dataset time axis.
    axis: &'a TimeAxis,
    /// First selected step.
    first_step: usize,
    /// Last selected step.
    last_step: usize,
    /// Number of bound units (months or days) covered.
    units: usize,
}

impl<'a> TimeWindow<'a> {
    /// Window for a request with a time range on a dataset with a time axis.
    fn for_request(
        request: &QueryRequest,
        metadata: &'a DatasetMetadata,
        plan: &SlicePlan,
    ) -> Option<Self> {
        request.time()?;
        let axis = metadata.time_axis()?;
        let IndexRange {
            start,
            end,
        } = plan.time_steps()?;
        let per_unit = axis.frequency.steps_per_unit();
        Some(Self {
            axis,
            first_step: start,
            last_step: end,
            units: (end - start + 1).div_ceil(per_unit),
        })
    }

    /// Range covering `count` units starting `offset` units into the window.
    fn range(&self, offset: usize, count: usize) -> Option<TimeRange> {
        if count == 0 {
            return None;
        }
        let per_unit = self.axis.frequency.steps_per_unit();
        let first = self.first_step + offset * per_unit;
        let last = (first + count * per_unit - 1).min(self.last_step);
        self.axis.range_between(first, last)
    }

    /// Plural unit name.
    const fn unit_label(&self) -> &'static str {
        match self.axis.frequency {
            Frequency::Monthly => "months",
            Frequency::Daily | Frequency::SubDaily(_) => "days",
        }
    }
}
