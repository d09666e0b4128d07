// climate-gate-mcp/src/pipeline.rs
// ============================================================================
// Module: Query Pipeline
// Description: Tool handlers over the probe, gate, and fetcher.
// Purpose: Run each tool call start to finish and package a uniform envelope.
// Dependencies: climate-gate-archive, climate-gate-config, climate-gate-core
// ============================================================================

//! ## Overview
//! [`QueryPipeline`] owns one instance of every pipeline stage and exposes one
//! synchronous handler per tool. A data query runs strictly in order:
//! build and normalize the region, resolve the handle, probe the header,
//! admit against the token budget, and only then fetch. Rejections return
//! concrete, re-estimated [`QueryDataArgs`] the caller can resubmit as-is.
//!
//! Handlers never return `Err`: every failure is mapped onto a
//! [`ToolEnvelope`] so the dispatcher answers uniformly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::iter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use climate_gate_archive::DatasetCatalog;
use climate_gate_config::ClimateGateConfig;
use climate_gate_config::ConfigError;
use climate_gate_config::HandleDefaults;
use climate_gate_config::PlotMode;
use climate_gate_core::Admission;
use climate_gate_core::AdmissionGate;
use climate_gate_core::AdmittedRequest;
use climate_gate_core::AlternativeStrategy;
use climate_gate_core::ArchiveEntry;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::CoordinateNormalizer;
use climate_gate_core::CostEstimator;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::DatasetSelector;
use climate_gate_core::EntryKind;
use climate_gate_core::LongitudeConvention;
use climate_gate_core::PipelineError;
use climate_gate_core::QueryRequest;
use climate_gate_core::SizeEstimate;
use climate_gate_core::SpatialBox;
use climate_gate_core::TimeBound;
use climate_gate_core::TimeRange;
use climate_gate_core::Verdict;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::CoordinateConversionEvent;
use crate::audit::ToolAuditSink;
use crate::audit::ToolNoopAuditSink;
use crate::envelope::FailureKind;
use crate::envelope::ToolEnvelope;
use crate::fetcher::DataFetcher;
use crate::glossary;
use crate::plots::DirectoryPlotSink;
use crate::plots::PlotError;
use crate::plots::PlotSink;
use crate::plots::PlotSpec;
use crate::probe::MetadataProbe;
use crate::probe::retry_once;

// ============================================================================
// SECTION: Tool Arguments
// ============================================================================

/// Arguments of the directory-browse tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowseArgs {
    /// Slash-separated archive path; the root when omitted.
    #[serde(default)]
    pub path: Option<String>,
}

/// Arguments of the variable-search tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchArgs {
    /// Name fragment or concept; every variable when omitted.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Scenario directory.
    #[serde(default)]
    pub scenario: Option<String>,
    /// Ensemble member directory.
    #[serde(default)]
    pub ensemble_member: Option<String>,
    /// Frequency (table) directory.
    #[serde(default)]
    pub frequency: Option<String>,
}

/// Arguments of the metadata-only tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataArgs {
    /// Variable directory.
    pub variable: String,
    /// Scenario directory.
    #[serde(default)]
    pub scenario: Option<String>,
    /// Ensemble member directory.
    #[serde(default)]
    pub ensemble_member: Option<String>,
    /// Frequency (table) directory.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Grid label directory.
    #[serde(default)]
    pub grid: Option<String>,
    /// Version directory.
    #[serde(default)]
    pub version: Option<String>,
    /// Object name; the first dataset in the version directory when omitted.
    #[serde(default)]
    pub object: Option<String>,
}

/// Arguments of the bounded data query tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryDataArgs {
    /// Variable directory; always part of the request.
    pub variable: String,
    /// Further variables stored in the same object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
    /// Scenario directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Ensemble member directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble_member: Option<String>,
    /// Frequency (table) directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    /// Grid label directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<String>,
    /// Version directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Object name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Inclusive start, `YYYY-MM` or `YYYY-MM-DD`; the dataset start when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Inclusive end, `YYYY-MM` or `YYYY-MM-DD`; the dataset end when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// `[min, max]` latitude; global when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_range: Option<[f64; 2]>,
    /// `[min, max]` longitude; global when omitted. `min > max` crosses the seam.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon_range: Option<[f64; 2]>,
    /// Convention of `lon_range`; inferred from the values when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon_convention: Option<LongitudeConvention>,
}

/// Handle fields shared by metadata and query arguments.
struct HandleFields<'a> {
    /// Variable directory.
    variable: &'a str,
    /// Scenario override.
    scenario: Option<&'a str>,
    /// Ensemble member override.
    ensemble_member: Option<&'a str>,
    /// Frequency override.
    frequency: Option<&'a str>,
    /// Grid override.
    grid: Option<&'a str>,
    /// Version override.
    version: Option<&'a str>,
}

impl MetadataArgs {
    /// Handle fields of these arguments.
    fn handle_fields(&self) -> HandleFields<'_> {
        HandleFields {
            variable: &self.variable,
            scenario: self.scenario.as_deref(),
            ensemble_member: self.ensemble_member.as_deref(),
            frequency: self.frequency.as_deref(),
            grid: self.grid.as_deref(),
            version: self.version.as_deref(),
        }
    }
}

impl QueryDataArgs {
    /// Handle fields of these arguments.
    fn handle_fields(&self) -> HandleFields<'_> {
        HandleFields {
            variable: &self.variable,
            scenario: self.scenario.as_deref(),
            ensemble_member: self.ensemble_member.as_deref(),
            frequency: self.frequency.as_deref(),
            grid: self.grid.as_deref(),
            version: self.version.as_deref(),
        }
    }

    /// Arguments reproducing `request` exactly, keeping the template's variable.
    fn for_request(&self, request: &QueryRequest) -> Self {
        let handle = request.handle();
        let region = request.region();
        Self {
            variable: self.variable.clone(),
            variables: request
                .variables()
                .iter()
                .filter(|name| **name != self.variable)
                .cloned()
                .collect(),
            scenario: Some(handle.selector.scenario.clone()),
            ensemble_member: Some(handle.selector.ensemble_member.clone()),
            frequency: Some(handle.selector.frequency.clone()),
            grid: Some(handle.selector.grid.clone()),
            version: Some(handle.selector.version.clone()),
            object: Some(handle.object.clone()),
            start_date: request.time().map(|time| time.start().to_string()),
            end_date: request.time().map(|time| time.end().to_string()),
            lat_range: Some([region.lat_min(), region.lat_max()]),
            lon_range: Some([region.lon_min(), region.lon_max()]),
            lon_convention: Some(region.convention()),
        }
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Envelope plus the admission facts recorded in the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Envelope returned to the caller.
    pub envelope: ToolEnvelope,
    /// Token estimate when the call was admission-checked.
    pub token_estimate: Option<u64>,
    /// Verdict when the call was admission-checked.
    pub verdict: Option<Verdict>,
}

impl From<ToolEnvelope> for ToolOutcome {
    fn from(envelope: ToolEnvelope) -> Self {
        Self {
            envelope,
            token_estimate: None,
            verdict: None,
        }
    }
}

impl From<PipelineError> for ToolOutcome {
    fn from(err: PipelineError) -> Self {
        ToolEnvelope::from(err).into()
    }
}

/// Rejected alternative rendered with resubmittable arguments.
#[derive(Debug, Serialize)]
struct AlternativeView {
    /// Strategy.
    strategy: AlternativeStrategy,
    /// Human-readable summary.
    description: String,
    /// Concrete requests; empty for advisory alternatives.
    requests: Vec<SuggestedArgs>,
}

/// One concrete alternative.
#[derive(Debug, Serialize)]
struct SuggestedArgs {
    /// Arguments for `query_data`.
    arguments: QueryDataArgs,
    /// Estimate of those arguments.
    estimate: SizeEstimate,
}

/// Request ready for admission.
struct Prepared {
    /// Validated request in the archive convention.
    request: QueryRequest,
    /// Probed header.
    metadata: DatasetMetadata,
    /// Coordinate conversion note, when longitudes were rewritten.
    note: Option<String>,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Components and limits used to build a [`QueryPipeline`].
pub struct QueryPipelineConfig {
    /// Archive store.
    pub store: Arc<dyn ArchiveStore>,
    /// Archive-native longitude convention.
    pub longitude_convention: LongitudeConvention,
    /// Delay before retrying an unreachable archive.
    pub retry_backoff: Duration,
    /// Bound on cached directory listings.
    pub catalog_max_entries: usize,
    /// Maximum entries returned by browse and search.
    pub search_limit: usize,
    /// Admission gate.
    pub gate: AdmissionGate,
    /// Handle defaults.
    pub defaults: HandleDefaults,
    /// Plot receiver; plots are unavailable when `None`.
    pub plot_sink: Option<Arc<dyn PlotSink>>,
    /// Maximum points accepted in one plot.
    pub max_points: usize,
    /// Audit sink for coordinate conversions.
    pub audit: Arc<dyn ToolAuditSink>,
}

impl QueryPipelineConfig {
    /// Derives pipeline settings from validated configuration.
    ///
    /// The audit sink defaults to a no-op sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when thresholds are invalid or the plot
    /// directory cannot be created.
    pub fn from_config(
        config: &ClimateGateConfig,
        store: Arc<dyn ArchiveStore>,
    ) -> Result<Self, ConfigError> {
        let gate = AdmissionGate::new(
            CostEstimator::new(config.budget.estimator_settings()),
            config.budget.thresholds()?,
        );
        let plot_sink: Option<Arc<dyn PlotSink>> = match (config.plots.mode, &config.plots.directory)
        {
            (PlotMode::Directory, Some(directory)) => {
                let sink = DirectoryPlotSink::new(Path::new(directory))
                    .map_err(|err| ConfigError::Io(format!("plots.directory: {err}")))?;
                Some(Arc::new(sink))
            }
            _ => None,
        };
        Ok(Self {
            store,
            longitude_convention: config.archive.longitude_convention,
            retry_backoff: config.archive.retry_backoff(),
            catalog_max_entries: config.catalog.max_entries,
            search_limit: config.catalog.search_limit,
            gate,
            defaults: config.defaults.clone(),
            plot_sink,
            max_points: config.plots.max_points,
            audit: Arc::new(ToolNoopAuditSink),
        })
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Per-call pipeline shared by all tool invocations.
pub struct QueryPipeline {
    /// Header probe over the listing cache.
    probe: MetadataProbe,
    /// Longitude normalizer.
    normalizer: CoordinateNormalizer,
    /// Admission gate.
    gate: AdmissionGate,
    /// Bounded reader.
    fetcher: DataFetcher,
    /// Handle defaults.
    defaults: HandleDefaults,
    /// Maximum entries returned by browse and search.
    search_limit: usize,
    /// Plot receiver.
    plot_sink: Option<Arc<dyn PlotSink>>,
    /// Maximum points accepted in one plot.
    max_points: usize,
    /// Audit sink.
    audit: Arc<dyn ToolAuditSink>,
    /// Delay before retrying an unreachable archive.
    retry_backoff: Duration,
}

impl QueryPipeline {
    /// Builds the pipeline.
    #[must_use]
    pub fn new(config: QueryPipelineConfig) -> Self {
        let catalog =
            Arc::new(DatasetCatalog::new(Arc::clone(&config.store), config.catalog_max_entries));
        Self {
            probe: MetadataProbe::new(catalog, config.retry_backoff),
            normalizer: CoordinateNormalizer::new(config.longitude_convention),
            gate: config.gate,
            fetcher: DataFetcher::new(config.store, config.retry_backoff),
            defaults: config.defaults,
            search_limit: config.search_limit,
            plot_sink: config.plot_sink,
            max_points: config.max_points,
            audit: config.audit,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Audit sink shared with the dispatcher.
    #[must_use]
    pub const fn audit(&self) -> &Arc<dyn ToolAuditSink> {
        &self.audit
    }

    /// Listing cache.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<DatasetCatalog> {
        self.probe.catalog()
    }

    /// Admission gate.
    #[must_use]
    pub const fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    // ------------------------------------------------------------------------
    // Browse and search
    // ------------------------------------------------------------------------

    /// Lists one archive directory.
    #[must_use]
    pub fn browse_directory(&self, args: &BrowseArgs) -> ToolOutcome {
        match self.browse(args) {
            Ok(data) => ToolEnvelope::ok(data).into(),
            Err(err) => err.into(),
        }
    }

    /// Browse body.
    fn browse(&self, args: &BrowseArgs) -> Result<Value, PipelineError> {
        let path = ArchivePath::parse(args.path.as_deref().unwrap_or_default())?;
        let entries = self.list(&path)?;
        let shown: Vec<Value> = entries
            .iter()
            .take(self.search_limit)
            .map(|entry| {
                let child = path.join(&entry.name).map(|child| child.to_string()).ok();
                json!({
                    "name": entry.name,
                    "kind": entry.kind,
                    "size_bytes": entry.size_bytes,
                    "path": child,
                })
            })
            .collect();
        Ok(json!({
            "path": path.to_string(),
            "entries": shown,
            "total": entries.len(),
            "truncated": entries.len() > self.search_limit,
        }))
    }

    /// Matches variables in a frequency directory against a keyword.
    #[must_use]
    pub fn search_variables(&self, args: &SearchArgs) -> ToolOutcome {
        match self.search(args) {
            Ok(data) => ToolEnvelope::ok(data).into(),
            Err(err) => err.into(),
        }
    }

    /// Search body.
    fn search(&self, args: &SearchArgs) -> Result<Value, PipelineError> {
        let directory = ArchivePath::root()
            .join(args.scenario.as_deref().unwrap_or(&self.defaults.scenario))?
            .join(args.ensemble_member.as_deref().unwrap_or(&self.defaults.ensemble_member))?
            .join(args.frequency.as_deref().unwrap_or(&self.defaults.frequency))?;
        let keyword = args.keyword.as_deref().unwrap_or_default();
        let needle = keyword.trim().to_lowercase();
        let concept_hits: BTreeSet<&str> =
            glossary::matches(keyword).into_iter().map(|entry| entry.name).collect();
        let entries = self.list(&directory)?;
        let found: Vec<Value> = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Directory)
            .filter(|entry| {
                entry.name.to_lowercase().contains(&needle)
                    || concept_hits.contains(entry.name.as_str())
            })
            .map(|entry| {
                let known = glossary::lookup(&entry.name);
                json!({
                    "variable": entry.name,
                    "long_name": known.map(|entry| entry.long_name),
                    "units": known.map(|entry| entry.units),
                })
            })
            .collect();
        let total = found.len();
        let shown: Vec<Value> = found.into_iter().take(self.search_limit).collect();
        Ok(json!({
            "directory": directory.to_string(),
            "keyword": keyword,
            "matches": shown,
            "total": total,
            "truncated": total > self.search_limit,
        }))
    }

    /// Cached listing with one retry.
    fn list(
        &self,
        path: &ArchivePath,
    ) -> Result<Arc<Vec<ArchiveEntry>>, PipelineError> {
        retry_once(self.retry_backoff, || {
            self.probe.catalog().list(path).map_err(PipelineError::from)
        })
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Reads a dataset header and the cost of its full record.
    #[must_use]
    pub fn get_metadata(&self, args: &MetadataArgs) -> ToolOutcome {
        match self.metadata(args) {
            Ok(data) => ToolEnvelope::ok(data).into(),
            Err(err) => err.into(),
        }
    }

    /// Metadata body.
    fn metadata(&self, args: &MetadataArgs) -> Result<Value, PipelineError> {
        let selector = self.selector(&args.handle_fields());
        let handle = self.probe.resolve(&selector, args.object.as_deref())?;
        let metadata = self.probe.probe(&handle)?;
        let extent = metadata.time_axis().and_then(|axis| axis.extent());
        let variables: Vec<String> = if metadata.variables.contains_key(&args.variable) {
            vec![args.variable.clone()]
        } else {
            metadata.data_variables().into_iter().map(str::to_string).collect()
        };
        let full_record = QueryRequest::new(handle.clone(), variables, self.normalizer.global(), extent)
            .ok()
            .and_then(|request| self.gate.estimator().estimate(&request, &metadata).ok())
            .map(|estimate| {
                json!({
                    "verdict": self.gate.classify(&estimate).as_str(),
                    "estimate": estimate,
                })
            });
        Ok(json!({
            "dataset": handle,
            "path": handle.to_string(),
            "metadata": metadata,
            "time_extent": extent.map(|range| range.to_string()),
            "glossary": glossary::lookup(&args.variable),
            "full_record": full_record,
        }))
    }

    // ------------------------------------------------------------------------
    // Data query
    // ------------------------------------------------------------------------

    /// Admits and, when within budget, fetches a bounded slice.
    #[must_use]
    pub fn query_data(&self, args: &QueryDataArgs) -> ToolOutcome {
        let prepared = match self.prepare(args) {
            Ok(prepared) => prepared,
            Err(err) => return err.into(),
        };
        let admission = match self.gate.admit(prepared.request, &prepared.metadata) {
            Ok(admission) => admission,
            Err(err) => return err.into(),
        };
        let token_estimate = Some(admission.estimate().token_estimate);
        let verdict = Some(admission.verdict());
        let envelope = match admission {
            Admission::Admitted(admitted) => {
                self.fetch(&admitted, &prepared.metadata, prepared.note.as_deref())
            }
            Admission::Rejected {
                estimate,
                reason,
                alternatives,
            } => {
                let views: Vec<AlternativeView> = alternatives
                    .into_iter()
                    .map(|alternative| AlternativeView {
                        strategy: alternative.strategy,
                        description: alternative.description,
                        requests: alternative
                            .requests
                            .into_iter()
                            .map(|suggested| SuggestedArgs {
                                arguments: args.for_request(&suggested.request),
                                estimate: suggested.estimate,
                            })
                            .collect(),
                    })
                    .collect();
                let data = json!({
                    "estimate": estimate,
                    "thresholds": self.gate.thresholds(),
                });
                match views.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>() {
                    Ok(alternatives) => {
                        let envelope = ToolEnvelope::rejected(data, reason, alternatives);
                        match prepared.note.as_deref() {
                            Some(note) => envelope.with_note(note),
                            None => envelope,
                        }
                    }
                    Err(err) => ToolEnvelope::error(FailureKind::Internal, err.to_string()),
                }
            }
        };
        ToolOutcome {
            envelope,
            token_estimate,
            verdict,
        }
    }

    /// Plans and decides a query without fetching.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the arguments are invalid or the
    /// dataset cannot be resolved or probed.
    pub fn estimate_query(&self, args: &QueryDataArgs) -> Result<Admission, PipelineError> {
        let prepared = self.prepare(args)?;
        self.gate.admit(prepared.request, &prepared.metadata)
    }

    /// Fetches an admitted request and packages the result.
    fn fetch(
        &self,
        admitted: &AdmittedRequest,
        metadata: &DatasetMetadata,
        note: Option<&str>,
    ) -> ToolEnvelope {
        let result = match self.fetcher.fetch(admitted, metadata) {
            Ok(result) => result,
            Err(err) => return err.into(),
        };
        let data = match serde_json::to_value(&result) {
            Ok(data) => data,
            Err(err) => return ToolEnvelope::error(FailureKind::Internal, err.to_string()),
        };
        let mut caveats: Vec<String> = Vec::new();
        if let Some(warning) = admitted.warning() {
            caveats.push(warning.to_string());
        }
        caveats.extend(result.gaps.iter().map(|gap| format!("partial data: {}", gap.detail)));
        let envelope = if caveats.is_empty() {
            ToolEnvelope::ok(data)
        } else {
            ToolEnvelope::warning(data, caveats.join("; "))
        };
        match note {
            Some(note) => envelope.with_note(note),
            None => envelope,
        }
    }

    /// Builds a validated request from tool arguments.
    fn prepare(&self, args: &QueryDataArgs) -> Result<Prepared, PipelineError> {
        let requested = self.region(args)?;
        let normalized = self.normalizer.normalize(&requested);
        let note = normalized.original.map(|original| {
            self.audit
                .record_conversion(&CoordinateConversionEvent::new(original, normalized.region));
            format!(
                "longitudes converted from {} [{}, {}] to {} [{}, {}]",
                original.convention().as_str(),
                original.lon_min(),
                original.lon_max(),
                normalized.region.convention().as_str(),
                normalized.region.lon_min(),
                normalized.region.lon_max()
            )
        });
        let selector = self.selector(&args.handle_fields());
        let handle = self.probe.resolve(&selector, args.object.as_deref())?;
        let metadata = self.probe.probe(&handle)?;
        let time = time_range(args, &metadata)?;
        let variables = iter::once(args.variable.clone()).chain(args.variables.iter().cloned());
        let request = QueryRequest::new(handle, variables, normalized.region, time)?;
        Ok(Prepared {
            request,
            metadata,
            note,
        })
    }

    /// Caller region with defaults for omitted ranges.
    fn region(&self, args: &QueryDataArgs) -> Result<SpatialBox, PipelineError> {
        let [lat_min, lat_max] = args.lat_range.unwrap_or([-90.0, 90.0]);
        let region = match (args.lon_range, args.lon_convention) {
            (Some([lon_min, lon_max]), Some(convention)) => {
                SpatialBox::new(lat_min, lat_max, lon_min, lon_max, convention)?
            }
            (Some([lon_min, lon_max]), None) => {
                SpatialBox::detect(lat_min, lat_max, lon_min, lon_max)?
            }
            (None, convention) => {
                let convention =
                    convention.unwrap_or_else(|| self.normalizer.archive_convention());
                SpatialBox::new(
                    lat_min,
                    lat_max,
                    convention.lower(),
                    convention.upper(),
                    convention,
                )?
            }
        };
        Ok(region)
    }

    /// Selector from handle fields with defaults applied.
    fn selector(&self, fields: &HandleFields<'_>) -> DatasetSelector {
        let defaults = &self.defaults;
        DatasetSelector {
            scenario: fields.scenario.unwrap_or(&defaults.scenario).to_string(),
            ensemble_member: fields.ensemble_member.unwrap_or(&defaults.ensemble_member).to_string(),
            frequency: fields.frequency.unwrap_or(&defaults.frequency).to_string(),
            variable: fields.variable.to_string(),
            grid: fields.grid.unwrap_or(&defaults.grid).to_string(),
            version: fields.version.unwrap_or(&defaults.version).to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Plots
    // ------------------------------------------------------------------------

    /// Validates a plot and hands it to the configured sink.
    #[must_use]
    pub fn create_plot(&self, spec: &PlotSpec) -> ToolOutcome {
        let points = match spec.validate(self.max_points) {
            Ok(points) => points,
            Err(err) => {
                return ToolEnvelope::error(FailureKind::InvalidRequest, err.to_string()).into();
            }
        };
        let Some(sink) = self.plot_sink.as_ref() else {
            return ToolEnvelope::error(
                FailureKind::PlotUnavailable,
                "plot rendering is not configured on this server; the request was valid",
            )
            .into();
        };
        match sink.submit(spec, points) {
            Ok(receipt) => match serde_json::to_value(&receipt) {
                Ok(data) => ToolEnvelope::ok(data).into(),
                Err(err) => ToolEnvelope::error(FailureKind::Internal, err.to_string()).into(),
            },
            Err(PlotError::Invalid(detail)) => {
                ToolEnvelope::error(FailureKind::InvalidRequest, detail).into()
            }
            Err(err @ PlotError::Sink(_)) => {
                ToolEnvelope::error(FailureKind::Internal, err.to_string()).into()
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requested time range, filling omitted bounds from the dataset extent.
fn time_range(
    args: &QueryDataArgs,
    metadata: &DatasetMetadata,
) -> Result<Option<TimeRange>, PipelineError> {
    let start = args.start_date.as_deref().map(TimeBound::parse).transpose()?;
    let end = args.end_date.as_deref().map(TimeBound::parse).transpose()?;
    let Some(axis) = metadata.time_axis() else {
        if start.is_some() || end.is_some() {
            return Err(PipelineError::InvalidRequest(
                "dataset has no time axis; omit start_date and end_date".to_string(),
            ));
        }
        return Ok(None);
    };
    let Some(extent) = axis.extent() else {
        return Err(PipelineError::InvalidRequest("dataset time axis is empty".to_string()));
    };
    let range = TimeRange::new(start.unwrap_or(extent.start()), end.unwrap_or(extent.end()))?;
    Ok(Some(range))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
