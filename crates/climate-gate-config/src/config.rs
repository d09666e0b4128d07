// climate-gate-config/src/config.rs
// ============================================================================
// Module: Climate Gate Configuration
// Description: Configuration loading and validation for the Climate Gate server.
// Purpose: Provide strict, fail-closed config parsing with size limits.
// Dependencies: climate-gate-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! This module loads and validates `climate-gate.toml`. Inputs are untrusted
//! and must be validated with strict size and path limits. Every section has
//! usable defaults except the archive location, which must be configured
//! explicitly (an HTTP gateway URL or a local fixture file).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use climate_gate_core::ArchivePath;
use climate_gate_core::EstimatorSettings;
use climate_gate_core::LongitudeConvention;
use climate_gate_core::Thresholds;
use climate_gate_core::runtime::estimator::DEFAULT_METADATA_OVERHEAD_TOKENS;
use climate_gate_core::runtime::estimator::DEFAULT_TOKENS_PER_BYTE;
use climate_gate_core::runtime::estimator::default_dtype_bytes;
use climate_gate_core::runtime::gate::DEFAULT_MAX_TOKENS;
use climate_gate_core::runtime::gate::DEFAULT_SAFE_TOKENS;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to locate the config file.
pub const CONFIG_ENV_VAR: &str = "CLIMATE_GATE_CONFIG";
/// Default config filename when no path is provided.
pub const DEFAULT_CONFIG_NAME: &str = "climate-gate.toml";
/// Maximum size of the config file in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the archive base URL.
pub(crate) const MAX_BASE_URL_LENGTH: usize = 2048;
/// Maximum length of the outbound user agent.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;
/// Minimum archive connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum archive connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum archive request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum archive request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Maximum retry backoff in milliseconds.
pub(crate) const MAX_RETRY_BACKOFF_MS: u64 = 10_000;
/// Minimum archive response size limit.
pub(crate) const MIN_RESPONSE_BYTES: usize = 1024;
/// Maximum archive response size limit.
pub(crate) const MAX_RESPONSE_BYTES: usize = 512 * 1024 * 1024;
/// Upper bound for the token conversion factor.
pub(crate) const MAX_TOKENS_PER_BYTE: f64 = 100.0;
/// Maximum number of dtype width entries.
pub(crate) const MAX_DTYPE_ENTRIES: usize = 64;
/// Maximum dtype width in bytes.
pub(crate) const MAX_DTYPE_WIDTH: u32 = 16;
/// Maximum length of a dtype name.
pub(crate) const MAX_DTYPE_NAME_LENGTH: usize = 32;
/// Maximum cached directory listings.
pub(crate) const MAX_CATALOG_ENTRIES: usize = 1_000_000;
/// Maximum variable search results.
pub(crate) const MAX_SEARCH_LIMIT: usize = 1_000;
/// Maximum data points accepted in one plot.
pub(crate) const MAX_PLOT_POINTS: usize = 10_000_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Climate Gate server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClimateGateConfig {
    /// Transport and audit configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote archive access configuration.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Token budget and estimation factors.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Defaults applied to partially specified dataset handles.
    #[serde(default)]
    pub defaults: HandleDefaults,
    /// Dataset listing cache configuration.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Plot hand-off configuration.
    #[serde(default)]
    pub plots: PlotConfig,
}

impl ClimateGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.archive.validate()?;
        self.budget.validate()?;
        self.defaults.validate()?;
        self.catalog.validate()?;
        self.plots.validate()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Transport used to serve MCP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Content-Length framed JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.audit.validate()?;
        if self.transport == ServerTransport::Http {
            self.bind_addr()?;
        }
        Ok(())
    }

    /// Parses the HTTP bind address, rejecting non-loopback addresses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address is missing, malformed, or not loopback.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        let addr: SocketAddr =
            bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
        if !addr.ip().is_loopback() {
            return Err(ConfigError::Invalid(
                "non-loopback bind is not allowed; bind to 127.0.0.1 or ::1".to_string(),
            ));
        }
        Ok(addr)
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional JSON-lines file; stderr is used when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Archive
// ============================================================================

/// Archive backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveBackend {
    /// Remote HTTP gateway.
    #[default]
    Http,
    /// Local JSON fixture file loaded into memory.
    Fixture,
}

/// Remote archive access configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Backend used to reach the archive.
    #[serde(default)]
    pub backend: ArchiveBackend,
    /// Gateway base URL for the HTTP backend.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Allow cleartext `http://` gateways (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
    /// Fixture file for the fixture backend.
    #[serde(default)]
    pub fixture_path: Option<String>,
    /// Native longitude convention of the archive grids.
    #[serde(default)]
    pub longitude_convention: LongitudeConvention,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay before the single retry of an unreachable header read.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Maximum response body size accepted from the gateway.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backend: ArchiveBackend::Http,
            base_url: None,
            allow_http: false,
            fixture_path: None,
            longitude_convention: LongitudeConvention::default(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl ArchiveConfig {
    /// Validates archive settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            ArchiveBackend::Http => {
                let base_url = self.base_url.as_deref().unwrap_or_default().trim();
                if base_url.is_empty() {
                    return Err(ConfigError::Invalid(
                        "archive.base_url must be set for the http backend".to_string(),
                    ));
                }
                if base_url.len() > MAX_BASE_URL_LENGTH {
                    return Err(ConfigError::Invalid(
                        "archive.base_url exceeds max length".to_string(),
                    ));
                }
                if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
                    return Err(ConfigError::Invalid(
                        "archive.base_url must include http:// or https://".to_string(),
                    ));
                }
                if base_url.starts_with("http://") && !self.allow_http {
                    return Err(ConfigError::Invalid(
                        "archive.base_url uses http:// without allow_http".to_string(),
                    ));
                }
            }
            ArchiveBackend::Fixture => {
                let Some(path) = &self.fixture_path else {
                    return Err(ConfigError::Invalid(
                        "archive.fixture_path must be set for the fixture backend".to_string(),
                    ));
                };
                validate_path_string("archive.fixture_path", path)?;
            }
        }
        validate_range(
            "archive.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_CONNECT_TIMEOUT_MS,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        validate_range(
            "archive.request_timeout_ms",
            self.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )?;
        if self.connect_timeout_ms > self.request_timeout_ms {
            return Err(ConfigError::Invalid(
                "archive.connect_timeout_ms must not exceed request_timeout_ms".to_string(),
            ));
        }
        if self.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "archive.retry_backoff_ms must be <= {MAX_RETRY_BACKOFF_MS}"
            )));
        }
        if self.max_response_bytes < MIN_RESPONSE_BYTES
            || self.max_response_bytes > MAX_RESPONSE_BYTES
        {
            return Err(ConfigError::Invalid(format!(
                "archive.max_response_bytes must be between {MIN_RESPONSE_BYTES} and \
                 {MAX_RESPONSE_BYTES}"
            )));
        }
        let agent = self.user_agent.trim();
        if agent.is_empty() || agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "archive.user_agent must be 1..={MAX_USER_AGENT_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Connect timeout as a duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry backoff as a duration.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

// ============================================================================
// SECTION: Budget
// ============================================================================

/// Token budget and estimation factors.
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    /// Estimates at or below this are admitted silently.
    #[serde(default = "default_safe_tokens")]
    pub safe_tokens: u64,
    /// Estimates above this are rejected.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    /// Serialized tokens per raw byte.
    #[serde(default = "default_tokens_per_byte")]
    pub tokens_per_byte: f64,
    /// Fixed token overhead for metadata and the response envelope.
    #[serde(default = "default_metadata_overhead_tokens")]
    pub metadata_overhead_tokens: u64,
    /// Per-dtype byte widths, merged over the built-in table.
    #[serde(default)]
    pub dtype_bytes: BTreeMap<String, u32>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            safe_tokens: default_safe_tokens(),
            max_tokens: default_max_tokens(),
            tokens_per_byte: default_tokens_per_byte(),
            metadata_overhead_tokens: default_metadata_overhead_tokens(),
            dtype_bytes: BTreeMap::new(),
        }
    }
}

impl BudgetConfig {
    /// Validates budget settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds()?;
        if !self.tokens_per_byte.is_finite()
            || self.tokens_per_byte <= 0.0
            || self.tokens_per_byte > MAX_TOKENS_PER_BYTE
        {
            return Err(ConfigError::Invalid(format!(
                "budget.tokens_per_byte must be > 0 and <= {MAX_TOKENS_PER_BYTE}"
            )));
        }
        if self.metadata_overhead_tokens >= self.max_tokens {
            return Err(ConfigError::Invalid(
                "budget.metadata_overhead_tokens must be below max_tokens".to_string(),
            ));
        }
        if self.dtype_bytes.len() > MAX_DTYPE_ENTRIES {
            return Err(ConfigError::Invalid("too many budget.dtype_bytes entries".to_string()));
        }
        for (name, width) in &self.dtype_bytes {
            if name.trim().is_empty() || name.len() > MAX_DTYPE_NAME_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "budget.dtype_bytes name must be 1..={MAX_DTYPE_NAME_LENGTH} characters"
                )));
            }
            if *width == 0 || *width > MAX_DTYPE_WIDTH {
                return Err(ConfigError::Invalid(format!(
                    "budget.dtype_bytes.{name} must be between 1 and {MAX_DTYPE_WIDTH}"
                )));
            }
        }
        Ok(())
    }

    /// Admission thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the thresholds are unordered or zero.
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.safe_tokens, self.max_tokens)
            .map_err(|err| ConfigError::Invalid(format!("budget: {err}")))
    }

    /// Estimator settings with configured widths merged over the built-in table.
    #[must_use]
    pub fn estimator_settings(&self) -> EstimatorSettings {
        let mut dtype_bytes = default_dtype_bytes();
        for (name, width) in &self.dtype_bytes {
            dtype_bytes.insert(name.trim().to_ascii_lowercase(), *width);
        }
        EstimatorSettings {
            tokens_per_byte: self.tokens_per_byte,
            metadata_overhead_tokens: self.metadata_overhead_tokens,
            dtype_bytes,
        }
    }
}

// ============================================================================
// SECTION: Handle Defaults
// ============================================================================

/// Defaults applied to dataset handles that omit optional fields.
#[derive(Debug, Clone, Deserialize)]
pub struct HandleDefaults {
    /// Scenario used when a data query omits one.
    #[serde(default = "default_scenario")]
    pub scenario: String,
    /// Ensemble member label.
    #[serde(default = "default_ensemble_member")]
    pub ensemble_member: String,
    /// Frequency table identifier.
    #[serde(default = "default_frequency")]
    pub frequency: String,
    /// Grid label.
    #[serde(default = "default_grid")]
    pub grid: String,
    /// Dataset version label.
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for HandleDefaults {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            ensemble_member: default_ensemble_member(),
            frequency: default_frequency(),
            grid: default_grid(),
            version: default_version(),
        }
    }
}

impl HandleDefaults {
    /// Each default must be a single valid archive path segment.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("defaults.scenario", &self.scenario),
            ("defaults.ensemble_member", &self.ensemble_member),
            ("defaults.frequency", &self.frequency),
            ("defaults.grid", &self.grid),
            ("defaults.version", &self.version),
        ] {
            let path = ArchivePath::parse(value)
                .map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))?;
            if path.segments().len() != 1 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a single path segment"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Dataset listing cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Maximum cached directory listings.
    #[serde(default = "default_catalog_max_entries")]
    pub max_entries: usize,
    /// Maximum results returned by variable search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_entries: default_catalog_max_entries(),
            search_limit: default_search_limit(),
        }
    }
}

impl CatalogConfig {
    /// Validates catalog bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 || self.max_entries > MAX_CATALOG_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "catalog.max_entries must be between 1 and {MAX_CATALOG_ENTRIES}"
            )));
        }
        if self.search_limit == 0 || self.search_limit > MAX_SEARCH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "catalog.search_limit must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Plots
// ============================================================================

/// Plot hand-off mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotMode {
    /// Plot requests are validated and answered as unavailable.
    #[default]
    Disabled,
    /// Accepted plot specs are written to a directory for an external renderer.
    Directory,
}

/// Plot hand-off configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotConfig {
    /// Hand-off mode.
    #[serde(default)]
    pub mode: PlotMode,
    /// Output directory for the directory mode.
    #[serde(default)]
    pub directory: Option<String>,
    /// Maximum data points accepted in one plot.
    #[serde(default = "default_plot_max_points")]
    pub max_points: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            mode: PlotMode::Disabled,
            directory: None,
            max_points: default_plot_max_points(),
        }
    }
}

impl PlotConfig {
    /// Validates plot settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_points == 0 || self.max_points > MAX_PLOT_POINTS {
            return Err(ConfigError::Invalid(format!(
                "plots.max_points must be between 1 and {MAX_PLOT_POINTS}"
            )));
        }
        match (self.mode, &self.directory) {
            (PlotMode::Directory, None) => Err(ConfigError::Invalid(
                "plots.directory must be set for the directory mode".to_string(),
            )),
            (PlotMode::Directory, Some(directory)) => {
                validate_path_string("plots.directory", directory)
            }
            (PlotMode::Disabled, _) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an inclusive numeric range.
fn validate_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default archive connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    2_000
}

/// Default archive request timeout.
const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Default retry backoff.
const fn default_retry_backoff_ms() -> u64 {
    250
}

/// Default archive response size limit.
const fn default_max_response_bytes() -> usize {
    64 * 1024 * 1024
}

/// Default outbound user agent.
fn default_user_agent() -> String {
    format!("climate-gate/{}", env!("CARGO_PKG_VERSION"))
}

/// Default safe threshold.
const fn default_safe_tokens() -> u64 {
    DEFAULT_SAFE_TOKENS
}

/// Default hard limit.
const fn default_max_tokens() -> u64 {
    DEFAULT_MAX_TOKENS
}

/// Default token conversion factor.
const fn default_tokens_per_byte() -> f64 {
    DEFAULT_TOKENS_PER_BYTE
}

/// Default metadata overhead.
const fn default_metadata_overhead_tokens() -> u64 {
    DEFAULT_METADATA_OVERHEAD_TOKENS
}

/// Default scenario.
fn default_scenario() -> String {
    "scenarioSSP5-85".to_string()
}

/// Default ensemble member.
fn default_ensemble_member() -> String {
    "r15i1p1f1".to_string()
}

/// Default frequency table.
fn default_frequency() -> String {
    "Amon".to_string()
}

/// Default grid label.
fn default_grid() -> String {
    "gr3".to_string()
}

/// Default dataset version.
fn default_version() -> String {
    "v20210201".to_string()
}

/// Default listing cache bound.
const fn default_catalog_max_entries() -> usize {
    1_024
}

/// Default search result limit.
const fn default_search_limit() -> usize {
    50
}

/// Default plot point limit.
const fn default_plot_max_points() -> usize {
    100_000
}
