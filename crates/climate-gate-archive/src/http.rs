// climate-gate-archive/src/http.rs
// ============================================================================
// Module: HTTP Archive Store
// Description: Archive store backed by a remote HTTP gateway.
// Purpose: Issue bounded GET requests for listings, headers, and slices.
// Dependencies: climate-gate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The HTTP store talks to an archive gateway exposing three read-only routes:
//! `list/{path}`, `header/{location}`, and `slice/{location}`. Requests are
//! bounded by connect and total timeouts, redirects are not followed, and
//! response bodies are read against a hard byte limit. Failures are
//! classified so callers can tell missing data from outages:
//!
//! - 404 and 410 map to [`ArchiveError::NotFound`].
//! - Connect errors, timeouts, 408, 429, and 5xx map to [`ArchiveError::Unreachable`].
//! - Oversized, malformed, or inconsistent bodies map to [`ArchiveError::Corrupt`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use climate_gate_core::ArchiveEntry;
use climate_gate_core::ArchiveError;
use climate_gate_core::ArchivePath;
use climate_gate_core::ArchiveStore;
use climate_gate_core::DatasetMetadata;
use climate_gate_core::IndexRange;
use climate_gate_core::RawSlice;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP archive store.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` base URLs.
/// - `max_response_bytes` is a hard upper bound on every response body.
/// - `request_timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpArchiveConfig {
    /// Gateway base URL.
    pub base_url: String,
    /// Allow cleartext HTTP.
    pub allow_http: bool,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for HttpArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            allow_http: false,
            connect_timeout_ms: 2_000,
            request_timeout_ms: 30_000,
            max_response_bytes: 64 * 1024 * 1024,
            user_agent: "climate-gate/0.1".to_string(),
        }
    }
}

/// Errors raised while constructing the HTTP store.
#[derive(Debug, Error)]
pub enum HttpStoreError {
    /// Base URL is malformed or uses a disallowed scheme.
    #[error("invalid archive base url: {0}")]
    InvalidBaseUrl(String),
    /// HTTP client could not be built.
    #[error("archive http client build failed: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Directory listing body.
#[derive(Debug, Deserialize)]
struct ListingWire {
    /// Listed entries.
    entries: Vec<ArchiveEntry>,
}

/// Slice body.
#[derive(Debug, Deserialize)]
struct SliceWire {
    /// Echoed variable name.
    variable: String,
    /// Shape and values.
    #[serde(flatten)]
    slice: RawSlice,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Archive store backed by an HTTP gateway.
pub struct HttpArchiveStore {
    /// Gateway base URL with a trailing slash.
    base: Url,
    /// Shared blocking client.
    client: Client,
    /// Response size limit.
    max_response_bytes: usize,
}

impl HttpArchiveStore {
    /// Builds a store for the configured gateway.
    ///
    /// # Errors
    ///
    /// Returns [`HttpStoreError`] when the base URL is invalid or the client
    /// cannot be created.
    pub fn new(config: &HttpArchiveConfig) -> Result<Self, HttpStoreError> {
        let base = parse_base_url(&config.base_url, config.allow_http)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| HttpStoreError::Client(err.to_string()))?;
        Ok(Self {
            base,
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Gateway base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `{base}/{route}/{path...}`.
    fn route_url(&self, route: &str, path: &ArchivePath) -> Result<Url, ArchiveError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ArchiveError::Corrupt("archive base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(route)
            .extend(path.segments());
        Ok(url)
    }

    /// Issues a GET and decodes the JSON body.
    fn get_json<T: DeserializeOwned>(&self, url: &Url, what: &str) -> Result<T, ArchiveError> {
        let mut response = self.client.get(url.as_str()).send().map_err(|err| {
            if err.is_timeout() {
                ArchiveError::Unreachable(format!("{what}: archive request timed out"))
            } else if err.is_connect() {
                ArchiveError::Unreachable(format!("{what}: archive connection failed"))
            } else {
                ArchiveError::Unreachable(format!("{what}: archive request failed"))
            }
        })?;
        classify_status(response.status(), what)?;
        let body = read_response_limited(&mut response, self.max_response_bytes, what)?;
        serde_json::from_slice(&body)
            .map_err(|err| ArchiveError::Corrupt(format!("{what}: malformed archive json: {err}")))
    }
}

impl ArchiveStore for HttpArchiveStore {
    fn list(&self, path: &ArchivePath) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let url = self.route_url("list", path)?;
        let listing: ListingWire = self.get_json(&url, &format!("listing of '{path}'"))?;
        for entry in &listing.entries {
            if path.join(&entry.name).is_err() {
                return Err(ArchiveError::Corrupt(format!(
                    "listing of '{path}' contains invalid entry name '{}'",
                    entry.name
                )));
            }
        }
        Ok(listing.entries)
    }

    fn header(&self, location: &ArchivePath) -> Result<DatasetMetadata, ArchiveError> {
        let url = self.route_url("header", location)?;
        self.get_json(&url, &format!("header of '{location}'"))
    }

    fn read_slice(
        &self,
        location: &ArchivePath,
        variable: &str,
        ranges: &[IndexRange],
    ) -> Result<RawSlice, ArchiveError> {
        let mut url = self.route_url("slice", location)?;
        url.query_pairs_mut()
            .append_pair("variable", variable)
            .append_pair("index", &format_index(ranges));
        let what = format!("slice of '{variable}' from '{location}'");
        let wire: SliceWire = self.get_json(&url, &what)?;
        if wire.variable != variable {
            return Err(ArchiveError::Corrupt(format!(
                "{what}: gateway answered for variable '{}'",
                wire.variable
            )));
        }
        check_slice_shape(&wire.slice, ranges, &what)?;
        Ok(wire.slice)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and validates the gateway base URL.
fn parse_base_url(raw: &str, allow_http: bool) -> Result<Url, HttpStoreError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|err| HttpStoreError::InvalidBaseUrl(err.to_string()))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        scheme => {
            return Err(HttpStoreError::InvalidBaseUrl(format!("unsupported scheme '{scheme}'")));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(HttpStoreError::InvalidBaseUrl("url credentials are not allowed".to_string()));
    }
    if url.host_str().is_none() {
        return Err(HttpStoreError::InvalidBaseUrl("url host required".to_string()));
    }
    if url.cannot_be_a_base() {
        return Err(HttpStoreError::InvalidBaseUrl("url cannot be a base".to_string()));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Maps non-success statuses onto archive errors.
fn classify_status(status: StatusCode, what: &str) -> Result<(), ArchiveError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            Err(ArchiveError::NotFound(format!("{what}: archive returned {status}")))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Err(ArchiveError::Unreachable(format!("{what}: archive returned {status}")))
        }
        status if status.is_server_error() => {
            Err(ArchiveError::Unreachable(format!("{what}: archive returned {status}")))
        }
        status => Err(ArchiveError::Corrupt(format!("{what}: unexpected archive status {status}"))),
    }
}

/// Formats inclusive index ranges as `a:b,c:d`.
fn format_index(ranges: &[IndexRange]) -> String {
    ranges.iter().map(|range| format!("{}:{}", range.start, range.end)).collect::<Vec<_>>().join(",")
}

/// Checks that a slice matches the requested ranges.
///
/// The leading dimension may come back shorter than requested when the
/// archive holds fewer records than its header declares.
fn check_slice_shape(
    slice: &RawSlice,
    ranges: &[IndexRange],
    what: &str,
) -> Result<(), ArchiveError> {
    if slice.shape.len() != ranges.len() {
        return Err(ArchiveError::Corrupt(format!(
            "{what}: expected {} dimensions, got {}",
            ranges.len(),
            slice.shape.len()
        )));
    }
    for (axis, (got, range)) in slice.shape.iter().zip(ranges).enumerate() {
        let short_ok = axis == 0 && *got <= range.len();
        if *got != range.len() && !short_ok {
            return Err(ArchiveError::Corrupt(format!(
                "{what}: dimension {axis} has extent {got}, expected {}",
                range.len()
            )));
        }
    }
    let expected = slice.shape.iter().product::<usize>();
    if slice.values.len() != expected {
        return Err(ArchiveError::Corrupt(format!(
            "{what}: {} values do not fill shape {}",
            slice.values.len(),
            shape_label(&slice.shape)
        )));
    }
    Ok(())
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
    what: &str,
) -> Result<Vec<u8>, ArchiveError> {
    let oversize = || ArchiveError::Corrupt(format!("{what}: archive response exceeds size limit"));
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| oversize())?;
    let expected_len = response.content_length();
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(oversize());
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|_| {
        ArchiveError::Unreachable(format!("{what}: failed to read archive response"))
    })?;
    if buf.len() > max_bytes {
        return Err(oversize());
    }
    let received = u64::try_from(buf.len()).unwrap_or(u64::MAX);
    if let Some(expected) = expected_len
        && received < expected
    {
        return Err(ArchiveError::Corrupt(format!("{what}: archive response truncated")));
    }
    Ok(buf)
}

/// Renders a shape as `[a, b, c]`.
fn shape_label(shape: &[usize]) -> String {
    let parts: Vec<String> = shape.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}
