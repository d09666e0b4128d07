// climate-gate-mcp/src/plots.rs
// ============================================================================
// Module: Plot Hand-off
// Description: Plot request validation and the renderer hand-off seam.
// Purpose: Pass well-formed plot specifications to an external renderer.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The pipeline never renders. A [`PlotSpec`] is validated (series lengths
//! agree, grids are rectangular, the point count stays under the configured
//! cap) and handed to a [`PlotSink`]. [`DirectoryPlotSink`] writes one JSON
//! document per accepted plot for a renderer watching that directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of a title or axis label, in characters.
pub const MAX_LABEL_CHARS: usize = 256;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported plot kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotType {
    /// Line series.
    Line,
    /// Bar series.
    Bar,
    /// Scatter series.
    Scatter,
    /// Colored grid.
    Heatmap,
    /// Contoured grid.
    Contour,
}

impl PlotType {
    /// Whether this kind draws a 2-D grid from `z`.
    #[must_use]
    pub const fn is_grid(self) -> bool {
        matches!(self, Self::Heatmap | Self::Contour)
    }
}

/// Plot data series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotData {
    /// X values or labels.
    #[serde(default)]
    pub x: Vec<Value>,
    /// Y values (series kinds) or row labels (grid kinds).
    #[serde(default)]
    pub y: Vec<Value>,
    /// Row-major grid for heatmap and contour plots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<Vec<Vec<Option<f64>>>>,
}

/// Plot request as received from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotSpec {
    /// Plot kind.
    pub plot_type: PlotType,
    /// Data series.
    pub data: PlotData,
    /// Plot title.
    #[serde(default)]
    pub title: Option<String>,
    /// X-axis label.
    #[serde(default)]
    pub xlabel: Option<String>,
    /// Y-axis label.
    #[serde(default)]
    pub ylabel: Option<String>,
    /// Renderer style options, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    /// Provenance of the plotted data, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
}

/// Acknowledgement from a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotReceipt {
    /// Identifier the renderer can use to find the plot.
    pub plot_id: String,
    /// Plotted points.
    pub points: usize,
}

/// Plot validation and hand-off failures.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Request is malformed.
    #[error("invalid plot request: {0}")]
    Invalid(String),
    /// Sink could not accept the plot.
    #[error("plot hand-off failed: {0}")]
    Sink(String),
}

// ============================================================================
// SECTION: Validation
// ============================================================================

impl PlotSpec {
    /// Validates the request and returns its point count.
    ///
    /// # Errors
    ///
    /// Returns [`PlotError::Invalid`] when series lengths disagree, the grid is
    /// empty or ragged, values are not scalars, labels are too long, or the
    /// point count exceeds `max_points`.
    pub fn validate(&self, max_points: usize) -> Result<usize, PlotError> {
        for (label, text) in
            [("title", &self.title), ("xlabel", &self.xlabel), ("ylabel", &self.ylabel)]
        {
            if text.as_ref().is_some_and(|text| text.chars().count() > MAX_LABEL_CHARS) {
                return Err(PlotError::Invalid(format!(
                    "{label} exceeds {MAX_LABEL_CHARS} characters"
                )));
            }
        }
        if self.style.as_ref().is_some_and(|style| !style.is_object()) {
            return Err(PlotError::Invalid("style must be an object".to_string()));
        }
        require_scalars("x", &self.data.x)?;
        require_scalars("y", &self.data.y)?;
        let points = if self.plot_type.is_grid() {
            self.validate_grid()?
        } else {
            self.validate_series()?
        };
        if points > max_points {
            return Err(PlotError::Invalid(format!(
                "{points} points exceed the limit of {max_points}"
            )));
        }
        Ok(points)
    }

    /// Line, bar, and scatter checks.
    fn validate_series(&self) -> Result<usize, PlotError> {
        let data = &self.data;
        if data.z.is_some() {
            return Err(PlotError::Invalid("z is only valid for heatmap and contour".to_string()));
        }
        if data.y.is_empty() {
            return Err(PlotError::Invalid("y must not be empty".to_string()));
        }
        if let Some(bad) = data.y.iter().position(|value| !(value.is_number() || value.is_null())) {
            return Err(PlotError::Invalid(format!("y[{bad}] must be a number or null")));
        }
        if !data.x.is_empty() && data.x.len() != data.y.len() {
            return Err(PlotError::Invalid(format!(
                "x has {} values but y has {}",
                data.x.len(),
                data.y.len()
            )));
        }
        Ok(data.y.len())
    }

    /// Heatmap and contour checks.
    fn validate_grid(&self) -> Result<usize, PlotError> {
        let data = &self.data;
        let Some(rows) = data.z.as_ref().filter(|rows| !rows.is_empty()) else {
            return Err(PlotError::Invalid("z must be a non-empty grid".to_string()));
        };
        let columns = rows.first().map_or(0, Vec::len);
        if columns == 0 {
            return Err(PlotError::Invalid("z rows must not be empty".to_string()));
        }
        if let Some(ragged) = rows.iter().position(|row| row.len() != columns) {
            return Err(PlotError::Invalid(format!(
                "z row {ragged} has {} values, expected {columns}",
                rows[ragged].len()
            )));
        }
        if !data.x.is_empty() && data.x.len() != columns {
            return Err(PlotError::Invalid(format!(
                "x has {} values but z has {columns} columns",
                data.x.len()
            )));
        }
        if !data.y.is_empty() && data.y.len() != rows.len() {
            return Err(PlotError::Invalid(format!(
                "y has {} values but z has {} rows",
                data.y.len(),
                rows.len()
            )));
        }
        Ok(rows.len() * columns)
    }
}

/// Rejects nested arrays and objects in a coordinate series.
fn require_scalars(label: &str, values: &[Value]) -> Result<(), PlotError> {
    match values.iter().position(|value| value.is_array() || value.is_object()) {
        Some(bad) => Err(PlotError::Invalid(format!("{label}[{bad}] must be a scalar"))),
        None => Ok(()),
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Receiver for validated plots.
pub trait PlotSink: Send + Sync {
    /// Accepts a validated plot.
    ///
    /// # Errors
    ///
    /// Returns [`PlotError::Sink`] when the plot cannot be handed off.
    fn submit(&self, spec: &PlotSpec, points: usize) -> Result<PlotReceipt, PlotError>;
}

/// Sink writing one JSON document per plot into a directory.
pub struct DirectoryPlotSink {
    /// Output directory.
    directory: PathBuf,
    /// Per-process sequence number.
    counter: AtomicU64,
}

impl DirectoryPlotSink {
    /// Creates the sink, creating `directory` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn new(directory: &Path) -> io::Result<Self> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
            counter: AtomicU64::new(0),
        })
    }

    /// Output directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl PlotSink for DirectoryPlotSink {
    fn submit(&self, spec: &PlotSpec, points: usize) -> Result<PlotReceipt, PlotError> {
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let plot_id = format!("plot-{stamp}-{sequence}");
        let payload =
            serde_json::to_vec_pretty(spec).map_err(|err| PlotError::Sink(err.to_string()))?;
        let path = self.directory.join(format!("{plot_id}.json"));
        fs::write(&path, payload)
            .map_err(|err| PlotError::Sink(format!("{}: {err}", path.display())))?;
        Ok(PlotReceipt {
            plot_id,
            points,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
