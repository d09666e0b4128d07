// climate-gate-core/src/core/geo.rs
// ============================================================================
// Module: Climate Gate Geographic Regions
// Description: Latitude/longitude boxes and longitude convention handling.
// Purpose: Normalize caller regions into the archive's longitude convention.
// Dependencies: serde, crate::core::error
// ============================================================================

//! ## Overview
//! A [`SpatialBox`] is a validated latitude/longitude rectangle tagged with the
//! longitude convention its values are expressed in. Boxes whose `lon_min`
//! exceeds `lon_max` cross the seam of their convention (the antimeridian for
//! signed longitudes, the prime meridian for unsigned ones) and are read as two
//! longitude segments rather than being silently wrapped.
//!
//! Normalization is a pure function: converting into the convention a box is
//! already in returns it unchanged, so normalizing twice equals normalizing once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::RequestError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Degrees in a full longitude revolution.
const FULL_TURN: f64 = 360.0;

/// Drift tolerated when a mapped edge lands on a convention bound.
const EDGE_EPSILON: f64 = 1e-9;

// ============================================================================
// SECTION: Longitude Convention
// ============================================================================

/// Longitude range convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongitudeConvention {
    /// Longitudes in [-180, 180].
    Signed,
    /// Longitudes in [0, 360].
    #[default]
    Unsigned,
}

impl LongitudeConvention {
    /// Returns the lower bound of the convention's range.
    #[must_use]
    pub const fn lower(self) -> f64 {
        match self {
            Self::Signed => -180.0,
            Self::Unsigned => 0.0,
        }
    }

    /// Returns the upper bound of the convention's range.
    #[must_use]
    pub const fn upper(self) -> f64 {
        self.lower() + FULL_TURN
    }

    /// Returns the wire label for the convention.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signed => "signed",
            Self::Unsigned => "unsigned",
        }
    }

    /// Returns a human-readable range description.
    const fn range_label(self) -> &'static str {
        match self {
            Self::Signed => "[-180, 180]",
            Self::Unsigned => "[0, 360]",
        }
    }

    /// Returns true when `value` lies within the convention's closed range.
    fn contains(self, value: f64) -> bool {
        value >= self.lower() && value <= self.upper()
    }

    /// Maps a western edge into `[lower, upper)`.
    fn wrap_west(self, value: f64) -> f64 {
        let mapped = (value - self.lower()).rem_euclid(FULL_TURN) + self.lower();
        if mapped >= self.upper() - EDGE_EPSILON || mapped <= self.lower() + EDGE_EPSILON {
            self.lower()
        } else {
            mapped
        }
    }

    /// Maps an eastern edge into `(lower, upper]`.
    ///
    /// The upper bound is inclusive, so an edge on the seam closes the range
    /// instead of reopening it.
    fn wrap_east(self, value: f64) -> f64 {
        let mapped = (value - self.lower()).rem_euclid(FULL_TURN) + self.lower();
        if mapped <= self.lower() + EDGE_EPSILON || mapped >= self.upper() - EDGE_EPSILON {
            self.upper()
        } else {
            mapped
        }
    }

    /// Infers the convention of caller-supplied longitudes.
    ///
    /// Any negative value implies signed input. Values in [0, 180] mean the
    /// same thing in both conventions and are treated as unsigned.
    #[must_use]
    pub fn detect(lon_min: f64, lon_max: f64) -> Self {
        if lon_min < 0.0 || lon_max < 0.0 { Self::Signed } else { Self::Unsigned }
    }
}

impl fmt::Display for LongitudeConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Longitude Segment
// ============================================================================

/// Contiguous, non-wrapping longitude interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LonSpan {
    /// Western edge.
    pub min: f64,
    /// Eastern edge.
    pub max: f64,
}

// ============================================================================
// SECTION: Spatial Box
// ============================================================================

/// Validated latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpatialBoxWire")]
pub struct SpatialBox {
    /// Southern edge in degrees.
    lat_min: f64,
    /// Northern edge in degrees.
    lat_max: f64,
    /// Western edge in the box's convention.
    lon_min: f64,
    /// Eastern edge in the box's convention.
    lon_max: f64,
    /// Convention the longitudes are expressed in.
    convention: LongitudeConvention,
}

/// Unvalidated wire form of [`SpatialBox`].
#[derive(Deserialize)]
struct SpatialBoxWire {
    /// Southern edge in degrees.
    lat_min: f64,
    /// Northern edge in degrees.
    lat_max: f64,
    /// Western edge.
    lon_min: f64,
    /// Eastern edge.
    lon_max: f64,
    /// Convention the longitudes are expressed in.
    convention: LongitudeConvention,
}

impl TryFrom<SpatialBoxWire> for SpatialBox {
    type Error = RequestError;

    fn try_from(wire: SpatialBoxWire) -> Result<Self, Self::Error> {
        Self::new(wire.lat_min, wire.lat_max, wire.lon_min, wire.lon_max, wire.convention)
    }
}

impl SpatialBox {
    /// Builds a validated box.
    ///
    /// A `lon_min` greater than `lon_max` denotes a box crossing the seam of
    /// `convention` and is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when any coordinate is not finite, a latitude
    /// lies outside [-90, 90], latitudes are inverted, or a longitude lies
    /// outside the convention's range.
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        convention: LongitudeConvention,
    ) -> Result<Self, RequestError> {
        for (label, value) in
            [("lat_min", lat_min), ("lat_max", lat_max), ("lon_min", lon_min), ("lon_max", lon_max)]
        {
            if !value.is_finite() {
                return Err(RequestError::NonFinite(label));
            }
        }
        for value in [lat_min, lat_max] {
            if !(-90.0 ..= 90.0).contains(&value) {
                return Err(RequestError::LatitudeOutOfRange(value.to_string()));
            }
        }
        if lat_min > lat_max {
            return Err(RequestError::LatitudeOrder {
                min: lat_min.to_string(),
                max: lat_max.to_string(),
            });
        }
        for value in [lon_min, lon_max] {
            if !convention.contains(value) {
                return Err(RequestError::LongitudeOutOfRange {
                    value: value.to_string(),
                    convention: convention.as_str(),
                    range: convention.range_label(),
                });
            }
        }
        Ok(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            convention,
        })
    }

    /// Builds a box from caller input, inferring the longitude convention.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when validation fails for the inferred convention.
    pub fn detect(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    ) -> Result<Self, RequestError> {
        let convention = LongitudeConvention::detect(lon_min, lon_max);
        Self::new(lat_min, lat_max, lon_min, lon_max, convention)
    }

    /// Returns the whole globe in the given convention.
    #[must_use]
    pub const fn global(convention: LongitudeConvention) -> Self {
        Self {
            lat_min: -90.0,
            lat_max: 90.0,
            lon_min: convention.lower(),
            lon_max: convention.upper(),
            convention,
        }
    }

    /// Southern edge.
    #[must_use]
    pub const fn lat_min(&self) -> f64 {
        self.lat_min
    }

    /// Northern edge.
    #[must_use]
    pub const fn lat_max(&self) -> f64 {
        self.lat_max
    }

    /// Western edge.
    #[must_use]
    pub const fn lon_min(&self) -> f64 {
        self.lon_min
    }

    /// Eastern edge.
    #[must_use]
    pub const fn lon_max(&self) -> f64 {
        self.lon_max
    }

    /// Convention the longitudes are expressed in.
    #[must_use]
    pub const fn convention(&self) -> LongitudeConvention {
        self.convention
    }

    /// Returns true when the box crosses its convention's seam.
    #[must_use]
    pub fn wraps(&self) -> bool {
        self.lon_min > self.lon_max
    }

    /// Eastward longitude extent in degrees, in [0, 360].
    #[must_use]
    pub fn lon_extent(&self) -> f64 {
        if self.wraps() {
            self.lon_max + FULL_TURN - self.lon_min
        } else {
            self.lon_max - self.lon_min
        }
    }

    /// Splits the longitude extent into non-wrapping segments.
    ///
    /// Returns one segment for ordinary boxes and two for seam-crossing boxes,
    /// ordered west to east starting at `lon_min`.
    #[must_use]
    pub fn lon_segments(&self) -> Vec<LonSpan> {
        if self.wraps() {
            vec![
                LonSpan {
                    min: self.lon_min,
                    max: self.convention.upper(),
                },
                LonSpan {
                    min: self.convention.lower(),
                    max: self.lon_max,
                },
            ]
        } else {
            vec![LonSpan {
                min: self.lon_min,
                max: self.lon_max,
            }]
        }
    }

    /// Re-expresses the box in `target` without changing the region it covers.
    ///
    /// Boxes already in `target` are returned unchanged. A longitude extent of
    /// a full turn maps to the whole range of `target`. Each edge is mapped on
    /// its own, so the result wraps only when the mapped west edge lies east
    /// of the mapped east edge.
    #[must_use]
    pub fn normalize(&self, target: LongitudeConvention) -> Self {
        if self.convention == target {
            return *self;
        }
        let extent = self.lon_extent();
        let (lon_min, lon_max) = if extent >= FULL_TURN {
            (target.lower(), target.upper())
        } else {
            let west = target.wrap_west(self.lon_min);
            let east = if extent <= EDGE_EPSILON { west } else { target.wrap_east(self.lon_max) };
            (west, east)
        };
        Self {
            lat_min: self.lat_min,
            lat_max: self.lat_max,
            lon_min,
            lon_max,
            convention: target,
        }
    }

    /// Builds a box from a center longitude and extent, wrapping into `convention`.
    ///
    /// Latitudes are clamped to [-90, 90].
    #[must_use]
    pub fn around(
        lat_center: f64,
        lat_extent: f64,
        lon_center: f64,
        lon_extent: f64,
        convention: LongitudeConvention,
    ) -> Self {
        let half_lat = lat_extent.max(0.0) / 2.0;
        let lat_min = (lat_center - half_lat).max(-90.0);
        let lat_max = (lat_center + half_lat).min(90.0);
        let extent = lon_extent.clamp(0.0, FULL_TURN);
        if extent >= FULL_TURN {
            return Self {
                lat_min,
                lat_max,
                lon_min: convention.lower(),
                lon_max: convention.upper(),
                convention,
            };
        }
        let west = lon_center - extent / 2.0;
        let lon_min = convention.wrap_west(west);
        let lon_max =
            if extent <= EDGE_EPSILON { lon_min } else { convention.wrap_east(west + extent) };
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            convention,
        }
    }

    /// Latitude midpoint.
    #[must_use]
    pub fn lat_center(&self) -> f64 {
        f64::midpoint(self.lat_min, self.lat_max)
    }

    /// Longitude midpoint measured eastward from `lon_min`, not wrapped.
    #[must_use]
    pub fn lon_center(&self) -> f64 {
        self.lon_min + self.lon_extent() / 2.0
    }
}
