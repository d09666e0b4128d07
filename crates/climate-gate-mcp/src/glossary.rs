// climate-gate-mcp/src/glossary.rs
// ============================================================================
// Module: Variable Glossary
// Description: Built-in table of common CMIP variable names.
// Purpose: Let keyword search find variables by meaning, not only by name.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A fixed table of CMIP short names with long names, canonical units, and
//! concept keywords. Matching is case-insensitive over all three, so
//! "temperature" finds `tas`, `tasmax`, and `tasmin`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Table
// ============================================================================

/// One glossary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlossaryEntry {
    /// CMIP short name.
    pub name: &'static str,
    /// Long name.
    pub long_name: &'static str,
    /// Canonical units.
    pub units: &'static str,
    /// Concept keywords.
    pub keywords: &'static [&'static str],
}

/// Keywords shared by the temperature family.
const TEMPERATURE: &[&str] = &["temperature", "heat", "warming"];
/// Keywords shared by precipitation fields.
const PRECIPITATION: &[&str] = &["precipitation", "rain", "snow", "water"];
/// Keywords shared by humidity fields.
const HUMIDITY: &[&str] = &["humidity", "moisture", "water"];
/// Keywords shared by pressure fields.
const PRESSURE: &[&str] = &["pressure", "atmosphere"];
/// Keywords shared by wind fields.
const WIND: &[&str] = &["wind", "circulation"];
/// Keywords shared by ocean surface fields.
const OCEAN: &[&str] = &["ocean", "sea"];
/// Keywords shared by radiation fields.
const RADIATION: &[&str] = &["radiation", "energy", "flux"];

/// Built-in glossary.
pub const GLOSSARY: &[GlossaryEntry] = &[
    GlossaryEntry {
        name: "tas",
        long_name: "Near-Surface Air Temperature",
        units: "K",
        keywords: TEMPERATURE,
    },
    GlossaryEntry {
        name: "tasmax",
        long_name: "Daily Maximum Near-Surface Air Temperature",
        units: "K",
        keywords: TEMPERATURE,
    },
    GlossaryEntry {
        name: "tasmin",
        long_name: "Daily Minimum Near-Surface Air Temperature",
        units: "K",
        keywords: TEMPERATURE,
    },
    GlossaryEntry {
        name: "pr",
        long_name: "Precipitation",
        units: "kg m-2 s-1",
        keywords: PRECIPITATION,
    },
    GlossaryEntry {
        name: "prsn",
        long_name: "Snowfall Flux",
        units: "kg m-2 s-1",
        keywords: PRECIPITATION,
    },
    GlossaryEntry {
        name: "hurs",
        long_name: "Near-Surface Relative Humidity",
        units: "%",
        keywords: HUMIDITY,
    },
    GlossaryEntry {
        name: "huss",
        long_name: "Near-Surface Specific Humidity",
        units: "kg/kg",
        keywords: HUMIDITY,
    },
    GlossaryEntry {
        name: "psl",
        long_name: "Sea Level Pressure",
        units: "Pa",
        keywords: PRESSURE,
    },
    GlossaryEntry {
        name: "ps",
        long_name: "Surface Air Pressure",
        units: "Pa",
        keywords: PRESSURE,
    },
    GlossaryEntry {
        name: "uas",
        long_name: "Eastward Near-Surface Wind",
        units: "m s-1",
        keywords: WIND,
    },
    GlossaryEntry {
        name: "vas",
        long_name: "Northward Near-Surface Wind",
        units: "m s-1",
        keywords: WIND,
    },
    GlossaryEntry {
        name: "sfcWind",
        long_name: "Near-Surface Wind Speed",
        units: "m s-1",
        keywords: WIND,
    },
    GlossaryEntry {
        name: "clt",
        long_name: "Total Cloud Cover Percentage",
        units: "%",
        keywords: &["cloud", "cover"],
    },
    GlossaryEntry {
        name: "tos",
        long_name: "Sea Surface Temperature",
        units: "degC",
        keywords: &["temperature", "ocean", "sea"],
    },
    GlossaryEntry {
        name: "sos",
        long_name: "Sea Surface Salinity",
        units: "0.001",
        keywords: &["salinity", "ocean", "sea"],
    },
    GlossaryEntry {
        name: "zos",
        long_name: "Sea Surface Height Above Geoid",
        units: "m",
        keywords: OCEAN,
    },
    GlossaryEntry {
        name: "rsds",
        long_name: "Surface Downwelling Shortwave Radiation",
        units: "W m-2",
        keywords: RADIATION,
    },
    GlossaryEntry {
        name: "rsus",
        long_name: "Surface Upwelling Shortwave Radiation",
        units: "W m-2",
        keywords: RADIATION,
    },
    GlossaryEntry {
        name: "rlds",
        long_name: "Surface Downwelling Longwave Radiation",
        units: "W m-2",
        keywords: RADIATION,
    },
    GlossaryEntry {
        name: "rlus",
        long_name: "Surface Upwelling Longwave Radiation",
        units: "W m-2",
        keywords: RADIATION,
    },
];

// ============================================================================
// SECTION: Lookup
// ============================================================================

/// Entry for an exact short name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static GlossaryEntry> {
    GLOSSARY.iter().find(|entry| entry.name == name)
}

/// Entries whose name, long name, or keywords contain `keyword`.
///
/// An empty or blank keyword matches every entry.
#[must_use]
pub fn matches(keyword: &str) -> Vec<&'static GlossaryEntry> {
    let needle = keyword.trim().to_lowercase();
    GLOSSARY.iter().filter(|entry| entry.matches(&needle)).collect()
}

impl GlossaryEntry {
    /// Case-insensitive containment test against a lowercased needle.
    fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.long_name.to_lowercase().contains(needle)
            || self.keywords.iter().any(|keyword| keyword.contains(needle))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
