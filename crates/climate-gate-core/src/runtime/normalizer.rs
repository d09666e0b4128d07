// climate-gate-core/src/runtime/normalizer.rs
// ============================================================================
// Module: Climate Gate Coordinate Normalizer
// Description: Rewrites caller regions into the archive's longitude convention.
// Purpose: Run before any archive access so every later stage sees one convention.
// Dependencies: crate::core::geo
// ============================================================================

//! ## Overview
//! The normalizer is bound to the archive's native [`LongitudeConvention`].
//! It reports whether a conversion happened so the dispatcher can log it;
//! normalizing an already normalized region is the identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::LongitudeConvention;
use crate::core::SpatialBox;

// ============================================================================
// SECTION: Normalizer
// ============================================================================

/// Region after normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// Region in the archive convention.
    pub region: SpatialBox,
    /// Region as supplied, when it had to be rewritten.
    pub original: Option<SpatialBox>,
}

/// Converts regions into the archive's longitude convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinateNormalizer {
    /// Archive-native convention.
    archive: LongitudeConvention,
}

impl CoordinateNormalizer {
    /// Builds a normalizer for an archive using `archive` longitudes.
    #[must_use]
    pub const fn new(archive: LongitudeConvention) -> Self {
        Self {
            archive,
        }
    }

    /// Archive-native convention.
    #[must_use]
    pub const fn archive_convention(&self) -> LongitudeConvention {
        self.archive
    }

    /// Normalizes a region.
    #[must_use]
    pub fn normalize(&self, region: &SpatialBox) -> Normalized {
        let normalized = region.normalize(self.archive);
        Normalized {
            region: normalized,
            original: (normalized != *region).then_some(*region),
        }
    }

    /// Whole globe in the archive convention.
    #[must_use]
    pub const fn global(&self) -> SpatialBox {
        SpatialBox::global(self.archive)
    }
}
