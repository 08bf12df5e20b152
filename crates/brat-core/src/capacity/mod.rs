//! Beaver dam capacity: the vegetation stage, the combined stage that layers
//! hydrology and slope on top of it, and the conversion from density to an
//! expected dam count per reach.
pub mod combined;
pub mod dams;
pub mod model;
pub mod vegetation;

use serde::{Deserialize, Serialize};

use crate::fuzzy::{Domain, Geometry};

pub use combined::{Baseflow, CombinedFis, PeakFlow, Slope};
pub use dams::dam_count;
pub use model::{AdjustmentSet, CapacityConfig, CapacityModel, Diagnostics, ReachCapacity};
pub use vegetation::{Suitability, VegetationFis};

/// Dam density universe (dams/km).  Shared by the vegetation output, the
/// combined stage's vegetation input and the combined output.
pub const DENSITY_DOMAIN: Domain = Domain::new(0.0, 45.0);

/// Value assigned when the vegetation result reaches the pervasive centroid.
pub const PERVASIVE_CEILING: f64 = 40.0;

/// Dam density categories, in output-variable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    None,
    Rare,
    Occasional,
    Frequent,
    Pervasive,
}

impl Density {
    pub const ALL: [Density; 5] =
        [Density::None, Density::Rare, Density::Occasional, Density::Frequent, Density::Pervasive];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        DENSITY_GEOMETRY[self as usize].0
    }
}

/// Density curves.  Never adjusted.
pub const DENSITY_GEOMETRY: [(&str, Geometry); 5] = [
    ("none", Geometry::Triangle([0.0, 0.0, 0.1])),
    ("rare", Geometry::Trapezoid([0.0, 0.1, 0.5, 1.5])),
    ("occasional", Geometry::Trapezoid([0.5, 1.5, 4.0, 8.0])),
    ("frequent", Geometry::Trapezoid([4.0, 8.0, 12.0, 25.0])),
    ("pervasive", Geometry::Trapezoid([12.0, 25.0, 45.0, 45.0])),
];

/// What post-processing did to a stage's raw centroid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reclass {
    #[default]
    Unchanged,
    /// Centroid equalled the lone "none" centroid and was reported as 0.
    NoneToZero,
    /// Vegetation result reached the pervasive centroid and was set to the
    /// ceiling.
    PervasiveCeiling,
    /// Combined result exceeded the vegetation capacity and was capped.
    CappedByVegetation,
    /// Drainage area at or above the limit; the stage was not evaluated.
    DrainageGated,
}

/// Post-processed result of one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageOutput {
    /// Reported value, rounded to two decimals.
    pub value: f64,
    /// Centroid before post-processing.
    pub raw: f64,
    pub reclass: Reclass,
    pub empty_surface: bool,
}

/// Round half away from zero to `places` decimals.
#[inline]
pub fn round_to(x: f64, places: i32) -> f64 {
    let m = 10f64.powi(places);
    (x * m).round() / m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_order_matches_geometry() {
        for d in Density::ALL {
            assert_eq!(DENSITY_GEOMETRY[d.index()].0, d.name());
        }
        assert_eq!(Density::Frequent.name(), "frequent");
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to(1.005_000_1, 2), 1.01);
        assert_eq!(round_to(2.344, 2), 2.34);
        assert_eq!(round_to(0.033_333_33, 6), 0.033333);
        assert_eq!(round_to(30.5, 0), 31.0);
    }
}
