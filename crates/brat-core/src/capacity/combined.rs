//! Combined stage: vegetation capacity limited by baseflow and peak-flow
//! stream power and by channel slope.
use serde::{Deserialize, Serialize};

use super::{round_to, Density, Reclass, StageOutput, DENSITY_DOMAIN, DENSITY_GEOMETRY};
use crate::error::Result;
use crate::fuzzy::{Adjustment, Clause, FuzzySystem, FuzzyVariable, Geometry, Inference, Rule, OUTPUT_STEP};
use crate::reach::{SLOPE_DOMAIN, STREAM_POWER_DOMAIN};

/// Whether a dam survives the typical two-year flood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakFlow {
    Persists,
    Breach,
    OccasionalBlowout,
    Blowout,
}

/// Whether beavers can build against typical low flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseflow {
    Can,
    Probably,
    Cannot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    Flat,
    Can,
    Probably,
    Cannot,
}

pub const PEAK_FLOW_GEOMETRY: [(&str, Geometry); 4] = [
    ("persists", Geometry::Trapezoid([0.0, 0.0, 1000.0, 1200.0])),
    ("breach", Geometry::Triangle([1000.0, 1200.0, 1600.0])),
    ("occasional_blowout", Geometry::Triangle([1200.0, 1600.0, 2800.0])),
    ("blowout", Geometry::Trapezoid([1600.0, 2800.0, 10_000.0, 10_000.0])),
];

pub const BASEFLOW_GEOMETRY: [(&str, Geometry); 3] = [
    ("can", Geometry::Trapezoid([0.0, 0.0, 150.0, 170.0])),
    ("probably", Geometry::Trapezoid([150.0, 170.0, 180.0, 190.0])),
    ("cannot", Geometry::Trapezoid([180.0, 190.0, 10_000.0, 10_000.0])),
];

pub const SLOPE_GEOMETRY: [(&str, Geometry); 4] = [
    ("flat", Geometry::Trapezoid([0.0, 0.0, 0.0002, 0.005])),
    ("can", Geometry::Trapezoid([0.0002, 0.005, 0.12, 0.15])),
    ("probably", Geometry::Trapezoid([0.12, 0.15, 0.17, 0.23])),
    ("cannot", Geometry::Trapezoid([0.17, 0.23, 1.0, 1.0])),
];

const VEGETATION: usize = 0;
const PEAK_FLOW: usize = 1;
const BASEFLOW: usize = 2;
const SLOPE: usize = 3;

macro_rules! clause {
    (VC is $c:ident) => {
        Clause { variable: VEGETATION, category: Density::$c as usize, negated: false }
    };
    (SP2 is $c:ident) => {
        Clause { variable: PEAK_FLOW, category: PeakFlow::$c as usize, negated: false }
    };
    (SPLOW is $c:ident) => {
        Clause { variable: BASEFLOW, category: Baseflow::$c as usize, negated: false }
    };
    (SLOPE is $c:ident) => {
        Clause { variable: SLOPE, category: Slope::$c as usize, negated: false }
    };
    (SLOPE not $c:ident) => {
        Clause { variable: SLOPE, category: Slope::$c as usize, negated: true }
    };
}

macro_rules! rule {
    ($( ($($c:tt)+) ),+ => $out:ident) => {
        Rule { antecedent: &[$(clause!($($c)+)),+], consequent: Density::$out as usize }
    };
}

pub const COMBINED_RULES: &[Rule] = &[
    // No vegetation, no water at low flow, or too steep: nothing else matters.
    rule!((VC is None) => None),
    rule!((SPLOW is Cannot) => None),
    rule!((SLOPE is Cannot) => None),
    // ── Rare vegetation ─────────────────────────────────────────────────────
    rule!((VC is Rare), (SP2 is Persists), (SPLOW is Can), (SLOPE not Cannot) => Rare),
    rule!((VC is Rare), (SP2 is Persists), (SPLOW is Probably), (SLOPE not Cannot) => Rare),
    rule!((VC is Rare), (SP2 is Breach), (SPLOW is Can), (SLOPE not Cannot) => Rare),
    rule!((VC is Rare), (SP2 is Breach), (SPLOW is Probably), (SLOPE not Cannot) => Rare),
    rule!((VC is Rare), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE not Cannot) => Rare),
    rule!((VC is Rare), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE not Cannot) => Rare),
    rule!((VC is Rare), (SP2 is Blowout), (SPLOW is Can), (SLOPE not Cannot) => None),
    rule!((VC is Rare), (SP2 is Blowout), (SPLOW is Probably), (SLOPE not Cannot) => None),
    // ── Occasional vegetation ───────────────────────────────────────────────
    rule!((VC is Occasional), (SP2 is Persists), (SPLOW is Can), (SLOPE not Cannot) => Occasional),
    rule!((VC is Occasional), (SP2 is Persists), (SPLOW is Probably), (SLOPE not Cannot) => Occasional),
    rule!((VC is Occasional), (SP2 is Breach), (SPLOW is Can), (SLOPE not Cannot) => Occasional),
    rule!((VC is Occasional), (SP2 is Breach), (SPLOW is Probably), (SLOPE not Cannot) => Occasional),
    rule!((VC is Occasional), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE not Cannot) => Occasional),
    rule!((VC is Occasional), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE not Cannot) => Occasional),
    rule!((VC is Occasional), (SP2 is Blowout), (SPLOW is Can), (SLOPE not Cannot) => Rare),
    rule!((VC is Occasional), (SP2 is Blowout), (SPLOW is Probably), (SLOPE not Cannot) => Rare),
    // ── Frequent vegetation ─────────────────────────────────────────────────
    rule!((VC is Frequent), (SP2 is Persists), (SPLOW is Can), (SLOPE is Flat) => Occasional),
    rule!((VC is Frequent), (SP2 is Persists), (SPLOW is Can), (SLOPE is Can) => Frequent),
    rule!((VC is Frequent), (SP2 is Persists), (SPLOW is Can), (SLOPE is Probably) => Occasional),
    rule!((VC is Frequent), (SP2 is Persists), (SPLOW is Probably), (SLOPE is Flat) => Occasional),
    rule!((VC is Frequent), (SP2 is Persists), (SPLOW is Probably), (SLOPE is Can) => Occasional),
    rule!((VC is Frequent), (SP2 is Persists), (SPLOW is Probably), (SLOPE is Probably) => Rare),
    rule!((VC is Frequent), (SP2 is Breach), (SPLOW is Can), (SLOPE is Flat) => Occasional),
    rule!((VC is Frequent), (SP2 is Breach), (SPLOW is Can), (SLOPE is Can) => Frequent),
    rule!((VC is Frequent), (SP2 is Breach), (SPLOW is Can), (SLOPE is Probably) => Occasional),
    rule!((VC is Frequent), (SP2 is Breach), (SPLOW is Probably), (SLOPE is Flat) => Occasional),
    rule!((VC is Frequent), (SP2 is Breach), (SPLOW is Probably), (SLOPE is Can) => Occasional),
    rule!((VC is Frequent), (SP2 is Breach), (SPLOW is Probably), (SLOPE is Probably) => Rare),
    rule!((VC is Frequent), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE is Flat) => Occasional),
    rule!((VC is Frequent), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE is Can) => Occasional),
    rule!((VC is Frequent), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE is Probably) => Rare),
    rule!((VC is Frequent), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE is Flat) => Rare),
    rule!((VC is Frequent), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE is Can) => Rare),
    rule!((VC is Frequent), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE is Probably) => Rare),
    rule!((VC is Frequent), (SP2 is Blowout), (SPLOW is Can), (SLOPE is Flat) => Rare),
    rule!((VC is Frequent), (SP2 is Blowout), (SPLOW is Can), (SLOPE is Can) => Rare),
    rule!((VC is Frequent), (SP2 is Blowout), (SPLOW is Can), (SLOPE is Probably) => Rare),
    rule!((VC is Frequent), (SP2 is Blowout), (SPLOW is Probably), (SLOPE is Flat) => Rare),
    rule!((VC is Frequent), (SP2 is Blowout), (SPLOW is Probably), (SLOPE is Can) => Rare),
    rule!((VC is Frequent), (SP2 is Blowout), (SPLOW is Probably), (SLOPE is Probably) => Rare),
    // ── Pervasive vegetation ────────────────────────────────────────────────
    rule!((VC is Pervasive), (SP2 is Persists), (SPLOW is Can), (SLOPE is Flat) => Frequent),
    rule!((VC is Pervasive), (SP2 is Persists), (SPLOW is Can), (SLOPE is Can) => Pervasive),
    rule!((VC is Pervasive), (SP2 is Persists), (SPLOW is Can), (SLOPE is Probably) => Occasional),
    rule!((VC is Pervasive), (SP2 is Persists), (SPLOW is Probably), (SLOPE is Flat) => Frequent),
    rule!((VC is Pervasive), (SP2 is Persists), (SPLOW is Probably), (SLOPE is Can) => Frequent),
    rule!((VC is Pervasive), (SP2 is Persists), (SPLOW is Probably), (SLOPE is Probably) => Occasional),
    rule!((VC is Pervasive), (SP2 is Breach), (SPLOW is Can), (SLOPE is Flat) => Frequent),
    rule!((VC is Pervasive), (SP2 is Breach), (SPLOW is Can), (SLOPE is Can) => Frequent),
    rule!((VC is Pervasive), (SP2 is Breach), (SPLOW is Can), (SLOPE is Probably) => Occasional),
    rule!((VC is Pervasive), (SP2 is Breach), (SPLOW is Probably), (SLOPE is Flat) => Occasional),
    rule!((VC is Pervasive), (SP2 is Breach), (SPLOW is Probably), (SLOPE is Can) => Occasional),
    rule!((VC is Pervasive), (SP2 is Breach), (SPLOW is Probably), (SLOPE is Probably) => Rare),
    rule!((VC is Pervasive), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE is Flat) => Frequent),
    rule!((VC is Pervasive), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE is Can) => Frequent),
    rule!((VC is Pervasive), (SP2 is OccasionalBlowout), (SPLOW is Can), (SLOPE is Probably) => Occasional),
    rule!((VC is Pervasive), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE is Flat) => Occasional),
    rule!((VC is Pervasive), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE is Can) => Occasional),
    rule!((VC is Pervasive), (SP2 is OccasionalBlowout), (SPLOW is Probably), (SLOPE is Probably) => Rare),
    rule!((VC is Pervasive), (SP2 is Blowout), (SPLOW is Can), (SLOPE is Flat) => Occasional),
    rule!((VC is Pervasive), (SP2 is Blowout), (SPLOW is Can), (SLOPE is Can) => Occasional),
    rule!((VC is Pervasive), (SP2 is Blowout), (SPLOW is Can), (SLOPE is Probably) => Rare),
    rule!((VC is Pervasive), (SP2 is Blowout), (SPLOW is Probably), (SLOPE is Flat) => Rare),
    rule!((VC is Pervasive), (SP2 is Blowout), (SPLOW is Probably), (SLOPE is Can) => Rare),
    rule!((VC is Pervasive), (SP2 is Blowout), (SPLOW is Probably), (SLOPE is Probably) => Rare),
];

#[derive(Debug, Clone)]
pub struct CombinedFis {
    system: FuzzySystem,
    none_centroid: f64,
}

impl CombinedFis {
    /// The vegetation-capacity input reuses the density curves and is never
    /// adjusted.
    pub fn new(
        peak_flow: Option<&Adjustment>,
        baseflow: Option<&Adjustment>,
        slope: Option<&Adjustment>,
    ) -> Result<Self> {
        let inputs = vec![
            FuzzyVariable::from_geometry("vegetation_capacity", DENSITY_DOMAIN, &DENSITY_GEOMETRY, None)?,
            FuzzyVariable::from_geometry("peak_flow", STREAM_POWER_DOMAIN, &PEAK_FLOW_GEOMETRY, peak_flow)?,
            FuzzyVariable::from_geometry("baseflow", STREAM_POWER_DOMAIN, &BASEFLOW_GEOMETRY, baseflow)?,
            FuzzyVariable::from_geometry("slope", SLOPE_DOMAIN, &SLOPE_GEOMETRY, slope)?,
        ];
        let output = FuzzyVariable::from_geometry("density", DENSITY_DOMAIN, &DENSITY_GEOMETRY, None)?;
        let system = FuzzySystem::new(inputs, output, COMBINED_RULES, OUTPUT_STEP)?;
        let none_centroid = round_to(system.category_centroid(Density::None.index()), 6);
        Ok(Self { system, none_centroid })
    }

    pub fn system(&self) -> &FuzzySystem {
        &self.system
    }

    /// `vegetation_capacity` is the reported (rounded) vegetation stage value;
    /// the result never exceeds it.
    pub fn evaluate(
        &self,
        vegetation_capacity: f64,
        peak_flow: f64,
        baseflow: f64,
        slope: f64,
    ) -> (StageOutput, Inference) {
        let inference = self.system.evaluate(&[vegetation_capacity, peak_flow, baseflow, slope]);
        let raw = inference.crisp;
        let mut value = raw;
        let mut reclass = Reclass::Unchanged;
        if round_to(raw, 6) == self.none_centroid {
            value = 0.0;
            reclass = Reclass::NoneToZero;
        }
        if value > vegetation_capacity {
            value = vegetation_capacity;
            reclass = Reclass::CappedByVegetation;
        }
        let out = StageOutput { value: round_to(value, 2), raw, reclass, empty_surface: inference.empty_surface };
        (out, inference)
    }
}
