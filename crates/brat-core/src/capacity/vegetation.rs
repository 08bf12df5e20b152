//! Vegetation stage: riparian (100 m) and streamside (30 m) suitability to a
//! dam density supported by vegetation alone.
use serde::{Deserialize, Serialize};

use super::{round_to, Density, Reclass, StageOutput, DENSITY_DOMAIN, DENSITY_GEOMETRY, PERVASIVE_CEILING};
use crate::error::Result;
use crate::fuzzy::{Adjustment, Clause, FuzzySystem, FuzzyVariable, Geometry, Inference, Rule, OUTPUT_STEP};
use crate::reach::SUITABILITY_DOMAIN;

/// Suitability categories, in variable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suitability {
    Unsuitable,
    Barely,
    Moderately,
    Suitable,
    Preferred,
}

impl Suitability {
    pub const ALL: [Suitability; 5] = [
        Suitability::Unsuitable,
        Suitability::Barely,
        Suitability::Moderately,
        Suitability::Suitable,
        Suitability::Preferred,
    ];

    /// Score at which this category has full membership.
    pub fn center(self) -> f64 {
        match SUITABILITY_GEOMETRY[self as usize].1 {
            Geometry::Triangle([_, b, _]) => b,
            Geometry::Trapezoid([_, b, c, _]) => (b + c) / 2.0,
        }
    }
}

/// Same curves for both buffers.
pub const SUITABILITY_GEOMETRY: [(&str, Geometry); 5] = [
    ("unsuitable", Geometry::Trapezoid([0.0, 0.0, 0.1, 1.0])),
    ("barely", Geometry::Triangle([0.1, 1.0, 2.0])),
    ("moderately", Geometry::Triangle([1.0, 2.0, 3.0])),
    ("suitable", Geometry::Triangle([2.0, 3.0, 4.0])),
    ("preferred", Geometry::Triangle([3.0, 4.0, 4.0])),
];

const RIPARIAN: usize = 0;
const STREAMSIDE: usize = 1;

macro_rules! veg {
    ($riparian:ident, $streamside:ident => $density:ident) => {
        Rule {
            antecedent: &[
                Clause { variable: RIPARIAN, category: Suitability::$riparian as usize, negated: false },
                Clause { variable: STREAMSIDE, category: Suitability::$streamside as usize, negated: false },
            ],
            consequent: Density::$density as usize,
        }
    };
}

/// One rule per (riparian, streamside) pair, grouped by streamside.
pub const VEGETATION_RULES: &[Rule] = &[
    veg!(Unsuitable, Unsuitable => None),
    veg!(Barely, Unsuitable => Rare),
    veg!(Moderately, Unsuitable => Rare),
    veg!(Suitable, Unsuitable => Occasional),
    veg!(Preferred, Unsuitable => Occasional),
    veg!(Unsuitable, Barely => Rare),
    veg!(Barely, Barely => Rare),
    veg!(Moderately, Barely => Occasional),
    veg!(Suitable, Barely => Occasional),
    veg!(Preferred, Barely => Occasional),
    veg!(Unsuitable, Moderately => Rare),
    veg!(Barely, Moderately => Occasional),
    veg!(Moderately, Moderately => Occasional),
    veg!(Suitable, Moderately => Frequent),
    veg!(Preferred, Moderately => Frequent),
    veg!(Unsuitable, Suitable => Occasional),
    veg!(Barely, Suitable => Occasional),
    veg!(Moderately, Suitable => Frequent),
    veg!(Suitable, Suitable => Frequent),
    veg!(Preferred, Suitable => Pervasive),
    veg!(Unsuitable, Preferred => Occasional),
    veg!(Barely, Preferred => Frequent),
    veg!(Moderately, Preferred => Pervasive),
    veg!(Suitable, Preferred => Pervasive),
    veg!(Preferred, Preferred => Pervasive),
];

#[derive(Debug, Clone)]
pub struct VegetationFis {
    system: FuzzySystem,
    /// Centroid of "none" alone, rounded to 6 decimals.
    none_centroid: f64,
    /// Centroid of "pervasive" alone, rounded to the unit.
    pervasive_centroid: f64,
}

impl VegetationFis {
    pub fn new(riparian: Option<&Adjustment>, streamside: Option<&Adjustment>) -> Result<Self> {
        let inputs = vec![
            FuzzyVariable::from_geometry("riparian", SUITABILITY_DOMAIN, &SUITABILITY_GEOMETRY, riparian)?,
            FuzzyVariable::from_geometry("streamside", SUITABILITY_DOMAIN, &SUITABILITY_GEOMETRY, streamside)?,
        ];
        let output = FuzzyVariable::from_geometry("density", DENSITY_DOMAIN, &DENSITY_GEOMETRY, None)?;
        let system = FuzzySystem::new(inputs, output, VEGETATION_RULES, OUTPUT_STEP)?;

        let none_centroid = round_to(system.category_centroid(Density::None.index()), 6);
        let pervasive_centroid = system.category_centroid(Density::Pervasive.index()).round();
        Ok(Self { system, none_centroid, pervasive_centroid })
    }

    pub fn system(&self) -> &FuzzySystem {
        &self.system
    }

    pub fn none_centroid(&self) -> f64 {
        self.none_centroid
    }

    pub fn pervasive_centroid(&self) -> f64 {
        self.pervasive_centroid
    }

    pub fn evaluate(&self, riparian: f64, streamside: f64) -> (StageOutput, Inference) {
        let inference = self.system.evaluate(&[riparian, streamside]);
        (self.post_process(&inference), inference)
    }

    fn post_process(&self, inference: &Inference) -> StageOutput {
        let raw = inference.crisp;
        let mut value = raw;
        let mut reclass = Reclass::Unchanged;
        if round_to(raw, 6) == self.none_centroid {
            value = 0.0;
            reclass = Reclass::NoneToZero;
        }
        if value.round() >= self.pervasive_centroid {
            value = PERVASIVE_CEILING;
            reclass = Reclass::PervasiveCeiling;
        }
        StageOutput { value: round_to(value, 2), raw, reclass, empty_surface: inference.empty_surface }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::rules::validate_table;
    use std::collections::HashSet;

    fn fis() -> VegetationFis {
        VegetationFis::new(None, None).unwrap()
    }

    #[test]
    fn table_covers_every_pair_once() {
        assert_eq!(VEGETATION_RULES.len(), 25);
        assert!(validate_table(VEGETATION_RULES, &[5, 5], 5).is_ok());
        let pairs: HashSet<(usize, usize)> = VEGETATION_RULES
            .iter()
            .map(|r| (r.antecedent[0].category, r.antecedent[1].category))
            .collect();
        assert_eq!(pairs.len(), 25);
    }

    #[test]
    fn streamside_outweighs_riparian_off_the_diagonal() {
        let consequent = |r: Suitability, s: Suitability| {
            VEGETATION_RULES
                .iter()
                .find(|rule| rule.antecedent[0].category == r as usize && rule.antecedent[1].category == s as usize)
                .map(|rule| rule.consequent)
        };
        use Suitability::*;
        assert_eq!(consequent(Barely, Preferred), Some(Density::Frequent as usize));
        assert_eq!(consequent(Preferred, Barely), Some(Density::Occasional as usize));
        assert_eq!(consequent(Moderately, Preferred), Some(Density::Pervasive as usize));
        assert_eq!(consequent(Preferred, Moderately), Some(Density::Frequent as usize));
        assert_eq!(consequent(Suitable, Barely), consequent(Barely, Suitable));
    }

    #[test]
    fn unsuitable_pair_reports_zero() {
        let (out, _) = fis().evaluate(0.0, 0.0);
        assert_eq!(out.value, 0.0);
        assert_eq!(out.reclass, Reclass::NoneToZero);
    }

    #[test]
    fn preferred_pair_hits_the_ceiling() {
        let (out, _) = fis().evaluate(4.0, 4.0);
        assert_eq!(out.value, PERVASIVE_CEILING);
        assert_eq!(out.reclass, Reclass::PervasiveCeiling);
        assert!(out.raw > 25.0 && out.raw < 45.0, "raw centroid {}", out.raw);
    }

    #[test]
    fn output_is_monotone_along_the_diagonal() {
        let f = fis();
        let values: Vec<f64> = Suitability::ALL.iter().map(|s| f.evaluate(s.center(), s.center()).0.value).collect();
        for w in values.windows(2) {
            assert!(w[0] <= w[1], "diagonal not monotone: {values:?}");
        }
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let f = fis();
        let (clamped, inference) = f.evaluate(7.0, -2.0);
        assert_eq!(inference.clamped, vec![true, true]);
        assert_eq!(clamped.value, f.evaluate(4.0, 0.0).0.value);
    }

    #[test]
    fn reclassification_constants() {
        let f = fis();
        assert!((f.none_centroid() - 0.033).abs() < 0.001, "none centroid {}", f.none_centroid());
        assert!(f.pervasive_centroid() > 25.0 && f.pervasive_centroid() < 40.0);
    }
}
