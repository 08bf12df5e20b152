//! The two-stage pipeline over a batch of reaches.
//!
//! A [`CapacityModel`] is built once from a [`CapacityConfig`] (adjustments
//! are applied at build time) and is immutable afterwards, so a batch can be
//! evaluated in parallel against one shared model.
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{dam_count, CombinedFis, Reclass, VegetationFis};
use crate::error::{BratError, Result};
use crate::fuzzy::{Adjustment, FuzzySystem, FuzzyVariable};
use crate::reach::{InputVariable, Reach};

/// Reach code of artificial paths (canals and the like); kept in the
/// default drainage-area exception set.
pub const ARTIFICIAL_PATH_REACH_CODE: u32 = 33400;

/// Samples across a domain when scanning adjusted inputs for coverage gaps.
const GAP_SCAN_SAMPLES: f64 = 4000.0;

/// At most one adjustment per input variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjustmentSet {
    pub streamside: Option<Adjustment>,
    pub riparian: Option<Adjustment>,
    pub baseflow: Option<Adjustment>,
    pub peak_flow: Option<Adjustment>,
    pub slope: Option<Adjustment>,
}

impl AdjustmentSet {
    pub fn get(&self, variable: InputVariable) -> Option<&Adjustment> {
        self.slot(variable).as_ref()
    }

    /// Assign an adjustment; fails if the variable already carries one.
    pub fn insert(&mut self, variable: InputVariable, adjustment: Adjustment) -> Result<()> {
        let slot = self.slot_mut(variable);
        if let Some(existing) = slot {
            return Err(BratError::InvalidConfig(format!(
                "{variable} already carries {existing}, cannot also apply {adjustment}"
            )));
        }
        *slot = Some(adjustment);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (InputVariable, &Adjustment)> + '_ {
        InputVariable::ALL.into_iter().filter_map(|v| self.get(v).map(|a| (v, a)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(_, adj)| adj.validate())
    }

    fn slot(&self, variable: InputVariable) -> &Option<Adjustment> {
        match variable {
            InputVariable::Streamside => &self.streamside,
            InputVariable::Riparian => &self.riparian,
            InputVariable::Baseflow => &self.baseflow,
            InputVariable::PeakFlow => &self.peak_flow,
            InputVariable::Slope => &self.slope,
        }
    }

    fn slot_mut(&mut self, variable: InputVariable) -> &mut Option<Adjustment> {
        match variable {
            InputVariable::Streamside => &mut self.streamside,
            InputVariable::Riparian => &mut self.riparian,
            InputVariable::Baseflow => &mut self.baseflow,
            InputVariable::PeakFlow => &mut self.peak_flow,
            InputVariable::Slope => &mut self.slope,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapacityConfig {
    /// Reaches draining at least this area (km²) get zero combined capacity.
    pub max_drainage_area: Option<f64>,
    /// Reach codes exempt from drainage-area gating.
    pub drainage_exceptions: Vec<u32>,
    pub adjustments: AdjustmentSet,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            max_drainage_area: None,
            drainage_exceptions: vec![ARTIFICIAL_PATH_REACH_CODE],
            adjustments: AdjustmentSet::default(),
        }
    }
}

impl CapacityConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_drainage_area {
            if !max.is_finite() || max < 0.0 {
                return Err(BratError::InvalidConfig(format!(
                    "max_drainage_area must be a non-negative number, got {max}"
                )));
            }
        }
        self.adjustments.validate()
    }
}

/// Per-reach record of everything post-processing did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Inputs that were outside their domain and clamped.
    pub clamped: Vec<InputVariable>,
    pub vegetation: Reclass,
    pub combined: Reclass,
    /// A stage had no firing rule and reported 0.
    pub empty_surface: bool,
}

impl Diagnostics {
    pub fn drainage_gated(&self) -> bool {
        self.combined == Reclass::DrainageGated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachCapacity {
    pub reach_id: i64,
    /// Dams/km supported by vegetation alone.
    pub vegetation: f64,
    /// Dams/km once hydrology and slope are considered.
    pub combined: f64,
    pub dam_count: f64,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct CapacityModel {
    vegetation: VegetationFis,
    combined: CombinedFis,
    max_drainage_area: Option<f64>,
    drainage_exceptions: Vec<u32>,
    adjustments: AdjustmentSet,
}

impl CapacityModel {
    pub fn new(config: &CapacityConfig) -> Result<Self> {
        config.validate()?;
        let adj = &config.adjustments;
        let vegetation = VegetationFis::new(adj.riparian.as_ref(), adj.streamside.as_ref())?;
        let combined = CombinedFis::new(adj.peak_flow.as_ref(), adj.baseflow.as_ref(), adj.slope.as_ref())?;

        let model = Self {
            vegetation,
            combined,
            max_drainage_area: config.max_drainage_area,
            drainage_exceptions: config.drainage_exceptions.clone(),
            adjustments: adj.clone(),
        };
        for (variable, gaps) in model.coverage_gaps() {
            debug!(%variable, ?gaps, "adjusted categories leave part of the domain uncovered");
        }
        Ok(model)
    }

    /// Unadjusted model with the default drainage exceptions and no gating.
    pub fn standard() -> Result<Self> {
        Self::new(&CapacityConfig::default())
    }

    pub fn vegetation(&self) -> &VegetationFis {
        &self.vegetation
    }

    pub fn combined(&self) -> &CombinedFis {
        &self.combined
    }

    pub fn adjustments(&self) -> &AdjustmentSet {
        &self.adjustments
    }

    /// The input variable's curves as built, adjustment applied.
    pub fn input_variable(&self, variable: InputVariable) -> &FuzzyVariable {
        let (system, index) = self.locate(variable);
        &system.inputs()[index]
    }

    /// Domain intervals left without any category by adjusted inputs.
    pub fn coverage_gaps(&self) -> Vec<(InputVariable, Vec<(f64, f64)>)> {
        self.adjustments
            .iter()
            .map(|(v, _)| {
                let var = self.input_variable(v);
                let step = (var.domain.max - var.domain.min) / GAP_SCAN_SAMPLES;
                (v, var.coverage_gaps(step))
            })
            .filter(|(_, gaps)| !gaps.is_empty())
            .collect()
    }

    fn locate(&self, variable: InputVariable) -> (&FuzzySystem, usize) {
        match variable {
            InputVariable::Riparian => (self.vegetation.system(), 0),
            InputVariable::Streamside => (self.vegetation.system(), 1),
            InputVariable::PeakFlow => (self.combined.system(), 1),
            InputVariable::Baseflow => (self.combined.system(), 2),
            InputVariable::Slope => (self.combined.system(), 3),
        }
    }

    fn is_gated(&self, reach: &Reach) -> bool {
        match self.max_drainage_area {
            Some(max) if reach.drainage_area_km2 >= max => !reach
                .reach_code
                .is_some_and(|code| self.drainage_exceptions.contains(&code)),
            _ => false,
        }
    }

    pub fn evaluate(&self, reach: &Reach) -> ReachCapacity {
        let mut diagnostics = Diagnostics::default();

        let (veg, veg_inf) = self.vegetation.evaluate(reach.riparian, reach.streamside);
        diagnostics.vegetation = veg.reclass;
        diagnostics.empty_surface = veg.empty_surface;
        for (flag, variable) in veg_inf.clamped.iter().zip([InputVariable::Riparian, InputVariable::Streamside]) {
            if *flag {
                diagnostics.clamped.push(variable);
            }
        }

        let combined = if self.is_gated(reach) {
            diagnostics.combined = Reclass::DrainageGated;
            0.0
        } else {
            let (out, inf) =
                self.combined.evaluate(veg.value, reach.peak_flow_power, reach.baseflow_power, reach.slope);
            diagnostics.combined = out.reclass;
            diagnostics.empty_surface |= out.empty_surface;
            let tail = [InputVariable::PeakFlow, InputVariable::Baseflow, InputVariable::Slope];
            for (flag, variable) in inf.clamped[1..].iter().zip(tail) {
                if *flag {
                    diagnostics.clamped.push(variable);
                }
            }
            out.value
        };

        if !diagnostics.clamped.is_empty() {
            debug!(reach = reach.id, clamped = ?diagnostics.clamped, "inputs clamped into domain");
        }

        ReachCapacity {
            reach_id: reach.id,
            vegetation: veg.value,
            combined,
            dam_count: dam_count(combined, reach.length_m),
            diagnostics,
        }
    }

    /// Evaluate a batch; results come back in input order.
    pub fn run(&self, reaches: &[Reach]) -> Vec<ReachCapacity> {
        #[cfg(feature = "threading")]
        let results: Vec<ReachCapacity> = reaches.par_iter().map(|r| self.evaluate(r)).collect();
        #[cfg(not(feature = "threading"))]
        let results: Vec<ReachCapacity> = reaches.iter().map(|r| self.evaluate(r)).collect();

        let clamped = results.iter().filter(|r| !r.diagnostics.clamped.is_empty()).count();
        if clamped > 0 {
            warn!(clamped, total = results.len(), "reaches had inputs outside their domain");
        }
        let empty = results.iter().filter(|r| r.diagnostics.empty_surface).count();
        if empty > 0 {
            warn!(empty, "reaches fell into coverage gaps and no rule fired");
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::PERVASIVE_CEILING;

    fn reach(drainage_area_km2: f64, reach_code: Option<u32>) -> Reach {
        Reach {
            id: 1,
            reach_code,
            length_m: 500.0,
            drainage_area_km2,
            streamside: 4.0,
            riparian: 4.0,
            baseflow_power: 50.0,
            peak_flow_power: 500.0,
            slope: 0.01,
        }
    }

    fn gated_model() -> CapacityModel {
        CapacityModel::new(&CapacityConfig { max_drainage_area: Some(100.0), ..Default::default() }).unwrap()
    }

    #[test]
    fn good_reach_is_pervasive() {
        let out = CapacityModel::standard().unwrap().evaluate(&reach(10.0, None));
        assert_eq!(out.vegetation, PERVASIVE_CEILING);
        assert!(out.combined > 25.0 && out.combined <= 40.0, "combined {}", out.combined);
        assert_eq!(out.dam_count, dam_count(out.combined, 500.0));
        assert!(out.diagnostics.clamped.is_empty());
    }

    #[test]
    fn large_drainage_is_gated_unless_excepted() {
        let model = gated_model();
        let gated = model.evaluate(&reach(100.0, Some(46006)));
        assert_eq!(gated.combined, 0.0);
        assert_eq!(gated.dam_count, 0.0);
        assert!(gated.diagnostics.drainage_gated());
        assert_eq!(gated.vegetation, PERVASIVE_CEILING, "vegetation stage is not gated");

        let canal = model.evaluate(&reach(500.0, Some(ARTIFICIAL_PATH_REACH_CODE)));
        assert!(canal.combined > 0.0);

        let small = model.evaluate(&reach(99.9, None));
        assert!(small.combined > 0.0);
    }

    #[test]
    fn clamped_inputs_are_reported() {
        let mut r = reach(1.0, None);
        r.peak_flow_power = 25_000.0;
        r.streamside = 4.5;
        let out = CapacityModel::standard().unwrap().evaluate(&r);
        assert_eq!(out.diagnostics.clamped, vec![InputVariable::Streamside, InputVariable::PeakFlow]);
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let mut set = AdjustmentSet::default();
        set.insert(InputVariable::Slope, Adjustment::Shift(0.01)).unwrap();
        assert!(set.insert(InputVariable::Slope, Adjustment::Scale(2.0)).is_err());
        assert_eq!(set.iter().count(), 1);
    }

    #[test]
    fn negative_drainage_limit_is_rejected() {
        let cfg = CapacityConfig { max_drainage_area: Some(-1.0), ..Default::default() };
        assert!(matches!(CapacityModel::new(&cfg), Err(BratError::InvalidConfig(_))));
    }

    #[test]
    fn shrinking_scale_reports_gaps() {
        let mut cfg = CapacityConfig::default();
        cfg.adjustments.riparian = Some(Adjustment::Scale(0.2));
        let model = CapacityModel::new(&cfg).unwrap();
        let gaps = model.coverage_gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].0, InputVariable::Riparian);
    }

    #[test]
    fn config_reads_from_json() {
        let cfg: CapacityConfig = serde_json::from_str(
            r#"{"max_drainage_area": 5000, "adjustments": {"baseflow": {"kind": "shift", "value": 18.5}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.drainage_exceptions, vec![ARTIFICIAL_PATH_REACH_CODE]);
        assert_eq!(cfg.adjustments.baseflow, Some(Adjustment::Shift(18.5)));
        assert!(cfg.adjustments.slope.is_none());
    }

    #[test]
    fn batch_preserves_order() {
        let model = CapacityModel::standard().unwrap();
        let reaches: Vec<Reach> = (0..8)
            .map(|i| Reach { id: i, streamside: i as f64 * 0.5, ..reach(1.0, None) })
            .collect();
        let ids: Vec<i64> = model.run(&reaches).iter().map(|r| r.reach_id).collect();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
    }
}
