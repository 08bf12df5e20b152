//! Mamdani inference: min for AND, max aggregation per consequent, clipped
//! union of output curves, centroid defuzzification.
//!
//! The output universe is sampled once per system.  When a consequent is
//! clipped at a level strictly between 0 and 1 the points where its curve
//! crosses that level are merged into the sampled universe before the
//! centroid is taken, so the clipped plateau edges are not lost between
//! samples.
use std::collections::BTreeMap;

use super::rules::{validate_table, Rule};
use super::variable::{Domain, FuzzyVariable};
use crate::error::{BratError, Result};

/// Sampling step of the output universe.  The reclassification constants of
/// both capacity stages are computed on this grid.
pub const OUTPUT_STEP: f64 = 0.01;

/// Raw result of one evaluation, before stage post-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    /// Centroid of the aggregated output surface.
    pub crisp: f64,
    /// Aggregated firing strength per output category.
    pub firing: Vec<f64>,
    /// Per input: whether the value was outside the domain and clamped.
    pub clamped: Vec<bool>,
    /// No rule fired; `crisp` is 0.
    pub empty_surface: bool,
}

/// A built fuzzy inference system.  Immutable once constructed and safe to
/// share across threads.
#[derive(Debug, Clone)]
pub struct FuzzySystem {
    inputs: Vec<FuzzyVariable>,
    output: FuzzyVariable,
    rules: &'static [Rule],
    universe: Vec<f64>,
    /// Output category curves sampled on `universe`.
    sampled: Vec<Vec<f64>>,
}

impl FuzzySystem {
    pub fn new(
        inputs: Vec<FuzzyVariable>,
        output: FuzzyVariable,
        rules: &'static [Rule],
        step: f64,
    ) -> Result<Self> {
        let shape: Vec<usize> = inputs.iter().map(FuzzyVariable::len).collect();
        validate_table(rules, &shape, output.len()).map_err(BratError::InvalidConfig)?;
        if step.is_nan() || step <= 0.0 {
            return Err(BratError::InvalidConfig(format!("output step must be > 0, got {step}")));
        }

        let universe = sample_universe(output.domain, step);
        let sampled = output
            .categories
            .iter()
            .map(|c| universe.iter().map(|&x| c.mf.eval(x)).collect())
            .collect();

        Ok(Self { inputs, output, rules, universe, sampled })
    }

    pub fn inputs(&self) -> &[FuzzyVariable] {
        &self.inputs
    }

    pub fn output(&self) -> &FuzzyVariable {
        &self.output
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    pub fn universe(&self) -> &[f64] {
        &self.universe
    }

    /// Centroid of a single output category on its own, as used for the
    /// reclassification constants.
    pub fn category_centroid(&self, category: usize) -> f64 {
        centroid(&self.universe, &self.sampled[category])
    }

    /// Evaluate with inputs given in declared variable order.
    ///
    /// # Panics
    /// If `values.len()` differs from the number of input variables.
    pub fn evaluate(&self, values: &[f64]) -> Inference {
        assert_eq!(values.len(), self.inputs.len(), "input arity mismatch");

        let mut clamped = Vec::with_capacity(values.len());
        let memberships: Vec<Vec<f64>> = self
            .inputs
            .iter()
            .zip(values)
            .map(|(var, &x)| {
                clamped.push(!var.domain.contains(x));
                var.memberships(var.domain.clamp(x))
            })
            .collect();

        let mut firing = vec![0.0f64; self.output.len()];
        for rule in self.rules {
            let s = rule.strength(&memberships);
            let slot = &mut firing[rule.consequent];
            *slot = slot.max(s);
        }

        if firing.iter().all(|&s| s <= 0.0) {
            return Inference { crisp: 0.0, firing, clamped, empty_surface: true };
        }

        let (xs, ys) = self.surface(&firing);
        Inference { crisp: centroid(&xs, &ys), firing, clamped, empty_surface: false }
    }

    /// Evaluate with inputs keyed by variable name.
    pub fn evaluate_named(&self, values: &BTreeMap<String, f64>) -> Result<Inference> {
        let ordered = self
            .inputs
            .iter()
            .map(|v| {
                values
                    .get(v.name)
                    .copied()
                    .ok_or_else(|| BratError::MissingVariable(v.name.to_string()))
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(self.evaluate(&ordered))
    }

    /// Aggregated output surface on the universe plus the cut crossings.
    fn surface(&self, firing: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut cuts = Vec::new();
        for (k, &level) in firing.iter().enumerate() {
            if level <= 0.0 || level >= 1.0 {
                continue;
            }
            let curve = &self.sampled[k];
            for i in 1..self.universe.len() {
                let (y0, y1) = (curve[i - 1], curve[i]);
                if (y0 - level) * (y1 - level) < 0.0 {
                    let (x0, x1) = (self.universe[i - 1], self.universe[i]);
                    cuts.push(x0 + (level - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        let clip = |k: usize, mu: f64| mu.min(firing[k]);
        let mut xs = Vec::with_capacity(self.universe.len() + cuts.len());
        let mut ys = Vec::with_capacity(xs.capacity());
        let mut j = 0;
        for (i, &x) in self.universe.iter().enumerate() {
            while j < cuts.len() && cuts[j] < x {
                let cx = cuts[j];
                xs.push(cx);
                ys.push(
                    (0..firing.len())
                        .map(|k| clip(k, self.output.membership(k, cx)))
                        .fold(0.0, f64::max),
                );
                j += 1;
            }
            if j < cuts.len() && cuts[j] == x {
                j += 1;
            }
            xs.push(x);
            ys.push((0..firing.len()).map(|k| clip(k, self.sampled[k][i])).fold(0.0, f64::max));
        }
        (xs, ys)
    }
}

/// Evenly spaced samples `min, min + step, ...` strictly below `max`.
pub fn sample_universe(domain: Domain, step: f64) -> Vec<f64> {
    let n = ((domain.max - domain.min) / step).round() as usize;
    (0..n).map(|i| domain.min + i as f64 * step).collect()
}

/// Centroid of a piecewise-linear curve through `(xs[i], ys[i])`, integrated
/// segment by segment.
pub fn centroid(xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let mut moment = 0.0;
    let mut area = 0.0;
    for i in 1..xs.len() {
        let (x1, x2) = (xs[i - 1], xs[i]);
        let (y1, y2) = (ys[i - 1], ys[i]);
        if (y1 == 0.0 && y2 == 0.0) || x1 == x2 {
            continue;
        }
        let w = x2 - x1;
        let (m, a) = if y1 == y2 {
            (0.5 * (x1 + x2), w * y1)
        } else if y1 == 0.0 {
            (2.0 / 3.0 * w + x1, 0.5 * w * y2)
        } else if y2 == 0.0 {
            (1.0 / 3.0 * w + x1, 0.5 * w * y1)
        } else {
            (2.0 / 3.0 * w * (y2 + 0.5 * y1) / (y1 + y2) + x1, 0.5 * w * (y1 + y2))
        };
        moment += m * a;
        area += a;
    }
    moment / area.max(f64::EPSILON)
}
