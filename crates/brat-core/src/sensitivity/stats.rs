use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::capacity::ReachCapacity;
use crate::reach::{InputVariable, Reach};

/// Mean and population standard deviation of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    /// NaN for an empty column.
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let values: Vec<f64> = values.into_iter().collect();
        Self { mean: values.iter().mean(), std_dev: values.iter().population_std_dev() }
    }
}

/// Aggregates recorded per simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub mean_streamside: f64,
    pub mean_riparian: f64,
    pub mean_baseflow: f64,
    pub mean_peak_flow: f64,
    pub mean_slope: f64,
    pub vegetation: Summary,
    pub combined: Summary,
    pub dam_count: Summary,
}

impl SimulationStats {
    pub fn compute(reaches: &[Reach], results: &[ReachCapacity]) -> Self {
        let input_mean = |v: InputVariable| reaches.iter().map(|r| v.value(r)).mean();
        Self {
            mean_streamside: input_mean(InputVariable::Streamside),
            mean_riparian: input_mean(InputVariable::Riparian),
            mean_baseflow: input_mean(InputVariable::Baseflow),
            mean_peak_flow: input_mean(InputVariable::PeakFlow),
            mean_slope: input_mean(InputVariable::Slope),
            vegetation: Summary::of(results.iter().map(|r| r.vegetation)),
            combined: Summary::of(results.iter().map(|r| r.combined)),
            dam_count: Summary::of(results.iter().map(|r| r.dam_count)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn population_std_uses_n() {
        let s = Summary::of([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_abs_diff_eq!(s.mean, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std_dev, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_column_has_zero_spread() {
        let s = Summary::of([3.5; 10]);
        assert_eq!(s.mean, 3.5);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn empty_column_is_nan() {
        assert!(Summary::of(std::iter::empty()).mean.is_nan());
    }
}
