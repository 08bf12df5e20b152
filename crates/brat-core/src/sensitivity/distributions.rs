//! Parametric distributions for synthetic reach inputs and adjustment draws.
use std::fmt;

use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{BratError, Result};
use crate::reach::InputVariable;

/// `norm(mean, std)`, `uniform(low, high)` or `expon(loc, scale)`, written
/// on the wire as `{ "family": "expon", "param1": 244.0, "param2": 302.9 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDistribution", into = "RawDistribution")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    Uniform { low: f64, high: f64 },
    /// `loc + Exp(1 / scale)`.
    Exponential { loc: f64, scale: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDistribution {
    family: String,
    param1: f64,
    param2: f64,
}

impl TryFrom<RawDistribution> for Distribution {
    type Error = BratError;

    fn try_from(raw: RawDistribution) -> Result<Self> {
        Distribution::new(&raw.family, raw.param1, raw.param2)
    }
}

impl From<Distribution> for RawDistribution {
    fn from(d: Distribution) -> Self {
        let (param1, param2) = d.params();
        RawDistribution { family: d.family().to_string(), param1, param2 }
    }
}

impl Distribution {
    pub fn new(family: &str, param1: f64, param2: f64) -> Result<Self> {
        let d = match family.to_ascii_lowercase().as_str() {
            "norm" | "normal" => Distribution::Normal { mean: param1, std_dev: param2 },
            "uniform" => Distribution::Uniform { low: param1, high: param2 },
            "expon" | "exponential" => Distribution::Exponential { loc: param1, scale: param2 },
            other => {
                return Err(BratError::DistributionSampling(format!(
                    "unknown distribution family `{other}` (expected norm, uniform or expon)"
                )))
            }
        };
        d.validate()?;
        Ok(d)
    }

    pub fn family(&self) -> &'static str {
        match self {
            Distribution::Normal { .. } => "norm",
            Distribution::Uniform { .. } => "uniform",
            Distribution::Exponential { .. } => "expon",
        }
    }

    pub fn params(&self) -> (f64, f64) {
        match *self {
            Distribution::Normal { mean, std_dev } => (mean, std_dev),
            Distribution::Uniform { low, high } => (low, high),
            Distribution::Exponential { loc, scale } => (loc, scale),
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Normal { mean, .. } => mean,
            Distribution::Uniform { low, high } => (low + high) / 2.0,
            Distribution::Exponential { loc, scale } => loc + scale,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (p1, p2) = self.params();
        let ok = p1.is_finite()
            && p2.is_finite()
            && match self {
                Distribution::Normal { .. } => p2 >= 0.0,
                Distribution::Uniform { .. } => p1 < p2,
                Distribution::Exponential { .. } => p2 > 0.0,
            };
        if ok {
            Ok(())
        } else {
            Err(BratError::DistributionSampling(format!("unusable parameters for {self}")))
        }
    }

    /// A ready-to-draw sampler.
    pub fn sampler(&self) -> Result<Sampler> {
        self.validate()?;
        let err = |e: &dyn fmt::Display| BratError::DistributionSampling(format!("{self}: {e}"));
        Ok(match *self {
            Distribution::Normal { mean, std_dev } => Sampler::Normal(Normal::new(mean, std_dev).map_err(|e| err(&e))?),
            Distribution::Uniform { low, high } => Sampler::Uniform(Uniform::new(low, high)),
            Distribution::Exponential { loc, scale } => {
                Sampler::Exponential { exp: Exp::new(1.0 / scale).map_err(|e| err(&e))?, loc }
            }
        })
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (p1, p2) = self.params();
        write!(f, "{}({p1}, {p2})", self.family())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Sampler {
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
    Exponential { exp: Exp<f64>, loc: f64 },
}

impl rand_distr::Distribution<f64> for Sampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Normal(d) => rng.sample(d),
            Sampler::Uniform(d) => rng.sample(d),
            Sampler::Exponential { exp, loc } => loc + rng.sample(exp),
        }
    }
}

/// One distribution per model input for synthetic reaches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDistributions {
    pub streamside: Distribution,
    pub riparian: Distribution,
    pub baseflow: Distribution,
    pub peak_flow: Distribution,
    pub slope: Distribution,
}

impl InputDistributions {
    /// Fitted to the Siletz River basin network.
    pub fn siletz() -> Self {
        Self {
            streamside: Distribution::Normal { mean: 2.234, std_dev: 0.5708 },
            riparian: Distribution::Normal { mean: 2.110, std_dev: 0.3793 },
            baseflow: Distribution::Exponential { loc: 0.0, scale: 3.311 },
            peak_flow: Distribution::Exponential { loc: 244.0, scale: 302.9 },
            slope: Distribution::Exponential { loc: 0.0, scale: 0.1878 },
        }
    }

    /// Flat across each input's plausible range.
    pub fn uniform() -> Self {
        Self {
            streamside: Distribution::Uniform { low: 0.0, high: 4.0 },
            riparian: Distribution::Uniform { low: 0.0, high: 4.0 },
            baseflow: Distribution::Uniform { low: 0.0, high: 190.0 },
            peak_flow: Distribution::Uniform { low: 0.0, high: 2400.0 },
            slope: Distribution::Uniform { low: 0.0, high: 1.0 },
        }
    }

    pub fn get(&self, variable: InputVariable) -> &Distribution {
        match variable {
            InputVariable::Streamside => &self.streamside,
            InputVariable::Riparian => &self.riparian,
            InputVariable::Baseflow => &self.baseflow,
            InputVariable::PeakFlow => &self.peak_flow,
            InputVariable::Slope => &self.slope,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (InputVariable, &Distribution)> + '_ {
        InputVariable::ALL.into_iter().map(|v| (v, self.get(v)))
    }

    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(_, d)| d.validate())
    }
}

impl Default for InputDistributions {
    fn default() -> Self {
        Self::siletz()
    }
}
