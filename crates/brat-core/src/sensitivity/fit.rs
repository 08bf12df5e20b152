//! Fit candidate distributions to observed reach attributes and rank them by
//! their Kolmogorov–Smirnov distance, to choose sampling distributions for
//! synthetic reaches.
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Exp, Normal, Uniform};
use statrs::statistics::Statistics;

use super::distributions::Distribution;
use crate::error::{BratError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub distribution: Distribution,
    /// Sup distance between the empirical and fitted CDFs.
    pub ks_statistic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    /// Finite values used.
    pub n: usize,
    /// Ranked, best first.
    pub candidates: Vec<Candidate>,
}

impl FitReport {
    pub fn best(&self) -> &Candidate {
        // `fit` never returns an empty report.
        &self.candidates[0]
    }
}

enum Cdf {
    Normal(Normal),
    Uniform(Uniform),
    Exponential(Exp, f64),
}

impl Cdf {
    fn for_distribution(d: &Distribution) -> Result<Self> {
        let err = |e: &dyn std::fmt::Display| BratError::Fit(format!("{d}: {e}"));
        Ok(match *d {
            Distribution::Normal { mean, std_dev } => Cdf::Normal(Normal::new(mean, std_dev).map_err(|e| err(&e))?),
            Distribution::Uniform { low, high } => Cdf::Uniform(Uniform::new(low, high).map_err(|e| err(&e))?),
            Distribution::Exponential { loc, scale } => Cdf::Exponential(Exp::new(1.0 / scale).map_err(|e| err(&e))?, loc),
        })
    }

    fn eval(&self, x: f64) -> f64 {
        match self {
            Cdf::Normal(d) => d.cdf(x),
            Cdf::Uniform(d) => d.cdf(x),
            Cdf::Exponential(d, loc) => {
                if x < *loc {
                    0.0
                } else {
                    d.cdf(x - loc)
                }
            }
        }
    }
}

/// Maximum-likelihood fits of the normal, uniform and exponential families,
/// ranked by KS statistic.  Families whose fit degenerates (zero spread) are
/// skipped.
pub fn fit(values: &[f64]) -> Result<FitReport> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.len() < 2 {
        return Err(BratError::Fit(format!("need at least two finite values, got {}", sorted.len())));
    }
    sorted.sort_by(f64::total_cmp);

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = sorted.iter().mean();
    let std_dev = sorted.iter().population_std_dev();

    let fits = [
        (std_dev > 0.0).then_some(Distribution::Normal { mean, std_dev }),
        (max > min).then_some(Distribution::Uniform { low: min, high: max }),
        (mean > min).then_some(Distribution::Exponential { loc: min, scale: mean - min }),
    ];

    let mut candidates = fits
        .into_iter()
        .flatten()
        .map(|distribution| {
            let cdf = Cdf::for_distribution(&distribution)?;
            Ok(Candidate { distribution, ks_statistic: ks_statistic(&sorted, |x| cdf.eval(x)) })
        })
        .collect::<Result<Vec<_>>>()?;
    if candidates.is_empty() {
        return Err(BratError::Fit("all values are identical".into()));
    }
    candidates.sort_by(|a, b| a.ks_statistic.total_cmp(&b.ks_statistic));
    Ok(FitReport { n: sorted.len(), candidates })
}

/// One-sample KS statistic of ascending `sorted` against `cdf`.
pub fn ks_statistic(sorted: &[f64], cdf: impl Fn(f64) -> f64) -> f64 {
    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f = cdf(x);
            (f - i as f64 / n).max((i + 1) as f64 / n - f)
        })
        .fold(0.0, f64::max)
}
