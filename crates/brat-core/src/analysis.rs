//! Summaries of evaluated networks: how often hydrology and slope limited the
//! vegetation capacity, and capacity histograms.
use serde::Serialize;

use crate::capacity::ReachCapacity;
use crate::reach::{InputVariable, Reach};

/// Half-open interval `[lower, upper)` of one input; `upper == None` is
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakClass {
    pub label: &'static str,
    pub lower: f64,
    pub upper: Option<f64>,
}

impl BreakClass {
    const fn new(label: &'static str, lower: f64, upper: Option<f64>) -> Self {
        Self { label, lower, upper }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && self.upper.map_or(true, |u| x < u)
    }
}

pub const BASEFLOW_CLASSES: [BreakClass; 3] = [
    BreakClass::new("can build", 0.0, Some(160.0)),
    BreakClass::new("probably can build", 160.0, Some(185.0)),
    BreakClass::new("cannot build", 185.0, None),
];

pub const PEAK_FLOW_CLASSES: [BreakClass; 4] = [
    BreakClass::new("persists", 0.0, Some(1100.0)),
    BreakClass::new("occasional breach", 1100.0, Some(1400.0)),
    BreakClass::new("occasional blowout", 1400.0, Some(2200.0)),
    BreakClass::new("blowout", 2200.0, None),
];

pub const SLOPE_CLASSES: [BreakClass; 4] = [
    BreakClass::new("flat", 0.0, Some(0.0026)),
    BreakClass::new("can build", 0.0026, Some(0.135)),
    BreakClass::new("probably can build", 0.135, Some(0.20)),
    BreakClass::new("cannot build", 0.20, None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub class: BreakClass,
    pub reaches: usize,
    /// Reaches in this class whose combined capacity differs from the
    /// vegetation capacity.
    pub limited: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableBreakdown {
    pub variable: InputVariable,
    pub classes: Vec<ClassCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitationReport {
    pub total: usize,
    pub limited: usize,
    /// Rounded to two decimals.
    pub percent_limited: f64,
    pub by_variable: Vec<VariableBreakdown>,
}

/// `reaches` and `results` are parallel slices.
pub fn limitation_report(reaches: &[Reach], results: &[ReachCapacity]) -> LimitationReport {
    debug_assert_eq!(reaches.len(), results.len());
    let is_limited: Vec<bool> = results.iter().map(|r| r.combined != r.vegetation).collect();
    let limited = is_limited.iter().filter(|&&l| l).count();
    let total = results.len();
    let percent_limited = if total == 0 { 0.0 } else { crate::capacity::round_to(100.0 * limited as f64 / total as f64, 2) };

    let breakdown = |variable: InputVariable, classes: &[BreakClass]| VariableBreakdown {
        variable,
        classes: classes
            .iter()
            .map(|&class| {
                let members = reaches.iter().zip(&is_limited).filter(|(r, _)| class.contains(variable.value(r)));
                let (reaches, limited) = members.fold((0, 0), |(n, l), (_, &lim)| (n + 1, l + usize::from(lim)));
                ClassCount { class, reaches, limited }
            })
            .collect(),
    };

    LimitationReport {
        total,
        limited,
        percent_limited,
        by_variable: vec![
            breakdown(InputVariable::Baseflow, &BASEFLOW_CLASSES),
            breakdown(InputVariable::PeakFlow, &PEAK_FLOW_CLASSES),
            breakdown(InputVariable::Slope, &SLOPE_CLASSES),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over `[min, max]` of the finite values; the last
/// bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for v in finite {
        let i = (((v - min) / width) as usize).min(bins - 1);
        counts[i] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin { lower: min + i as f64 * width, upper: min + (i + 1) as f64 * width, count })
        .collect()
}
