use serde::{Deserialize, Serialize};

use super::adjust::{build, Adjustment};
use super::membership::MembershipFn;
use crate::error::Result;

/// Closed numeric range of a fuzzy variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Floor/ceiling policy for out-of-range inputs.
    #[inline]
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    /// True if `x` sits exactly on the hard boundary of the domain.
    #[inline]
    pub fn is_boundary(&self, x: f64) -> bool {
        x == self.min || x == self.max
    }
}

/// Base piecewise-linear geometry of a category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    Triangle([f64; 3]),
    Trapezoid([f64; 4]),
}

impl Geometry {
    pub fn to_membership(self) -> MembershipFn {
        match self {
            Geometry::Triangle([a, b, c]) => MembershipFn::Triangle { a, b, c },
            Geometry::Trapezoid([a, b, c, d]) => MembershipFn::Trapezoid { a, b, c, d },
        }
    }
}

/// Named membership curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub name: &'static str,
    pub mf: MembershipFn,
}

/// A linguistic variable: a domain and its ordered categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyVariable {
    pub name: &'static str,
    pub domain: Domain,
    pub categories: Vec<Category>,
}

impl FuzzyVariable {
    pub fn new(name: &'static str, domain: Domain, categories: Vec<Category>) -> Self {
        Self { name, domain, categories }
    }

    /// Build every category from its base geometry, applying the same
    /// adjustment to all of them.
    pub fn from_geometry(
        name: &'static str,
        domain: Domain,
        geometry: &[(&'static str, Geometry)],
        adjustment: Option<&Adjustment>,
    ) -> Result<Self> {
        let categories = geometry
            .iter()
            .map(|&(cat, g)| Ok(Category { name: cat, mf: build(g, domain, adjustment)? }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(name, domain, categories))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category_index(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Membership of `x` in category `index`.
    #[inline]
    pub fn membership(&self, index: usize, x: f64) -> f64 {
        self.categories[index].mf.eval(x)
    }

    /// Membership of `x` in every category, in category order.
    pub fn memberships(&self, x: f64) -> Vec<f64> {
        self.categories.iter().map(|c| c.mf.eval(x)).collect()
    }

    /// Intervals of the domain, sampled every `step`, where no category has
    /// any membership.  Empty for every unadjusted variable.
    pub fn coverage_gaps(&self, step: f64) -> Vec<(f64, f64)> {
        let n = ((self.domain.max - self.domain.min) / step).round() as usize;
        let mut gaps = Vec::new();
        let mut open: Option<(f64, f64)> = None;
        for i in 0..=n {
            let x = (self.domain.min + i as f64 * step).min(self.domain.max);
            let covered = self.categories.iter().any(|c| c.mf.eval(x) > 0.0);
            open = match (open, covered) {
                (None, false) => Some((x, x)),
                (Some((start, _)), false) => Some((start, x)),
                (Some(gap), true) => {
                    gaps.push(gap);
                    None
                }
                (None, true) => None,
            };
        }
        gaps.extend(open);
        gaps
    }

    /// Sampled curves `(x, [membership per category])`, for export and
    /// diagnostics.
    pub fn sample(&self, step: f64) -> Vec<(f64, Vec<f64>)> {
        let n = ((self.domain.max - self.domain.min) / step).round() as usize;
        (0..=n)
            .map(|i| {
                let x = (self.domain.min + i as f64 * step).min(self.domain.max);
                (x, self.memberships(x))
            })
            .collect()
    }
}
