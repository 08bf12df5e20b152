//! Membership-function adjustments for sensitivity analysis.
//!
//! An [`Adjustment`] perturbs the input categorization of one variable while
//! the rule tables and the output variable stay untouched:
//!
//! * **shift** translates every breakpoint that is not pinned to the domain
//!   boundary by a constant offset;
//! * **scale** stretches or shrinks the legs of each shape around its fixed
//!   top (trapezoid) or apex (triangle);
//! * **shape** swaps the piecewise-linear curves for a smooth family.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::membership::{MembershipFn, Side};
use super::variable::{Domain, Geometry};
use crate::error::{BratError, Result};

/// Bell exponent used by the loose-fit shoulders and plateaus.
const LOOSE_BELL_SLOPE: f64 = 2.0;

/// Ratio between a triangle's longest leg and the sigma of its Gaussian
/// replacement (a leg of 1.0 gives sigma 0.4).
const LEG_TO_SIGMA: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Shift,
    Scale,
    Shape,
}

impl AdjustmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AdjustmentKind::Shift => "shift",
            AdjustmentKind::Scale => "scale",
            AdjustmentKind::Shape => "shape",
        }
    }
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentKind {
    type Err = BratError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift" => Ok(AdjustmentKind::Shift),
            "scale" => Ok(AdjustmentKind::Scale),
            "shape" => Ok(AdjustmentKind::Shape),
            other => Err(BratError::InvalidAdjustment(format!(
                "unknown adjustment kind `{other}` (expected shift, scale or shape)"
            ))),
        }
    }
}

/// Alternative smooth shape family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFit {
    /// S/Z/Pi curves on the original breakpoints, Gaussian bells at apexes.
    BestFit,
    /// Generalized bells with wide tails, Gaussian bells at apexes.
    LooseFit,
}

impl ShapeFit {
    /// Numeric selector as used in adjustment configs: 1 = best, 2 = loose.
    pub fn from_selector(value: f64) -> Result<Self> {
        if value == 1.0 {
            Ok(ShapeFit::BestFit)
        } else if value == 2.0 {
            Ok(ShapeFit::LooseFit)
        } else {
            Err(BratError::InvalidAdjustment(format!(
                "shape selector {value} must be 1 (best fit) or 2 (loose fit)"
            )))
        }
    }

    pub fn selector(self) -> f64 {
        match self {
            ShapeFit::BestFit => 1.0,
            ShapeFit::LooseFit => 2.0,
        }
    }
}

/// One perturbation applied to all categories of a single input variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAdjustment", into = "RawAdjustment")]
pub enum Adjustment {
    /// Additive offset in variable units.
    Shift(f64),
    /// Leg stretch factor, strictly positive.
    Scale(f64),
    Shape(ShapeFit),
}

/// Wire form: `{ "kind": "scale", "value": 1.5 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAdjustment {
    kind: String,
    value: f64,
}

impl TryFrom<RawAdjustment> for Adjustment {
    type Error = BratError;

    fn try_from(raw: RawAdjustment) -> Result<Self> {
        Adjustment::parse(&raw.kind, raw.value)
    }
}

impl From<Adjustment> for RawAdjustment {
    fn from(adj: Adjustment) -> Self {
        RawAdjustment { kind: adj.kind().as_str().to_string(), value: adj.value() }
    }
}

impl Adjustment {
    /// Build and validate an adjustment from its kind and numeric value.
    pub fn new(kind: AdjustmentKind, value: f64) -> Result<Self> {
        let adj = match kind {
            AdjustmentKind::Shift => Adjustment::Shift(value),
            AdjustmentKind::Scale => Adjustment::Scale(value),
            AdjustmentKind::Shape => Adjustment::Shape(ShapeFit::from_selector(value)?),
        };
        adj.validate()?;
        Ok(adj)
    }

    /// Parse a kind name (`shift`, `scale`, `shape`) and value.
    pub fn parse(kind: &str, value: f64) -> Result<Self> {
        Adjustment::new(kind.parse()?, value)
    }

    pub fn kind(&self) -> AdjustmentKind {
        match self {
            Adjustment::Shift(_) => AdjustmentKind::Shift,
            Adjustment::Scale(_) => AdjustmentKind::Scale,
            Adjustment::Shape(_) => AdjustmentKind::Shape,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Adjustment::Shift(v) | Adjustment::Scale(v) => v,
            Adjustment::Shape(fit) => fit.selector(),
        }
    }

    /// Shift by 0 and scale by 1 leave every curve exactly as it was.
    pub fn is_identity(&self) -> bool {
        matches!(*self, Adjustment::Shift(v) if v == 0.0)
            || matches!(*self, Adjustment::Scale(f) if f == 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Adjustment::Shift(v) if !v.is_finite() => Err(BratError::InvalidAdjustment(format!(
                "shift offset must be finite, got {v}"
            ))),
            Adjustment::Scale(f) if !(f.is_finite() && f > 0.0) => Err(
                BratError::InvalidAdjustment(format!("scale factor must be > 0, got {f}")),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Shape(fit) => write!(f, "shape({fit:?})"),
            other => write!(f, "{}({})", other.kind(), other.value()),
        }
    }
}

/// Build the membership curve for one category.
///
/// `None` or an identity adjustment returns the base piecewise-linear shape
/// unchanged.
pub fn build(geometry: Geometry, domain: Domain, adjustment: Option<&Adjustment>) -> Result<MembershipFn> {
    let Some(adj) = adjustment else {
        return Ok(geometry.to_membership());
    };
    adj.validate()?;
    if adj.is_identity() {
        return Ok(geometry.to_membership());
    }
    let mf = match *adj {
        Adjustment::Shift(offset) => shift(geometry, domain, offset).to_membership(),
        Adjustment::Scale(factor) => scale(geometry, factor).to_membership(),
        Adjustment::Shape(fit) => reshape(geometry, domain, fit),
    };
    Ok(mf)
}

/// Translate unpinned breakpoints, keeping them inside the domain so the
/// breakpoints stay ordered.
pub fn shift(geometry: Geometry, domain: Domain, offset: f64) -> Geometry {
    let mv = |p: f64| if domain.is_boundary(p) { p } else { domain.clamp(p + offset) };
    match geometry {
        Geometry::Triangle([a, b, c]) => Geometry::Triangle([mv(a), mv(b), mv(c)]),
        Geometry::Trapezoid([a, b, c, d]) => Geometry::Trapezoid([mv(a), mv(b), mv(c), mv(d)]),
    }
}

/// Stretch legs around the fixed top/apex.
pub fn scale(geometry: Geometry, factor: f64) -> Geometry {
    match geometry {
        Geometry::Triangle([a, b, c]) => {
            Geometry::Triangle([b - (b - a) * factor, b, b + (c - b) * factor])
        }
        Geometry::Trapezoid([a, b, c, d]) => {
            Geometry::Trapezoid([b - (b - a) * factor, b, c, c + (d - c) * factor])
        }
    }
}

fn reshape(geometry: Geometry, domain: Domain, fit: ShapeFit) -> MembershipFn {
    match geometry {
        Geometry::Triangle([a, b, c]) => {
            let leg = (b - a).max(c - b);
            MembershipFn::Gaussian { mean: b, sigma: leg / LEG_TO_SIGMA }
        }
        Geometry::Trapezoid([a, b, c, d]) => {
            let left_shoulder = a == b && domain.is_boundary(a);
            let right_shoulder = c == d && domain.is_boundary(d);
            match (fit, left_shoulder, right_shoulder) {
                (_, true, true) => geometry.to_membership(),
                (ShapeFit::BestFit, true, false) => MembershipFn::ZCurve { a: c, b: d },
                (ShapeFit::BestFit, false, true) => MembershipFn::SCurve { a, b },
                (ShapeFit::BestFit, false, false) => MembershipFn::Pi { a, b, c, d },
                // Closed at the domain minimum: the bell stays just under 1 there.
                (ShapeFit::LooseFit, true, false) => loose_bell(c, (d - b) / LEG_TO_SIGMA, None, geometry),
                (ShapeFit::LooseFit, false, true) => loose_bell(b, (b - a) / 2.0, Some(Side::Right), geometry),
                (ShapeFit::LooseFit, false, false) => {
                    // Half the distance between the two 0.5-crossings.
                    let width = ((c + d) / 2.0 - (a + b) / 2.0) / 2.0;
                    loose_bell((b + c) / 2.0, width, None, geometry)
                }
            }
        }
    }
}

fn loose_bell(center: f64, width: f64, open: Option<Side>, fallback: Geometry) -> MembershipFn {
    if width > 0.0 {
        MembershipFn::Bell { width, slope: LOOSE_BELL_SLOPE, center, open }
    } else {
        fallback.to_membership()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const VEG: Domain = Domain::new(0.0, 4.0);

    #[test]
    fn scale_two_doubles_trapezoid_legs() {
        let g = Geometry::Trapezoid([4.0, 8.0, 12.0, 25.0]);
        let Geometry::Trapezoid([a, b, c, d]) = scale(g, 2.0) else { panic!("shape changed") };
        assert_eq!((b, c), (8.0, 12.0));
        assert_abs_diff_eq!(a, 8.0 - 2.0 * (8.0 - 4.0), epsilon = 1e-12);
        assert_abs_diff_eq!(d, 12.0 + 2.0 * (25.0 - 12.0), epsilon = 1e-12);
    }

    #[test]
    fn scale_triangle_keeps_apex() {
        let Geometry::Triangle([a, b, c]) = scale(Geometry::Triangle([0.1, 1.0, 2.0]), 0.5) else {
            panic!("shape changed")
        };
        assert_eq!(b, 1.0);
        assert_abs_diff_eq!(a, 0.55, epsilon = 1e-12);
        assert_abs_diff_eq!(c, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn identity_adjustments_are_exact() {
        let g = Geometry::Triangle([0.1, 1.0, 2.0]);
        let base = g.to_membership();
        assert_eq!(build(g, VEG, Some(&Adjustment::Scale(1.0))).unwrap(), base);
        assert_eq!(build(g, VEG, Some(&Adjustment::Shift(0.0))).unwrap(), base);
        assert_eq!(build(g, VEG, None).unwrap(), base);
    }

    #[test]
    fn shift_never_moves_pinned_points() {
        let Geometry::Trapezoid([a, b, c, d]) = shift(Geometry::Trapezoid([0.0, 0.0, 0.1, 1.0]), VEG, 0.5)
        else {
            panic!("shape changed")
        };
        assert_eq!((a, b), (0.0, 0.0));
        assert_abs_diff_eq!(c, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(d, 1.5, epsilon = 1e-12);
        let top = shift(Geometry::Triangle([3.0, 4.0, 4.0]), VEG, -0.5);
        assert_eq!(top, Geometry::Triangle([2.5, 4.0, 4.0]));
    }

    #[test]
    fn shift_clamps_into_domain() {
        let d = Domain::new(0.0, 10_000.0);
        let g = shift(Geometry::Trapezoid([0.0, 0.0, 150.0, 170.0]), d, -160.0);
        assert_eq!(g, Geometry::Trapezoid([0.0, 0.0, 0.0, 10.0]));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        assert!(matches!(Adjustment::parse("scale", 0.0), Err(BratError::InvalidAdjustment(_))));
        assert!(matches!(Adjustment::parse("scale", -1.0), Err(BratError::InvalidAdjustment(_))));
        let g = Geometry::Triangle([0.1, 1.0, 2.0]);
        assert!(build(g, VEG, Some(&Adjustment::Scale(-2.0))).is_err());
    }

    #[test]
    fn shape_selector_must_be_one_or_two() {
        assert_eq!(Adjustment::parse("shape", 1.0).unwrap(), Adjustment::Shape(ShapeFit::BestFit));
        assert_eq!(Adjustment::parse("shape", 2.0).unwrap(), Adjustment::Shape(ShapeFit::LooseFit));
        assert!(Adjustment::parse("shape", 3.0).is_err());
        assert!(Adjustment::parse("stretch", 1.0).is_err());
    }

    #[test]
    fn best_fit_shoulder_matches_base_breakpoints() {
        let g = Geometry::Trapezoid([0.0, 0.0, 0.1, 1.0]);
        let mf = build(g, VEG, Some(&Adjustment::Shape(ShapeFit::BestFit))).unwrap();
        assert_eq!(mf.eval(0.0), 1.0);
        assert_abs_diff_eq!(mf.eval(0.55), 0.5, epsilon = 1e-12);
        assert_eq!(mf.eval(1.0), 0.0);
    }

    #[test]
    fn loose_fit_triangle_is_gaussian_at_apex() {
        let g = Geometry::Triangle([1.0, 2.0, 3.0]);
        let mf = build(g, VEG, Some(&Adjustment::Shape(ShapeFit::LooseFit))).unwrap();
        assert_eq!(mf, MembershipFn::Gaussian { mean: 2.0, sigma: 0.4 });
    }

    #[test]
    fn loose_fit_low_shoulder_is_a_closed_bell() {
        let g = Geometry::Trapezoid([0.0, 0.0, 0.1, 1.0]);
        let mf = build(g, VEG, Some(&Adjustment::Shape(ShapeFit::LooseFit))).unwrap();
        assert_eq!(mf, MembershipFn::Bell { width: 0.4, slope: 2.0, center: 0.1, open: None });
        assert_abs_diff_eq!(mf.eval(0.0), 0.9961, epsilon = 1e-4);
        assert_abs_diff_eq!(mf.eval(0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(mf.eval(1.0), 0.0376, epsilon = 1e-4);
    }

    #[test]
    fn adjustment_deserializes_and_validates() {
        let adj: Adjustment = serde_json::from_str(r#"{"kind":"scale","value":1.5}"#).unwrap();
        assert_eq!(adj, Adjustment::Scale(1.5));
        let bad = serde_json::from_str::<Adjustment>(r#"{"kind":"scale","value":0}"#);
        assert!(bad.is_err());
        let round = serde_json::to_string(&Adjustment::Shape(ShapeFit::LooseFit)).unwrap();
        assert_eq!(round, r#"{"kind":"shape","value":2.0}"#);
    }
}
