//! Membership curves: the piecewise-linear base shapes plus the smooth
//! families used when a variable's shape is substituted.
//!
//! Every curve is evaluated analytically.  The piecewise-linear shapes follow
//! the usual fuzzy-toolkit conventions: a triangle is exactly 1 at its apex
//! even when a leg has zero width, and a trapezoid whose outer breakpoint
//! coincides with its top behaves as an open shoulder.
use serde::{Deserialize, Serialize};

/// Which side of a bell stays at full membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// A single membership curve over a variable's domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MembershipFn {
    Triangle { a: f64, b: f64, c: f64 },
    Trapezoid { a: f64, b: f64, c: f64, d: f64 },
    Gaussian { mean: f64, sigma: f64 },
    /// Generalized bell `1 / (1 + |(x - center) / width|^(2 slope))`.
    /// With `open` set, the curve is held at 1 on that side of `center`.
    Bell { width: f64, slope: f64, center: f64, open: Option<Side> },
    /// Smooth 0 → 1 rise between `a` and `b`.
    SCurve { a: f64, b: f64 },
    /// Smooth 1 → 0 fall between `a` and `b`.
    ZCurve { a: f64, b: f64 },
    /// S-curve over (a, b) multiplied by a Z-curve over (c, d).
    Pi { a: f64, b: f64, c: f64, d: f64 },
}

impl MembershipFn {
    /// Degree of membership of `x`, always in [0, 1].
    pub fn eval(&self, x: f64) -> f64 {
        match *self {
            MembershipFn::Triangle { a, b, c } => triangle(x, a, b, c),
            MembershipFn::Trapezoid { a, b, c, d } => {
                if x <= b {
                    triangle(x, a, b, b)
                } else if x >= c {
                    triangle(x, c, c, d)
                } else {
                    1.0
                }
            }
            MembershipFn::Gaussian { mean, sigma } => {
                if sigma <= 0.0 {
                    return if x == mean { 1.0 } else { 0.0 };
                }
                (-(x - mean).powi(2) / (2.0 * sigma * sigma)).exp()
            }
            MembershipFn::Bell { width, slope, center, open } => {
                match open {
                    Some(Side::Left) if x <= center => return 1.0,
                    Some(Side::Right) if x >= center => return 1.0,
                    _ => {}
                }
                if width <= 0.0 {
                    return if x == center { 1.0 } else { 0.0 };
                }
                1.0 / (1.0 + ((x - center) / width).abs().powf(2.0 * slope))
            }
            MembershipFn::SCurve { a, b } => s_curve(x, a, b),
            MembershipFn::ZCurve { a, b } => z_curve(x, a, b),
            MembershipFn::Pi { a, b, c, d } => s_curve(x, a, b) * z_curve(x, c, d),
        }
    }

    /// True for the two piecewise-linear base shapes.
    pub fn is_piecewise_linear(&self) -> bool {
        matches!(self, MembershipFn::Triangle { .. } | MembershipFn::Trapezoid { .. })
    }
}

fn triangle(x: f64, a: f64, b: f64, c: f64) -> f64 {
    if x == b {
        1.0
    } else if a < x && x < b {
        (x - a) / (b - a)
    } else if b < x && x < c {
        (c - x) / (c - b)
    } else {
        0.0
    }
}

fn s_curve(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        return if a == b && x == a { 1.0 } else { 0.0 };
    }
    if x >= b {
        return 1.0;
    }
    let mid = (a + b) / 2.0;
    if x <= mid {
        2.0 * ((x - a) / (b - a)).powi(2)
    } else {
        1.0 - 2.0 * ((x - b) / (b - a)).powi(2)
    }
}

fn z_curve(x: f64, a: f64, b: f64) -> f64 {
    if x <= a {
        return 1.0;
    }
    if x >= b {
        return 0.0;
    }
    let mid = (a + b) / 2.0;
    if x <= mid {
        1.0 - 2.0 * ((x - a) / (b - a)).powi(2)
    } else {
        2.0 * ((x - b) / (b - a)).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn triangle_apex_and_legs() {
        let t = MembershipFn::Triangle { a: 1.0, b: 2.0, c: 3.0 };
        assert_eq!(t.eval(2.0), 1.0);
        assert_abs_diff_eq!(t.eval(1.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.eval(2.75), 0.25, epsilon = 1e-12);
        assert_eq!(t.eval(0.5), 0.0);
        assert_eq!(t.eval(3.0), 0.0);
    }

    #[test]
    fn degenerate_right_leg_is_full_at_apex() {
        // "preferred" vegetation: (3, 4, 4) must be 1 at the domain maximum.
        let t = MembershipFn::Triangle { a: 3.0, b: 4.0, c: 4.0 };
        assert_eq!(t.eval(4.0), 1.0);
        assert_abs_diff_eq!(t.eval(3.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn trapezoid_left_shoulder_covers_zero() {
        let t = MembershipFn::Trapezoid { a: 0.0, b: 0.0, c: 0.1, d: 1.0 };
        assert_eq!(t.eval(0.0), 1.0);
        assert_eq!(t.eval(0.05), 1.0);
        assert_abs_diff_eq!(t.eval(0.55), 0.5, epsilon = 1e-12);
        assert_eq!(t.eval(1.0), 0.0);
    }

    #[test]
    fn trapezoid_right_shoulder_covers_max() {
        let t = MembershipFn::Trapezoid { a: 12.0, b: 25.0, c: 45.0, d: 45.0 };
        assert_eq!(t.eval(45.0), 1.0);
        assert_eq!(t.eval(30.0), 1.0);
        assert_abs_diff_eq!(t.eval(18.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn s_and_z_curves_cross_at_half() {
        let s = MembershipFn::SCurve { a: 150.0, b: 170.0 };
        let z = MembershipFn::ZCurve { a: 150.0, b: 170.0 };
        assert_abs_diff_eq!(s.eval(160.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z.eval(160.0), 0.5, epsilon = 1e-12);
        assert_eq!(s.eval(140.0), 0.0);
        assert_eq!(z.eval(180.0), 0.0);
        for x in [151.0, 155.0, 163.0, 169.0] {
            assert_abs_diff_eq!(s.eval(x) + z.eval(x), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn pi_curve_has_flat_top() {
        let p = MembershipFn::Pi { a: 150.0, b: 170.0, c: 180.0, d: 190.0 };
        assert_eq!(p.eval(175.0), 1.0);
        assert_eq!(p.eval(100.0), 0.0);
        assert_eq!(p.eval(195.0), 0.0);
        assert!(p.eval(160.0) > 0.0 && p.eval(160.0) < 1.0);
    }

    #[test]
    fn open_bell_saturates_on_open_side() {
        let b = MembershipFn::Bell { width: 5.0, slope: 2.0, center: 190.0, open: Some(Side::Right) };
        assert_eq!(b.eval(9_000.0), 1.0);
        assert_abs_diff_eq!(b.eval(185.0), 0.5, epsilon = 1e-12);
        let closed = MembershipFn::Bell { width: 5.0, slope: 2.0, center: 190.0, open: None };
        assert!(closed.eval(9_000.0) < 1e-6);
    }

    #[test]
    fn gaussian_peak_and_spread() {
        let g = MembershipFn::Gaussian { mean: 2.0, sigma: 0.4 };
        assert_eq!(g.eval(2.0), 1.0);
        assert_abs_diff_eq!(g.eval(2.4), (-0.5f64).exp(), epsilon = 1e-12);
    }
}
