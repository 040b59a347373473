//! Polar cut curves: the loci rack features carve into the rotating blank.
//!
//! Coordinates: the blank spins about the origin while the rack slides past on
//! the +x side. A cut curve answers, for a polar angle θ on the blank, the
//! radius its feature cut there. Two shapes cover every rack feature: a
//! constant radius (from an edge parallel to the slide direction) and the
//! trochoid-like trace of a single moving point.

use log::warn;
use nalgebra::{Point2, Vector2};

use crate::biarc::{self, Sample};
use crate::pen::Pen;
use crate::search::search;

/// Squared blank-frame speed below which the tangent falls back to radial.
pub const CUSP_SPEED_SQ: f64 = 1e-16;

/// Slack when testing whether a branch's θ interval covers a query angle.
const THETA_COVER_EPS: f64 = 1e-9;

/// A curve cut into the blank, indexed by polar angle (radians, curve-local).
pub trait CutCurve {
    /// Radius of the cut surface at angle `theta`. Where two branches of the
    /// curve coexist the inner (smaller-radius) branch answers, since that is
    /// the one the envelope can keep. Angles the curve never visits return
    /// infinity.
    fn get_r(&self, theta: f64) -> f64;

    /// Angles strictly inside `(lo, hi)` where the curve reverses direction
    /// and the inner branch hands over to an outer one. The envelope sweep
    /// must break at these angles.
    fn discontinuities(&self, lo: f64, hi: f64) -> Vec<f64>;

    /// Attained θ extremes, reversal points included.
    fn theta_range(&self) -> (f64, f64);

    /// Draws the inner-branch trace from `from` to `to` into `pen`.
    fn draw_segment(&self, pen: &mut dyn Pen, from: f64, to: f64, initial_move: bool);
}

/// Cut at a fixed radius: an edge sliding parallel to its own direction leaves
/// a circular arc about the blank axis.
#[derive(Debug, Clone, Copy)]
pub struct ConstantCut {
    r: f64,
}

impl ConstantCut {
    pub fn new(r: f64) -> Self {
        ConstantCut { r }
    }

    pub fn radius(&self) -> f64 {
        self.r
    }
}

impl CutCurve for ConstantCut {
    fn get_r(&self, _theta: f64) -> f64 {
        self.r
    }

    fn discontinuities(&self, _lo: f64, _hi: f64) -> Vec<f64> {
        Vec::new()
    }

    fn theta_range(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    fn draw_segment(&self, pen: &mut dyn Pen, from: f64, to: f64, initial_move: bool) {
        if initial_move {
            pen.move_to(self.r * from.cos(), self.r * from.sin());
        }
        // An arc about the origin sweeps its own central angle.
        pen.arc_to(self.r * to.cos(), self.r * to.sin(), to - from);
    }
}

/// The trace of one rack point moving linearly while the blank turns
/// uniformly.
///
/// With `p(s) = p0 + s·dp` and blank angle `a(s) = a0 + s·da` over `s ∈ [0,1]`,
/// the curve is `θ(s) = atan2(y, x) − a(s)`, `r(s) = |p(s)|`. The angular
/// speed is `dnum/|p|² − da` with `dnum = x·dy − y·dx` constant, so the curve
/// reverses exactly where `|p(s)|²` crosses `dnum/da`; the discriminant of
/// that quadratic decides whether a reversal (a cusp-bounded loop) exists.
/// Between the two roots the radius is below the crossover, which is why the
/// loop's middle branch is always the inner one.
pub struct CircleCut {
    a0: f64,
    da: f64,
    p0: Point2<f64>,
    dp: Vector2<f64>,
    dnum: f64,
    v2: f64,  // |dp|²
    pv2: f64, // 2 p0·dp
    tol: f64,
    reversal: Option<(f64, f64)>,
}

impl CircleCut {
    /// Curve from two endpoint states: blank angle plus point position.
    pub fn new(a0: f64, p0: Point2<f64>, a1: f64, p1: Point2<f64>, tol: f64) -> Self {
        let dp = p1 - p0;
        let da = a1 - a0;
        assert!(da != 0.0, "circle cut needs blank motion");
        let dnum = p0.x * dp.y - p0.y * dp.x;
        let v2 = dp.norm_squared();
        let pv2 = 2.0 * p0.coords.dot(&dp);
        let p2 = p0.coords.norm_squared();
        let reversal = if v2 > 0.0 && dnum / da > 0.0 {
            let disc = pv2 * pv2 - 4.0 * v2 * (p2 - dnum / da);
            if disc > 0.0 {
                let sq = disc.sqrt();
                Some(((-pv2 - sq) / (2.0 * v2), (-pv2 + sq) / (2.0 * v2)))
            } else {
                None
            }
        } else {
            None
        };
        CircleCut {
            a0,
            da,
            p0,
            dp,
            dnum,
            v2,
            pv2,
            tol,
            reversal,
        }
    }

    /// Canonical curve of a rack vertex at radius `x`, swept across one tooth
    /// of rolling motion centred on its closest approach. Vertices at other
    /// slide offsets reuse this curve rotated.
    pub fn point_cut(x: f64, dad_tooth: f64, dyd_tooth: f64, tol: f64) -> Self {
        CircleCut::new(
            -0.5 * dad_tooth,
            Point2::new(x, -0.5 * dyd_tooth),
            0.5 * dad_tooth,
            Point2::new(x, 0.5 * dyd_tooth),
            tol,
        )
    }

    fn point_at(&self, s: f64) -> Point2<f64> {
        self.p0 + self.dp * s
    }

    fn theta_at(&self, s: f64) -> f64 {
        let p = self.point_at(s);
        p.y.atan2(p.x) - (self.a0 + s * self.da)
    }

    fn r_at(&self, s: f64) -> f64 {
        self.point_at(s).coords.norm()
    }

    /// Reversal roots that actually fall inside the parameter range.
    fn interior_reversals(&self) -> Vec<f64> {
        let mut out = Vec::new();
        if let Some((lo, hi)) = self.reversal {
            for &s in [lo, hi].iter() {
                if s > 0.0 && s < 1.0 {
                    out.push(s);
                }
            }
        }
        out
    }

    /// Monotone-θ branch boundaries: 0, interior reversal roots, 1.
    fn branch_bounds(&self) -> Vec<f64> {
        let mut bounds = vec![0.0];
        bounds.extend(self.interior_reversals());
        bounds.push(1.0);
        bounds
    }

    /// Finds `s` on one monotone branch with `θ(s) = target`, clamping to the
    /// branch ends. The inversion is a float binary search; the equality is
    /// only ever established to bracketing precision, never analytically.
    fn solve_branch(&self, sa: f64, sb: f64, target: f64) -> f64 {
        let ta = self.theta_at(sa);
        let tb = self.theta_at(sb);
        if ta == tb {
            return sa;
        }
        let increasing = tb > ta;
        if increasing {
            if target <= ta {
                return sa;
            }
            if target >= tb {
                return sb;
            }
        } else {
            if target >= ta {
                return sa;
            }
            if target <= tb {
                return sb;
            }
        }
        let (l, _h) = search(sa, sb, |s| {
            if increasing {
                self.theta_at(s) <= target
            } else {
                self.theta_at(s) >= target
            }
        });
        l
    }

    /// Parameter of the inner-branch point at `theta`: among the branches
    /// whose θ interval covers it, the one with the smallest radius.
    fn solve_inner(&self, theta: f64) -> Option<f64> {
        let bounds = self.branch_bounds();
        let mut best: Option<(f64, f64)> = None; // (r, s)
        for w in bounds.windows(2) {
            let (sa, sb) = (w[0], w[1]);
            let ta = self.theta_at(sa);
            let tb = self.theta_at(sb);
            let (tmin, tmax) = if ta <= tb { (ta, tb) } else { (tb, ta) };
            if theta < tmin - THETA_COVER_EPS || theta > tmax + THETA_COVER_EPS {
                continue;
            }
            let s = self.solve_branch(sa, sb, theta);
            let r = self.r_at(s);
            match best {
                Some((br, _)) if br <= r => {}
                _ => best = Some((r, s)),
            }
        }
        best.map(|(_, s)| s)
    }

    /// Blank-frame position at `s` (the trace as the blank sees it).
    fn blank_point(&self, s: f64) -> Point2<f64> {
        let p = self.point_at(s);
        let a = self.a0 + s * self.da;
        let (sin, cos) = a.sin_cos();
        Point2::new(cos * p.x + sin * p.y, -sin * p.x + cos * p.y)
    }

    /// Unit tangent of the blank-frame trace at `s`, oriented along `dir`
    /// (the sign of ds along the draw). Where the point is momentarily at
    /// rest on the blank (the rolling-contact cusp) the tangent degenerates;
    /// the radial direction with the sign of dr/ds stands in.
    fn blank_tangent(&self, s: f64, dir: f64) -> Vector2<f64> {
        let p = self.point_at(s);
        let a = self.a0 + s * self.da;
        let (sin, cos) = a.sin_cos();
        // |q'|² = |dp|² − 2·da·dnum + da²·|p|², zero exactly at rolling
        // contact (the point sitting on the pitch point).
        let speed_sq = self.v2 - 2.0 * self.da * self.dnum
            + self.da * self.da * p.coords.norm_squared();
        if speed_sq < CUSP_SPEED_SQ {
            warn!("cusp tangent fallback at s = {}", s);
            let q = self.blank_point(s);
            let radial = q.coords.normalize();
            let drds = (self.pv2 + 2.0 * self.v2 * s).signum();
            return radial * drds * dir;
        }
        let v_rel = Vector2::new(self.dp.x + self.da * p.y, self.dp.y - self.da * p.x);
        let t = Vector2::new(cos * v_rel.x + sin * v_rel.y, -sin * v_rel.x + cos * v_rel.y);
        t.normalize() * dir
    }

    /// Recursively samples `[sa, sb]` (already monotone in θ and r) so the
    /// chord of every step stays within tol/2 of the curve, appending to
    /// `out`. The endpoint sample at `sb` is always appended; `sa`'s is not.
    fn sample_into(&self, sa: f64, sb: f64, dir: f64, depth: u32, out: &mut Vec<Sample>) {
        let sm = 0.5 * (sa + sb);
        let pa = self.blank_point(sa);
        let pb = self.blank_point(sb);
        let pm = self.blank_point(sm);
        let chord = pb - pa;
        let off = pm - pa;
        let len_sq = chord.norm_squared();
        let dev_sq = if len_sq > 0.0 {
            let t = off.dot(&chord) / len_sq;
            (off - chord * t).norm_squared()
        } else {
            off.norm_squared()
        };
        if depth > 0 && dev_sq > self.tol * self.tol * 0.25 {
            self.sample_into(sa, sm, dir, depth - 1, out);
            self.sample_into(sm, sb, dir, depth - 1, out);
        } else {
            out.push(Sample {
                p: pb,
                t: self.blank_tangent(sb, dir),
            });
        }
    }
}

impl CutCurve for CircleCut {
    fn get_r(&self, theta: f64) -> f64 {
        match self.solve_inner(theta) {
            Some(s) => self.r_at(s),
            None => f64::INFINITY,
        }
    }

    fn discontinuities(&self, lo: f64, hi: f64) -> Vec<f64> {
        let mut out = Vec::new();
        for s in self.interior_reversals() {
            let t = self.theta_at(s);
            if t > lo && t < hi {
                out.push(t);
            }
        }
        out
    }

    fn theta_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for s in self.branch_bounds() {
            let t = self.theta_at(s);
            min = min.min(t);
            max = max.max(t);
        }
        (min, max)
    }

    fn draw_segment(&self, pen: &mut dyn Pen, from: f64, to: f64, initial_move: bool) {
        let s_from = match self.solve_inner(from) {
            Some(s) => s,
            None => return,
        };
        let s_to = match self.solve_inner(to) {
            Some(s) => s,
            None => return,
        };
        let dir = if s_to >= s_from { 1.0 } else { -1.0 };

        // Split so each piece is monotone in both θ and r: at reversal roots
        // (which the envelope should already avoid crossing) and at the
        // closest-approach parameter where r turns around.
        let (lo, hi) = if s_from <= s_to {
            (s_from, s_to)
        } else {
            (s_to, s_from)
        };
        let mut cuts = self.interior_reversals();
        if self.v2 > 0.0 {
            cuts.push(-self.pv2 / (2.0 * self.v2));
        }
        let mut splits: Vec<f64> = cuts
            .into_iter()
            .filter(|&s| s > lo + 1e-12 && s < hi - 1e-12)
            .collect();
        splits.sort_by(|a, b| a.partial_cmp(b).unwrap());
        if dir < 0.0 {
            splits.reverse();
        }

        let mut stops = vec![s_from];
        stops.extend(splits);
        stops.push(s_to);

        let mut samples = vec![Sample {
            p: self.blank_point(s_from),
            t: self.blank_tangent(s_from, dir),
        }];
        for w in stops.windows(2) {
            if (w[1] - w[0]).abs() > 0.0 {
                self.sample_into(w[0], w[1], dir, 32, &mut samples);
            }
        }
        biarc::draw(pen, &samples, self.tol, initial_move);
    }
}
