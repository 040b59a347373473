//! Approximation of sampled curves by tangent-continuous arc pairs.
//!
//! Given point-and-tangent samples along a smooth curve, picks the smallest
//! subsequence whose pairwise biarc interpolation stays within tolerance of
//! every skipped sample, then emits the chosen biarcs as `arc_to` commands.
//! The biarc joining two samples is the incenter-connecting one: the joint
//! tangent is the chord direction, which keeps the curvature step across the
//! joint small.

use log::warn;
use nalgebra::{Point2, Vector2};

use crate::pen::Pen;

/// A point on a curve with its unit tangent, oriented along traversal.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub p: Point2<f64>,
    pub t: Vector2<f64>,
}

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Joint point and joint tangent of the incenter-connecting biarc.
///
/// Fails when the tangents disagree about the turning direction (a curvature
/// sign reversal inside the pair); callers are expected to partition the curve
/// at such points before fitting.
pub fn split(
    p0: &Point2<f64>,
    t0: &Vector2<f64>,
    p1: &Point2<f64>,
    t1: &Vector2<f64>,
) -> Option<(Point2<f64>, Vector2<f64>)> {
    let c = p1 - p0;
    let len = c.norm();
    if len == 0.0 {
        return None;
    }
    let tm = c / len;
    let f0 = cross(t1, &c);
    let f1 = cross(&c, t0);
    if f0.abs() < 1e-12 * len && f1.abs() < 1e-12 * len {
        // Both tangents run along the chord: the biarc degenerates to a line.
        return Some((p0 + c * 0.5, tm));
    }
    if f0 * f1 < 0.0 {
        return None;
    }
    let denom = f0 * (1.0 + t0.dot(&tm)) + f1 * (1.0 + t1.dot(&tm));
    if denom == 0.0 {
        return None;
    }
    let k = len / denom;
    let a0 = k * f0;
    let a1 = k * f1;
    if a0 < 0.0 || a1 < 0.0 {
        return None;
    }
    Some((p0 + (t0 + tm) * a0, tm))
}

/// Distance from `s` to the arc through `p0`/`p1` with tangents `t0`/`t1`.
///
/// The center is recovered from the two point-tangent pairs; when the radius
/// blows up relative to the chord the arc is treated as a straight line and
/// the perpendicular distance from the averaged tangent is used instead.
fn arc_deviation(
    p0: &Point2<f64>,
    t0: &Vector2<f64>,
    p1: &Point2<f64>,
    t1: &Vector2<f64>,
    s: &Point2<f64>,
) -> f64 {
    let c = p1 - p0;
    let len_sq = c.norm_squared();
    let dt = t1 - t0;
    let denom = cross(&dt, &c);
    if denom.abs() * 1e8 <= len_sq.sqrt() {
        let sum = t0 + t1;
        let n = sum.norm();
        let u = if n > 0.0 { sum / n } else { tm_fallback(&c) };
        return cross(&u, &(s - p0)).abs();
    }
    let r = len_sq / denom;
    let mid = nalgebra::center(p0, p1);
    let tsum = t0 + t1;
    let center = mid - Vector2::new(-tsum.y, tsum.x) * (0.5 * r);
    ((s - center).norm() - r.abs()).abs()
}

fn tm_fallback(c: &Vector2<f64>) -> Vector2<f64> {
    let n = c.norm();
    if n > 0.0 {
        c / n
    } else {
        Vector2::new(1.0, 0.0)
    }
}

/// Worst deviation of the samples strictly between `j` and `i` from the
/// biarc joining samples `j` and `i`. Infinite when no biarc exists.
fn biarc_error(samples: &[Sample], j: usize, i: usize) -> f64 {
    let s0 = &samples[j];
    let s1 = &samples[i];
    let (pj, tm) = match split(&s0.p, &s0.t, &s1.p, &s1.t) {
        Some(v) => v,
        None => return f64::INFINITY,
    };
    let chord = tm_fallback(&(s1.p - s0.p));
    let joint_u = (pj - s0.p).dot(&chord);
    let mut worst = 0.0_f64;
    for s in &samples[j + 1..i] {
        let u = (s.p - s0.p).dot(&chord);
        let dev = if u <= joint_u {
            arc_deviation(&s0.p, &s0.t, &pj, &tm, &s.p)
        } else {
            arc_deviation(&pj, &tm, &s1.p, &s1.t, &s.p)
        };
        worst = worst.max(dev);
    }
    worst
}

#[derive(Clone, Copy)]
struct State {
    count: u32,
    err: f64,
    pred: usize,
}

fn better(a: Option<State>, b: State) -> Option<State> {
    match a {
        None => Some(b),
        Some(a) => {
            if b.count < a.count || (b.count == a.count && b.err < a.err) {
                Some(b)
            } else {
                Some(a)
            }
        }
    }
}

/// Indices of the minimum-cardinality sample subsequence whose biarc
/// interpolation deviates from the skipped samples by at most `tolerance`.
///
/// Ties on count are broken by the smaller worst-case deviation. A sliding
/// scan start prunes predecessors that have already failed to reach any later
/// sample, keeping the quadratic scan windowed in practice.
pub fn fit(samples: &[Sample], tolerance: f64) -> Vec<usize> {
    let n = samples.len();
    if n <= 1 {
        return (0..n).collect();
    }
    let mut dp: Vec<Option<State>> = vec![None; n];
    dp[0] = Some(State {
        count: 0,
        err: 0.0,
        pred: 0,
    });
    let mut next_scan_start = 0usize;
    for i in 1..n {
        let mut best: Option<State> = None;
        let mut feasible_seen = false;
        for j in next_scan_start..i {
            let prev = match dp[j] {
                Some(p) => p,
                None => continue,
            };
            let err = biarc_error(samples, j, i);
            if err <= tolerance {
                feasible_seen = true;
                best = better(
                    best,
                    State {
                        count: prev.count + 1,
                        err: prev.err.max(err),
                        pred: j,
                    },
                );
            } else if !feasible_seen {
                next_scan_start = j + 1;
            }
        }
        // Adjacent samples have no interior points to miss, so this only
        // triggers when the pair admits no biarc at all; keep the chain alive
        // and let emission fall back to a chord.
        dp[i] = Some(best.unwrap_or_else(|| {
            let prev = dp[i - 1].expect("previous dp state");
            State {
                count: prev.count + 1,
                err: f64::INFINITY,
                pred: i - 1,
            }
        }));
    }

    let mut picks = vec![n - 1];
    let mut at = n - 1;
    while at != 0 {
        at = dp[at].expect("dp chain").pred;
        picks.push(at);
    }
    picks.reverse();
    picks
}

/// Fits `samples` within `tolerance` and emits the result as biarcs.
pub fn draw(pen: &mut dyn Pen, samples: &[Sample], tolerance: f64, initial_move: bool) {
    if samples.is_empty() {
        return;
    }
    if initial_move {
        pen.move_to(samples[0].p.x, samples[0].p.y);
    }
    let picks = fit(samples, tolerance);
    for w in picks.windows(2) {
        let s0 = &samples[w[0]];
        let s1 = &samples[w[1]];
        match split(&s0.p, &s0.t, &s1.p, &s1.t) {
            Some((pj, tm)) => {
                let turn0 = cross(&s0.t, &tm).max(-1.0).min(1.0).asin();
                let turn1 = cross(&tm, &s1.t).max(-1.0).min(1.0).asin();
                pen.arc_to(pj.x, pj.y, turn0);
                pen.arc_to(s1.p.x, s1.p.y, turn1);
            }
            None => {
                warn!("no biarc between adjacent samples, emitting chord");
                pen.arc_to(s1.p.x, s1.p.y, 0.0);
            }
        }
    }
}
