//! Lower-envelope normalization: from a pile of overlapping cuts to the one
//! minimum-radius boundary per angular range.
//!
//! Input segments are wrapped into the canonical tooth window `(−0.5, +0.5]`
//! (teeth), streamed in start order from a min-heap, and probed on a dense
//! angle grid that stays clear of segment ends and curve reversals. At each
//! probe the cuts within [`BOTTOM_TOLERANCE`] of the minimum radius form a
//! candidate set; while consecutive probes keep a common candidate the same
//! cut keeps winning, and when the intersection empties a segment is
//! committed. Neighbouring commits are then stitched exactly by searching the
//! radius crossover between their probe brackets.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use log::debug;

use crate::curve::CutCurve;
use crate::cutter::CutSegment;
use crate::search::search;

/// Cuts within this of the minimum radius count as co-winners at a probe.
pub const BOTTOM_TOLERANCE: f64 = 1e-5;

/// Approximate probe spacing, in teeth.
const PROBE_STEP: f64 = 1e-3;

/// Probes keep at least this distance from any event angle.
const EVENT_MARGIN: f64 = 1e-6;

/// Spans at or below this are degenerate and dropped.
const ZERO_SPAN: f64 = 1e-12;

struct ByStart {
    start: f64,
    idx: usize,
}

impl PartialEq for ByStart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByStart {}

impl PartialOrd for ByStart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByStart {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then(self.idx.cmp(&other.idx))
    }
}

/// Wraps a segment into the canonical window, splitting at the seam. The
/// rotation moves with the span so the curve is queried at the same local
/// angles either way.
fn wrap_into_window(seg: CutSegment, out: &mut Vec<CutSegment>) {
    if seg.end - seg.start <= ZERO_SPAN {
        return;
    }
    let shift = (seg.start - 0.5).ceil();
    let mut s = CutSegment {
        start: seg.start - shift,
        end: seg.end - shift,
        rot: seg.rot - shift,
        curve: seg.curve,
    };
    while s.end > 0.5 + ZERO_SPAN {
        if 0.5 - s.start > ZERO_SPAN {
            out.push(CutSegment {
                start: s.start,
                end: 0.5,
                rot: s.rot,
                curve: s.curve.clone(),
            });
        }
        s = CutSegment {
            start: -0.5,
            end: s.end - 1.0,
            rot: s.rot - 1.0,
            curve: s.curve,
        };
    }
    if s.end - s.start > ZERO_SPAN {
        out.push(s);
    }
}

struct Run {
    start: f64,
    snap_start: bool,
    last_probe: f64,
    rep: usize,
    cands: Vec<usize>,
    bracket: Option<(f64, f64)>,
}

struct Commit {
    start: f64,
    end: f64,
    rep: usize,
    snap_start: bool,
    snap_end: bool,
    /// Probe bracket around the hand-over from the previous commit.
    bracket: Option<(f64, f64)>,
}

/// Reduces cut segments covering one tooth to the ordered, disjoint list of
/// envelope segments: per angular range, the cut of smallest radius, with
/// exact stitch angles between neighbours.
pub fn normalize(input: Vec<CutSegment>, dad_tooth: f64) -> Vec<CutSegment> {
    let mut segs: Vec<CutSegment> = Vec::new();
    for s in input {
        wrap_into_window(s, &mut segs);
    }
    if segs.is_empty() {
        return Vec::new();
    }

    // Event angles: every span end and every curve reversal, in teeth.
    let mut events: Vec<f64> = Vec::new();
    for s in &segs {
        events.push(s.start);
        events.push(s.end);
        let lo = (s.start - s.rot) * dad_tooth;
        let hi = (s.end - s.rot) * dad_tooth;
        for t in s.curve.discontinuities(lo, hi) {
            events.push(t / dad_tooth + s.rot);
        }
    }
    events.sort_by(|a, b| a.total_cmp(b));
    events.dedup_by(|a, b| (*a - *b).abs() <= ZERO_SPAN);

    // Probe grid between events, clear of the events themselves.
    let mut probes: Vec<f64> = Vec::new();
    for w in events.windows(2) {
        let (e0, e1) = (w[0], w[1]);
        if e1 - e0 <= 2.0 * EVENT_MARGIN {
            continue;
        }
        probes.push(e0 + EVENT_MARGIN);
        let n = ((e1 - e0) / PROBE_STEP).ceil() as usize;
        let step = (e1 - e0) / n as f64;
        for k in 1..n {
            probes.push(e0 + step * k as f64);
        }
        probes.push(e1 - EVENT_MARGIN);
    }
    debug!(
        "normalizing {} segments over {} events, {} probes",
        segs.len(),
        events.len(),
        probes.len()
    );

    let mut heap: BinaryHeap<Reverse<ByStart>> = segs
        .iter()
        .enumerate()
        .map(|(idx, s)| Reverse(ByStart { start: s.start, idx }))
        .collect();
    let mut active: Vec<usize> = Vec::new();
    let mut commits: Vec<Commit> = Vec::new();
    let mut run: Option<Run> = None;

    for &a in &probes {
        while let Some(Reverse(top)) = heap.peek() {
            if top.start <= a {
                active.push(top.idx);
                heap.pop();
            } else {
                break;
            }
        }
        active.retain(|&i| segs[i].end > a);

        let mut min_r = f64::INFINITY;
        let mut rs: Vec<(usize, f64)> = Vec::with_capacity(active.len());
        for &i in &active {
            let r = segs[i].r_at(a, dad_tooth);
            min_r = min_r.min(r);
            rs.push((i, r));
        }
        let cands: Vec<usize> = rs
            .iter()
            .filter(|&&(_, r)| r <= min_r + BOTTOM_TOLERANCE)
            .map(|&(i, _)| i)
            .collect();

        if cands.is_empty() {
            if let Some(r) = run.take() {
                commits.push(Commit {
                    start: r.start,
                    end: r.last_probe,
                    rep: r.rep,
                    snap_start: r.snap_start,
                    snap_end: true,
                    bracket: r.bracket,
                });
            }
            continue;
        }

        run = Some(match run.take() {
            None => Run {
                start: a,
                snap_start: true,
                last_probe: a,
                rep: cands[0],
                cands,
                bracket: None,
            },
            Some(r) => {
                let inter: Vec<usize> = r
                    .cands
                    .iter()
                    .copied()
                    .filter(|i| cands.contains(i))
                    .collect();
                if inter.is_empty() {
                    commits.push(Commit {
                        start: r.start,
                        end: r.last_probe,
                        rep: r.rep,
                        snap_start: r.snap_start,
                        snap_end: false,
                        bracket: r.bracket,
                    });
                    Run {
                        start: r.last_probe,
                        snap_start: false,
                        last_probe: a,
                        rep: cands[0],
                        cands,
                        bracket: Some((r.last_probe, a)),
                    }
                } else {
                    let rep = if inter.contains(&r.rep) {
                        r.rep
                    } else {
                        inter[0]
                    };
                    Run {
                        start: r.start,
                        snap_start: r.snap_start,
                        last_probe: a,
                        rep,
                        cands: inter,
                        bracket: r.bracket,
                    }
                }
            }
        });
    }
    if let Some(r) = run.take() {
        commits.push(Commit {
            start: r.start,
            end: r.last_probe,
            rep: r.rep,
            snap_start: r.snap_start,
            snap_end: true,
            bracket: r.bracket,
        });
    }

    // Exact stitches: between adjacent commits, search the angle where the
    // two radius functions cross inside the probe bracket.
    for k in 1..commits.len() {
        let (b_lo, b_hi) = match commits[k].bracket {
            Some(b) => b,
            None => continue,
        };
        let a_star = {
            let lo_seg = &segs[commits[k - 1].rep];
            let hi_seg = &segs[commits[k].rep];
            let lo_clamp = b_lo.max(hi_seg.start);
            let hi_clamp = b_hi.min(lo_seg.end);
            if hi_clamp <= lo_clamp {
                lo_clamp
            } else {
                let pred =
                    |a: f64| lo_seg.r_at(a, dad_tooth) <= hi_seg.r_at(a, dad_tooth);
                if !pred(lo_clamp) {
                    // The newcomer is already below where its span begins.
                    lo_clamp
                } else if pred(hi_clamp) {
                    // The old cut stays below until its span runs out.
                    hi_clamp
                } else {
                    search(lo_clamp, hi_clamp, pred).0
                }
            }
        };
        commits[k - 1].end = a_star;
        commits[k].start = a_star;
    }

    // Runs bounded by coverage (not by a crossover) snap to the event that
    // bounded them, undoing the probe margin.
    for c in commits.iter_mut() {
        if c.snap_start {
            let i = events.partition_point(|&e| e <= c.start + ZERO_SPAN);
            if i > 0 {
                c.start = events[i - 1];
            }
        }
        if c.snap_end {
            let i = events.partition_point(|&e| e < c.end - ZERO_SPAN);
            if i < events.len() {
                c.end = events[i];
            }
        }
    }

    let out: Vec<CutSegment> = commits
        .into_iter()
        .filter(|c| c.end - c.start > ZERO_SPAN)
        .map(|c| CutSegment {
            start: c.start,
            end: c.end,
            rot: segs[c.rep].rot,
            curve: segs[c.rep].curve.clone(),
        })
        .collect();
    debug!("envelope has {} segments", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{CircleCut, ConstantCut};
    use std::f64::consts::PI;
    use std::rc::Rc;

    const N: f64 = 8.0;

    fn dad() -> f64 {
        2.0 * PI / N
    }

    fn flat(r: f64, start: f64, end: f64) -> CutSegment {
        CutSegment {
            start,
            end,
            rot: 0.0,
            curve: Rc::new(ConstantCut::new(r)),
        }
    }

    #[test]
    fn single_cut_passes_through() {
        let env = normalize(vec![flat(1.0, -0.5, 0.5)], dad());
        assert_eq!(env.len(), 1);
        assert!((env[0].start + 0.5).abs() < 1e-9);
        assert!((env[0].end - 0.5).abs() < 1e-9);
    }

    #[test]
    fn smaller_radius_wins_where_active() {
        let env = normalize(
            vec![flat(1.0, -0.5, 0.5), flat(0.8, -0.1, 0.3)],
            dad(),
        );
        assert_eq!(env.len(), 3);
        // Boundaries land exactly on the inner cut's span.
        assert!((env[0].end + 0.1).abs() < 1e-9);
        assert!((env[1].start + 0.1).abs() < 1e-9);
        assert!((env[1].end - 0.3).abs() < 1e-9);
        assert!((env[2].start - 0.3).abs() < 1e-9);
        let a = 0.1;
        assert_eq!(env[1].r_at(a, dad()), 0.8);
    }

    #[test]
    fn intervals_are_disjoint_and_cover() {
        let env = normalize(
            vec![
                flat(1.0, -0.5, 0.5),
                flat(0.9, -0.3, 0.0),
                flat(0.85, 0.1, 0.4),
            ],
            dad(),
        );
        for w in env.windows(2) {
            assert!(
                (w[1].start - w[0].end).abs() < 1e-9,
                "gap or overlap between {} and {}",
                w[0].end,
                w[1].start
            );
        }
        assert!((env.first().unwrap().start + 0.5).abs() < 1e-9);
        assert!((env.last().unwrap().end - 0.5).abs() < 1e-9);
    }

    #[test]
    fn envelope_is_minimal_at_probes() {
        let cuts = vec![
            flat(1.0, -0.5, 0.5),
            flat(0.9, -0.35, -0.05),
            flat(0.88, -0.1, 0.25),
            flat(0.95, 0.2, 0.45),
        ];
        let env = normalize(cuts.clone(), dad());
        for k in 0..200 {
            let a = -0.499 + 0.998 * k as f64 / 199.0;
            let seg = env
                .iter()
                .find(|s| s.start <= a && a <= s.end)
                .expect("coverage");
            let r_env = seg.r_at(a, dad());
            for c in &cuts {
                if c.start + 1e-9 < a && a < c.end - 1e-9 {
                    assert!(
                        r_env <= c.r_at(a, dad()) + BOTTOM_TOLERANCE,
                        "cut beats envelope at {}",
                        a
                    );
                }
            }
        }
    }

    #[test]
    fn wrapping_splits_at_the_seam() {
        let env = normalize(vec![flat(1.0, 0.3, 0.8)], dad());
        assert_eq!(env.len(), 2);
        // Pieces come back ordered by start: [-0.5, -0.2] then [0.3, 0.5].
        assert!((env[0].start + 0.5).abs() < 1e-9);
        assert!((env[0].end + 0.2).abs() < 1e-9);
        assert!((env[1].start - 0.3).abs() < 1e-9);
        assert!((env[1].end - 0.5).abs() < 1e-9);
    }

    #[test]
    fn crossover_stitch_is_radius_continuous() {
        // A flat circle against a vertex trochoid dipping below it: the
        // stitch angles must satisfy r_lo == r_hi to search precision.
        let pr = N / (2.0 * PI);
        let x = 1.1;
        let trochoid = CutSegment {
            start: 0.0,
            end: 0.0,
            rot: 0.0,
            curve: Rc::new(CircleCut::point_cut(x, dad(), 1.0, 1e-4)),
        };
        let (tmin, tmax) = trochoid.curve.theta_range();
        let trochoid = CutSegment {
            start: tmin / dad(),
            end: tmax / dad(),
            ..trochoid
        };
        assert!(x < pr, "test wants a looping vertex");
        let cuts = vec![flat(1.15, -0.5, 0.5), trochoid];
        let env = normalize(cuts, dad());
        assert_eq!(env.len(), 3, "flat / trochoid / flat");
        for w in env.windows(2) {
            let a = w[0].end;
            let r0 = w[0].r_at(a, dad());
            let r1 = w[1].r_at(a, dad());
            assert!(
                (r0 - r1).abs() <= 1e-9 * r0.abs().max(1.0),
                "stitch discontinuity at {}: {} vs {}",
                a,
                r0,
                r1
            );
        }
    }

    #[test]
    fn empty_input_yields_empty_envelope() {
        assert!(normalize(Vec::new(), dad()).is_empty());
        // Zero-length spans are filtered, not swept.
        assert!(normalize(vec![flat(1.0, 0.2, 0.2)], dad()).is_empty());
    }
}
