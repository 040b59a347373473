//! Turns a rack outline into the multiset of curves it cuts on the blank.
//!
//! The cutter consumes the rack through the [`Pen`] interface in the blank
//! frame: x is radial distance from the blank axis, y the slide direction.
//! Per tooth of motion the blank turns `2π/N` while the rack advances
//! `pitch_radius · 2π/N` (one pitch) along y. Every vertex contributes the
//! trochoid its point sweeps; every edge contributes either a constant-radius
//! arc (edges parallel to the slide) or the curve its rolling contact point
//! generates.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::rc::Rc;

use log::debug;
use nalgebra::Point2;
use thiserror::Error;

use crate::curve::{CircleCut, ConstantCut, CutCurve};
use crate::pen::Pen;

/// Edges with more turn than this are not straight, and rejected.
const STRAIGHT_TURN_EPS: f64 = 1e-3;

/// Below this radial contact speed an edge generates nothing; its endpoint
/// trochoids own the envelope instead.
const DEGENERATE_EDGE_EPS: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum CutterError {
    #[error("gear needs at least 4 teeth, got {0}")]
    TooFewTeeth(u32),
    #[error("rack vertex at x = {0} is on or behind the blank axis")]
    VertexBehindAxis(f64),
    #[error("rack edges must be straight, got turn = {0}")]
    CurvedEdge(f64),
}

/// One cut, indexed over the blank's angular coordinate.
///
/// Angles are in teeth (1 tooth = 2π/N radians). `rot` shifts the curve
/// about the axis: the curve answers for the local angle `(a − rot)·dad`.
#[derive(Clone)]
pub struct CutSegment {
    pub start: f64,
    pub end: f64,
    pub rot: f64,
    pub curve: Rc<dyn CutCurve>,
}

impl CutSegment {
    /// Radius of this cut at blank angle `a` (teeth).
    pub fn r_at(&self, a: f64, dad_tooth: f64) -> f64 {
        self.curve.get_r((a - self.rot) * dad_tooth)
    }
}

pub struct GearCutter {
    pitch_radius: f64,
    dad_tooth: f64,
    dyd_tooth: f64,
    face_tol: f64,
    fillet_tol: f64,
    cur: Option<Point2<f64>>,
    point_curves: HashMap<u64, Rc<CircleCut>>,
    flat_curves: HashMap<u64, Rc<ConstantCut>>,
    segments: Vec<CutSegment>,
    error: Option<CutterError>,
}

impl GearCutter {
    pub fn new(
        n_teeth: u32,
        face_tol: f64,
        fillet_tol: f64,
    ) -> Result<GearCutter, CutterError> {
        if n_teeth < 4 {
            return Err(CutterError::TooFewTeeth(n_teeth));
        }
        assert!(face_tol > 0.0 && fillet_tol > 0.0, "tolerances must be positive");
        let dad_tooth = 2.0 * PI / n_teeth as f64;
        let pitch_radius = n_teeth as f64 / (2.0 * PI);
        Ok(GearCutter {
            pitch_radius,
            dad_tooth,
            dyd_tooth: dad_tooth * pitch_radius,
            face_tol,
            fillet_tol,
            cur: None,
            point_curves: HashMap::new(),
            flat_curves: HashMap::new(),
            segments: Vec::new(),
            error: None,
        })
    }

    pub fn pitch_radius(&self) -> f64 {
        self.pitch_radius
    }

    pub fn dad_tooth(&self) -> f64 {
        self.dad_tooth
    }

    /// The collected cut segments, or the first rejected input.
    pub fn finish(self) -> Result<Vec<CutSegment>, CutterError> {
        match self.error {
            Some(e) => Err(e),
            None => {
                debug!("cutter produced {} segments", self.segments.len());
                Ok(self.segments)
            }
        }
    }

    fn fail(&mut self, e: CutterError) {
        if self.error.is_none() {
            self.error = Some(e);
        }
    }

    /// Trochoid of a single rack vertex. Identical x share one canonical
    /// curve; the slide offset y becomes a rotation in teeth.
    fn add_vertex(&mut self, x: f64, y: f64) {
        if x <= 0.0 {
            self.fail(CutterError::VertexBehindAxis(x));
            return;
        }
        let dad = self.dad_tooth;
        let dyd = self.dyd_tooth;
        let tol = self.fillet_tol;
        let curve = self
            .point_curves
            .entry(x.to_bits())
            .or_insert_with(|| Rc::new(CircleCut::point_cut(x, dad, dyd, tol)))
            .clone();
        let rot = y / dyd;
        let (tmin, tmax) = curve.theta_range();
        self.push_segment(CutSegment {
            start: rot + tmin / dad,
            end: rot + tmax / dad,
            rot,
            curve,
        });
    }

    /// Edge parallel to the slide direction: its envelope is the circle it
    /// stays tangent to, over the angles the flat actually covers.
    fn add_flat(&mut self, x: f64, y0: f64, y1: f64) {
        let curve = self
            .flat_curves
            .entry(x.to_bits())
            .or_insert_with(|| Rc::new(ConstantCut::new(x)))
            .clone();
        let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        self.push_segment(CutSegment {
            start: lo / self.dyd_tooth,
            end: hi / self.dyd_tooth,
            rot: 0.0,
            curve,
        });
    }

    /// Sloped edge: the contact point runs along the fixed line of action
    /// through the pitch point, linearly in time, while the blank turns.
    fn add_edge(&mut self, p0: Point2<f64>, p1: Point2<f64>) {
        if (p1.x - p0.x).abs() < DEGENERATE_EDGE_EPS {
            self.add_flat(p0.x, p0.y, p1.y);
            return;
        }
        let xp = self.pitch_radius;
        let dyd = self.dyd_tooth;
        let edge = (p1 - p0).normalize();
        // Contact point velocity: the component of the slide perpendicular
        // to the edge.
        let dxdt = -dyd * edge.x * edge.y;
        let dydt = dyd * edge.x * edge.x;
        if dxdt.abs() < DEGENERATE_EDGE_EPS {
            // Purely radial edge; the contact never leaves the pitch radius.
            return;
        }
        // Slide time at which the edge passes through the pitch point.
        let y0p = (p1.y - p0.y) * (xp - p0.x) / (p1.x - p0.x) + p0.y;
        let tp = -y0p / dyd;
        let t0 = (p0.x - xp) / dxdt;
        let t1 = (p1.x - xp) / dxdt;
        let curve = Rc::new(CircleCut::new(
            (t0 + tp) * self.dad_tooth,
            Point2::new(p0.x, t0 * dydt),
            (t1 + tp) * self.dad_tooth,
            Point2::new(p1.x, t1 * dydt),
            self.face_tol,
        ));
        let (tmin, tmax) = curve.theta_range();
        self.push_segment(CutSegment {
            start: tmin / self.dad_tooth,
            end: tmax / self.dad_tooth,
            rot: 0.0,
            curve,
        });
    }

    fn push_segment(&mut self, seg: CutSegment) {
        if seg.end - seg.start > 0.0 {
            self.segments.push(seg);
        }
    }
}

impl Pen for GearCutter {
    fn move_to(&mut self, x: f64, y: f64) {
        self.add_vertex(x, y);
        self.cur = Some(Point2::new(x, y));
    }

    fn arc_to(&mut self, x: f64, y: f64, turn: f64) {
        let p0 = self.cur.expect("arc_to with no current point");
        let p1 = Point2::new(x, y);
        if turn.abs() > STRAIGHT_TURN_EPS {
            self.fail(CutterError::CurvedEdge(turn));
            self.cur = Some(p1);
            return;
        }
        if p1.x > 0.0 {
            if p0.x > 0.0 {
                self.add_edge(p0, p1);
            }
            self.add_vertex(x, y);
        } else {
            self.fail(CutterError::VertexBehindAxis(p1.x));
        }
        self.cur = Some(p1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pen::{Pen, Transform, TransformPen};
    use crate::rack::{rack_path, RackProps};
    use pretty_assertions::assert_eq;

    fn feed_rack(n_teeth: u32) -> Vec<CutSegment> {
        let mut cutter = GearCutter::new(n_teeth, 5e-4, 5e-3).unwrap();
        let pr = cutter.pitch_radius();
        {
            let mut pen = TransformPen::new(
                &mut cutter,
                Transform::identity().translate(pr, 0.0).rotate(-90.0),
            );
            rack_path(&RackProps::default(), &mut pen, true);
        }
        cutter.finish().unwrap()
    }

    #[test]
    fn rejects_too_few_teeth() {
        assert_eq!(
            GearCutter::new(3, 1e-3, 1e-3).err(),
            Some(CutterError::TooFewTeeth(3))
        );
    }

    #[test]
    fn rejects_vertex_behind_axis() {
        let mut cutter = GearCutter::new(12, 1e-3, 1e-3).unwrap();
        cutter.move_to(-0.5, 0.0);
        assert!(matches!(
            cutter.finish(),
            Err(CutterError::VertexBehindAxis(_))
        ));
    }

    #[test]
    fn rejects_curved_edges() {
        let mut cutter = GearCutter::new(12, 1e-3, 1e-3).unwrap();
        cutter.move_to(1.0, 0.0);
        cutter.arc_to(1.0, 0.5, 0.3);
        assert!(matches!(cutter.finish(), Err(CutterError::CurvedEdge(_))));
    }

    #[test]
    fn one_pitch_produces_vertex_flat_and_edge_cuts() {
        let segments = feed_rack(14);
        // 5 path points -> 5 vertex cuts; 2 flats (tip + gap); 2 flank edges.
        assert_eq!(segments.len(), 9);
        let flats = segments
            .iter()
            .filter(|s| s.curve.discontinuities(-10.0, 10.0).is_empty() && s.rot == 0.0)
            .count();
        assert!(flats >= 2);
    }

    #[test]
    fn vertex_curves_are_memoized_by_x() {
        let mut cutter = GearCutter::new(10, 1e-3, 1e-3).unwrap();
        cutter.move_to(1.2, -0.3);
        cutter.move_to(1.2, 0.4);
        let segments = cutter.finish().unwrap();
        assert_eq!(segments.len(), 2);
        assert!(Rc::ptr_eq(&segments[0].curve, &segments[1].curve));
        // Same curve, shifted by the slide offset in teeth.
        assert!((segments[1].rot - segments[0].rot - 0.7).abs() < 1e-12);
    }

    #[test]
    fn flat_spans_its_slide_range_in_teeth() {
        let mut cutter = GearCutter::new(10, 1e-3, 1e-3).unwrap();
        cutter.move_to(1.4, -0.2);
        cutter.arc_to(1.4, 0.1, 0.0);
        let segments = cutter.finish().unwrap();
        // dyd_tooth is one pitch, so slide offsets are already teeth.
        let flat = segments
            .iter()
            .find(|s| (s.start + 0.2).abs() < 1e-12 && (s.end - 0.1).abs() < 1e-12)
            .expect("flat segment");
        assert_eq!(flat.rot, 0.0);
        assert_eq!(flat.r_at(0.0, cutter_dad(10)), 1.4);
    }

    fn cutter_dad(n: u32) -> f64 {
        2.0 * PI / n as f64
    }

    #[test]
    fn edge_cut_matches_vertex_state_at_its_ends() {
        // The edge's contact point coincides with the edge endpoints at the
        // endpoint times, so the generated curve must take the endpoint
        // radius where it meets the endpoint trochoid.
        let segments = feed_rack(14);
        let dad = cutter_dad(14);
        for seg in &segments {
            let r_start = seg.r_at(seg.start + 1e-9, dad);
            let r_end = seg.r_at(seg.end - 1e-9, dad);
            assert!(r_start.is_finite(), "cut undefined at its own start");
            assert!(r_end.is_finite(), "cut undefined at its own end");
        }
    }

    #[test]
    fn zero_pressure_rack_produces_no_edge_curves() {
        let props = RackProps {
            pressure_angle: 0.0,
            ..RackProps::default()
        };
        let mut cutter = GearCutter::new(12, 1e-3, 1e-3).unwrap();
        let pr = cutter.pitch_radius();
        {
            let mut pen = TransformPen::new(
                &mut cutter,
                Transform::identity().translate(pr, 0.0).rotate(-90.0),
            );
            rack_path(&props, &mut pen, true);
        }
        let segments = cutter.finish().unwrap();
        // 5 vertices + 2 flats; the radial flank edges generate nothing.
        assert_eq!(segments.len(), 7);
    }
}
