//! DXF emission: one lightweight polyline per subpath.
//!
//! Arcs ride on the polyline bulge, `bulge = tan(turn/4)` on the vertex that
//! starts the curved segment. Outlines whose last point returns to the first
//! become closed polylines. Drawing extents are tracked from the real path
//! bounds, arc bulges included.

use dxf::entities::{Entity, EntityType, LwPolyline};
use dxf::enums::AcadVersion;
use dxf::tables::Layer;
use dxf::{Drawing, LwPolylineVertex, Point};

use crate::pen::{arc_extremes, Pen, DUP_DIST_SQ, LINE_TURN_EPS};

/// Layer carrying the tooth outlines.
pub const PROFILE_LAYER: &str = "PROFILE";

#[derive(Default)]
pub struct DxfPen {
    polylines: Vec<Vec<LwPolylineVertex>>,
    verts: Vec<LwPolylineVertex>,
    cur: Option<(f64, f64)>,
    bounds: Option<(f64, f64, f64, f64)>,
}

impl DxfPen {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(&mut self, x: f64, y: f64) {
        self.bounds = Some(match self.bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    fn flush(&mut self) {
        if self.verts.len() >= 2 {
            let verts = std::mem::replace(&mut self.verts, Vec::new());
            self.polylines.push(verts);
        } else {
            self.verts.clear();
        }
    }

    /// Builds the drawing. The caller decides where and whether to save it.
    pub fn finish(mut self) -> Drawing {
        self.flush();
        let mut drawing = Drawing::new();
        drawing.header.version = AcadVersion::R2000;
        drawing.add_layer(Layer {
            name: PROFILE_LAYER.to_string(),
            ..Default::default()
        });
        for mut verts in self.polylines {
            let closed = {
                let first = &verts[0];
                let last = &verts[verts.len() - 1];
                let dx = last.x - first.x;
                let dy = last.y - first.y;
                dx * dx + dy * dy < DUP_DIST_SQ
            };
            let mut lwp = LwPolyline::default();
            if closed {
                // The dropped duplicate's segment is the closing one; its
                // bulge already sits on the vertex before it.
                verts.pop();
                lwp.set_is_closed(true);
            }
            lwp.vertices = verts;
            let mut entity = Entity::new(EntityType::LwPolyline(lwp));
            entity.common.layer = PROFILE_LAYER.to_string();
            drawing.add_entity(entity);
        }
        if let Some((x0, y0, x1, y1)) = self.bounds {
            drawing.header.minimum_drawing_extents = Point::new(x0, y0, 0.0);
            drawing.header.maximum_drawing_extents = Point::new(x1, y1, 0.0);
        }
        drawing
    }
}

impl Pen for DxfPen {
    fn move_to(&mut self, x: f64, y: f64) {
        self.flush();
        self.verts.push(LwPolylineVertex {
            x,
            y,
            ..Default::default()
        });
        self.grow(x, y);
        self.cur = Some((x, y));
    }

    fn arc_to(&mut self, x: f64, y: f64, turn: f64) {
        let (cx, cy) = self.cur.expect("arc_to with no current point");
        let bulge = if turn.abs() < LINE_TURN_EPS {
            0.0
        } else {
            for &(ex, ey) in arc_extremes((cx, cy), (x, y), turn).iter() {
                self.grow(ex, ey);
            }
            (turn * 0.25).tan()
        };
        if let Some(last) = self.verts.last_mut() {
            last.bulge = bulge;
        }
        self.verts.push(LwPolylineVertex {
            x,
            y,
            ..Default::default()
        });
        self.grow(x, y);
        self.cur = Some((x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn reload(drawing: &Drawing) -> Drawing {
        let mut buf = Vec::new();
        drawing.save(&mut buf).unwrap();
        Drawing::load(&mut buf.as_slice()).unwrap()
    }

    #[test]
    fn open_path_round_trips() {
        let mut pen = DxfPen::new();
        pen.move_to(0.0, 0.0);
        pen.arc_to(10.0, 0.0, 0.0);
        pen.arc_to(10.0, 5.0, 0.0);
        let drawing = reload(&pen.finish());
        let polylines: Vec<&LwPolyline> = drawing
            .entities()
            .filter_map(|e| match &e.specific {
                EntityType::LwPolyline(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(polylines.len(), 1);
        assert_eq!(polylines[0].vertices.len(), 3);
        assert!(!polylines[0].is_closed());
    }

    #[test]
    fn closing_point_collapses_into_closed_polyline() {
        let mut pen = DxfPen::new();
        pen.move_to(0.0, 0.0);
        pen.arc_to(4.0, 0.0, 0.0);
        pen.arc_to(4.0, 4.0, 0.0);
        pen.arc_to(0.0, 0.0, 0.0);
        let drawing = reload(&pen.finish());
        let polylines: Vec<&LwPolyline> = drawing
            .entities()
            .filter_map(|e| match &e.specific {
                EntityType::LwPolyline(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(polylines.len(), 1);
        assert!(polylines[0].is_closed());
        assert_eq!(polylines[0].vertices.len(), 3);
    }

    #[test]
    fn arc_turn_becomes_bulge() {
        let mut pen = DxfPen::new();
        pen.move_to(1.0, 0.0);
        pen.arc_to(0.0, 1.0, FRAC_PI_2);
        let drawing = reload(&pen.finish());
        let lwp = drawing
            .entities()
            .find_map(|e| match &e.specific {
                EntityType::LwPolyline(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        let expect = (FRAC_PI_2 * 0.25).tan();
        assert!((lwp.vertices[0].bulge - expect).abs() < 1e-9);
        assert_eq!(lwp.vertices[1].bulge, 0.0);
    }

    #[test]
    fn extents_track_arc_bulges() {
        // Half circle over the top: EXTMAX.y is the apex, and EXTMIN.y is a
        // real minimum, not a copy of EXTMIN.x.
        let mut pen = DxfPen::new();
        pen.move_to(1.0, 0.5);
        pen.arc_to(-1.0, 0.5, std::f64::consts::PI);
        let drawing = pen.finish();
        let min = &drawing.header.minimum_drawing_extents;
        let max = &drawing.header.maximum_drawing_extents;
        assert!((min.x + 1.0).abs() < 1e-9);
        assert!((min.y - 0.5).abs() < 1e-9);
        assert!((max.y - 1.5).abs() < 1e-9);
        assert_ne!(min.y, min.x);
    }

    #[test]
    fn separate_subpaths_become_separate_polylines() {
        let mut pen = DxfPen::new();
        pen.move_to(0.0, 0.0);
        pen.arc_to(1.0, 0.0, 0.0);
        pen.move_to(5.0, 5.0);
        pen.arc_to(6.0, 5.0, 0.0);
        let drawing = reload(&pen.finish());
        let count = drawing
            .entities()
            .filter(|e| matches!(&e.specific, EntityType::LwPolyline(_)))
            .count();
        assert_eq!(count, 2);
    }
}
