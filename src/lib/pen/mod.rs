//! The unified 2D path sink the whole kernel draws against.
//!
//! A path is a `move_to` followed by `arc_to(x, y, turn)` commands, where
//! `turn` is the signed total rotation of the tangent along the arc from the
//! current point to `(x, y)`. Zero turn is a straight line; positive turn
//! sweeps the +x axis toward +y.

/// Turns smaller than this are semantically straight lines.
pub const LINE_TURN_EPS: f64 = 1e-5;

/// Squared distance below which consecutive path points are duplicates.
pub const DUP_DIST_SQ: f64 = 1e-14;

/// Squared distance below which an arc is too short to carry a turn.
pub const SHORT_ARC_DIST_SQ: f64 = 1e-8;

pub trait Pen {
    fn move_to(&mut self, x: f64, y: f64);

    /// Draws a line or circular arc from the current point to `(x, y)`.
    ///
    /// Every `arc_to` requires a defined current point (a prior `move_to` or
    /// the endpoint of the previous command); calling it without one is a
    /// programmer error and panics.
    fn arc_to(&mut self, x: f64, y: f64, turn: f64);
}

/// A recorded path command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCmd {
    MoveTo(f64, f64),
    ArcTo(f64, f64, f64),
}

/// Buffers a path for later replay.
///
/// Near-duplicate points are cleaned on the way in: a point closer than
/// [`DUP_DIST_SQ`] to the current point is dropped, and arcs shorter than
/// [`SHORT_ARC_DIST_SQ`] have their turn clamped to zero.
#[derive(Debug, Default)]
pub struct RecordPen {
    cmds: Vec<PathCmd>,
    cur: Option<(f64, f64)>,
}

impl RecordPen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cmds(&self) -> &[PathCmd] {
        &self.cmds
    }

    pub fn arc_count(&self) -> usize {
        self.cmds
            .iter()
            .filter(|c| matches!(c, PathCmd::ArcTo(..)))
            .count()
    }

    /// Replays the recording into another pen. With `skip_initial_move` the
    /// leading `move_to` is dropped so the path continues from the sink's
    /// current point.
    pub fn replay(&self, pen: &mut dyn Pen, skip_initial_move: bool) {
        let mut skip = skip_initial_move;
        for cmd in &self.cmds {
            match *cmd {
                PathCmd::MoveTo(x, y) => {
                    if skip {
                        skip = false;
                    } else {
                        pen.move_to(x, y);
                    }
                }
                PathCmd::ArcTo(x, y, turn) => pen.arc_to(x, y, turn),
            }
        }
    }

    /// Axis-aligned bounds of the recorded path, arc bulges included.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        let grow = |x: f64, y: f64, b: &mut Option<(f64, f64, f64, f64)>| match b {
            None => *b = Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => {
                *x0 = x0.min(x);
                *y0 = y0.min(y);
                *x1 = x1.max(x);
                *y1 = y1.max(y);
            }
        };
        let mut cur: Option<(f64, f64)> = None;
        for cmd in &self.cmds {
            match *cmd {
                PathCmd::MoveTo(x, y) => {
                    grow(x, y, &mut bounds);
                    cur = Some((x, y));
                }
                PathCmd::ArcTo(x, y, turn) => {
                    grow(x, y, &mut bounds);
                    if let Some((cx, cy)) = cur {
                        for &(ex, ey) in arc_extremes((cx, cy), (x, y), turn).iter() {
                            grow(ex, ey, &mut bounds);
                        }
                    }
                    cur = Some((x, y));
                }
            }
        }
        bounds
    }
}

impl Pen for RecordPen {
    fn move_to(&mut self, x: f64, y: f64) {
        if let Some((cx, cy)) = self.cur {
            let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
            if d2 < DUP_DIST_SQ {
                return;
            }
        }
        self.cmds.push(PathCmd::MoveTo(x, y));
        self.cur = Some((x, y));
    }

    fn arc_to(&mut self, x: f64, y: f64, turn: f64) {
        let (cx, cy) = self.cur.expect("arc_to with no current point");
        let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
        if d2 < DUP_DIST_SQ {
            return;
        }
        let turn = if d2 < SHORT_ARC_DIST_SQ { 0.0 } else { turn };
        self.cmds.push(PathCmd::ArcTo(x, y, turn));
        self.cur = Some((x, y));
    }
}

/// Points of an arc where the tangent is axis-aligned, i.e. the candidate
/// bounding-box extremes between the endpoints.
pub(crate) fn arc_extremes(from: (f64, f64), to: (f64, f64), turn: f64) -> Vec<(f64, f64)> {
    use std::f64::consts::{PI, TAU};
    if turn.abs() < LINE_TURN_EPS {
        return Vec::new();
    }
    let (cx, cy) = arc_center(from, to, turn);
    let r = ((from.0 - cx) * (from.0 - cx) + (from.1 - cy) * (from.1 - cy)).sqrt();
    let a0 = (from.1 - cy).atan2(from.0 - cx);
    let mut out = Vec::new();
    // Walk the four cardinal directions and keep the ones inside the sweep.
    for k in 0..4 {
        let card = k as f64 * 0.5 * PI;
        let mut rel = (card - a0).rem_euclid(TAU);
        if turn < 0.0 {
            rel -= TAU;
        }
        if rel.abs() <= turn.abs() {
            out.push((cx + r * card.cos(), cy + r * card.sin()));
        }
    }
    out
}

/// Center of the arc with the given endpoints and turn angle.
pub(crate) fn arc_center(from: (f64, f64), to: (f64, f64), turn: f64) -> (f64, f64) {
    let mx = (from.0 + to.0) * 0.5;
    let my = (from.1 + to.1) * 0.5;
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    // Offset from the chord midpoint along the left normal.
    let d = 0.5 / (turn * 0.5).tan();
    (mx - dy * d, my + dx * d)
}

/// An affine transform, row-major `[a c e; b d f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Transform {
    pub fn identity() -> Self {
        Transform {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Appends a rotation. Multiples of 90 degrees snap to exact axis
    /// components so quarter-turn symmetry survives float round-trips.
    pub fn rotate(self, deg: f64) -> Self {
        if deg.rem_euclid(90.0) == 0.0 {
            let quarter = (deg / 90.0).rem_euclid(4.0) as i32;
            let (sin, cos) = match quarter {
                0 => (0.0, 1.0),
                1 => (1.0, 0.0),
                2 => (0.0, -1.0),
                _ => (-1.0, 0.0),
            };
            return self.compose(Transform {
                a: cos,
                b: sin,
                c: -sin,
                d: cos,
                e: 0.0,
                f: 0.0,
            });
        }
        self.rotate_rad(deg.to_radians())
    }

    /// Appends a rotation in radians, without the quarter-turn snap.
    pub fn rotate_rad(self, rad: f64) -> Self {
        let (sin, cos) = rad.sin_cos();
        self.compose(Transform {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        })
    }

    pub fn translate(self, x: f64, y: f64) -> Self {
        self.compose(Transform {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: x,
            f: y,
        })
    }

    /// Appends a uniform scale, optionally mirroring the y axis.
    pub fn scale(self, factor: f64, flip_y: bool) -> Self {
        let dy = if flip_y { -factor } else { factor };
        self.compose(Transform {
            a: factor,
            b: 0.0,
            c: 0.0,
            d: dy,
            e: 0.0,
            f: 0.0,
        })
    }

    /// `self` applied after `other` (`self * other`), so appended operations
    /// act in the local frame established by the ones before them.
    pub fn compose(self, other: Transform) -> Self {
        Transform {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn det(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

/// Applies an affine transform before delegating to another pen.
///
/// A mirroring transform (negative determinant) flips arc orientation, so the
/// turn sign is negated on the way through.
pub struct TransformPen<'a> {
    xf: Transform,
    sink: &'a mut dyn Pen,
}

impl<'a> TransformPen<'a> {
    pub fn new(sink: &'a mut dyn Pen, xf: Transform) -> Self {
        TransformPen { xf, sink }
    }

    /// The composed transform, for building further wrappers off this one.
    pub fn transform(&self) -> Transform {
        self.xf
    }
}

impl Pen for TransformPen<'_> {
    fn move_to(&mut self, x: f64, y: f64) {
        let (x, y) = self.xf.apply(x, y);
        self.sink.move_to(x, y);
    }

    fn arc_to(&mut self, x: f64, y: f64, turn: f64) {
        let (x, y) = self.xf.apply(x, y);
        let turn = if self.xf.det() < 0.0 { -turn } else { turn };
        self.sink.arc_to(x, y, turn);
    }
}
