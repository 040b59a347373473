//! End-to-end profile generation: rack → cutter → envelope → recorded tooth.
//!
//! One tooth is computed once and replayed rotated for the full gear, the
//! same way a dividing head cuts every tooth with the same pass.

use log::debug;

use crate::curve::CutCurve;
use crate::cutter::{CutterError, GearCutter};
use crate::envelope::normalize;
use crate::pen::{Pen, RecordPen, Transform, TransformPen};
use crate::rack::{rack_path, RackProps};

#[derive(Debug, Clone, Copy)]
pub struct GearProps {
    pub n_teeth: u32,
    pub rack: RackProps,
    /// Arc-fit tolerance for working faces, in pitch units.
    pub face_tol: f64,
    /// Arc-fit tolerance for fillets, in pitch units.
    pub fillet_tol: f64,
}

impl Default for GearProps {
    fn default() -> Self {
        GearProps {
            n_teeth: 14,
            rack: RackProps::default(),
            face_tol: 5e-4,
            fillet_tol: 5e-3,
        }
    }
}

/// A generated tooth outline plus the radii that describe the blank.
pub struct ToothProfile {
    n_teeth: u32,
    pitch_radius: f64,
    root_radius: f64,
    tip_radius: f64,
    tooth: RecordPen,
}

/// Runs the kernel for one gear: builds the rack, sweeps it into cut curves,
/// normalizes the lower envelope, and records one tooth's arc path.
pub fn generate(props: &GearProps) -> Result<ToothProfile, CutterError> {
    let mut cutter = GearCutter::new(props.n_teeth, props.face_tol, props.fillet_tol)?;
    let pitch_radius = cutter.pitch_radius();
    let dad = cutter.dad_tooth();
    {
        // Rack frame (x along the pitch line, y radial offset) into the blank
        // frame (x radial, y slide): quarter turn, then out to pitch radius.
        let mut pen = TransformPen::new(
            &mut cutter,
            Transform::identity()
                .translate(pitch_radius, 0.0)
                .rotate(-90.0),
        );
        rack_path(&props.rack, &mut pen, true);
    }
    let segments = cutter.finish()?;
    let envelope = normalize(segments, dad);
    debug!(
        "tooth of {} teeth gear: {} envelope segments",
        props.n_teeth,
        envelope.len()
    );

    let mut root_radius = f64::INFINITY;
    let mut tip_radius = f64::NEG_INFINITY;
    for seg in &envelope {
        for k in 0..=8 {
            let a = seg.start + (seg.end - seg.start) * k as f64 / 8.0;
            let r = seg.r_at(a, dad);
            if r.is_finite() {
                root_radius = root_radius.min(r);
                tip_radius = tip_radius.max(r);
            }
        }
    }

    let mut tooth = RecordPen::new();
    for (i, seg) in envelope.iter().enumerate() {
        let mut pen = TransformPen::new(
            &mut tooth,
            Transform::identity().rotate_rad(seg.rot * dad),
        );
        seg.curve.draw_segment(
            &mut pen,
            (seg.start - seg.rot) * dad,
            (seg.end - seg.rot) * dad,
            i == 0,
        );
    }

    Ok(ToothProfile {
        n_teeth: props.n_teeth,
        pitch_radius,
        root_radius,
        tip_radius,
        tooth,
    })
}

impl ToothProfile {
    pub fn n_teeth(&self) -> u32 {
        self.n_teeth
    }

    /// Pitch radius in pitch units (`n / 2π`).
    pub fn pitch_radius(&self) -> f64 {
        self.pitch_radius
    }

    pub fn root_radius(&self) -> f64 {
        self.root_radius
    }

    pub fn tip_radius(&self) -> f64 {
        self.tip_radius
    }

    /// The recorded single-tooth path.
    pub fn tooth(&self) -> &RecordPen {
        &self.tooth
    }

    /// Draws the full gear outline: the tooth replayed once per tooth, each
    /// copy rotated into place and chained onto the previous one.
    pub fn draw(&self, pen: &mut dyn Pen) {
        for k in 0..self.n_teeth {
            let deg = 360.0 * k as f64 / self.n_teeth as f64;
            let mut tp = TransformPen::new(pen, Transform::identity().rotate(deg));
            self.tooth.replay(&mut tp, k != 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pen::PathCmd;

    fn pinion() -> GearProps {
        GearProps {
            n_teeth: 8,
            ..GearProps::default()
        }
    }

    #[test]
    fn default_pinion_tooth_uses_a_sane_arc_count() {
        let profile = generate(&pinion()).unwrap();
        // Each chosen biarc emits two arcs; a default pinion tooth wants a
        // few dozen of them, not hundreds.
        let arcs = profile.tooth().arc_count();
        assert!(
            arcs >= 8 && arcs <= 80,
            "unexpected arc count for a default pinion tooth: {}",
            arcs
        );
    }

    #[test]
    fn radii_are_ordered_root_pitch_tip() {
        let profile = generate(&pinion()).unwrap();
        assert!(profile.root_radius() > 0.0);
        assert!(profile.root_radius() < profile.pitch_radius());
        assert!(profile.pitch_radius() < profile.tip_radius());
    }

    #[test]
    fn tooth_path_spans_one_tooth_of_arc() {
        let profile = generate(&pinion()).unwrap();
        let cmds = profile.tooth().cmds();
        assert!(matches!(cmds[0], PathCmd::MoveTo(..)));
        // Start and end sit one tooth apart around the axis.
        let first = match cmds[0] {
            PathCmd::MoveTo(x, y) => (x, y),
            _ => unreachable!(),
        };
        let last = match *cmds.last().unwrap() {
            PathCmd::ArcTo(x, y, _) => (x, y),
            _ => panic!("tooth must end in an arc"),
        };
        let a0 = first.1.atan2(first.0);
        let a1 = last.1.atan2(last.0);
        let tooth_angle = 2.0 * std::f64::consts::PI / 8.0;
        assert!(
            ((a1 - a0) - tooth_angle).abs() < 1e-6,
            "tooth spans {} rad, want {}",
            a1 - a0,
            tooth_angle
        );
    }

    #[test]
    fn minimum_pinion_with_profile_shift_generates() {
        // A 6-tooth pinion only works with substantial profile shift.
        let props = GearProps {
            n_teeth: 6,
            rack: RackProps {
                profile_shift: 40.0,
                ..RackProps::default()
            },
            ..GearProps::default()
        };
        let profile = generate(&props).unwrap();
        assert!(profile.root_radius() > 0.0);
        assert!(profile.tip_radius() > profile.root_radius());
        assert!(profile.tooth().arc_count() > 0);
        // Profile shift moves the whole tooth outward.
        let unshifted = generate(&GearProps {
            n_teeth: 6,
            ..GearProps::default()
        })
        .unwrap();
        assert!(profile.root_radius() > unshifted.root_radius());
    }

    #[test]
    fn square_wave_rack_cuts_piecewise_constant_envelope() {
        let props = GearProps {
            n_teeth: 12,
            rack: RackProps {
                pressure_angle: 0.0,
                ..RackProps::default()
            },
            ..GearProps::default()
        };
        let profile = generate(&props).unwrap();
        // Zero working depth: only the clearances separate tip from root.
        let depth = profile.tip_radius() - profile.root_radius();
        let expect = 0.30 / std::f64::consts::PI;
        assert!(
            (depth - expect).abs() < 1e-3,
            "depth {} differs from clearance stack {}",
            depth,
            expect
        );
    }

    #[test]
    fn full_gear_is_n_rotated_teeth_and_closes() {
        let profile = generate(&pinion()).unwrap();
        let mut rec = RecordPen::new();
        profile.draw(&mut rec);
        let moves = rec
            .cmds()
            .iter()
            .filter(|c| matches!(c, PathCmd::MoveTo(..)))
            .count();
        assert_eq!(moves, 1, "teeth must chain into one outline");
        assert_eq!(rec.arc_count() % 8, 0, "every tooth draws the same arcs");
        // The outline returns to its start.
        let first = match rec.cmds()[0] {
            PathCmd::MoveTo(x, y) => (x, y),
            _ => unreachable!(),
        };
        let last = match *rec.cmds().last().unwrap() {
            PathCmd::ArcTo(x, y, _) => (x, y),
            _ => panic!(),
        };
        let d2 = (last.0 - first.0).powi(2) + (last.1 - first.1).powi(2);
        assert!(d2 < 1e-12, "outline must close, gap² = {}", d2);
    }

    #[test]
    fn envelope_covers_the_full_tooth_window() {
        use crate::envelope::normalize;
        let props = pinion();
        let mut cutter =
            GearCutter::new(props.n_teeth, props.face_tol, props.fillet_tol).unwrap();
        let pr = cutter.pitch_radius();
        let dad = cutter.dad_tooth();
        {
            let mut pen = TransformPen::new(
                &mut cutter,
                Transform::identity().translate(pr, 0.0).rotate(-90.0),
            );
            rack_path(&props.rack, &mut pen, true);
        }
        let env = normalize(cutter.finish().unwrap(), dad);
        assert!((env.first().unwrap().start + 0.5).abs() < 1e-6);
        assert!((env.last().unwrap().end - 0.5).abs() < 1e-6);
        for w in env.windows(2) {
            assert!(
                (w[1].start - w[0].end).abs() < 1e-6,
                "envelope gap between {} and {}",
                w[0].end,
                w[1].start
            );
        }
    }
}
