//! One pitch of the straight-sided rack cutter.
//!
//! Rack frame: x runs along the pitch direction (one pitch = 1 unit), y is
//! the offset from the pitch line, positive away from the blank center. The
//! profile is a trapezoid wave: tooth tip flat low, gap flat high, two flanks
//! inclined by the pressure angle in between.

use std::f64::consts::PI;

use crate::pen::Pen;

/// Rack cutter configuration. Percentages are percent of module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RackProps {
    /// Average tooth pairs in contact, 1.0–2.5. Sets the working depth.
    pub contact_ratio: f64,
    /// Pressure angle in degrees.
    pub pressure_angle: f64,
    /// Radial offset of the rack from the nominal pitch line, % of module.
    pub profile_shift: f64,
    /// Tooth/gap balance, 0–100; 50 is symmetric.
    pub balance_percent: f64,
    /// Absolute tooth thickness offset, % of module; used for backlash.
    pub balance_abs_percent: f64,
    /// Extra space behind the gear tip, % of module.
    pub top_clr_percent: f64,
    /// Extra depth below the gear root, % of module.
    pub bot_clr_percent: f64,
}

impl Default for RackProps {
    fn default() -> Self {
        RackProps {
            contact_ratio: 1.5,
            pressure_angle: 20.0,
            profile_shift: 0.0,
            balance_percent: 50.0,
            balance_abs_percent: 0.0,
            top_clr_percent: 15.0,
            bot_clr_percent: 15.0,
        }
    }
}

impl RackProps {
    /// The matching rack for cutting an internal gear: balance mirrored,
    /// clearances swapped between tip and root, backlash sign inverted.
    pub fn internal(&self) -> RackProps {
        RackProps {
            balance_percent: 100.0 - self.balance_percent,
            balance_abs_percent: -self.balance_abs_percent,
            top_clr_percent: self.bot_clr_percent,
            bot_clr_percent: self.top_clr_percent,
            ..*self
        }
    }
}

/// Derived rack dimensions, all in pitch units.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RackDims {
    /// Tooth-height half-amplitude above/below the pitch line.
    pub ah: f64,
    /// Pitch-line y offset from the profile shift.
    pub yc: f64,
    /// Profile extent above the pitch line (gap side, clearance included).
    pub top: f64,
    /// Profile extent below the pitch line (tip side, clearance included).
    pub bot: f64,
    /// Pitch-line crossing of the left flank.
    pub xl: f64,
    /// Pitch-line crossing of the right flank.
    pub xr: f64,
    pub tan_a: f64,
}

pub(crate) fn dims(props: &RackProps) -> RackDims {
    let a = props.pressure_angle.to_radians();
    let (sin_a, cos_a) = a.sin_cos();
    let tan_a = a.tan();
    let ah = props.contact_ratio * sin_a * cos_a;
    let yc = props.profile_shift / (100.0 * PI);
    let freew = 0.5 - ah * tan_a;
    let xc = -(props.balance_percent - 50.0) / 100.0 * freew - 0.25;
    let bkw = props.balance_abs_percent / (200.0 * PI);
    RackDims {
        ah,
        yc,
        top: ah + props.top_clr_percent / (100.0 * PI),
        bot: ah + props.bot_clr_percent / (100.0 * PI),
        xl: xc - 0.25 - bkw,
        xr: xc + 0.25 + bkw,
        tan_a,
    }
}

/// Emits one pitch of the rack outline as four straight `arc_to`s, starting
/// on the gap flat at the top of the left flank. Without the optional
/// initial `move_to` the path continues from wherever the pen sits, which is
/// how consecutive pitches chain.
pub fn rack_path(props: &RackProps, pen: &mut dyn Pen, initial_move: bool) {
    let d = dims(props);
    let v0 = (d.xl - d.top * d.tan_a, d.yc + d.top);
    let v1 = (d.xl + d.bot * d.tan_a, d.yc - d.bot);
    let v2 = (d.xr - d.bot * d.tan_a, d.yc - d.bot);
    let v3 = (d.xr + d.top * d.tan_a, d.yc + d.top);
    let v4 = (v0.0 + 1.0, v0.1);

    if initial_move {
        pen.move_to(v0.0, v0.1);
    }
    // Left flank down, tooth tip, right flank up, gap flat to the next pitch.
    pen.arc_to(v1.0, v1.1, 0.0);
    pen.arc_to(v2.0, v2.1, 0.0);
    pen.arc_to(v3.0, v3.1, 0.0);
    pen.arc_to(v4.0, v4.1, 0.0);
}
