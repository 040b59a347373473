//! Spur gear profile generator: exact rack-envelope tooth shapes as SVG or
//! DXF paths, ready for CNC.
use std::f64::consts::PI;
use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;
use structopt::StructOpt;

use gearpath::pen::Transform;
use gearpath::pen::TransformPen;
use gearpath::svg::SvgPen;
use gearpath::{generate, GearProps, Pen, RackProps, ToothProfile};

#[derive(Debug, StructOpt)]
#[structopt(name = "gearcut", about = "A spur gear profile generator")]
struct Opt {
    /// Gear module in output units (mm for DXF)
    #[structopt(short, long, default_value = "1")]
    module: f64,

    /// Number of gear teeth
    #[structopt(short, long)]
    teeth: u32,

    /// Also generate a meshing pinion with this many teeth
    #[structopt(short, long)]
    pinion_teeth: Option<u32>,

    /// Pressure angle, in degrees
    #[structopt(long, default_value = "20")]
    pressure_angle: f64,

    /// Contact ratio, 1.0-2.5; sets the working depth
    #[structopt(long, default_value = "1.5")]
    contact_ratio: f64,

    /// Profile shift, percent of module
    #[structopt(long, default_value = "0")]
    profile_shift: f64,

    /// Tooth/gap balance, 0-100 (50 = symmetric)
    #[structopt(long, default_value = "50")]
    balance: f64,

    /// Backlash as a tooth thickness offset, percent of module
    #[structopt(long, default_value = "0")]
    backlash: f64,

    /// Tip clearance, percent of module
    #[structopt(long, default_value = "15")]
    top_clearance: f64,

    /// Root clearance, percent of module
    #[structopt(long, default_value = "15")]
    bot_clearance: f64,

    /// Arc fit tolerance on working faces, in module units
    #[structopt(long, default_value = "0.0005")]
    face_tol: f64,

    /// Arc fit tolerance on fillets, in module units
    #[structopt(long, default_value = "0.005")]
    fillet_tol: f64,

    /// Cut the gear as an internal (ring) gear
    #[structopt(long)]
    internal: bool,

    /// Extra center distance when laying out the pair, in modules
    #[structopt(long, default_value = "2")]
    separation: f64,

    /// Output SVG file
    #[structopt(long, parse(from_os_str))]
    svg: Option<PathBuf>,

    /// Output DXF file
    #[structopt(long, parse(from_os_str))]
    dxf: Option<PathBuf>,
}

/// The kernel assumes validated inputs; out-of-range values are pulled back
/// to the recommended ranges here, at the parameter boundary.
fn clamp(name: &str, value: f64, lo: f64, hi: f64) -> f64 {
    if value < lo || value > hi {
        let clamped = value.max(lo).min(hi);
        info!("{} = {} out of range, clamped to {}", name, value, clamped);
        clamped
    } else {
        value
    }
}

fn rack_props(opt: &Opt) -> RackProps {
    RackProps {
        contact_ratio: clamp("contact-ratio", opt.contact_ratio, 1.0, 2.5),
        pressure_angle: clamp("pressure-angle", opt.pressure_angle, 0.0, 40.0),
        profile_shift: opt.profile_shift,
        balance_percent: clamp("balance", opt.balance, 0.0, 100.0),
        balance_abs_percent: opt.backlash,
        top_clr_percent: opt.top_clearance,
        bot_clr_percent: opt.bot_clearance,
    }
}

/// One pitch = π modules, so the kernel's unit scale maps to output units by
/// π·module. The tolerances are quoted in modules and shrink accordingly.
fn profiles(opt: &Opt) -> Result<Vec<(ToothProfile, f64, f64)>> {
    let rack = rack_props(opt);
    let gear_rack = if opt.internal { rack.internal() } else { rack };
    let face_tol = opt.face_tol / PI;
    let fillet_tol = opt.fillet_tol / PI;

    let gear = generate(&GearProps {
        n_teeth: opt.teeth,
        rack: gear_rack,
        face_tol,
        fillet_tol,
    })?;

    let mut out = Vec::new();
    if let Some(pt) = opt.pinion_teeth {
        let pinion = generate(&GearProps {
            n_teeth: pt,
            rack,
            face_tol,
            fillet_tol,
        })?;
        // Lay the pair out on a common x axis, pitch circles separated.
        let center = if opt.internal {
            gear.pitch_radius() - pinion.pitch_radius()
        } else {
            gear.pitch_radius() + pinion.pitch_radius()
        } + opt.separation / PI;
        out.push((pinion, center, 0.5 * 360.0 / pt as f64));
    }
    out.push((gear, 0.0, 0.0));
    Ok(out)
}

fn draw_all(parts: &[(ToothProfile, f64, f64)], pen: &mut dyn Pen) {
    for (profile, cx, rot_deg) in parts {
        let mut tp = TransformPen::new(
            pen,
            Transform::identity().translate(*cx, 0.0).rotate(*rot_deg),
        );
        profile.draw(&mut tp);
    }
}

fn help_text(opt: &Opt, parts: &[(ToothProfile, f64, f64)]) {
    let scale = PI * opt.module;
    for (profile, cx, _) in parts {
        println!(
            "{} teeth: blank OD {:.3}, root dia {:.3}, centered at x = {:.3}",
            profile.n_teeth(),
            2.0 * profile.tip_radius() * scale,
            2.0 * profile.root_radius() * scale,
            cx * scale,
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();
    if opt.svg.is_none() && opt.dxf.is_none() {
        bail!("choose at least one output with --svg or --dxf");
    }

    let parts = profiles(&opt)?;
    help_text(&opt, &parts);
    let scale = PI * opt.module;

    if let Some(path) = &opt.svg {
        let mut svg = SvgPen::new();
        {
            // Screen coordinates run y-down; mirror so the gears read
            // right-side up.
            let mut pen =
                TransformPen::new(&mut svg, Transform::identity().scale(scale, true));
            draw_all(&parts, &mut pen);
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
        svg.finish(&mut file, 0.02 * scale)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if let Some(path) = &opt.dxf {
        let mut dxf = gearpath::dxf_out::DxfPen::new();
        {
            let mut pen =
                TransformPen::new(&mut dxf, Transform::identity().scale(scale, false));
            draw_all(&parts, &mut pen);
        }
        let drawing = dxf.finish();
        let path_str = path
            .to_str()
            .context("dxf path must be valid unicode")?;
        drawing
            .save_file(path_str)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}
