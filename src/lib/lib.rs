//! Exact tooth profiles for involute spur gears.
//!
//! The profile of each tooth is computed as the lower envelope of the curves a
//! straight-sided rack cutter carves into a rotating blank, then rendered as a
//! minimal chain of tangent-continuous circular arcs. Everything downstream of
//! the kernel speaks the [`pen::Pen`] interface: `move_to` plus `arc_to` with a
//! signed tangent sweep, which maps directly onto SVG paths and DXF polylines.
//!
//! Angular quantities inside the kernel are measured in *teeth* (one tooth =
//! 2π/N radians) and lengths in *pitches* (one rack pitch = 1 unit, so one
//! module = 1/π units). Callers scale the output to real units with a
//! [`pen::TransformPen`].

pub mod biarc;
pub mod curve;
pub mod cutter;
pub mod dxf_out;
pub mod envelope;
pub mod gear;
pub mod pen;
pub mod rack;
pub mod search;
pub mod svg;

pub use crate::cutter::{CutSegment, CutterError, GearCutter};
pub use crate::gear::{generate, GearProps, ToothProfile};
pub use crate::pen::{Pen, RecordPen, Transform, TransformPen};
pub use crate::rack::{rack_path, RackProps};
