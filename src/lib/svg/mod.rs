//! SVG path emission.
//!
//! Lines and arcs map directly onto `M`/`L`/`A` path commands; the arc radius
//! comes from the chord length and the turn angle, the sweep and large-arc
//! flags from the turn's sign and magnitude.

use std::f64::consts::PI;
use std::io::{self, Write};

use crate::pen::{arc_extremes, Pen, LINE_TURN_EPS};

#[derive(Debug, Default)]
pub struct SvgPen {
    data: String,
    cur: Option<(f64, f64)>,
    bounds: Option<(f64, f64, f64, f64)>,
}

impl SvgPen {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(&mut self, x: f64, y: f64) {
        self.bounds = Some(match self.bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    pub fn path_data(&self) -> &str {
        &self.data
    }

    /// Writes a complete standalone SVG document around the collected path.
    pub fn finish(&self, w: &mut dyn Write, stroke_width: f64) -> io::Result<()> {
        let (x0, y0, x1, y1) = self.bounds.unwrap_or((0.0, 0.0, 1.0, 1.0));
        let pad = 0.05 * (x1 - x0).max(y1 - y0).max(stroke_width);
        writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            w,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.6} {:.6} {:.6} {:.6}">"#,
            x0 - pad,
            y0 - pad,
            (x1 - x0) + 2.0 * pad,
            (y1 - y0) + 2.0 * pad
        )?;
        writeln!(
            w,
            r#"  <path d="{}" fill="none" stroke="black" stroke-width="{}"/>"#,
            self.data.trim_end(),
            stroke_width
        )?;
        writeln!(w, "</svg>")
    }
}

impl Pen for SvgPen {
    fn move_to(&mut self, x: f64, y: f64) {
        self.data.push_str(&format!("M {:.6} {:.6} ", x, y));
        self.grow(x, y);
        self.cur = Some((x, y));
    }

    fn arc_to(&mut self, x: f64, y: f64, turn: f64) {
        let (cx, cy) = self.cur.expect("arc_to with no current point");
        if turn.abs() < LINE_TURN_EPS {
            self.data.push_str(&format!("L {:.6} {:.6} ", x, y));
        } else {
            let chord = ((x - cx) * (x - cx) + (y - cy) * (y - cy)).sqrt();
            let r = chord / (2.0 * (turn.abs() * 0.5).sin());
            let large_arc = (turn.abs() > PI) as u8;
            let sweep = (turn > 0.0) as u8;
            self.data.push_str(&format!(
                "A {:.6} {:.6} 0 {} {} {:.6} {:.6} ",
                r, r, large_arc, sweep, x, y
            ));
            for &(ex, ey) in arc_extremes((cx, cy), (x, y), turn).iter() {
                self.grow(ex, ey);
            }
        }
        self.grow(x, y);
        self.cur = Some((x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn render(f: impl FnOnce(&mut SvgPen)) -> String {
        let mut pen = SvgPen::new();
        f(&mut pen);
        let mut out = Vec::new();
        pen.finish(&mut out, 0.1).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn document_parses_and_contains_path() {
        let svg = render(|pen| {
            pen.move_to(0.0, 0.0);
            pen.arc_to(10.0, 0.0, 0.0);
            pen.arc_to(10.0, 10.0, 0.0);
        });
        let doc = roxmltree::Document::parse(&svg).unwrap();
        let path = doc
            .descendants()
            .find(|n| n.has_tag_name("path"))
            .expect("path element");
        let d = path.attribute("d").unwrap();
        assert!(d.starts_with("M 0.000000 0.000000"));
        assert_eq!(d.matches('L').count(), 2);
        assert!(doc.root_element().attribute("viewBox").is_some());
    }

    #[test]
    fn quarter_arc_radius_and_flags() {
        let svg = render(|pen| {
            pen.move_to(1.0, 0.0);
            pen.arc_to(0.0, 1.0, FRAC_PI_2);
        });
        let doc = roxmltree::Document::parse(&svg).unwrap();
        let d = doc
            .descendants()
            .find(|n| n.has_tag_name("path"))
            .unwrap()
            .attribute("d")
            .unwrap()
            .to_string();
        // Unit circle quarter: radius 1, small arc, positive sweep.
        let arc = d.split('A').nth(1).unwrap();
        let fields: Vec<&str> = arc.split_whitespace().collect();
        assert_eq!(fields[0], "1.000000");
        assert_eq!(fields[3], "0");
        assert_eq!(fields[4], "1");
    }

    #[test]
    fn negative_turn_clears_sweep_flag() {
        let svg = render(|pen| {
            pen.move_to(0.0, 0.0);
            pen.arc_to(1.0, -1.0, -FRAC_PI_2);
        });
        assert!(svg.contains(" 0 0 0 "));
    }

    #[test]
    fn view_box_covers_arc_bulge() {
        let svg = render(|pen| {
            pen.move_to(1.0, 0.0);
            pen.arc_to(-1.0, 0.0, std::f64::consts::PI);
        });
        let doc = roxmltree::Document::parse(&svg).unwrap();
        let vb = doc.root_element().attribute("viewBox").unwrap().to_string();
        let nums: Vec<f64> = vb
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        // The half-circle reaches y = 1; the viewBox must include it.
        assert!(nums[1] + nums[3] >= 1.0);
    }
}
