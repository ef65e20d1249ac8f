/*! Tokenize and replay the XPS path mini-language.

The grammar is the SVG-compatible command stream (`M/L/H/V/C/Q/A/Z` plus the
relative lowercase forms and the XPS `F` fill-rule prefix). Quadratic Béziers
and elliptical arcs are normalized to cubics so the emitter only has to deal
with four segment kinds. Unknown commands are dropped together with their
operands; a malformed tail ends the parse without failing it.
*/

use std::f64::consts::{FRAC_PI_2, PI};

/// One replayed drawing operation, in absolute coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    ClosePath,
}

/// Whether every coordinate in the path is a finite number.
pub fn segments_are_finite(segments: &[PathSegment]) -> bool {
    segments.iter().all(|segment| match *segment {
        PathSegment::MoveTo(x, y) | PathSegment::LineTo(x, y) => {
            x.is_finite() && y.is_finite()
        }
        PathSegment::CurveTo(x1, y1, x2, y2, x, y) => {
            [x1, y1, x2, y2, x, y].iter().all(|v| v.is_finite())
        }
        PathSegment::ClosePath => true,
    })
}

/// Parse a path data string into a sequence of absolute segments.
pub fn parse_path_data(data: &str) -> Vec<PathSegment> {
    let mut scanner = Scanner::new(data);
    let mut segments = Vec::new();
    let mut cmd = ' ';
    // Current point and subpath start.
    let (mut cx, mut cy) = (0.0f64, 0.0f64);
    let (mut sx, mut sy) = (0.0f64, 0.0f64);

    while let Some(c) = scanner.next_command(&mut cmd) {
        match c {
            // Fill rule prefix; it has no drawing effect.
            'F' => {
                scanner.next_number();
            }
            'M' | 'm' => {
                let relative = c == 'm';
                if let Some((x, y)) = scanner.next_pair() {
                    let (x, y) = if relative { (cx + x, cy + y) } else { (x, y) };
                    segments.push(PathSegment::MoveTo(x, y));
                    cx = x;
                    cy = y;
                    sx = x;
                    sy = y;

                    // Additional pairs continue the subpath as lines.
                    while let Some((x, y)) = scanner.next_pair() {
                        let (x, y) = if relative { (cx + x, cy + y) } else { (x, y) };
                        segments.push(PathSegment::LineTo(x, y));
                        cx = x;
                        cy = y;
                    }
                }
            }
            'L' | 'l' => {
                let relative = c == 'l';
                while let Some((x, y)) = scanner.next_pair() {
                    let (x, y) = if relative { (cx + x, cy + y) } else { (x, y) };
                    segments.push(PathSegment::LineTo(x, y));
                    cx = x;
                    cy = y;
                }
            }
            'H' | 'h' => {
                let relative = c == 'h';
                while let Some(x) = scanner.next_number() {
                    let x = if relative { cx + x } else { x };
                    segments.push(PathSegment::LineTo(x, cy));
                    cx = x;
                }
            }
            'V' | 'v' => {
                let relative = c == 'v';
                while let Some(y) = scanner.next_number() {
                    let y = if relative { cy + y } else { y };
                    segments.push(PathSegment::LineTo(cx, y));
                    cy = y;
                }
            }
            'C' | 'c' => {
                let relative = c == 'c';
                while let (Some(x1), Some(y1), Some(x2), Some(y2), Some(x), Some(y)) = (
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                ) {
                    let (x1, y1, x2, y2, x, y) = if relative {
                        (cx + x1, cy + y1, cx + x2, cy + y2, cx + x, cy + y)
                    } else {
                        (x1, y1, x2, y2, x, y)
                    };
                    segments.push(PathSegment::CurveTo(x1, y1, x2, y2, x, y));
                    cx = x;
                    cy = y;
                }
            }
            'Q' | 'q' => {
                let relative = c == 'q';
                while let (Some(qx), Some(qy), Some(x), Some(y)) = (
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                ) {
                    let (qx, qy, x, y) = if relative {
                        (cx + qx, cy + qy, cx + x, cy + y)
                    } else {
                        (qx, qy, x, y)
                    };
                    let (x1, y1, x2, y2) = quad_to_cubic(cx, cy, qx, qy, x, y);
                    segments.push(PathSegment::CurveTo(x1, y1, x2, y2, x, y));
                    cx = x;
                    cy = y;
                }
            }
            'A' | 'a' => {
                let relative = c == 'a';
                while let (
                    Some(rx),
                    Some(ry),
                    Some(rotation),
                    Some(large_arc),
                    Some(sweep),
                    Some(x),
                    Some(y),
                ) = (
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_number(),
                    scanner.next_flag(),
                    scanner.next_flag(),
                    scanner.next_number(),
                    scanner.next_number(),
                ) {
                    let (x, y) = if relative { (cx + x, cy + y) } else { (x, y) };
                    arc_to_curves(
                        cx, cy, rx, ry, rotation, large_arc, sweep, x, y,
                        &mut segments,
                    );
                    cx = x;
                    cy = y;
                }
            }
            'Z' | 'z' => {
                segments.push(PathSegment::ClosePath);
                cx = sx;
                cy = sy;
            }
            // Unknown command: drop it along with its operands.
            _ => while scanner.next_number().is_some() {},
        }
    }

    segments
}

/// Lift a quadratic Bézier to its exact cubic control points.
fn quad_to_cubic(x0: f64, y0: f64, qx: f64, qy: f64, x: f64, y: f64) -> (f64, f64, f64, f64) {
    let x1 = x0 + 2.0 / 3.0 * (qx - x0);
    let y1 = y0 + 2.0 / 3.0 * (qy - y0);
    let x2 = x + 2.0 / 3.0 * (qx - x);
    let y2 = y + 2.0 / 3.0 * (qy - y);
    (x1, y1, x2, y2)
}

/// Convert an elliptical arc into a chain of cubic Béziers, following the
/// center parameterization of the SVG implementation notes. Degenerate arcs
/// (coincident endpoints or a zero radius) fall back to a straight line.
#[allow(clippy::too_many_arguments)]
fn arc_to_curves(
    x1: f64,
    y1: f64,
    rx: f64,
    ry: f64,
    rotation: f64,
    large_arc: bool,
    sweep: bool,
    x2: f64,
    y2: f64,
    out: &mut Vec<PathSegment>,
) {
    if (x1 == x2 && y1 == y2) || rx == 0.0 || ry == 0.0 {
        out.push(PathSegment::LineTo(x2, y2));
        return;
    }

    let mut rx = rx.abs();
    let mut ry = ry.abs();
    let phi = rotation.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    // Midpoint of the chord, in the rotated frame.
    let dx = (x1 - x2) / 2.0;
    let dy = (y1 - y2) / 2.0;
    let x1p = cos_phi * dx + sin_phi * dy;
    let y1p = -sin_phi * dx + cos_phi * dy;

    // Grow the radii when they cannot span the endpoints.
    let lambda = x1p * x1p / (rx * rx) + y1p * y1p / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let numerator = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let denominator = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let mut coefficient = if denominator == 0.0 {
        0.0
    } else {
        (numerator / denominator).max(0.0).sqrt()
    };
    if large_arc == sweep {
        coefficient = -coefficient;
    }
    let cxp = coefficient * rx * y1p / ry;
    let cyp = -coefficient * ry * x1p / rx;

    // Rotate the center back into the original frame.
    let cx = cos_phi * cxp - sin_phi * cyp + (x1 + x2) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (y1 + y2) / 2.0;

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let theta1 = vec_angle(1.0, 0.0, ux, uy);
    let mut delta = vec_angle(ux, uy, vx, vy);
    if !sweep && delta > 0.0 {
        delta -= 2.0 * PI;
    } else if sweep && delta < 0.0 {
        delta += 2.0 * PI;
    }

    // Split into segments no wider than a quarter turn.
    let count = (delta.abs() / FRAC_PI_2).ceil().max(1.0);
    let step = delta / count;
    let mut t1 = theta1;
    for _ in 0..count as usize {
        let t2 = t1 + step;
        out.push(unit_arc_segment(cx, cy, rx, ry, sin_phi, cos_phi, t1, t2));
        t1 = t2;
    }
}

/// The signed angle between two vectors, zero when either is degenerate.
fn vec_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    let len = ((ux * ux + uy * uy) * (vx * vx + vy * vy)).sqrt();
    if len == 0.0 {
        return 0.0;
    }
    let cos = ((ux * vx + uy * vy) / len).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if ux * vy - uy * vx < 0.0 {
        -angle
    } else {
        angle
    }
}

/// One ellipse slice `t1..t2` as a cubic, using the standard tangent scaling
/// `4/3 · tan((t2 − t1) / 4)`.
#[allow(clippy::too_many_arguments)]
fn unit_arc_segment(
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    sin_phi: f64,
    cos_phi: f64,
    t1: f64,
    t2: f64,
) -> PathSegment {
    let k = 4.0 / 3.0 * ((t2 - t1) / 4.0).tan();
    let (s1, c1) = t1.sin_cos();
    let (s2, c2) = t2.sin_cos();

    // Map unit-circle points onto the rotated ellipse around the center.
    let map = |x: f64, y: f64| {
        let x = rx * x;
        let y = ry * y;
        (cx + cos_phi * x - sin_phi * y, cy + sin_phi * x + cos_phi * y)
    };

    let (x1, y1) = map(c1 - k * s1, s1 + k * c1);
    let (x2, y2) = map(c2 + k * s2, s2 - k * c2);
    let (x, y) = map(c2, s2);
    PathSegment::CurveTo(x1, y1, x2, y2, x, y)
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { bytes: input.as_bytes(), pos: 0 }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b',') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// The next command letter, or the previous one when operands repeat it.
    /// Bytes that are neither commands nor numbers are dropped, so the parse
    /// always makes progress.
    fn next_command(&mut self, current: &mut char) -> Option<char> {
        loop {
            self.skip_separators();
            let &b = self.bytes.get(self.pos)?;
            if b.is_ascii_alphabetic() {
                self.pos += 1;
                *current = b as char;
                return Some(*current);
            }
            if matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.') {
                return Some(*current);
            }
            self.pos += 1;
        }
    }

    /// Scan a number: optional sign, integer and fractional digits, and an
    /// optional exponent.
    fn next_number(&mut self) -> Option<f64> {
        self.skip_separators();
        let start = self.pos;
        let mut digits = false;

        if matches!(self.bytes.get(self.pos), Some(&(b'+' | b'-'))) {
            self.pos += 1;
        }
        while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
            digits = true;
        }
        if matches!(self.bytes.get(self.pos), Some(&b'.')) {
            self.pos += 1;
            while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
                digits = true;
            }
        }
        if digits && matches!(self.bytes.get(self.pos), Some(&(b'e' | b'E'))) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.bytes.get(self.pos), Some(&(b'+' | b'-'))) {
                self.pos += 1;
            }
            let mut exponent_digits = false;
            while matches!(self.bytes.get(self.pos), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
                exponent_digits = true;
            }
            if !exponent_digits {
                self.pos = mark;
            }
        }

        if !digits {
            self.pos = start;
            return None;
        }

        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
    }

    fn next_pair(&mut self) -> Option<(f64, f64)> {
        let x = self.next_number()?;
        let y = self.next_number()?;
        Some((x, y))
    }

    /// Arc flags may be written without separators, so a lone `0`/`1` digit
    /// is accepted directly.
    fn next_flag(&mut self) -> Option<bool> {
        self.skip_separators();
        match self.bytes.get(self.pos) {
            Some(&b'0') => {
                self.pos += 1;
                Some(false)
            }
            Some(&b'1') => {
                self.pos += 1;
                Some(true)
            }
            _ => self.next_number().map(|v| v.abs() > 0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(segment: &PathSegment) -> (f64, f64) {
        match *segment {
            PathSegment::MoveTo(x, y) | PathSegment::LineTo(x, y) => (x, y),
            PathSegment::CurveTo(.., x, y) => (x, y),
            PathSegment::ClosePath => panic!("close has no endpoint"),
        }
    }

    #[test]
    fn simple_commands_replay_in_order() {
        let segments = parse_path_data("M 10,10 L 110,10 H 110 V 110 Z");
        assert_eq!(
            segments,
            vec![
                PathSegment::MoveTo(10.0, 10.0),
                PathSegment::LineTo(110.0, 10.0),
                PathSegment::LineTo(110.0, 10.0),
                PathSegment::LineTo(110.0, 110.0),
                PathSegment::ClosePath,
            ]
        );
    }

    #[test]
    fn relative_commands_match_absolute() {
        let absolute = parse_path_data("M 1 2 L 4 6 L 10 10");
        let relative = parse_path_data("M 1 2 l 3 4 l 6 4");
        assert_eq!(absolute, relative);
    }

    #[test]
    fn fill_rule_prefix_is_consumed() {
        let segments = parse_path_data("F1 M 0 0 L 1 1");
        assert_eq!(
            segments,
            vec![PathSegment::MoveTo(0.0, 0.0), PathSegment::LineTo(1.0, 1.0)]
        );
    }

    #[test]
    fn operands_repeat_the_command() {
        let segments = parse_path_data("M 0 0 L 1 1 2 2");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2], PathSegment::LineTo(2.0, 2.0));

        // Extra move-to pairs continue the subpath as lines.
        let segments = parse_path_data("M 0 0 5 5 9 9");
        assert_eq!(
            segments,
            vec![
                PathSegment::MoveTo(0.0, 0.0),
                PathSegment::LineTo(5.0, 5.0),
                PathSegment::LineTo(9.0, 9.0),
            ]
        );
    }

    #[test]
    fn unknown_commands_are_dropped_with_their_operands() {
        let segments = parse_path_data("M 0 0 X 5 5 L 1 1");
        assert_eq!(
            segments,
            vec![PathSegment::MoveTo(0.0, 0.0), PathSegment::LineTo(1.0, 1.0)]
        );
    }

    #[test]
    fn close_resets_the_current_point() {
        let segments = parse_path_data("M 10 10 L 20 10 Z l 5 5");
        assert_eq!(*segments.last().unwrap(), PathSegment::LineTo(15.0, 15.0));
    }

    #[test]
    fn scientific_notation_is_accepted() {
        let segments = parse_path_data("M 1e1 -2.5e0 L 1.5e2 0");
        assert_eq!(segments[0], PathSegment::MoveTo(10.0, -2.5));
        assert_eq!(segments[1], PathSegment::LineTo(150.0, 0.0));
    }

    #[test]
    fn quadratic_lifts_to_cubic() {
        let segments = parse_path_data("M 0 0 Q 10 0 10 10");
        match segments[1] {
            PathSegment::CurveTo(x1, y1, x2, y2, x, y) => {
                assert!((x1 - 20.0 / 3.0).abs() < 1e-9);
                assert!(y1.abs() < 1e-9);
                assert!((x2 - 10.0).abs() < 1e-9);
                assert!((y2 - 10.0 / 3.0).abs() < 1e-9);
                assert_eq!((x, y), (10.0, 10.0));
            }
            ref other => panic!("expected a curve, got {other:?}"),
        }
    }

    #[test]
    fn semicircle_needs_at_most_two_curves() {
        let segments = parse_path_data("M 0,0 A 50 50 0 0 1 100 0");
        let curves: Vec<_> = segments
            .iter()
            .filter(|s| matches!(s, PathSegment::CurveTo(..)))
            .collect();
        assert!(!curves.is_empty() && curves.len() <= 2);

        let (x, y) = endpoint(segments.last().unwrap());
        assert!((x - 100.0).abs() < 1e-6 * 50.0);
        assert!(y.abs() < 1e-6 * 50.0);
    }

    #[test]
    fn degenerate_arcs_become_lines() {
        let segments = parse_path_data("M 0 0 A 0 10 0 0 1 5 5");
        assert_eq!(segments[1], PathSegment::LineTo(5.0, 5.0));

        let segments = parse_path_data("M 5 5 A 10 10 0 0 1 5 5");
        assert_eq!(segments[1], PathSegment::LineTo(5.0, 5.0));
    }

    #[test]
    fn undersized_arc_radii_are_scaled_up() {
        // The chord is longer than the diameter, so the radii must grow and
        // the curve still has to land on the endpoint.
        let segments = parse_path_data("M 0 0 A 10 10 0 0 1 100 0");
        let (x, y) = endpoint(segments.last().unwrap());
        assert!((x - 100.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn malformed_tails_do_not_panic() {
        assert!(parse_path_data("").is_empty());
        assert!(parse_path_data("L").is_empty());
        let segments = parse_path_data("M 1 1 L 2");
        assert_eq!(segments, vec![PathSegment::MoveTo(1.0, 1.0)]);
        let segments = parse_path_data("M 1 1 (%) L 2 2");
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn finite_check_flags_bad_coordinates() {
        let good = parse_path_data("M 0 0 L 1 1");
        assert!(segments_are_finite(&good));
        let bad = vec![PathSegment::LineTo(f64::NAN, 0.0)];
        assert!(!segments_are_finite(&bad));
    }
}
