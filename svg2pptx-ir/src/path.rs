// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use kurbo::{ParamCurve, ParamCurveArclen, ParamCurveExtrema};

use crate::geom::{nearly_zero, Point, Rect, Transform};

/// The tolerance used to decide whether two segments are connected.
pub const CONNECTION_EPSILON: f64 = 1e-6;

/// A path segment.
///
/// All coordinates are absolute. Each segment carries its own start point,
/// therefore a segment list is self-describing and subpath boundaries
/// are simply connection discontinuities.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug)]
pub enum Segment {
    Line {
        start: Point,
        end: Point,
    },
    Cubic {
        start: Point,
        c1: Point,
        c2: Point,
        end: Point,
    },
    /// An elliptical arc.
    ///
    /// Kept symbolic until lowering. `Segment::to_cubics` performs
    /// the subtended-angle decomposition.
    Arc {
        start: Point,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        end: Point,
    },
}

impl Segment {
    /// Returns the segment's start point.
    #[inline]
    pub fn start(&self) -> Point {
        match *self {
            Segment::Line { start, .. } => start,
            Segment::Cubic { start, .. } => start,
            Segment::Arc { start, .. } => start,
        }
    }

    /// Returns the segment's end point.
    #[inline]
    pub fn end(&self) -> Point {
        match *self {
            Segment::Line { end, .. } => end,
            Segment::Cubic { end, .. } => end,
            Segment::Arc { end, .. } => end,
        }
    }

    /// Converts an arc segment into a list of cubic segments.
    ///
    /// Follows the SVG 1.1 endpoint-to-center conversion with the standard
    /// radius correction, then splits the sweep into sub-arcs of at most
    /// 90 degrees each. Line and cubic segments are returned as is.
    pub fn to_cubics(&self) -> Vec<Segment> {
        let (start, rx, ry, x_axis_rotation, large_arc, sweep, end) = match *self {
            Segment::Arc {
                start,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                end,
            } => (start, rx, ry, x_axis_rotation, large_arc, sweep, end),
            seg => return vec![seg],
        };

        // Out-of-range parameter handling from the SVG spec, F.6.2.
        if start.distance(end) < CONNECTION_EPSILON {
            return Vec::new();
        }

        let mut rx = rx.abs();
        let mut ry = ry.abs();
        if nearly_zero(rx) || nearly_zero(ry) {
            return vec![Segment::Line { start, end }];
        }

        let phi = x_axis_rotation.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        // F.6.5.1: midpoint in the rotated frame.
        let dx2 = (start.x - end.x) / 2.0;
        let dy2 = (start.y - end.y) / 2.0;
        let x1p = cos_phi * dx2 + sin_phi * dy2;
        let y1p = -sin_phi * dx2 + cos_phi * dy2;

        // F.6.6.2: scale radii up when they cannot span the chord.
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        // F.6.5.2: center in the rotated frame.
        let sign = if large_arc == sweep { -1.0 } else { 1.0 };
        let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
        let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
        let coef = sign * (num / den).max(0.0).sqrt();
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;

        // F.6.5.3: center in the original frame.
        let cx = cos_phi * cxp - sin_phi * cyp + (start.x + end.x) / 2.0;
        let cy = sin_phi * cxp + cos_phi * cyp + (start.y + end.y) / 2.0;

        // F.6.5.5/6: start angle and sweep.
        let theta1 = unit_vector_angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
        let mut delta = unit_vector_angle(
            (x1p - cxp) / rx,
            (y1p - cyp) / ry,
            (-x1p - cxp) / rx,
            (-y1p - cyp) / ry,
        );
        if !sweep && delta > 0.0 {
            delta -= std::f64::consts::TAU;
        }
        if sweep && delta < 0.0 {
            delta += std::f64::consts::TAU;
        }

        // Split into the smallest number of sub-arcs with at most
        // a quarter turn each.
        let n = (delta.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
        let step = delta / n as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();

        let arc_point = |t: f64| -> Point {
            let (sin_t, cos_t) = t.sin_cos();
            Point::new(
                cx + rx * cos_t * cos_phi - ry * sin_t * sin_phi,
                cy + rx * cos_t * sin_phi + ry * sin_t * cos_phi,
            )
        };
        let arc_derivative = |t: f64| -> Point {
            let (sin_t, cos_t) = t.sin_cos();
            Point::new(
                -rx * sin_t * cos_phi - ry * cos_t * sin_phi,
                -rx * sin_t * sin_phi + ry * cos_t * cos_phi,
            )
        };

        let mut curves = Vec::with_capacity(n);
        let mut p0 = start;
        for i in 0..n {
            let t0 = theta1 + step * i as f64;
            let t1 = t0 + step;

            let d0 = arc_derivative(t0);
            let d1 = arc_derivative(t1);
            // The last sub-arc must land exactly on the requested endpoint.
            let p1 = if i + 1 == n { end } else { arc_point(t1) };

            curves.push(Segment::Cubic {
                start: p0,
                c1: Point::new(p0.x + k * d0.x, p0.y + k * d0.y),
                c2: Point::new(p1.x - k * d1.x, p1.y - k * d1.y),
                end: p1,
            });

            p0 = p1;
        }

        curves
    }
}

/// The angle between two vectors, in radians, with orientation.
fn unit_vector_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    let dot = ux * vx + uy * vy;
    let len = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    let mut angle = (dot / len).clamp(-1.0, 1.0).acos();
    if ux * vy - uy * vx < 0.0 {
        angle = -angle;
    }
    angle
}

/// The geometry of one path element: a flat, absolute segment list.
#[derive(Clone, Default, Debug)]
pub struct PathData {
    /// Segments list.
    pub segments: Vec<Segment>,
    /// Whether an implicit line connects the last end back to the
    /// first start. Closure is a path property, not a segment.
    pub closed: bool,
}

impl PathData {
    /// Creates a new, empty path.
    #[inline]
    pub fn new() -> Self {
        PathData::default()
    }

    /// Whether the path carries no geometry.
    ///
    /// An empty path is a valid no-op: degenerate output, like
    /// a radius-zero morphology, produces one.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment count.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Creates a rectangular path.
    pub fn from_rect(rect: Rect) -> Self {
        let p1 = Point::new(rect.x(), rect.y());
        let p2 = Point::new(rect.right(), rect.y());
        let p3 = Point::new(rect.right(), rect.bottom());
        let p4 = Point::new(rect.x(), rect.bottom());

        PathData {
            segments: vec![
                Segment::Line { start: p1, end: p2 },
                Segment::Line { start: p2, end: p3 },
                Segment::Line { start: p3, end: p4 },
                Segment::Line { start: p4, end: p1 },
            ],
            closed: true,
        }
    }

    /// Drops spare capacity; segment storage is sized once after
    /// parsing and never reallocates afterwards.
    pub fn shrink_to_fit(&mut self) {
        self.segments.shrink_to_fit();
    }

    /// Splits the path into subpaths at connection discontinuities.
    pub fn subpaths(&self) -> Vec<&[Segment]> {
        let mut list = Vec::new();
        let mut start = 0;
        for i in 1..self.segments.len() {
            let prev_end = self.segments[i - 1].end();
            let cur_start = self.segments[i].start();
            if prev_end.distance(cur_start) > CONNECTION_EPSILON {
                list.push(&self.segments[start..i]);
                start = i;
            }
        }

        if !self.segments.is_empty() {
            list.push(&self.segments[start..]);
        }

        list
    }

    /// Returns a copy with all arcs lowered into cubic curves.
    pub fn lower_arcs(&self) -> PathData {
        let mut segments = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg {
                Segment::Arc { .. } => segments.extend(seg.to_cubics()),
                seg => segments.push(*seg),
            }
        }

        PathData {
            segments,
            closed: self.closed,
        }
    }

    /// Applies the transform to the path.
    pub fn transform(&mut self, ts: Transform) {
        if ts.is_default() {
            return;
        }

        for seg in &mut self.segments {
            match seg {
                Segment::Line { start, end } => {
                    *start = ts.apply_to(*start);
                    *end = ts.apply_to(*end);
                }
                Segment::Cubic { start, c1, c2, end } => {
                    *start = ts.apply_to(*start);
                    *c1 = ts.apply_to(*c1);
                    *c2 = ts.apply_to(*c2);
                    *end = ts.apply_to(*end);
                }
                // Transforming a symbolic arc is only valid for uniform
                // scale/translate. Callers must lower arcs first otherwise.
                Segment::Arc {
                    start,
                    rx,
                    ry,
                    end,
                    ..
                } => {
                    let (sx, sy) = ts.get_scale();
                    *start = ts.apply_to(*start);
                    *end = ts.apply_to(*end);
                    *rx *= sx;
                    *ry *= sy;
                }
            }
        }
    }

    /// The tight bounding box, with curve extrema accounted for.
    ///
    /// Walks every segment, so callers should hold on to the result.
    pub fn bounding_box(&self) -> Option<Rect> {
        let lowered;
        let segments = if self.segments.iter().any(|s| matches!(s, Segment::Arc { .. })) {
            lowered = self.lower_arcs();
            &lowered.segments
        } else {
            &self.segments
        };

        let first = segments.first()?;
        let mut minx = first.start().x;
        let mut miny = first.start().y;
        let mut maxx = minx;
        let mut maxy = miny;

        let mut add = |p: Point| {
            minx = minx.min(p.x);
            miny = miny.min(p.y);
            maxx = maxx.max(p.x);
            maxy = maxy.max(p.y);
        };

        for seg in segments {
            match *seg {
                Segment::Line { start, end } => {
                    add(start);
                    add(end);
                }
                Segment::Cubic { start, c1, c2, end } => {
                    let curve = kurbo::CubicBez::new(
                        kurbo::Point::new(start.x, start.y),
                        kurbo::Point::new(c1.x, c1.y),
                        kurbo::Point::new(c2.x, c2.y),
                        kurbo::Point::new(end.x, end.y),
                    );
                    let r = curve.bounding_box();
                    add(Point::new(r.x0, r.y0));
                    add(Point::new(r.x1, r.y1));
                }
                Segment::Arc { .. } => unreachable!("arcs were lowered above"),
            }
        }

        // A degenerate path still has a location, but no valid rect.
        Rect::new(minx, miny, maxx - minx, maxy - miny)
    }

    /// The total arc length, used for paced interpolation and motion
    /// sampling. Walks and measures every segment.
    pub fn length(&self) -> f64 {
        let lowered = self.lower_arcs();

        let mut length = 0.0;
        for seg in &lowered.segments {
            match *seg {
                Segment::Line { start, end } => length += start.distance(end),
                Segment::Cubic { start, c1, c2, end } => {
                    let curve = kurbo::CubicBez::new(
                        kurbo::Point::new(start.x, start.y),
                        kurbo::Point::new(c1.x, c1.y),
                        kurbo::Point::new(c2.x, c2.y),
                        kurbo::Point::new(end.x, end.y),
                    );
                    length += curve.arclen(0.5);
                }
                Segment::Arc { .. } => {}
            }
        }

        if self.closed {
            if let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) {
                length += last.end().distance(first.start());
            }
        }

        length
    }

    /// Evaluates the point at the provided normalized position.
    ///
    /// Used by motion-path sampling. Arcs are lowered first.
    pub fn point_at(&self, t: f64) -> Option<Point> {
        let lowered = self.lower_arcs();
        if lowered.is_empty() {
            return None;
        }

        let total = lowered.length();
        if nearly_zero(total) {
            return Some(lowered.segments[0].start());
        }

        let mut target = t.clamp(0.0, 1.0) * total;
        for seg in &lowered.segments {
            let seg_len = match *seg {
                Segment::Line { start, end } => start.distance(end),
                Segment::Cubic { start, c1, c2, end } => kurbo::CubicBez::new(
                    kurbo::Point::new(start.x, start.y),
                    kurbo::Point::new(c1.x, c1.y),
                    kurbo::Point::new(c2.x, c2.y),
                    kurbo::Point::new(end.x, end.y),
                )
                .arclen(0.5),
                Segment::Arc { .. } => 0.0,
            };

            if target <= seg_len || nearly_zero(seg_len) {
                let local = if nearly_zero(seg_len) {
                    0.0
                } else {
                    target / seg_len
                };
                return Some(match *seg {
                    Segment::Line { start, end } => Point::new(
                        start.x + (end.x - start.x) * local,
                        start.y + (end.y - start.y) * local,
                    ),
                    Segment::Cubic { start, c1, c2, end } => {
                        let p = kurbo::CubicBez::new(
                            kurbo::Point::new(start.x, start.y),
                            kurbo::Point::new(c1.x, c1.y),
                            kurbo::Point::new(c2.x, c2.y),
                            kurbo::Point::new(end.x, end.y),
                        )
                        .eval(local);
                        Point::new(p.x, p.y)
                    }
                    Segment::Arc { .. } => unreachable!(),
                });
            }

            target -= seg_len;
        }

        lowered.segments.last().map(|s| s.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_to_cubics_endpoints() {
        let arc = Segment::Arc {
            start: Point::new(20.0, 50.0),
            rx: 50.0,
            ry: 30.0,
            x_axis_rotation: 0.0,
            large_arc: false,
            sweep: true,
            end: Point::new(120.0, 50.0),
        };

        let cubics = arc.to_cubics();
        // A half-turn splits into at least two quarter-turn cubics.
        assert!(cubics.len() >= 2);
        assert_eq!(cubics[0].start(), Point::new(20.0, 50.0));
        assert_eq!(cubics.last().unwrap().end(), Point::new(120.0, 50.0));

        // Segments stay connected.
        for w in cubics.windows(2) {
            assert!(w[0].end().distance(w[1].start()) < CONNECTION_EPSILON);
        }
    }

    #[test]
    fn arc_deviation_is_bounded() {
        let rx = 50.0;
        let ry = 30.0;
        let arc = Segment::Arc {
            start: Point::new(20.0, 50.0),
            rx,
            ry,
            x_axis_rotation: 0.0,
            large_arc: false,
            sweep: true,
            end: Point::new(120.0, 50.0),
        };

        // Sample each cubic densely and check the implicit ellipse
        // equation in the centered frame.
        let cx = 70.0;
        let cy = 50.0;
        for seg in arc.to_cubics() {
            if let Segment::Cubic { start, c1, c2, end } = seg {
                let curve = kurbo::CubicBez::new(
                    kurbo::Point::new(start.x, start.y),
                    kurbo::Point::new(c1.x, c1.y),
                    kurbo::Point::new(c2.x, c2.y),
                    kurbo::Point::new(end.x, end.y),
                );
                for i in 0..=32 {
                    let p = curve.eval(i as f64 / 32.0);
                    let nx = (p.x - cx) / rx;
                    let ny = (p.y - cy) / ry;
                    let deviation = ((nx * nx + ny * ny).sqrt() - 1.0).abs() * rx.max(ry);
                    assert!(deviation <= 1e-3 * rx.max(ry), "deviation {}", deviation);
                }
            }
        }
    }

    #[test]
    fn degenerate_arcs() {
        let p = Point::new(10.0, 10.0);
        let same = Segment::Arc {
            start: p,
            rx: 5.0,
            ry: 5.0,
            x_axis_rotation: 0.0,
            large_arc: false,
            sweep: true,
            end: p,
        };
        assert!(same.to_cubics().is_empty());

        let flat = Segment::Arc {
            start: p,
            rx: 0.0,
            ry: 5.0,
            x_axis_rotation: 0.0,
            large_arc: false,
            sweep: true,
            end: Point::new(20.0, 10.0),
        };
        assert!(matches!(flat.to_cubics()[0], Segment::Line { .. }));
    }

    #[test]
    fn subpath_split() {
        let path = PathData {
            segments: vec![
                Segment::Line {
                    start: Point::new(0.0, 0.0),
                    end: Point::new(10.0, 0.0),
                },
                Segment::Line {
                    start: Point::new(10.0, 0.0),
                    end: Point::new(10.0, 10.0),
                },
                Segment::Line {
                    start: Point::new(50.0, 50.0),
                    end: Point::new(60.0, 50.0),
                },
            ],
            closed: false,
        };

        let subpaths = path.subpaths();
        assert_eq!(subpaths.len(), 2);
        assert_eq!(subpaths[0].len(), 2);
        assert_eq!(subpaths[1].len(), 1);
    }

    #[test]
    fn rect_path_bbox() {
        let rect = Rect::new(10.0, 10.0, 80.0, 40.0).unwrap();
        let path = PathData::from_rect(rect);
        assert!(path.closed);
        assert_eq!(path.bounding_box().unwrap(), rect);
    }
}
