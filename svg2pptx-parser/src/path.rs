// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svg2pptx_ir::{PathData, Point, Segment};

/// A path data parsing error.
///
/// Fatal to the offending element only; the caller skips the element
/// and continues.
#[derive(Clone, Debug)]
pub struct PathParseError {
    /// Byte offset into the `d` attribute, when known.
    pub offset: usize,
    /// A human readable message.
    pub message: String,
}

impl std::fmt::Display for PathParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

impl std::error::Error for PathParseError {}

impl From<svgtypes::Error> for PathParseError {
    fn from(e: svgtypes::Error) -> Self {
        let offset = match e {
            svgtypes::Error::UnexpectedData(pos) => pos,
            svgtypes::Error::InvalidNumber(pos) => pos,
            svgtypes::Error::InvalidChar(_, pos) => pos,
            svgtypes::Error::InvalidString(_, pos) => pos,
            _ => 0,
        };

        PathParseError {
            offset,
            message: e.to_string(),
        }
    }
}

/// Parses SVG path data into absolute segments.
///
/// The token grammar is handled by `svgtypes`; this function owns the
/// current-point discipline, relative-to-absolute conversion, smooth
/// control reflection and the quadratic-to-cubic promotion. Arcs are
/// kept symbolic.
///
/// An empty `d` produces an empty path, which is not an error.
pub fn parse_path(text: &str) -> Result<PathData, PathParseError> {
    let mut path = PathData::new();

    // Previous MoveTo coordinates.
    let mut prev_mx = 0.0;
    let mut prev_my = 0.0;

    // Previous SmoothQuadratic control.
    let mut prev_tx = 0.0;
    let mut prev_ty = 0.0;

    // Previous coordinates.
    let mut prev_x = 0.0;
    let mut prev_y = 0.0;

    let mut after_close = false;

    let mut prev_seg = svgtypes::PathSegment::MoveTo {
        abs: true,
        x: 0.0,
        y: 0.0,
    };

    for segment in svgtypes::PathParser::from(text) {
        let segment = segment?;

        match segment {
            svgtypes::PathSegment::MoveTo { abs, mut x, mut y } => {
                if !abs {
                    // A relative `m` after `z` is relative to the closed
                    // subpath's start, not to the last segment end.
                    if after_close {
                        x += prev_mx;
                        y += prev_my;
                    } else {
                        x += prev_x;
                        y += prev_y;
                    }
                }

                prev_x = x;
                prev_y = y;
                prev_mx = x;
                prev_my = y;
                after_close = false;
                prev_seg = segment;
            }
            svgtypes::PathSegment::LineTo { abs, mut x, mut y } => {
                if !abs {
                    x += prev_x;
                    y += prev_y;
                }

                path.segments.push(Segment::Line {
                    start: Point::new(prev_x, prev_y),
                    end: Point::new(x, y),
                });
                prev_x = x;
                prev_y = y;
                after_close = false;
                prev_seg = segment;
            }
            svgtypes::PathSegment::HorizontalLineTo { abs, mut x } => {
                if !abs {
                    x += prev_x;
                }

                path.segments.push(Segment::Line {
                    start: Point::new(prev_x, prev_y),
                    end: Point::new(x, prev_y),
                });
                prev_x = x;
                after_close = false;
                prev_seg = segment;
            }
            svgtypes::PathSegment::VerticalLineTo { abs, mut y } => {
                if !abs {
                    y += prev_y;
                }

                path.segments.push(Segment::Line {
                    start: Point::new(prev_x, prev_y),
                    end: Point::new(prev_x, y),
                });
                prev_y = y;
                after_close = false;
                prev_seg = segment;
            }
            svgtypes::PathSegment::CurveTo {
                abs,
                mut x1,
                mut y1,
                mut x2,
                mut y2,
                mut x,
                mut y,
            } => {
                if !abs {
                    x1 += prev_x;
                    y1 += prev_y;
                    x2 += prev_x;
                    y2 += prev_y;
                    x += prev_x;
                    y += prev_y;
                }

                path.segments.push(Segment::Cubic {
                    start: Point::new(prev_x, prev_y),
                    c1: Point::new(x1, y1),
                    c2: Point::new(x2, y2),
                    end: Point::new(x, y),
                });
                prev_x = x;
                prev_y = y;
                after_close = false;

                // Remember as absolute.
                prev_seg = svgtypes::PathSegment::CurveTo {
                    abs: true,
                    x1,
                    y1,
                    x2,
                    y2,
                    x,
                    y,
                };
            }
            svgtypes::PathSegment::SmoothCurveTo {
                abs,
                mut x2,
                mut y2,
                mut x,
                mut y,
            } => {
                // A smooth curve mirrors the previous cubic's trailing
                // control across the current point; without a preceding
                // cubic the control collapses onto the current point.
                let (x1, y1) = match prev_seg {
                    svgtypes::PathSegment::CurveTo { x2, y2, x, y, .. }
                    | svgtypes::PathSegment::SmoothCurveTo { x2, y2, x, y, .. } => {
                        (x * 2.0 - x2, y * 2.0 - y2)
                    }
                    _ => (prev_x, prev_y),
                };

                if !abs {
                    x2 += prev_x;
                    y2 += prev_y;
                    x += prev_x;
                    y += prev_y;
                }

                path.segments.push(Segment::Cubic {
                    start: Point::new(prev_x, prev_y),
                    c1: Point::new(x1, y1),
                    c2: Point::new(x2, y2),
                    end: Point::new(x, y),
                });
                prev_x = x;
                prev_y = y;
                after_close = false;

                // Remember as absolute.
                prev_seg = svgtypes::PathSegment::SmoothCurveTo {
                    abs: true,
                    x2,
                    y2,
                    x,
                    y,
                };
            }
            svgtypes::PathSegment::Quadratic {
                abs,
                mut x1,
                mut y1,
                mut x,
                mut y,
            } => {
                if !abs {
                    x1 += prev_x;
                    y1 += prev_y;
                    x += prev_x;
                    y += prev_y;
                }

                push_quad(&mut path, prev_x, prev_y, x1, y1, x, y);
                prev_x = x;
                prev_y = y;
                after_close = false;

                // Remember as absolute.
                prev_seg = svgtypes::PathSegment::Quadratic {
                    abs: true,
                    x1,
                    y1,
                    x,
                    y,
                };
            }
            svgtypes::PathSegment::SmoothQuadratic { abs, mut x, mut y } => {
                // Same mirroring rule as `S`, but against the previous
                // quadratic's single control.
                let (x1, y1) = match prev_seg {
                    svgtypes::PathSegment::Quadratic { x1, y1, x, y, .. } => {
                        (x * 2.0 - x1, y * 2.0 - y1)
                    }
                    svgtypes::PathSegment::SmoothQuadratic { x, y, .. } => {
                        (x * 2.0 - prev_tx, y * 2.0 - prev_ty)
                    }
                    _ => (prev_x, prev_y),
                };

                prev_tx = x1;
                prev_ty = y1;

                if !abs {
                    x += prev_x;
                    y += prev_y;
                }

                push_quad(&mut path, prev_x, prev_y, x1, y1, x, y);
                prev_x = x;
                prev_y = y;
                after_close = false;

                // Remember as absolute.
                prev_seg = svgtypes::PathSegment::SmoothQuadratic { abs: true, x, y };
            }
            svgtypes::PathSegment::EllipticalArc {
                abs,
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                mut x,
                mut y,
            } => {
                if !abs {
                    x += prev_x;
                    y += prev_y;
                }

                path.segments.push(Segment::Arc {
                    start: Point::new(prev_x, prev_y),
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    end: Point::new(x, y),
                });
                prev_x = x;
                prev_y = y;
                after_close = false;
                prev_seg = segment;
            }
            svgtypes::PathSegment::ClosePath { .. } => {
                // ClosePath returns the current point to the subpath start.
                path.closed = true;
                prev_x = prev_mx;
                prev_y = prev_my;
                after_close = true;
                prev_seg = segment;
            }
        }
    }

    path.shrink_to_fit();
    Ok(path)
}

/// Promotes a quadratic curve to a cubic one.
fn push_quad(path: &mut PathData, px: f64, py: f64, x1: f64, y1: f64, x: f64, y: f64) {
    #[inline]
    fn calc(n1: f64, n2: f64) -> f64 {
        n1 + 2.0 / 3.0 * (n2 - n1)
    }

    path.segments.push(Segment::Cubic {
        start: Point::new(px, py),
        c1: Point::new(calc(px, x1), calc(py, y1)),
        c2: Point::new(calc(x, x1), calc(y, y1)),
        end: Point::new(x, y),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path() {
        let path = parse_path("").unwrap();
        assert!(path.is_empty());
        assert!(!path.closed);
    }

    #[test]
    fn absolute_lines() {
        let path = parse_path("M 10 10 L 20 10 V 20 H 10 Z").unwrap();
        assert_eq!(path.len(), 3);
        assert!(path.closed);
        assert_eq!(path.segments[0].start(), Point::new(10.0, 10.0));
        assert_eq!(path.segments[2].end(), Point::new(10.0, 20.0));
    }

    #[test]
    fn relative_commands() {
        let path = parse_path("m 10 10 l 10 0 l 0 10").unwrap();
        assert_eq!(path.segments[1].end(), Point::new(20.0, 20.0));
    }

    #[test]
    fn move_after_close_is_relative_to_subpath_start() {
        let path = parse_path("M 10 10 L 20 10 Z m 5 5 l 1 0").unwrap();
        let last = path.segments.last().unwrap();
        assert_eq!(last.start(), Point::new(15.0, 15.0));
    }

    #[test]
    fn implicit_lineto_after_moveto() {
        // Trailing coordinates after `M` continue as `L`.
        let path = parse_path("M 0 0 10 0 10 10").unwrap();
        assert_eq!(path.len(), 2);
        assert!(matches!(path.segments[0], Segment::Line { .. }));
    }

    #[test]
    fn smooth_cubic_reflection() {
        let path = parse_path("M 0 0 C 0 10 10 10 10 0 S 20 -10 20 0").unwrap();
        if let Segment::Cubic { c1, .. } = path.segments[1] {
            // Reflection of (10, 10) about (10, 0).
            assert_eq!(c1, Point::new(10.0, -10.0));
        } else {
            panic!("expected a cubic");
        }
    }

    #[test]
    fn smooth_without_previous_curve() {
        let path = parse_path("M 5 5 S 20 10 20 0").unwrap();
        if let Segment::Cubic { c1, .. } = path.segments[0] {
            assert_eq!(c1, Point::new(5.0, 5.0));
        } else {
            panic!("expected a cubic");
        }
    }

    #[test]
    fn quadratic_promotion() {
        let path = parse_path("M 0 0 Q 15 30 30 0").unwrap();
        if let Segment::Cubic { c1, c2, end, .. } = path.segments[0] {
            assert_eq!(c1, Point::new(10.0, 20.0));
            assert_eq!(c2, Point::new(20.0, 20.0));
            assert_eq!(end, Point::new(30.0, 0.0));
        } else {
            panic!("expected a cubic");
        }
    }

    #[test]
    fn arc_stays_symbolic() {
        let path = parse_path("M 20 50 A 50 30 0 0 1 120 50").unwrap();
        assert_eq!(path.len(), 1);
        assert!(matches!(path.segments[0], Segment::Arc { .. }));
    }

    #[test]
    fn invalid_data_reports_offset() {
        let err = parse_path("M 10 10 L foo").unwrap_err();
        assert!(err.offset > 0);
    }

    #[test]
    fn adversarial_input_does_not_panic() {
        for text in ["M", "M 1", "L 1 1", "M 1 1 C 1", "zzz", "M1-2e", "M 0 0 A 1"] {
            let _ = parse_path(text);
        }
    }
}
