// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Document normalization passes.
//!
//! Runs before IR construction, in order: shape-to-path conversion,
//! transform flattening, identity removal, viewport normalization.
//! Namespace resolution already happened while building the document.
//! The whole pipeline is idempotent.

use svgtypes::Length;

use svg2pptx_ir::{
    is_finite_positive, nearly_equal, nearly_zero, PathData, Point, Rect, Segment, Transform,
};

use crate::converter::State;
use crate::path::parse_path;
use crate::svgtree::{AId, Document, EId, NodeId};
use crate::units;
use crate::{Diagnostics, Error, Options};

/// The circle-from-cubics approximation constant.
const KAPPA: f64 = 0.5522847498;

pub(crate) fn preprocess(
    doc: &mut Document,
    opt: &Options,
    diag: &mut Diagnostics,
) -> Result<(), Error> {
    let svg = doc.svg_element().ok_or(Error::InvalidSize)?;

    let view_box = resolve_view_box(doc, svg, opt)?;
    let state = State {
        view_box,
        opt: opt.clone(),
    };

    convert_shapes(doc, &state, diag);
    flatten_transforms(doc, svg, diag);
    remove_identities(doc, svg);
    normalize_viewport(doc, svg, view_box);

    Ok(())
}

/// Computes the document viewBox, synthesizing it from `width`/`height`
/// when absent.
fn resolve_view_box(doc: &Document, svg: NodeId, opt: &Options) -> Result<Rect, Error> {
    if let Some(vb) = doc.parse_attribute::<svgtypes::ViewBox>(svg, AId::ViewBox) {
        return Rect::new(vb.x, vb.y, vb.w, vb.h).ok_or(Error::InvalidSize);
    }

    let width = resolve_viewport_length(doc, svg, AId::Width, opt.default_size.0);
    let height = resolve_viewport_length(doc, svg, AId::Height, opt.default_size.1);

    Rect::new(0.0, 0.0, width, height).ok_or(Error::InvalidSize)
}

fn resolve_viewport_length(doc: &Document, svg: NodeId, aid: AId, fallback: f64) -> f64 {
    match doc.parse_attribute::<Length>(svg, aid) {
        Some(len) if len.unit == svgtypes::LengthUnit::Percent => {
            fallback * len.number / 100.0
        }
        Some(len) => len.number,
        None => fallback,
    }
}

// ----------------------------------------------------------------------------
// Shape-to-path conversion.

fn convert_shapes(doc: &mut Document, state: &State, diag: &mut Diagnostics) {
    // Pattern content stays symbolic: the tile classifier matches the
    // original shape vocabulary, not converted paths.
    let nodes: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.tag(n).map(EId::is_shape).unwrap_or(false))
        .filter(|&n| !has_ancestor(doc, n, EId::Pattern))
        .collect();

    for node in nodes {
        let tag = doc.tag(node).unwrap();
        let path = match tag {
            EId::Rect => convert_rect(doc, node, state, diag),
            EId::Circle => convert_circle(doc, node, state, diag),
            EId::Ellipse => convert_ellipse(doc, node, state, diag),
            EId::Line => Some(convert_line(doc, node, state)),
            EId::Polyline => convert_poly(doc, node, false, diag),
            EId::Polygon => convert_poly(doc, node, true, diag),
            _ => None,
        };

        match path {
            Some(path) => {
                // The source geometry is kept around for debugging.
                let source = shape_source_summary(doc, node, tag);
                doc.set_attribute(node, AId::DataSource, source);
                doc.set_attribute(node, AId::D, to_d_string(&path));
                doc.set_tag(node, EId::Path);
                for aid in [
                    AId::X,
                    AId::Y,
                    AId::X1,
                    AId::Y1,
                    AId::X2,
                    AId::Y2,
                    AId::Cx,
                    AId::Cy,
                    AId::R,
                    AId::Rx,
                    AId::Ry,
                    AId::Width,
                    AId::Height,
                    AId::Points,
                ] {
                    doc.remove_attribute(node, aid);
                }
            }
            None => {
                doc.detach(node);
            }
        }
    }
}

fn has_ancestor(doc: &Document, node: NodeId, tag: EId) -> bool {
    let mut current = doc.parent(node);
    while let Some(n) = current {
        if doc.tag(n) == Some(tag) {
            return true;
        }
        current = doc.parent(n);
    }
    false
}

fn shape_source_summary(doc: &Document, node: NodeId, tag: EId) -> String {
    let mut out = tag.to_str().to_string();
    for aid in [
        AId::X,
        AId::Y,
        AId::X1,
        AId::Y1,
        AId::X2,
        AId::Y2,
        AId::Cx,
        AId::Cy,
        AId::R,
        AId::Rx,
        AId::Ry,
        AId::Width,
        AId::Height,
    ] {
        if let Some(value) = doc.attribute(node, aid) {
            out.push_str(&format!(" {}={}", aid, value));
        }
    }
    out
}

fn length_attr(doc: &Document, node: NodeId, aid: AId, state: &State) -> f64 {
    let length = doc
        .parse_attribute::<Length>(node, aid)
        .unwrap_or_else(Length::zero);
    units::convert_user_length(length, doc, node, aid, state)
}

fn convert_rect(
    doc: &Document,
    node: NodeId,
    state: &State,
    diag: &mut Diagnostics,
) -> Option<PathData> {
    let width = length_attr(doc, node, AId::Width, state);
    let height = length_attr(doc, node, AId::Height, state);
    if !is_finite_positive(width) || !is_finite_positive(height) {
        diag.warn(format!(
            "Skipping rect '{}': both sides must be positive lengths.",
            doc.element_id(node)
        ));
        return None;
    }

    let x = length_attr(doc, node, AId::X, state);
    let y = length_attr(doc, node, AId::Y, state);

    // A corner radius never exceeds half the matching side; the cap
    // applies to the resolved user-space value.
    let (rx, ry) = corner_radii(doc, node, state);
    let rx = rx.min(width / 2.0);
    let ry = ry.min(height / 2.0);

    if nearly_zero(rx) {
        return Rect::new(x, y, width, height).map(PathData::from_rect);
    }

    // A rounded rect: straight edges joined by one corner cubic each.
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;

    let mut segments = Vec::with_capacity(8);
    let mut cursor = Point::new(x + rx, y);

    let line_to = |segments: &mut Vec<Segment>, cursor: &mut Point, ex: f64, ey: f64| {
        let end = Point::new(ex, ey);
        if cursor.distance(end) > 1e-9 {
            segments.push(Segment::Line { start: *cursor, end });
            *cursor = end;
        }
    };
    let corner = |segments: &mut Vec<Segment>,
                  cursor: &mut Point,
                  c1: (f64, f64),
                  c2: (f64, f64),
                  end: (f64, f64)| {
        segments.push(Segment::Cubic {
            start: *cursor,
            c1: Point::new(c1.0, c1.1),
            c2: Point::new(c2.0, c2.1),
            end: Point::new(end.0, end.1),
        });
        *cursor = Point::new(end.0, end.1);
    };

    line_to(&mut segments, &mut cursor, x + width - rx, y);
    corner(
        &mut segments,
        &mut cursor,
        (x + width - rx + kx, y),
        (x + width, y + ry - ky),
        (x + width, y + ry),
    );
    line_to(&mut segments, &mut cursor, x + width, y + height - ry);
    corner(
        &mut segments,
        &mut cursor,
        (x + width, y + height - ry + ky),
        (x + width - rx + kx, y + height),
        (x + width - rx, y + height),
    );
    line_to(&mut segments, &mut cursor, x + rx, y + height);
    corner(
        &mut segments,
        &mut cursor,
        (x + rx - kx, y + height),
        (x, y + height - ry + ky),
        (x, y + height - ry),
    );
    line_to(&mut segments, &mut cursor, x, y + ry);
    corner(
        &mut segments,
        &mut cursor,
        (x, y + ry - ky),
        (x + rx - kx, y),
        (x + rx, y),
    );

    Some(PathData {
        segments,
        closed: true,
    })
}

/// Resolves the `rx`/`ry` pair.
///
/// Per the SVG shape rules, a negative radius counts as unspecified,
/// and a single specified axis supplies the other one.
fn corner_radii(doc: &Document, node: NodeId, state: &State) -> (f64, f64) {
    let axis = |aid: AId| -> Option<Length> {
        doc.parse_attribute::<Length>(node, aid)
            .filter(|len| !len.number.is_sign_negative())
    };

    let rx = axis(AId::Rx);
    let ry = axis(AId::Ry);

    let resolve = |own: Option<Length>, borrowed: Option<Length>, aid: AId| -> f64 {
        let length = own.or(borrowed).unwrap_or_else(Length::zero);
        units::convert_user_length(length, doc, node, aid, state)
    };

    (resolve(rx, ry, AId::Rx), resolve(ry, rx, AId::Ry))
}

fn convert_circle(
    doc: &Document,
    node: NodeId,
    state: &State,
    diag: &mut Diagnostics,
) -> Option<PathData> {
    let cx = length_attr(doc, node, AId::Cx, state);
    let cy = length_attr(doc, node, AId::Cy, state);
    let r = length_attr(doc, node, AId::R, state);

    if !is_finite_positive(r) {
        diag.warn(format!(
            "Skipping circle '{}': 'r' must be a positive length.",
            doc.element_id(node)
        ));
        return None;
    }

    Some(ellipse_to_path(cx, cy, r, r))
}

fn convert_ellipse(
    doc: &Document,
    node: NodeId,
    state: &State,
    diag: &mut Diagnostics,
) -> Option<PathData> {
    let cx = length_attr(doc, node, AId::Cx, state);
    let cy = length_attr(doc, node, AId::Cy, state);
    let (rx, ry) = corner_radii(doc, node, state);

    if !is_finite_positive(rx) || !is_finite_positive(ry) {
        diag.warn(format!(
            "Skipping ellipse '{}': both radii must be positive lengths.",
            doc.element_id(node)
        ));
        return None;
    }

    Some(ellipse_to_path(cx, cy, rx, ry))
}

/// Approximates an ellipse with four cubic curves.
fn ellipse_to_path(cx: f64, cy: f64, rx: f64, ry: f64) -> PathData {
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;

    let p = |x: f64, y: f64| Point::new(x, y);
    let east = p(cx + rx, cy);
    let south = p(cx, cy + ry);
    let west = p(cx - rx, cy);
    let north = p(cx, cy - ry);

    PathData {
        segments: vec![
            Segment::Cubic {
                start: east,
                c1: p(cx + rx, cy + ky),
                c2: p(cx + kx, cy + ry),
                end: south,
            },
            Segment::Cubic {
                start: south,
                c1: p(cx - kx, cy + ry),
                c2: p(cx - rx, cy + ky),
                end: west,
            },
            Segment::Cubic {
                start: west,
                c1: p(cx - rx, cy - ky),
                c2: p(cx - kx, cy - ry),
                end: north,
            },
            Segment::Cubic {
                start: north,
                c1: p(cx + kx, cy - ry),
                c2: p(cx + rx, cy - ky),
                end: east,
            },
        ],
        closed: true,
    }
}

fn convert_line(doc: &Document, node: NodeId, state: &State) -> PathData {
    let x1 = length_attr(doc, node, AId::X1, state);
    let y1 = length_attr(doc, node, AId::Y1, state);
    let x2 = length_attr(doc, node, AId::X2, state);
    let y2 = length_attr(doc, node, AId::Y2, state);

    PathData {
        segments: vec![Segment::Line {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        }],
        closed: false,
    }
}

fn convert_poly(
    doc: &Document,
    node: NodeId,
    close: bool,
    diag: &mut Diagnostics,
) -> Option<PathData> {
    let text = match doc.attribute(node, AId::Points) {
        Some(text) => text,
        None => {
            diag.warn(format!(
                "Skipping '{}': the 'points' attribute is missing.",
                doc.element_id(node)
            ));
            return None;
        }
    };

    let points: Vec<(f64, f64)> = svgtypes::PointsParser::from(text).collect();

    // Nothing to draw below two vertices.
    if points.len() < 2 {
        diag.warn(format!(
            "Skipping '{}': a poly shape needs at least two points.",
            doc.element_id(node)
        ));
        return None;
    }

    let mut segments = Vec::with_capacity(points.len() - 1);
    for w in points.windows(2) {
        segments.push(Segment::Line {
            start: Point::new(w[0].0, w[0].1),
            end: Point::new(w[1].0, w[1].1),
        });
    }

    Some(PathData {
        segments,
        closed: close,
    })
}

/// Serializes path data back into a `d` attribute string.
pub(crate) fn to_d_string(path: &PathData) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let mut cursor: Option<Point> = None;

    for seg in &path.segments {
        let start = seg.start();
        let disconnected = match cursor {
            Some(c) => c.distance(start) > svg2pptx_ir::CONNECTION_EPSILON,
            None => true,
        };
        if disconnected {
            let _ = write!(out, "M {} {} ", start.x, start.y);
        }

        match *seg {
            Segment::Line { end, .. } => {
                let _ = write!(out, "L {} {} ", end.x, end.y);
            }
            Segment::Cubic { c1, c2, end, .. } => {
                let _ = write!(
                    out,
                    "C {} {} {} {} {} {} ",
                    c1.x, c1.y, c2.x, c2.y, end.x, end.y
                );
            }
            Segment::Arc {
                rx,
                ry,
                x_axis_rotation,
                large_arc,
                sweep,
                end,
                ..
            } => {
                let _ = write!(
                    out,
                    "A {} {} {} {} {} {} {} ",
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc as u8,
                    sweep as u8,
                    end.x,
                    end.y
                );
            }
        }

        cursor = Some(seg.end());
    }

    if path.closed {
        out.push('Z');
    }

    out.trim_end().to_string()
}

// ----------------------------------------------------------------------------
// Transform flattening.

fn flatten_transforms(doc: &mut Document, svg: NodeId, diag: &mut Diagnostics) {
    flatten_node(doc, svg, diag);
}

fn flatten_node(doc: &mut Document, node: NodeId, diag: &mut Diagnostics) {
    let tag = match doc.tag(node) {
        Some(tag) => tag,
        None => return,
    };

    if tag == EId::G {
        let ts = parse_transform(doc, node);
        if let Some(ts) = ts {
            if !ts.is_default() && ts.is_scale_translate() {
                // Fold the group transform into the children; composite
                // matrices stay on the group to avoid precision loss.
                for child in doc.element_children(node) {
                    let child_ts = parse_transform(doc, child).unwrap_or_default();
                    let mut combined = ts;
                    combined.append(&child_ts);
                    doc.set_attribute(child, AId::Transform, transform_to_string(combined));
                }
                doc.remove_attribute(node, AId::Transform);
            }
        }
    }

    if tag == EId::Path {
        bake_path_transform(doc, node, diag);
    }

    for child in doc.element_children(node) {
        flatten_node(doc, child, diag);
    }
}

fn bake_path_transform(doc: &mut Document, node: NodeId, diag: &mut Diagnostics) {
    let ts = match parse_transform(doc, node) {
        Some(ts) if !ts.is_default() => ts,
        _ => return,
    };

    if !ts.is_scale_translate() {
        return;
    }

    let d = match doc.attribute(node, AId::D) {
        Some(d) => d.to_string(),
        None => return,
    };

    let mut path = match parse_path(&d) {
        Ok(path) => path,
        Err(e) => {
            diag.warn(format!(
                "Path '{}' has invalid path data: {}.",
                doc.element_id(node),
                e
            ));
            return;
        }
    };

    // Rotated arcs cannot be scaled anisotropically while staying symbolic.
    let (sx, sy) = ts.get_scale();
    let has_rotated_arc = path.segments.iter().any(|s| {
        matches!(s, Segment::Arc { x_axis_rotation, .. } if !nearly_zero(*x_axis_rotation))
    });
    if has_rotated_arc && !nearly_equal(sx, sy) {
        return;
    }

    path.transform(ts);
    doc.set_attribute(node, AId::D, to_d_string(&path));
    doc.remove_attribute(node, AId::Transform);
}

fn parse_transform(doc: &Document, node: NodeId) -> Option<Transform> {
    let value = doc.attribute(node, AId::Transform)?;
    let ts = value.parse::<svgtypes::Transform>().ok()?;
    let ts = Transform::from(ts);
    if ts.is_valid() {
        Some(ts)
    } else {
        None
    }
}

fn transform_to_string(ts: Transform) -> String {
    format!(
        "matrix({} {} {} {} {} {})",
        ts.a, ts.b, ts.c, ts.d, ts.e, ts.f
    )
}

// ----------------------------------------------------------------------------
// Identity removal.

fn remove_identities(doc: &mut Document, svg: NodeId) {
    // Identity transforms first, so the wrappers below become removable.
    for node in doc.descendants(svg) {
        if let Some(ts) = parse_transform(doc, node) {
            if ts.is_default() {
                doc.remove_attribute(node, AId::Transform);
            }
        }
    }

    loop {
        let mut changed = false;

        for node in doc.descendants(svg) {
            if doc.tag(node) != Some(EId::G) {
                continue;
            }

            if doc.children(node).is_empty() {
                doc.detach(node);
                changed = true;
                continue;
            }

            // A group that carries nothing is a plain wrapper. Named
            // groups stay: animations may target them.
            let is_wrapper = !doc.has_attribute(node, AId::Transform)
                && !doc.has_attribute(node, AId::Opacity)
                && !doc.has_attribute(node, AId::ClipPath)
                && !doc.has_attribute(node, AId::Filter)
                && !doc.has_attribute(node, AId::Id)
                && !has_presentation_attrs(doc, node);
            if is_wrapper {
                doc.replace_with_children(node);
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
}

fn has_presentation_attrs(doc: &Document, node: NodeId) -> bool {
    [
        AId::Fill,
        AId::FillOpacity,
        AId::Stroke,
        AId::StrokeWidth,
        AId::StrokeOpacity,
        AId::FontFamily,
        AId::FontSize,
        AId::FontWeight,
        AId::FontStyle,
        AId::TextAnchor,
        AId::Direction,
    ]
    .iter()
    .any(|&aid| doc.has_attribute(node, aid))
}

// ----------------------------------------------------------------------------
// Viewport normalization.

fn normalize_viewport(doc: &mut Document, svg: NodeId, view_box: Rect) {
    if !doc.has_attribute(svg, AId::ViewBox) {
        doc.set_attribute(
            svg,
            AId::ViewBox,
            format!(
                "{} {} {} {}",
                view_box.x(),
                view_box.y(),
                view_box.width(),
                view_box.height()
            ),
        );
    }

    let needs_width = match doc.parse_attribute::<Length>(svg, AId::Width) {
        Some(len) => len.unit == svgtypes::LengthUnit::Percent,
        None => true,
    };
    let needs_height = match doc.parse_attribute::<Length>(svg, AId::Height) {
        Some(len) => len.unit == svgtypes::LengthUnit::Percent,
        None => true,
    };

    if needs_width {
        doc.set_attribute(svg, AId::Width, format!("{}", view_box.width()));
    }
    if needs_height {
        doc.set_attribute(svg, AId::Height, format!("{}", view_box.height()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocessed(text: &str) -> (Document, Diagnostics) {
        let mut diag = Diagnostics::default();
        let mut doc = Document::parse(text, &mut diag).unwrap();
        preprocess(&mut doc, &Options::default(), &mut diag).unwrap();
        (doc, diag)
    }

    #[test]
    fn rect_becomes_path() {
        let (doc, _) = preprocessed(
            "<svg viewBox='0 0 100 60'><rect x='10' y='10' width='80' height='40'/></svg>",
        );
        let svg = doc.svg_element().unwrap();
        let node = doc.element_children(svg)[0];
        assert_eq!(doc.tag(node), Some(EId::Path));
        assert!(doc.attribute(node, AId::D).is_some());
        assert!(doc.attribute(node, AId::DataSource).unwrap().starts_with("rect"));
        assert!(!doc.has_attribute(node, AId::Width));
    }

    #[test]
    fn circle_uses_four_cubics() {
        let (doc, _) = preprocessed("<svg viewBox='0 0 100 100'><circle cx='50' cy='50' r='40'/></svg>");
        let svg = doc.svg_element().unwrap();
        let node = doc.element_children(svg)[0];
        let d = doc.attribute(node, AId::D).unwrap();
        assert_eq!(d.matches('C').count(), 4);
        assert!(d.ends_with('Z'));
    }

    #[test]
    fn invalid_rect_is_dropped() {
        let (doc, diag) = preprocessed(
            "<svg viewBox='0 0 100 60'><rect x='10' y='10' width='0' height='40'/></svg>",
        );
        let svg = doc.svg_element().unwrap();
        assert!(doc.element_children(svg).is_empty());
        assert!(!diag.is_empty());
    }

    #[test]
    fn identity_transform_is_removed() {
        let (doc, _) = preprocessed(
            "<svg viewBox='0 0 10 10'><path transform='translate(0 0)' d='M 0 0 L 1 1'/></svg>",
        );
        let svg = doc.svg_element().unwrap();
        let node = doc.element_children(svg)[0];
        assert!(!doc.has_attribute(node, AId::Transform));
    }

    #[test]
    fn translate_is_baked_into_path() {
        let (doc, _) = preprocessed(
            "<svg viewBox='0 0 10 10'><path transform='translate(5 5)' d='M 0 0 L 1 1'/></svg>",
        );
        let svg = doc.svg_element().unwrap();
        let node = doc.element_children(svg)[0];
        assert!(!doc.has_attribute(node, AId::Transform));
        assert!(doc.attribute(node, AId::D).unwrap().starts_with("M 5 5"));
    }

    #[test]
    fn rotation_stays_on_group() {
        let (doc, _) = preprocessed(
            "<svg viewBox='0 0 10 10'><g transform='rotate(45)'><path d='M 0 0 L 1 1'/></g></svg>",
        );
        let svg = doc.svg_element().unwrap();
        let g = doc.element_children(svg)[0];
        assert_eq!(doc.tag(g), Some(EId::G));
        assert!(doc.has_attribute(g, AId::Transform));
    }

    #[test]
    fn wrapper_group_is_unwrapped() {
        let (doc, _) = preprocessed(
            "<svg viewBox='0 0 10 10'><g><path d='M 0 0 L 1 1'/></g></svg>",
        );
        let svg = doc.svg_element().unwrap();
        let node = doc.element_children(svg)[0];
        assert_eq!(doc.tag(node), Some(EId::Path));
    }

    #[test]
    fn viewport_is_synthesized() {
        let (doc, _) = preprocessed("<svg width='200' height='100'><path d='M 0 0 L 1 1'/></svg>");
        let svg = doc.svg_element().unwrap();
        assert_eq!(doc.attribute(svg, AId::ViewBox), Some("0 0 200 100"));
    }

    #[test]
    fn preprocess_is_idempotent() {
        let text = "<svg viewBox='0 0 100 60'><g transform='translate(1 2)'><rect x='1' y='1' width='10' height='10' rx='2'/></g></svg>";
        let mut diag = Diagnostics::default();
        let mut doc = Document::parse(text, &mut diag).unwrap();
        preprocess(&mut doc, &Options::default(), &mut diag).unwrap();

        let svg = doc.svg_element().unwrap();
        let first: Vec<_> = doc
            .descendants(svg)
            .into_iter()
            .map(|n| {
                (
                    doc.tag(n),
                    doc.attribute(n, AId::D).map(|s| s.to_string()),
                )
            })
            .collect();

        preprocess(&mut doc, &Options::default(), &mut diag).unwrap();
        let second: Vec<_> = doc
            .descendants(svg)
            .into_iter()
            .map(|n| {
                (
                    doc.tag(n),
                    doc.attribute(n, AId::D).map(|s| s.to_string()),
                )
            })
            .collect();

        assert_eq!(first, second);
    }
}
