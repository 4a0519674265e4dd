// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgtypes::Length;

use svg2pptx_ir::{
    BaseGradient, ClipPath, Color, LinearGradient, Opacity, Paint, Pattern, RadialGradient, Rect,
    SpreadMethod, Stop, TileKind, Transform, Units,
};

use crate::converter::{Cache, State};
use crate::path::parse_path;
use crate::style;
use crate::svgtree::{AId, Document, EId, NodeId};
use crate::units;
use crate::Diagnostics;

/// Maximum `href` indirection depth for gradient templates.
const HREF_CHAIN_LIMIT: usize = 8;

/// Resolves a paint server reference.
///
/// Conversion happens lazily on first use and is cached, so forward
/// references across `defs` resolve naturally.
pub(crate) fn paint_by_id(
    doc: &Document,
    id: &str,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Paint> {
    if let Some(paint) = cache.paint.get(id) {
        return paint.clone();
    }

    let paint = convert_paint(doc, id, state, cache, diag);
    cache.paint.insert(id.to_string(), paint.clone());
    paint
}

fn convert_paint(
    doc: &Document,
    id: &str,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Paint> {
    let node = doc.node_by_element_id(id)?;

    match doc.tag(node)? {
        EId::LinearGradient => convert_linear_gradient(doc, node, state, diag),
        EId::RadialGradient => convert_radial_gradient(doc, node, state, diag),
        EId::Pattern => convert_pattern(doc, node, state, cache, diag),
        _ => None,
    }
}

fn convert_linear_gradient(
    doc: &Document,
    node: NodeId,
    state: &State,
    diag: &mut Diagnostics,
) -> Option<Paint> {
    let units = gradient_units(doc, node, AId::GradientUnits, Units::ObjectBoundingBox);
    let stops = collect_stops(doc, node, diag);

    match stops.len() {
        0 => {
            diag.warn(format!(
                "Gradient '{}' has no stops. Skipped.",
                doc.element_id(node)
            ));
            return None;
        }
        1 => return Some(Paint::Color(stops[0].color)),
        _ => {}
    }

    let percent = |aid: AId, def: f64| -> f64 {
        let length = doc
            .parse_attribute::<Length>(node, aid)
            .unwrap_or_else(|| Length::new(def, svgtypes::LengthUnit::Percent));
        units::convert_length(length, doc, node, aid, units, state)
    };

    Some(Paint::LinearGradient(Rc::new(LinearGradient {
        base: BaseGradient {
            id: doc.element_id(node).to_string(),
            units,
            transform: gradient_transform(doc, node, AId::GradientTransform),
            spread_method: convert_spread_method(doc, node),
            stops,
        },
        x1: percent(AId::X1, 0.0),
        y1: percent(AId::Y1, 0.0),
        x2: percent(AId::X2, 100.0),
        y2: percent(AId::Y2, 0.0),
    })))
}

fn convert_radial_gradient(
    doc: &Document,
    node: NodeId,
    state: &State,
    diag: &mut Diagnostics,
) -> Option<Paint> {
    let units = gradient_units(doc, node, AId::GradientUnits, Units::ObjectBoundingBox);
    let stops = collect_stops(doc, node, diag);

    match stops.len() {
        0 => {
            diag.warn(format!(
                "Gradient '{}' has no stops. Skipped.",
                doc.element_id(node)
            ));
            return None;
        }
        1 => return Some(Paint::Color(stops[0].color)),
        _ => {}
    }

    let percent = |aid: AId, def: f64| -> f64 {
        let length = doc
            .parse_attribute::<Length>(node, aid)
            .unwrap_or_else(|| Length::new(def, svgtypes::LengthUnit::Percent));
        units::convert_length(length, doc, node, aid, units, state)
    };

    let cx = percent(AId::Cx, 50.0);
    let cy = percent(AId::Cy, 50.0);
    let r = percent(AId::R, 50.0);

    if r <= 0.0 {
        // A zero-radius radial gradient paints the last stop color.
        let color = stops.last().map(|s| s.color).unwrap_or_else(Color::black);
        return Some(Paint::Color(color));
    }

    let fx = doc
        .parse_attribute::<Length>(node, AId::Fx)
        .map(|l| units::convert_length(l, doc, node, AId::Fx, units, state))
        .unwrap_or(cx);
    let fy = doc
        .parse_attribute::<Length>(node, AId::Fy)
        .map(|l| units::convert_length(l, doc, node, AId::Fy, units, state))
        .unwrap_or(cy);

    Some(Paint::RadialGradient(Rc::new(RadialGradient {
        base: BaseGradient {
            id: doc.element_id(node).to_string(),
            units,
            transform: gradient_transform(doc, node, AId::GradientTransform),
            spread_method: convert_spread_method(doc, node),
            stops,
        },
        cx,
        cy,
        r,
        fx,
        fy,
    })))
}

fn convert_spread_method(doc: &Document, node: NodeId) -> SpreadMethod {
    match doc.attribute(node, AId::SpreadMethod) {
        Some("reflect") => SpreadMethod::Reflect,
        Some("repeat") => SpreadMethod::Repeat,
        _ => SpreadMethod::Pad,
    }
}

fn gradient_units(doc: &Document, node: NodeId, aid: AId, def: Units) -> Units {
    match doc.attribute(node, aid) {
        Some("userSpaceOnUse") => Units::UserSpaceOnUse,
        Some("objectBoundingBox") => Units::ObjectBoundingBox,
        _ => def,
    }
}

fn gradient_transform(doc: &Document, node: NodeId, aid: AId) -> Transform {
    doc.attribute(node, aid)
        .and_then(|v| v.parse::<svgtypes::Transform>().ok())
        .map(Transform::from)
        .filter(|ts| ts.is_valid())
        .unwrap_or_default()
}

/// Collects gradient stops, following `href` templates when the
/// gradient itself has none.
fn collect_stops(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> Vec<Stop> {
    let mut current = node;
    for _ in 0..HREF_CHAIN_LIMIT {
        let stops = stops_of(doc, current);
        if !stops.is_empty() {
            return stops;
        }

        let href = match doc.attribute(current, AId::Href) {
            Some(href) => href.trim_start_matches('#'),
            None => return Vec::new(),
        };

        match doc.node_by_element_id(href) {
            Some(next) if next != current => current = next,
            _ => {
                diag.warn(format!(
                    "Gradient '{}' references an unresolvable template '{}'.",
                    doc.element_id(node),
                    href
                ));
                return Vec::new();
            }
        }
    }

    diag.warn(format!(
        "Gradient '{}' has a cyclic template chain. Stops dropped.",
        doc.element_id(node)
    ));
    Vec::new()
}

fn stops_of(doc: &Document, node: NodeId) -> Vec<Stop> {
    let mut stops = Vec::new();
    let mut prev_offset = 0.0;

    for child in doc.element_children(node) {
        if doc.tag(child) != Some(EId::Stop) {
            continue;
        }

        let mut offset = doc
            .attribute(child, AId::Offset)
            .and_then(parse_offset)
            .unwrap_or(0.0);

        // Offsets are monotonically non-decreasing.
        offset = offset.max(prev_offset);
        prev_offset = offset;

        let (color, color_opacity) = doc
            .attribute(child, AId::StopColor)
            .and_then(|v| v.parse::<svgtypes::Color>().ok())
            .map(|c| (Color::new_rgb(c.red, c.green, c.blue), Opacity::new_u8(c.alpha)))
            .unwrap_or((Color::black(), Opacity::ONE));

        let opacity = doc
            .attribute(child, AId::StopOpacity)
            .map(style::parse_opacity)
            .unwrap_or(Opacity::ONE);

        stops.push(Stop {
            offset: Opacity::new(offset),
            color,
            opacity: opacity * color_opacity,
        });
    }

    stops
}

fn parse_offset(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(p) = value.strip_suffix('%') {
        p.trim().parse::<f64>().ok().map(|n| n / 100.0)
    } else {
        value.parse::<f64>().ok()
    }
}

// ----------------------------------------------------------------------------
// Patterns.

fn convert_pattern(
    doc: &Document,
    node: NodeId,
    state: &State,
    _cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Paint> {
    let units = gradient_units(doc, node, AId::PatternUnits, Units::ObjectBoundingBox);

    let length = |aid: AId| -> f64 {
        let length = doc
            .parse_attribute::<Length>(node, aid)
            .unwrap_or_else(Length::zero);
        units::convert_length(length, doc, node, aid, units, state)
    };

    let rect = Rect::new(
        length(AId::X),
        length(AId::Y),
        length(AId::Width),
        length(AId::Height),
    );
    let rect = match rect {
        Some(rect) => rect,
        None => {
            diag.warn(format!(
                "Pattern '{}' has an invalid size. Skipped.",
                doc.element_id(node)
            ));
            return None;
        }
    };

    let (tile, color) = detect_tile(doc, node);

    Some(Paint::Pattern(Rc::new(Pattern {
        id: doc.element_id(node).to_string(),
        units,
        transform: gradient_transform(doc, node, AId::PatternTransform),
        rect,
        tile,
        color,
    })))
}

/// Classifies a pattern's content into a tile preset.
///
/// PowerPoint cannot host arbitrary nested content inside a fill, so the
/// pattern children are matched against the supported tile library.
fn detect_tile(doc: &Document, node: NodeId) -> (TileKind, Color) {
    let mut color = Color::black();
    let mut lines = 0usize;
    let mut kind: Option<TileKind> = None;

    for child in doc.element_children(node) {
        let tag = match doc.tag(child) {
            Some(tag) => tag,
            None => continue,
        };

        if let Some(c) = child_color(doc, child) {
            color = c;
        }

        match tag {
            EId::Circle | EId::Ellipse => {
                kind = Some(TileKind::Dots);
            }
            EId::Line => {
                lines += 1;
                let x1 = doc.parse_attribute::<f64>(child, AId::X1).unwrap_or(0.0);
                let y1 = doc.parse_attribute::<f64>(child, AId::Y1).unwrap_or(0.0);
                let x2 = doc.parse_attribute::<f64>(child, AId::X2).unwrap_or(0.0);
                let y2 = doc.parse_attribute::<f64>(child, AId::Y2).unwrap_or(0.0);

                let dx = (x2 - x1).abs();
                let dy = (y2 - y1).abs();
                let oriented = if dx > dy * 3.0 {
                    TileKind::HorizontalLines
                } else if dy > dx * 3.0 {
                    TileKind::VerticalLines
                } else {
                    TileKind::DiagonalLines
                };

                kind = Some(if lines >= 2 { TileKind::CrossHatch } else { oriented });
            }
            EId::Rect => {
                let w = doc.parse_attribute::<f64>(child, AId::Width).unwrap_or(1.0);
                let h = doc.parse_attribute::<f64>(child, AId::Height).unwrap_or(1.0);
                let k = if w > h * 3.0 {
                    TileKind::HorizontalLines
                } else if h > w * 3.0 {
                    TileKind::VerticalLines
                } else {
                    TileKind::Solid(color)
                };
                kind = Some(k);
            }
            EId::Path => {
                let d = doc.attribute(child, AId::D).unwrap_or("");
                if d.contains('L') && d.contains('M') {
                    kind = Some(TileKind::DiagonalLines);
                }
            }
            _ => {}
        }
    }

    (kind.unwrap_or(TileKind::Solid(color)), color)
}

fn child_color(doc: &Document, node: NodeId) -> Option<Color> {
    for aid in [AId::Fill, AId::Stroke] {
        if let Some(value) = doc.attribute(node, aid) {
            if let Ok(c) = value.parse::<svgtypes::Color>() {
                return Some(Color::new_rgb(c.red, c.green, c.blue));
            }
        }
    }
    None
}

// ----------------------------------------------------------------------------
// Clip paths.

/// Converts a `clipPath` element into a clip-table entry.
pub(crate) fn convert_clip_path(
    doc: &Document,
    node: NodeId,
    diag: &mut Diagnostics,
) -> Option<ClipPath> {
    let units = gradient_units(doc, node, AId::ClipPathUnits, Units::UserSpaceOnUse);
    let transform = gradient_transform(doc, node, AId::Transform);

    let mut paths = Vec::new();
    for child in doc.element_children(node) {
        if doc.tag(child) != Some(EId::Path) {
            continue;
        }

        let d = match doc.attribute(child, AId::D) {
            Some(d) => d,
            None => continue,
        };

        match parse_path(d) {
            Ok(path) if !path.is_empty() => paths.push(path),
            Ok(_) => {}
            Err(e) => {
                diag.warn(format!(
                    "Clip path '{}' has invalid path data: {}. Entry skipped.",
                    doc.element_id(node),
                    e
                ));
            }
        }
    }

    if paths.is_empty() {
        diag.warn(format!(
            "Clip path '{}' has no usable geometry.",
            doc.element_id(node)
        ));
        return None;
    }

    Some(ClipPath {
        id: doc.element_id(node).to_string(),
        units,
        transform,
        paths,
    })
}
