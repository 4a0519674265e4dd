// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fill and stroke resolution against the inherited
//! presentation-attribute chain.

use svgtypes::Length;

use svg2pptx_ir::{Color, Fill, LineCap, LineJoin, MiterLimit, Opacity, Paint, Stroke, StrokeWidth};

use crate::converter::{Cache, State};
use crate::paint_server;
use crate::svgtree::{AId, Document, NodeId};
use crate::units;
use crate::Diagnostics;

pub(crate) fn resolve_fill(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Fill> {
    // The SVG default fill is black.
    let value = doc.find_attribute(node, AId::Fill).unwrap_or("black");

    let paint = resolve_paint(doc, node, value, state, cache, diag)?;
    let opacity = doc
        .find_attribute(node, AId::FillOpacity)
        .map(parse_opacity)
        .unwrap_or(Opacity::ONE);

    Some(Fill { paint, opacity })
}

pub(crate) fn resolve_stroke(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Stroke> {
    // The SVG default stroke is none.
    let value = doc.find_attribute(node, AId::Stroke)?;
    let paint = resolve_paint(doc, node, value, state, cache, diag)?;

    // An unusable width falls back to the initial value rather than
    // killing the stroke.
    let width = doc
        .find_attribute(node, AId::StrokeWidth)
        .and_then(|v| v.parse::<Length>().ok())
        .map(|l| units::convert_user_length(l, doc, node, AId::StrokeWidth, state))
        .and_then(StrokeWidth::new)
        .unwrap_or_default();

    let cap = match doc.find_attribute(node, AId::StrokeLinecap) {
        Some("round") => LineCap::Round,
        Some("square") => LineCap::Square,
        _ => LineCap::Butt,
    };

    let join = match doc.find_attribute(node, AId::StrokeLinejoin) {
        Some("round") => LineJoin::Round,
        Some("bevel") => LineJoin::Bevel,
        _ => LineJoin::Miter,
    };

    let miter_limit = doc
        .find_attribute(node, AId::StrokeMiterlimit)
        .and_then(|v| v.parse::<f64>().ok())
        .map(MiterLimit::new)
        .unwrap_or_default();

    let opacity = doc
        .find_attribute(node, AId::StrokeOpacity)
        .map(parse_opacity)
        .unwrap_or(Opacity::ONE);

    let dash_array = resolve_dasharray(doc, node, state);
    let dash_offset = doc
        .find_attribute(node, AId::StrokeDashoffset)
        .and_then(|v| v.parse::<Length>().ok())
        .map(|l| units::convert_user_length(l, doc, node, AId::StrokeDashoffset, state))
        .unwrap_or(0.0);

    Some(Stroke {
        paint,
        width,
        cap,
        join,
        miter_limit,
        dash_array,
        dash_offset,
        opacity,
    })
}

fn resolve_paint(
    doc: &Document,
    node: NodeId,
    value: &str,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Paint> {
    let paint = match svgtypes::Paint::from_str(value) {
        Ok(paint) => paint,
        Err(_) => {
            diag.warn(format!(
                "Element '{}' has an invalid paint value '{}'. Black is used.",
                doc.element_id(node),
                value
            ));
            return Some(Paint::Color(Color::black()));
        }
    };

    match paint {
        svgtypes::Paint::None => None,
        svgtypes::Paint::Inherit => {
            // `find_attribute` already resolved `inherit`; reaching here
            // means the chain had nothing, so fall back to black.
            Some(Paint::Color(Color::black()))
        }
        svgtypes::Paint::CurrentColor => {
            let color = doc
                .find_attribute(node, AId::Color)
                .and_then(|v| v.parse::<svgtypes::Color>().ok())
                .map(|c| Color::new_rgb(c.red, c.green, c.blue))
                .unwrap_or_else(Color::black);
            Some(Paint::Color(color))
        }
        svgtypes::Paint::Color(c) => Some(Paint::Color(Color::new_rgb(c.red, c.green, c.blue))),
        svgtypes::Paint::FuncIRI(iri, fallback) => {
            if let Some(paint) = paint_server::paint_by_id(doc, iri, state, cache, diag) {
                return Some(paint);
            }

            diag.warn(format!(
                "Element '{}' references a missing paint server '{}'.",
                doc.element_id(node),
                iri
            ));

            // A missing reference degrades to the fallback, then to black.
            match fallback {
                Some(svgtypes::PaintFallback::None) => None,
                Some(svgtypes::PaintFallback::CurrentColor) => {
                    let color = doc
                        .find_attribute(node, AId::Color)
                        .and_then(|v| v.parse::<svgtypes::Color>().ok())
                        .map(|c| Color::new_rgb(c.red, c.green, c.blue))
                        .unwrap_or_else(Color::black);
                    Some(Paint::Color(color))
                }
                Some(svgtypes::PaintFallback::Color(c)) => {
                    Some(Paint::Color(Color::new_rgb(c.red, c.green, c.blue)))
                }
                None => Some(Paint::Color(Color::black())),
            }
        }
        // Context paints and anything newer degrade to black.
        _ => Some(Paint::Color(Color::black())),
    }
}

fn resolve_dasharray(doc: &Document, node: NodeId, state: &State) -> Option<Vec<f64>> {
    let value = doc.find_attribute(node, AId::StrokeDasharray)?;
    if value == "none" {
        return None;
    }

    let mut list = Vec::new();
    for length in svgtypes::LengthListParser::from(value) {
        let length = length.ok()?;
        list.push(units::convert_user_length(
            length,
            doc,
            node,
            AId::StrokeDasharray,
            state,
        ));
    }

    if list.is_empty() || list.iter().any(|n| *n < 0.0) {
        return None;
    }

    // An odd list is repeated to yield an even one.
    if list.len() % 2 != 0 {
        let copy = list.clone();
        list.extend_from_slice(&copy);
    }

    if list.iter().sum::<f64>() == 0.0 {
        return None;
    }

    Some(list)
}

/// Parses an opacity value: a number or a percentage.
pub(crate) fn parse_opacity(value: &str) -> Opacity {
    let value = value.trim();
    let n = if let Some(p) = value.strip_suffix('%') {
        p.trim().parse::<f64>().map(|n| n / 100.0)
    } else {
        value.parse::<f64>()
    };

    n.map(Opacity::new).unwrap_or(Opacity::ONE)
}

/// Resolves the `opacity` attribute of the element itself.
pub(crate) fn resolve_element_opacity(doc: &Document, node: NodeId) -> Opacity {
    doc.attribute(node, AId::Opacity)
        .map(parse_opacity)
        .unwrap_or(Opacity::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_forms() {
        assert_eq!(parse_opacity("0.5").get(), 0.5);
        assert_eq!(parse_opacity("50%").get(), 0.5);
        assert_eq!(parse_opacity("2").get(), 1.0);
        assert_eq!(parse_opacity("junk").get(), 1.0);
    }
}
