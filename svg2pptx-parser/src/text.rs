// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Text extraction: `text`/`tspan` into `TextFrame` runs.
//!
//! Styling is resolved against the inherited presentation-attribute
//! chain at this point. No font shaping happens here; the frame size
//! is a metric-free estimate good enough for anchoring.

use svgtypes::Length;

use svg2pptx_ir::{Color, Direction, Opacity, Paint, Point, Run, TextAnchor, TextFrame};

use crate::converter::{Cache, State};
use crate::style;
use crate::svgtree::{AId, Document, EId, NodeId};
use crate::units;
use crate::Diagnostics;

/// Average glyph advance as a fraction of the font size.
const GLYPH_ADVANCE_FACTOR: f64 = 0.6;

/// Line height as a fraction of the font size.
const LINE_HEIGHT_FACTOR: f64 = 1.2;

pub(crate) fn convert(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<TextFrame> {
    let x = doc
        .parse_attribute::<Length>(node, AId::X)
        .map(|l| units::convert_user_length(l, doc, node, AId::X, state))
        .unwrap_or(0.0);
    let y = doc
        .parse_attribute::<Length>(node, AId::Y)
        .map(|l| units::convert_user_length(l, doc, node, AId::Y, state))
        .unwrap_or(0.0);

    let anchor = match doc.find_attribute(node, AId::TextAnchor) {
        Some("middle") => TextAnchor::Middle,
        Some("end") => TextAnchor::End,
        _ => TextAnchor::Start,
    };

    let mut runs = Vec::new();
    collect_runs(doc, node, state, cache, diag, &mut runs);

    // Whitespace-only text produces nothing.
    runs.retain(|r: &Run| !r.text.trim().is_empty());
    if runs.is_empty() {
        return None;
    }

    let max_size = runs.iter().map(|r| r.size_pt).fold(0.0, f64::max);
    let width: f64 = runs
        .iter()
        .map(|r| r.text.chars().count() as f64 * r.size_pt * GLYPH_ADVANCE_FACTOR)
        .sum();
    let height = max_size * LINE_HEIGHT_FACTOR;

    // SVG anchors text at the baseline; the frame starts above it.
    Some(TextFrame {
        id: doc.element_id(node).to_string(),
        origin: Point::new(x, y - max_size),
        width,
        height,
        anchor,
        runs,
    })
}

fn collect_runs(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
    runs: &mut Vec<Run>,
) {
    for child in doc.children(node) {
        if let Some(text) = doc.text(child) {
            runs.push(make_run(doc, node, text, state, cache, diag));
        } else if doc.tag(child) == Some(EId::Tspan) {
            collect_runs(doc, child, state, cache, diag, runs);
        }
    }
}

fn make_run(
    doc: &Document,
    styled_node: NodeId,
    text: &str,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Run {
    let font_family = doc
        .find_attribute(styled_node, AId::FontFamily)
        .map(|f| f.split(',').next().unwrap_or(f).trim().trim_matches('\'').trim_matches('"').to_string())
        .unwrap_or_else(|| state.opt.font_family.clone());

    let size_px = units::resolve_font_size(doc, styled_node, state);
    // User units are CSS pixels; points are 72 per inch.
    let size_pt = size_px * 72.0 / state.opt.dpi;

    let bold = matches!(
        doc.find_attribute(styled_node, AId::FontWeight),
        Some("bold") | Some("bolder") | Some("600") | Some("700") | Some("800") | Some("900")
    );
    let italic = matches!(
        doc.find_attribute(styled_node, AId::FontStyle),
        Some("italic") | Some("oblique")
    );

    let (color, alpha) = match style::resolve_fill(doc, styled_node, state, cache, diag) {
        Some(fill) => match fill.paint {
            Paint::Color(c) => (c, fill.opacity),
            // Gradient and pattern text renders with the first stop
            // or tile color; PowerPoint runs take a single color.
            Paint::LinearGradient(ref lg) => {
                (lg.stops.first().map(|s| s.color).unwrap_or_else(Color::black), fill.opacity)
            }
            Paint::RadialGradient(ref rg) => {
                (rg.stops.first().map(|s| s.color).unwrap_or_else(Color::black), fill.opacity)
            }
            Paint::Pattern(ref p) => (p.color, fill.opacity),
        },
        None => (Color::black(), Opacity::new(0.0)),
    };

    let direction = match doc.find_attribute(styled_node, AId::Direction) {
        Some("rtl") => Direction::Rtl,
        _ => Direction::Ltr,
    };

    // Collapse internal whitespace the way renderers do for
    // the default `xml:space`.
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

    Run {
        text: normalized,
        font_family,
        size_pt,
        bold,
        italic,
        color,
        alpha,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svgtree::Document;
    use crate::Options;

    fn convert_text(text: &str) -> Option<TextFrame> {
        let mut diag = Diagnostics::default();
        let doc = Document::parse(text, &mut diag).unwrap();
        let svg = doc.svg_element().unwrap();
        let node = doc
            .descendants(svg)
            .into_iter()
            .find(|&n| doc.tag(n) == Some(EId::Text))?;

        let state = State {
            view_box: svg2pptx_ir::Rect::new(0.0, 0.0, 100.0, 100.0).unwrap(),
            opt: Options::default(),
        };
        let mut cache = Cache::default();
        convert(&doc, node, &state, &mut cache, &mut diag)
    }

    #[test]
    fn simple_text() {
        let frame = convert_text(
            "<svg viewBox='0 0 100 100'><text x='10' y='20' font-size='16'>Hi</text></svg>",
        )
        .unwrap();
        assert_eq!(frame.runs.len(), 1);
        assert_eq!(frame.runs[0].text, "Hi");
        assert_eq!(frame.runs[0].size_pt, 12.0);
        assert_eq!(frame.anchor, TextAnchor::Start);
    }

    #[test]
    fn tspan_styling() {
        let frame = convert_text(
            "<svg viewBox='0 0 100 100'><text x='0' y='10' fill='#FF0000'>a<tspan font-weight='bold'>b</tspan></text></svg>",
        )
        .unwrap();
        assert_eq!(frame.runs.len(), 2);
        assert!(!frame.runs[0].bold);
        assert!(frame.runs[1].bold);
        assert_eq!(frame.runs[1].color, Color::new_rgb(0xFF, 0, 0));
    }

    #[test]
    fn whitespace_only_is_dropped() {
        assert!(convert_text("<svg viewBox='0 0 100 100'><text x='0' y='0'>  </text></svg>").is_none());
    }
}
