// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fill and stroke emission.

use svg2pptx_ir::{Color, LineCap, LineJoin, Opacity, Paint, SpreadMethod, Stroke, TileKind};

use super::SlideWriter;
use crate::emf;
use crate::Profile;

/// Per-mille scale used by DrawingML percentage attributes.
const PERMILLE: f64 = 100_000.0;

/// Writes a fill element for the given paint.
pub(super) fn write_fill(w: &mut SlideWriter, paint: &Paint, opacity: Opacity) {
    match paint {
        Paint::Color(color) => write_solid_fill(w, *color, opacity),
        Paint::LinearGradient(ref lg) => {
            w.xml.start_element("a:gradFill");
            w.xml
                .write_attribute("flip", spread_flip(lg.spread_method));
            w.xml.write_attribute("rotWithShape", "1");

            write_stop_list(w, &lg.stops, opacity);

            // The gradient vector collapses to an angle.
            let angle = (lg.y2 - lg.y1).atan2(lg.x2 - lg.x1).to_degrees();
            let angle = (angle.rem_euclid(360.0) * 60_000.0).round() as i64;
            w.xml.start_element("a:lin");
            w.xml.write_attribute("ang", &angle);
            w.xml.write_attribute("scaled", "1");
            w.xml.end_element();

            w.xml.end_element(); // a:gradFill
        }
        Paint::RadialGradient(ref rg) => {
            w.xml.start_element("a:gradFill");
            w.xml
                .write_attribute("flip", spread_flip(rg.spread_method));
            w.xml.write_attribute("rotWithShape", "1");

            // DrawingML radial gradients run outside-in, so the stop
            // order is reversed.
            let mut stops = rg.stops.clone();
            stops.reverse();
            for stop in &mut stops {
                stop.offset = Opacity::new(1.0 - stop.offset.get());
            }
            write_stop_list(w, &stops, opacity);

            w.xml.start_element("a:path");
            w.xml.write_attribute("path", "circle");
            w.xml.start_element("a:fillToRect");
            w.xml.write_attribute("l", "50000");
            w.xml.write_attribute("t", "50000");
            w.xml.write_attribute("r", "50000");
            w.xml.write_attribute("b", "50000");
            w.xml.end_element();
            w.xml.end_element();

            w.xml.end_element(); // a:gradFill
        }
        Paint::Pattern(ref pattern) => {
            if w.opt().profile == Profile::Speed {
                // The speed profile trusts the preset pattern fills.
                write_preset_pattern(w, pattern.tile, pattern.color);
            } else {
                write_tile_blip(w, pattern.tile, pattern.color);
            }
        }
    }
}

fn write_solid_fill(w: &mut SlideWriter, color: Color, opacity: Opacity) {
    w.xml.start_element("a:solidFill");
    write_srgb(w, color, opacity);
    w.xml.end_element();
}

fn write_stop_list(w: &mut SlideWriter, stops: &[svg2pptx_ir::Stop], opacity: Opacity) {
    w.xml.start_element("a:gsLst");
    for stop in stops {
        // Offsets are integer per-mille.
        let pos = (stop.offset.get() * PERMILLE).round() as i64;
        w.xml.start_element("a:gs");
        w.xml.write_attribute("pos", &pos);
        write_srgb(w, stop.color, stop.opacity * opacity);
        w.xml.end_element();
    }
    w.xml.end_element();
}

/// Writes `<a:srgbClr>` with an `<a:alpha>` child when translucent.
pub(super) fn write_srgb(w: &mut SlideWriter, color: Color, opacity: Opacity) {
    w.xml.start_element("a:srgbClr");
    w.xml.write_attribute("val", &color.to_hex());
    if !opacity.is_opaque() {
        let alpha = (opacity.get() * PERMILLE).round() as i64;
        w.xml.start_element("a:alpha");
        w.xml.write_attribute("val", &alpha);
        w.xml.end_element();
    }
    w.xml.end_element();
}

fn spread_flip(spread: SpreadMethod) -> &'static str {
    match spread {
        SpreadMethod::Pad => "none",
        SpreadMethod::Reflect => "xy",
        // True repetition is not expressible; the padded edge is
        // the closest rendering.
        SpreadMethod::Repeat => "none",
    }
}

fn write_preset_pattern(w: &mut SlideWriter, tile: TileKind, color: Color) {
    let preset = match tile {
        TileKind::HorizontalLines => "horz",
        TileKind::VerticalLines => "vert",
        TileKind::DiagonalLines => "dnDiag",
        TileKind::CrossHatch => "diagCross",
        TileKind::Grid | TileKind::Dots => "dotGrid",
        TileKind::Brick => "horzBrick",
        TileKind::Solid(c) => {
            write_solid_fill(w, c, Opacity::ONE);
            return;
        }
    };

    w.xml.start_element("a:pattFill");
    w.xml.write_attribute("prst", preset);
    w.xml.start_element("a:fgClr");
    write_srgb(w, color, Opacity::ONE);
    w.xml.end_element();
    w.xml.start_element("a:bgClr");
    write_srgb(w, Color::white(), Opacity::ONE);
    w.xml.end_element();
    w.xml.end_element();
}

/// Writes a tiled metafile fill from the pattern tile library.
fn write_tile_blip(w: &mut SlideWriter, tile: TileKind, color: Color) {
    if let TileKind::Solid(c) = tile {
        write_solid_fill(w, c, Opacity::ONE);
        return;
    }

    let blob = emf::pattern_tile(tile, color);
    let rid = w.register_media(blob, "emf");

    w.xml.start_element("a:blipFill");
    w.xml.start_element("a:blip");
    w.xml.write_attribute("r:embed", &format!("rId{}", rid));
    w.xml.end_element();
    w.xml.start_element("a:tile");
    w.xml.write_attribute("tx", "0");
    w.xml.write_attribute("ty", "0");
    w.xml.write_attribute("sx", "100000");
    w.xml.write_attribute("sy", "100000");
    w.xml.write_attribute("algn", "tl");
    w.xml.write_attribute("flip", "none");
    w.xml.end_element();
    w.xml.end_element(); // a:blipFill
}

/// Writes an `<a:ln>` stroke element.
pub(super) fn write_stroke(w: &mut SlideWriter, stroke: &Stroke, opacity: Opacity) {
    let width_emu = (stroke.width.get() * w.scale_x()).round().max(1.0) as i64;

    w.xml.start_element("a:ln");
    w.xml.write_attribute("w", &width_emu);
    w.xml.write_attribute(
        "cap",
        match stroke.cap {
            LineCap::Butt => "flat",
            LineCap::Round => "rnd",
            LineCap::Square => "sq",
        },
    );

    let opacity = stroke.opacity * opacity;
    match stroke.paint {
        Paint::Color(color) => write_solid_fill(w, color, opacity),
        // Gradient and pattern strokes degrade to their dominant color.
        ref paint => write_solid_fill(w, paint_color(paint), opacity),
    }

    if let Some(ref dash) = stroke.dash_array {
        write_dash(w, dash, stroke.width.get());
    }

    match stroke.join {
        LineJoin::Round => {
            w.xml.start_element("a:round");
            w.xml.end_element();
        }
        LineJoin::Bevel => {
            w.xml.start_element("a:bevel");
            w.xml.end_element();
        }
        LineJoin::Miter => {
            let lim = (stroke.miter_limit.get() * PERMILLE).round() as i64;
            w.xml.start_element("a:miter");
            w.xml.write_attribute("lim", &lim);
            w.xml.end_element();
        }
    }

    w.xml.end_element(); // a:ln
}

/// Writes `<a:custDash>`; entries are percentages of the line width.
fn write_dash(w: &mut SlideWriter, dash: &[f64], stroke_width: f64) {
    let width = stroke_width.max(1e-6);

    w.xml.start_element("a:custDash");
    for pair in dash.chunks(2) {
        let d = (pair[0] / width * PERMILLE).round().max(1.0) as i64;
        let sp = pair
            .get(1)
            .map(|sp| (sp / width * PERMILLE).round().max(1.0) as i64)
            .unwrap_or(d);

        w.xml.start_element("a:ds");
        w.xml.write_attribute("d", &d);
        w.xml.write_attribute("sp", &sp);
        w.xml.end_element();
    }
    w.xml.end_element();
}

/// The dominant color of a paint, used by the metafile renderer.
pub(super) fn paint_color(paint: &Paint) -> Color {
    match paint {
        Paint::Color(color) => *color,
        Paint::LinearGradient(ref lg) => {
            lg.stops.first().map(|s| s.color).unwrap_or_else(Color::black)
        }
        Paint::RadialGradient(ref rg) => {
            rg.stops.first().map(|s| s.color).unwrap_or_else(Color::black)
        }
        Paint::Pattern(ref pattern) => pattern.color,
    }
}
