// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filter lowering: morphology and diffuse lighting become DrawingML
//! shadow and 3D primitives. Everything else was already routed to the
//! metafile fallback by the policy engine.

use svg2pptx_ir::filter::{Filter, FilterPrimitive, LightSource, MorphologyOperator};
use svg2pptx_ir::{nearly_zero, Color};

use super::SlideWriter;

/// EMUs per filter pixel.
const EMU_PER_PX: f64 = 25_400.0;

/// 60000ths of a degree, the DrawingML angle unit.
const ANGLE_SCALE: f64 = 60_000.0;

pub(super) fn write_effects(w: &mut SlideWriter, filter: &Filter) {
    // Radius-zero morphology is a no-op; skip the whole list when
    // nothing would be written.
    let relevant: Vec<&FilterPrimitive> = filter
        .primitives
        .iter()
        .filter(|p| match p {
            FilterPrimitive::Morphology {
                radius_x, radius_y, ..
            } => !(nearly_zero(*radius_x) && nearly_zero(*radius_y)),
            FilterPrimitive::DiffuseLighting { .. } => true,
            FilterPrimitive::Unsupported(_) => false,
        })
        .collect();

    if relevant.is_empty() {
        return;
    }

    w.xml.start_element("a:effectLst");
    for primitive in relevant {
        match *primitive {
            FilterPrimitive::Morphology {
                operator,
                radius_x,
                radius_y,
            } => write_morphology(w, operator, radius_x, radius_y),
            FilterPrimitive::DiffuseLighting {
                surface_scale,
                diffuse_constant,
                color,
                light,
            } => write_diffuse_lighting(w, surface_scale, diffuse_constant, color, light),
            FilterPrimitive::Unsupported(_) => {}
        }
    }
    w.xml.end_element();
}

/// Dilate becomes an outer shadow whose distance equals the radius;
/// erode an inner one. Blur stays zero so the edge remains crisp.
fn write_morphology(
    w: &mut SlideWriter,
    operator: MorphologyOperator,
    radius_x: f64,
    radius_y: f64,
) {
    let rx_emu = radius_x * EMU_PER_PX;
    let ry_emu = radius_y * EMU_PER_PX;
    let asymmetric = (radius_x - radius_y).abs() > 0.001;

    match operator {
        MorphologyOperator::Dilate => {
            // Stroke-expansion equivalent: the shadow reaches one
            // radius outward.
            let (dist, sx) = if asymmetric {
                let tx = rx_emu * 2.0;
                let ty = ry_emu * 2.0;
                ((tx + ty) / 4.0, (tx / ty * 100_000.0).round() as i64)
            } else {
                (rx_emu, 100_000)
            };

            w.xml.start_element("a:outerShdw");
            w.xml.write_attribute("blurRad", "0");
            w.xml.write_attribute("dist", &(dist.round() as i64));
            w.xml.write_attribute("dir", "0");
            w.xml.write_attribute("rotWithShape", "0");
            w.xml.write_attribute("sx", &sx);
            w.xml.write_attribute("sy", "100000");
            w.xml.write_attribute("kx", "0");
            w.xml.write_attribute("ky", "0");
            w.xml.write_attribute("algn", "ctr");
            write_color_with_alpha(w, Color::black(), 100_000);
            w.xml.end_element();
        }
        MorphologyOperator::Erode => {
            w.xml.start_element("a:innerShdw");
            w.xml.write_attribute("blurRad", "0");
            w.xml.write_attribute("dist", &(rx_emu.round() as i64));
            w.xml
                .write_attribute("dir", &((180.0 * ANGLE_SCALE) as i64));
            write_color_with_alpha(w, Color::white(), 100_000);
            w.xml.end_element();
        }
    }
}

fn write_diffuse_lighting(
    w: &mut SlideWriter,
    surface_scale: f64,
    diffuse_constant: f64,
    color: Color,
    light: LightSource,
) {
    // Surface elevation drives the extrusion depth.
    let extrusion = (surface_scale.abs() * EMU_PER_PX).round() as i64;
    let contour = (surface_scale.abs() * 0.5 * EMU_PER_PX).round() as i64;

    let material = if diffuse_constant >= 2.0 {
        "matte"
    } else if diffuse_constant >= 1.0 {
        "softEdge"
    } else {
        "flat"
    };

    w.xml.start_element("a:sp3d");
    w.xml.write_attribute("extrusionH", &extrusion);
    w.xml.write_attribute("contourW", &contour);
    w.xml.write_attribute("prstMaterial", material);
    w.xml.start_element("a:bevelT");
    w.xml.write_attribute("w", "25400");
    w.xml.write_attribute("h", "12700");
    w.xml.end_element();
    w.xml.end_element();

    // Directional bevel from the light's quadrant.
    let bevel_w = (diffuse_constant * 2.0 * EMU_PER_PX).round() as i64;
    let bevel_h = (diffuse_constant * 1.5 * EMU_PER_PX).round() as i64;
    w.xml.start_element(bevel_side(light));
    w.xml.write_attribute("w", &bevel_w);
    w.xml.write_attribute("h", &bevel_h);
    w.xml.end_element();

    let (rig, dir) = light_rig(light);
    w.xml.start_element("a:lightRig");
    w.xml.write_attribute("rig", rig);
    w.xml.write_attribute("dir", dir);
    w.xml.start_element("a:rot");
    w.xml.write_attribute("lat", "0");
    w.xml.write_attribute("lon", "0");
    w.xml.write_attribute("rev", "1200000");
    w.xml.end_element();
    w.xml.end_element();

    // An inner shadow opposite the light gives the shape depth.
    let blur = (surface_scale * 2.0 * EMU_PER_PX).round().max(0.0) as i64;
    let dist = (surface_scale * EMU_PER_PX).round().max(0.0) as i64;
    let dir = match light {
        LightSource::Distant { azimuth, .. } => {
            (((azimuth + 180.0).rem_euclid(360.0)) * ANGLE_SCALE) as i64
        }
        // A bottom-right shadow for positional lights.
        _ => 13_500_000,
    };
    let alpha = ((diffuse_constant * 20_000.0) as i64).min(50_000);

    w.xml.start_element("a:innerShdw");
    w.xml.write_attribute("blurRad", &blur);
    w.xml.write_attribute("dist", &dist);
    w.xml.write_attribute("dir", &dir);
    w.xml.write_attribute("rotWithShape", "1");
    w.xml.write_attribute("algn", "ctr");
    write_color_with_alpha(w, color, alpha);
    w.xml.end_element();
}

fn write_color_with_alpha(w: &mut SlideWriter, color: Color, alpha: i64) {
    w.xml.start_element("a:srgbClr");
    w.xml.write_attribute("val", &color.to_hex());
    w.xml.start_element("a:alpha");
    w.xml.write_attribute("val", &alpha);
    w.xml.end_element();
    w.xml.end_element();
}

/// The bevel side lit by the light source.
fn bevel_side(light: LightSource) -> &'static str {
    match light {
        LightSource::Distant { azimuth, elevation } => {
            if elevation >= 75.0 {
                "a:bevelT"
            } else if elevation <= 15.0 {
                "a:bevelB"
            } else if (45.0..=135.0).contains(&azimuth) {
                "a:bevelR"
            } else if (225.0..=315.0).contains(&azimuth) {
                "a:bevelL"
            } else {
                "a:bevelT"
            }
        }
        _ => "a:bevelT",
    }
}

/// The light rig preset and direction for a light source.
fn light_rig(light: LightSource) -> (&'static str, &'static str) {
    match light {
        LightSource::Distant { azimuth, elevation } => {
            if elevation >= 75.0 {
                ("threePt", "t")
            } else if !(0.0..=360.0).contains(&azimuth) {
                ("threePt", "tl")
            } else if azimuth >= 315.0 || azimuth <= 45.0 {
                ("balanced", "tl")
            } else if azimuth <= 135.0 {
                ("soft", "r")
            } else if azimuth <= 225.0 {
                ("harsh", "b")
            } else {
                ("soft", "l")
            }
        }
        LightSource::Point { .. } => ("contrasting", "tl"),
        LightSource::Spot { .. } => ("harsh", "t"),
    }
}
