// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! PowerPoint timing-tree lowering.
//!
//! Each expressible animation becomes one effect node in the
//! `<p:timing>` tree: opacity maps to fades, transform types to
//! grow/shrink and spin, translation and motion to motion paths,
//! and color animations to color changes.

use std::collections::HashMap;
use std::fmt::Write as _;

use xmlwriter::XmlWriter;

use svg2pptx_ir::animate::{AnimationKind, CalcMode, KeySpline, TransformType};
use svg2pptx_ir::{Color, PathData, Point, Rect};

use super::interpolate::{self, Value};
use super::ResolvedAnimation;
use crate::Diagnostics;

/// What an animation lowers to.
#[derive(Clone, Debug)]
enum Effect {
    FadeIn,
    FadeOut,
    GrowShrink { sx: f64, sy: f64 },
    Spin { degrees: f64 },
    MotionPath { points: Vec<Point> },
    ColorChange { to: Color },
}

/// Returns `true` when the animation maps onto a PowerPoint effect.
///
/// Zero durations and spline-eased multi-segment color or motion
/// timelines exceed what the timing tree expresses; those are baked.
pub(crate) fn is_expressible(resolved: &ResolvedAnimation) -> bool {
    let animation = &resolved.animation;

    if animation.timing.dur <= 0.0 {
        return false;
    }

    let effect = match classify(resolved) {
        Some(effect) => effect,
        None => return false,
    };

    if animation.calc_mode == CalcMode::Spline && animation.values.len() > 2 {
        if matches!(effect, Effect::ColorChange { .. } | Effect::MotionPath { .. }) {
            return false;
        }
    }

    true
}

fn classify(resolved: &ResolvedAnimation) -> Option<Effect> {
    let animation = &resolved.animation;

    match &animation.kind {
        AnimationKind::Attribute(name) if name == "opacity" => {
            let first = first_value(animation)?.as_number()?;
            let last = last_value(animation)?.as_number()?;
            Some(if last >= first {
                Effect::FadeIn
            } else {
                Effect::FadeOut
            })
        }
        AnimationKind::Attribute(name) if name == "fill" || name == "stroke" => {
            match last_value(animation)? {
                Value::Color(to) => Some(Effect::ColorChange { to }),
                _ => None,
            }
        }
        AnimationKind::Transform(TransformType::Scale) => {
            let list = last_value(animation)?.to_list();
            let sx = *list.first()?;
            let sy = list.get(1).copied().unwrap_or(sx);
            Some(Effect::GrowShrink { sx, sy })
        }
        AnimationKind::Transform(TransformType::Rotate) => {
            let first = first_value(animation)?.to_list();
            let last = last_value(animation)?.to_list();
            Some(Effect::Spin {
                degrees: last.first()? - first.first()?,
            })
        }
        AnimationKind::Transform(TransformType::Translate) => {
            let points: Vec<Point> = animation
                .values
                .iter()
                .filter_map(|v| interpolate::parse_value(v))
                .map(|v| {
                    let list = v.to_list();
                    Point::new(
                        list.first().copied().unwrap_or(0.0),
                        list.get(1).copied().unwrap_or(0.0),
                    )
                })
                .collect();

            if points.len() < 2 {
                return None;
            }
            Some(Effect::MotionPath { points })
        }
        AnimationKind::Motion { path } => {
            let points = motion_points(path);
            if points.len() < 2 {
                return None;
            }
            Some(Effect::MotionPath { points })
        }
        _ => None,
    }
}

fn first_value(animation: &svg2pptx_ir::animate::Animation) -> Option<Value> {
    interpolate::parse_value(animation.values.first()?)
}

fn last_value(animation: &svg2pptx_ir::animate::Animation) -> Option<Value> {
    interpolate::parse_value(animation.values.last()?)
}

/// Samples a motion path into polyline points.
fn motion_points(path: &PathData) -> Vec<Point> {
    const SAMPLES: usize = 16;

    if path.is_empty() {
        return Vec::new();
    }

    (0..=SAMPLES)
        .filter_map(|i| path.point_at(i as f64 / SAMPLES as f64))
        .collect()
}

/// Writes the `<p:timing>` tree binding effects to their shapes.
pub(crate) fn write_timing(
    xml: &mut XmlWriter,
    effects: &[ResolvedAnimation],
    shape_ids: &HashMap<String, u32>,
    view_box: Rect,
    diag: &mut Diagnostics,
) {
    let mut nodes: Vec<(&ResolvedAnimation, Effect, u32)> = Vec::new();
    for resolved in effects {
        let spid = match shape_ids.get(&resolved.animation.target_id) {
            Some(spid) => *spid,
            None => {
                diag.warn(format!(
                    "Animation '{}' targets '{}', which produced no shape. Dropped.",
                    resolved.animation.id, resolved.animation.target_id
                ));
                continue;
            }
        };

        match classify(resolved) {
            Some(effect) => nodes.push((resolved, effect, spid)),
            None => {
                diag.warn(format!(
                    "Animation '{}' has no PowerPoint counterpart. Dropped.",
                    resolved.animation.id
                ));
            }
        }
    }

    if nodes.is_empty() {
        return;
    }

    let mut ids = TimingIds { next: 1 };

    xml.start_element("p:timing");
    xml.start_element("p:tnLst");
    xml.start_element("p:par");

    let root = ids.next();
    xml.start_element("p:cTn");
    xml.write_attribute("id", &root);
    xml.write_attribute("dur", "indefinite");
    xml.write_attribute("restart", "never");
    xml.write_attribute("nodeType", "tmRoot");
    xml.start_element("p:childTnLst");

    xml.start_element("p:seq");
    xml.write_attribute("concurrent", "1");
    xml.write_attribute("nextAc", "seek");

    let main = ids.next();
    xml.start_element("p:cTn");
    xml.write_attribute("id", &main);
    xml.write_attribute("dur", "indefinite");
    xml.write_attribute("nodeType", "mainSeq");
    xml.start_element("p:childTnLst");

    for (resolved, effect, spid) in &nodes {
        write_effect(xml, &mut ids, resolved, effect, *spid, view_box);
    }

    xml.end_element(); // p:childTnLst
    xml.end_element(); // main p:cTn
    xml.end_element(); // p:seq

    xml.end_element(); // root p:childTnLst
    xml.end_element(); // root p:cTn
    xml.end_element(); // p:par
    xml.end_element(); // p:tnLst
    xml.end_element(); // p:timing
}

struct TimingIds {
    next: u32,
}

impl TimingIds {
    fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

fn write_effect(
    xml: &mut XmlWriter,
    ids: &mut TimingIds,
    resolved: &ResolvedAnimation,
    effect: &Effect,
    spid: u32,
    view_box: Rect,
) {
    // Delay and duration are expressed in milliseconds.
    let delay = (resolved.begin * 1000.0).round() as i64;
    let duration = (resolved.animation.timing.dur * 1000.0).round().max(1.0) as i64;
    let (accel, decel) = easing(&resolved.animation);

    xml.start_element("p:par");
    let group = ids.next();
    xml.start_element("p:cTn");
    xml.write_attribute("id", &group);
    xml.write_attribute("fill", "hold");
    xml.start_element("p:stCondLst");
    xml.start_element("p:cond");
    xml.write_attribute("delay", &delay);
    xml.end_element();
    xml.end_element();
    xml.start_element("p:childTnLst");

    let write_cbhvr = |xml: &mut XmlWriter, ids: &mut TimingIds, attr: Option<&str>| {
        xml.start_element("p:cBhvr");
        let node = ids.next();
        xml.start_element("p:cTn");
        xml.write_attribute("id", &node);
        xml.write_attribute("dur", &duration);
        if accel > 0 {
            xml.write_attribute("accel", &accel);
        }
        if decel > 0 {
            xml.write_attribute("decel", &decel);
        }
        xml.write_attribute("fill", "hold");
        xml.end_element();
        xml.start_element("p:tgtEl");
        xml.start_element("p:spTgt");
        xml.write_attribute("spid", &spid);
        xml.end_element();
        xml.end_element();
        if let Some(attr) = attr {
            xml.start_element("p:attrNameLst");
            xml.start_element("p:attrName");
            xml.write_text(attr);
            xml.end_element();
            xml.end_element();
        }
        xml.end_element(); // p:cBhvr
    };

    match effect {
        Effect::FadeIn | Effect::FadeOut => {
            xml.start_element("p:animEffect");
            xml.write_attribute(
                "transition",
                if matches!(effect, Effect::FadeIn) {
                    "in"
                } else {
                    "out"
                },
            );
            xml.write_attribute("filter", "fade");
            write_cbhvr(xml, ids, None);
            xml.end_element();
        }
        Effect::GrowShrink { sx, sy } => {
            xml.start_element("p:animScale");
            write_cbhvr(xml, ids, None);
            xml.start_element("p:by");
            xml.write_attribute("x", &((sx * 100_000.0).round() as i64));
            xml.write_attribute("y", &((sy * 100_000.0).round() as i64));
            xml.end_element();
            xml.end_element();
        }
        Effect::Spin { degrees } => {
            xml.start_element("p:animRot");
            // Total rotation in 60000ths of a degree.
            xml.write_attribute("by", &((degrees * 60_000.0).round() as i64));
            write_cbhvr(xml, ids, None);
            xml.end_element();
        }
        Effect::MotionPath { points } => {
            xml.start_element("p:animMotion");
            xml.write_attribute("origin", "layout");
            xml.write_attribute("path", &motion_path_string(points, view_box));
            xml.write_attribute("pathEditMode", "relative");
            write_cbhvr(xml, ids, None);
            xml.end_element();
        }
        Effect::ColorChange { to } => {
            xml.start_element("p:animClr");
            xml.write_attribute("clrSpc", "rgb");
            write_cbhvr(xml, ids, Some("fillcolor"));
            xml.start_element("p:to");
            xml.start_element("a:srgbClr");
            xml.write_attribute("val", &to.to_hex());
            xml.end_element();
            xml.end_element();
            xml.end_element();
        }
    }

    xml.end_element(); // p:childTnLst
    xml.end_element(); // group p:cTn
    xml.end_element(); // p:par
}

/// Builds a motion path in slide-fraction units, relative to the
/// shape's resting position.
fn motion_path_string(points: &[Point], view_box: Rect) -> String {
    let origin = points[0];
    let mut out = String::from("M 0 0");

    for p in &points[1..] {
        let x = (p.x - origin.x) / view_box.width();
        let y = (p.y - origin.y) / view_box.height();
        let _ = write!(out, " L {:.5} {:.5}", x, y);
    }

    out.push_str(" E");
    out
}

/// An easing preset: name, spline, and the projected accel/decel pair
/// in 0.001% units of the duration.
const EASING_TABLE: &[(KeySpline, (i64, i64))] = &[
    // linear
    (
        KeySpline {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        },
        (0, 0),
    ),
    // ease
    (
        KeySpline {
            x1: 0.25,
            y1: 0.1,
            x2: 0.25,
            y2: 1.0,
        },
        (30_000, 30_000),
    ),
    // ease-in
    (
        KeySpline {
            x1: 0.42,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        },
        (50_000, 0),
    ),
    // ease-out
    (
        KeySpline {
            x1: 0.0,
            y1: 0.0,
            x2: 0.58,
            y2: 1.0,
        },
        (0, 50_000),
    ),
    // ease-in-out
    (
        KeySpline {
            x1: 0.42,
            y1: 0.0,
            x2: 0.58,
            y2: 1.0,
        },
        (50_000, 50_000),
    ),
];

/// Projects an animation's easing onto PowerPoint accel/decel.
fn easing(animation: &svg2pptx_ir::animate::Animation) -> (i64, i64) {
    if let Some(ref splines) = animation.key_splines {
        if let Some(spline) = splines.first() {
            return nearest_preset(*spline);
        }
    }

    match animation.calc_mode {
        // Spline mode without splines degrades to plain ease.
        CalcMode::Spline => (30_000, 30_000),
        _ => (0, 0),
    }
}

fn nearest_preset(spline: KeySpline) -> (i64, i64) {
    let mut best = (0, 0);
    let mut best_distance = f64::MAX;

    for (preset, pair) in EASING_TABLE {
        let distance = (spline.x1 - preset.x1).powi(2)
            + (spline.y1 - preset.y1).powi(2)
            + (spline.x2 - preset.x2).powi(2)
            + (spline.y2 - preset.y2).powi(2);
        if distance < best_distance {
            best_distance = distance;
            best = *pair;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use svg2pptx_ir::animate::{Animation, Timing};

    fn resolved(kind: AnimationKind, values: &[&str], dur: f64) -> ResolvedAnimation {
        ResolvedAnimation {
            animation: Animation {
                id: "a".to_string(),
                target_id: "t".to_string(),
                kind,
                values: values.iter().map(|v| v.to_string()).collect(),
                timing: Timing {
                    dur,
                    ..Timing::default()
                },
                key_times: None,
                key_splines: None,
                calc_mode: CalcMode::Linear,
            },
            begin: 0.0,
            end: dur,
        }
    }

    #[test]
    fn opacity_maps_to_fade() {
        let up = resolved(
            AnimationKind::Attribute("opacity".to_string()),
            &["0", "1"],
            1.0,
        );
        assert!(is_expressible(&up));
        assert!(matches!(classify(&up), Some(Effect::FadeIn)));

        let down = resolved(
            AnimationKind::Attribute("opacity".to_string()),
            &["1", "0"],
            1.0,
        );
        assert!(matches!(classify(&down), Some(Effect::FadeOut)));
    }

    #[test]
    fn zero_duration_is_not_expressible() {
        let a = resolved(
            AnimationKind::Attribute("opacity".to_string()),
            &["0", "1"],
            0.0,
        );
        assert!(!is_expressible(&a));
    }

    #[test]
    fn rotate_maps_to_spin() {
        let a = resolved(
            AnimationKind::Transform(TransformType::Rotate),
            &["0", "360"],
            2.0,
        );
        match classify(&a) {
            Some(Effect::Spin { degrees }) => assert_eq!(degrees, 360.0),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn splines_project_to_presets() {
        let spline = KeySpline {
            x1: 0.4,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        };
        assert_eq!(nearest_preset(spline), (50_000, 0));
    }
}
