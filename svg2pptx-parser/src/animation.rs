// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SMIL animation collection.
//!
//! Gathers `animate`, `animateTransform`, `animateColor`,
//! `animateMotion` and `set` elements into the IR animation model.
//! Timeline resolution and PowerPoint lowering happen downstream.

use svg2pptx_ir::animate::{
    Animation, AnimationKind, Begin, BeginEvent, CalcMode, FillMode, KeySpline, Repeat, Timing,
    TransformType,
};
use svg2pptx_ir::{PathData, Point, Segment};

use crate::path::parse_path;
use crate::svgtree::{AId, Document, EId, NodeId};
use crate::Diagnostics;

/// Collects all animation elements in document order.
///
/// Targets without an `id` get a synthetic one, so the animation
/// reference space is always resolvable.
pub(crate) fn collect(doc: &mut Document, diag: &mut Diagnostics) -> Vec<Animation> {
    let nodes: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.tag(n).map(EId::is_animation).unwrap_or(false))
        .collect();

    let mut animations = Vec::new();
    for (index, node) in nodes.into_iter().enumerate() {
        if let Some(animation) = convert_animation(doc, node, index, diag) {
            animations.push(animation);
        }
    }

    animations
}

fn convert_animation(
    doc: &mut Document,
    node: NodeId,
    index: usize,
    diag: &mut Diagnostics,
) -> Option<Animation> {
    let tag = doc.tag(node)?;

    let target_id = resolve_target(doc, node, index)?;

    let kind = match tag {
        EId::Animate | EId::AnimateColor => {
            let name = match doc.attribute(node, AId::AttributeName) {
                Some(name) => name.to_string(),
                None => {
                    diag.warn(format!(
                        "Animation on '{}' has no 'attributeName'. Skipped.",
                        target_id
                    ));
                    return None;
                }
            };
            AnimationKind::Attribute(name)
        }
        EId::Set => {
            let name = doc.attribute(node, AId::AttributeName)?.to_string();
            AnimationKind::Set(name)
        }
        EId::AnimateTransform => {
            let kind = match doc.attribute(node, AId::Type) {
                Some("translate") | None => TransformType::Translate,
                Some("scale") => TransformType::Scale,
                Some("rotate") => TransformType::Rotate,
                Some("skewX") => TransformType::SkewX,
                Some("skewY") => TransformType::SkewY,
                Some(other) => {
                    diag.warn(format!(
                        "Unknown 'animateTransform' type '{}'. Skipped.",
                        other
                    ));
                    return None;
                }
            };
            AnimationKind::Transform(kind)
        }
        EId::AnimateMotion => AnimationKind::Motion {
            path: motion_path(doc, node, diag),
        },
        _ => return None,
    };

    let values = collect_values(doc, node, diag)?;

    let timing = parse_timing(doc, node, diag);
    let key_times = parse_key_times(doc, node, diag);
    let key_splines = parse_key_splines(doc, node, diag);

    let calc_mode = match doc.attribute(node, AId::CalcMode) {
        Some("discrete") => CalcMode::Discrete,
        Some("paced") => CalcMode::Paced,
        Some("spline") => CalcMode::Spline,
        _ => CalcMode::Linear,
    };

    let id = match doc.attribute(node, AId::Id) {
        Some(id) => id.to_string(),
        None => format!("anim{}", index),
    };

    Some(Animation {
        id,
        target_id,
        kind,
        values,
        timing,
        key_times,
        key_splines,
        calc_mode,
    })
}

/// The animated element: the `href` target when present,
/// the parent otherwise.
fn resolve_target(doc: &mut Document, node: NodeId, index: usize) -> Option<String> {
    if let Some(href) = doc.attribute(node, AId::Href) {
        return Some(href.trim_start_matches('#').to_string());
    }

    let parent = doc.parent(node)?;
    doc.tag(parent)?;

    let id = doc.element_id(parent);
    if !id.is_empty() {
        return Some(id.to_string());
    }

    let synthetic = format!("anim-target-{}", index);
    doc.set_attribute(parent, AId::Id, synthetic.clone());
    Some(synthetic)
}

fn collect_values(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> Option<Vec<String>> {
    if let Some(values) = doc.attribute(node, AId::Values) {
        let list: Vec<String> = values
            .split(';')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !list.is_empty() {
            return Some(list);
        }
    }

    let from = doc.attribute(node, AId::From);
    let to = doc.attribute(node, AId::To);

    match (from, to) {
        (Some(from), Some(to)) => Some(vec![from.to_string(), to.to_string()]),
        (None, Some(to)) => Some(vec![to.to_string()]),
        _ => {
            if doc.has_attribute(node, AId::By) {
                diag.warn("'by' animations are not supported. Skipped.".to_string());
            }

            // Motion animations carry their values in the path.
            if doc.tag(node) == Some(EId::AnimateMotion) {
                Some(Vec::new())
            } else {
                None
            }
        }
    }
}

fn motion_path(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> PathData {
    if let Some(d) = doc.attribute(node, AId::Path) {
        match parse_path(d) {
            Ok(path) => return path,
            Err(e) => {
                diag.warn(format!("Invalid 'animateMotion' path: {}.", e));
            }
        }
    }

    // An `mpath` child references a path element by href.
    for child in doc.element_children(node) {
        if doc.tag(child) != Some(EId::Mpath) {
            continue;
        }

        let href = doc
            .attribute(child, AId::Href)
            .map(|h| h.trim_start_matches('#'))
            .unwrap_or("");

        if let Some(target) = doc.node_by_element_id(href) {
            if let Some(d) = doc.attribute(target, AId::D) {
                match parse_path(d) {
                    Ok(path) => return path,
                    Err(e) => {
                        diag.warn(format!("Invalid 'mpath' target path: {}.", e));
                    }
                }
            }
        }

        diag.warn(format!(
            "'mpath' reference '{}' cannot be resolved. A zero path is used.",
            href
        ));
    }

    // From the translate values, when provided.
    if let Some(values) = doc.attribute(node, AId::Values) {
        let points: Vec<Point> = values
            .split(';')
            .filter_map(parse_point)
            .collect();
        if points.len() >= 2 {
            let mut segments = Vec::with_capacity(points.len() - 1);
            for w in points.windows(2) {
                segments.push(Segment::Line {
                    start: w[0],
                    end: w[1],
                });
            }
            return PathData {
                segments,
                closed: false,
            };
        }
    }

    // The documented degenerate default.
    PathData::new()
}

fn parse_point(value: &str) -> Option<Point> {
    let mut parts = value
        .trim()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty());
    let x = parts.next()?.parse::<f64>().ok()?;
    let y = parts.next().and_then(|p| p.parse::<f64>().ok()).unwrap_or(0.0);
    Some(Point::new(x, y))
}

fn parse_timing(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> Timing {
    let begin = match doc.attribute(node, AId::Begin) {
        Some(value) => parse_begin(value, diag),
        None => Begin::Offset(0.0),
    };

    let mut dur = doc
        .attribute(node, AId::Dur)
        .and_then(parse_clock_value)
        .unwrap_or(1.0);

    // `min`/`max` constrain the simple duration.
    if let Some(min) = doc.attribute(node, AId::Min).and_then(parse_clock_value) {
        dur = dur.max(min);
    }
    if let Some(max) = doc.attribute(node, AId::Max).and_then(parse_clock_value) {
        dur = dur.min(max);
    }

    let repeat = match doc.attribute(node, AId::RepeatCount) {
        Some("indefinite") => Repeat::Indefinite,
        Some(value) => value
            .parse::<f64>()
            .ok()
            .map(|n| Repeat::Finite(n.max(1.0).round() as u32))
            .unwrap_or(Repeat::Finite(1)),
        None => Repeat::Finite(1),
    };

    let fill = match doc.attribute(node, AId::Fill) {
        Some("freeze") => FillMode::Freeze,
        _ => FillMode::Remove,
    };

    Timing {
        begin,
        dur,
        repeat,
        fill,
    }
}

/// Parses a `begin` value: an offset or an event reference like
/// `foo.begin+1s`.
fn parse_begin(value: &str, diag: &mut Diagnostics) -> Begin {
    let mut parts = value.split(';').map(str::trim).filter(|p| !p.is_empty());
    let first = match parts.next() {
        Some(first) => first,
        None => return Begin::Offset(0.0),
    };

    if parts.next().is_some() {
        diag.warn("Multiple 'begin' values are not supported; the first one is used.".to_string());
    }

    if let Some(offset) = parse_clock_value(first) {
        return Begin::Offset(offset);
    }

    // `id.begin` / `id.end` with an optional signed offset. The event
    // marker is located first, so ids containing signs parse fine.
    let reference = first.trim_start_matches('#');
    let event = if let Some(pos) = reference.find(".begin") {
        Some((&reference[..pos], BeginEvent::Begin, &reference[pos + 6..]))
    } else {
        reference
            .find(".end")
            .map(|pos| (&reference[..pos], BeginEvent::End, &reference[pos + 4..]))
    };

    if let Some((id, event, rest)) = event {
        let rest = rest.trim();
        let offset = if rest.is_empty() {
            0.0
        } else {
            parse_clock_value(rest).unwrap_or(0.0)
        };

        return Begin::Event {
            reference: id.trim().to_string(),
            event,
            offset,
        };
    }

    diag.warn(format!(
        "Unsupported 'begin' value '{}'. Zero is used.",
        value
    ));
    Begin::Offset(0.0)
}

/// Parses a SMIL clock value in seconds.
///
/// Supports `hh:mm:ss`, `mm:ss`, `2s`, `1500ms`, `2min`, `1h` and bare
/// numbers. The sign prefix is honored.
pub(crate) fn parse_clock_value(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (sign, value) = match value.strip_prefix('-') {
        Some(rest) => (-1.0, rest.trim()),
        None => (1.0, value.strip_prefix('+').unwrap_or(value).trim()),
    };

    if value.contains(':') {
        let parts: Vec<&str> = value.split(':').collect();
        let seconds = match parts.as_slice() {
            [h, m, s] => {
                h.parse::<f64>().ok()? * 3600.0
                    + m.parse::<f64>().ok()? * 60.0
                    + s.parse::<f64>().ok()?
            }
            [m, s] => m.parse::<f64>().ok()? * 60.0 + s.parse::<f64>().ok()?,
            _ => return None,
        };
        return Some(sign * seconds);
    }

    if let Some(n) = value.strip_suffix("ms") {
        return n.trim().parse::<f64>().ok().map(|n| sign * n / 1000.0);
    }
    if let Some(n) = value.strip_suffix("min") {
        return n.trim().parse::<f64>().ok().map(|n| sign * n * 60.0);
    }
    if let Some(n) = value.strip_suffix('h') {
        return n.trim().parse::<f64>().ok().map(|n| sign * n * 3600.0);
    }
    if let Some(n) = value.strip_suffix('s') {
        return n.trim().parse::<f64>().ok().map(|n| sign * n);
    }

    value.parse::<f64>().ok().map(|n| sign * n)
}

fn parse_key_times(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> Option<Vec<f64>> {
    let value = doc.attribute(node, AId::KeyTimes)?;

    let mut times = Vec::new();
    for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<f64>() {
            Ok(t) if (0.0..=1.0).contains(&t) => times.push(t),
            _ => {
                diag.warn("Invalid 'keyTimes' value. Even spacing is used.".to_string());
                return None;
            }
        }
    }

    // Key times must be monotonic.
    if times.windows(2).any(|w| w[1] < w[0]) {
        diag.warn("Non-monotonic 'keyTimes'. Even spacing is used.".to_string());
        return None;
    }

    Some(times)
}

fn parse_key_splines(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> Option<Vec<KeySpline>> {
    let value = doc.attribute(node, AId::KeySplines)?;

    let mut splines = Vec::new();
    for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let nums: Vec<f64> = part
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .filter_map(|p| p.parse().ok())
            .collect();

        if nums.len() != 4 {
            diag.warn("Invalid 'keySplines' entry. Linear easing is used.".to_string());
            return None;
        }

        splines.push(KeySpline {
            x1: nums[0].clamp(0.0, 1.0),
            y1: nums[1],
            x2: nums[2].clamp(0.0, 1.0),
            y2: nums[3],
        });
    }

    Some(splines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_values() {
        assert_eq!(parse_clock_value("2s"), Some(2.0));
        assert_eq!(parse_clock_value("1500ms"), Some(1.5));
        assert_eq!(parse_clock_value("2min"), Some(120.0));
        assert_eq!(parse_clock_value("0:02"), Some(2.0));
        assert_eq!(parse_clock_value("1:00:01"), Some(3601.0));
        assert_eq!(parse_clock_value("-0.5s"), Some(-0.5));
        assert_eq!(parse_clock_value("3"), Some(3.0));
        assert_eq!(parse_clock_value("junk"), None);
    }

    #[test]
    fn begin_references() {
        let mut diag = Diagnostics::default();
        match parse_begin("#foo.begin+1s", &mut diag) {
            Begin::Event {
                reference,
                event,
                offset,
            } => {
                assert_eq!(reference, "foo");
                assert_eq!(event, BeginEvent::Begin);
                assert_eq!(offset, 1.0);
            }
            _ => panic!("expected an event begin"),
        }

        match parse_begin("bar.end-0.5s", &mut diag) {
            Begin::Event { event, offset, .. } => {
                assert_eq!(event, BeginEvent::End);
                assert_eq!(offset, -0.5);
            }
            _ => panic!("expected an event begin"),
        }

        assert!(matches!(parse_begin("1.5s", &mut diag), Begin::Offset(o) if o == 1.5));
    }

    #[test]
    fn collects_opacity_animation() {
        let mut diag = Diagnostics::default();
        let mut doc = Document::parse(
            "<svg viewBox='0 0 10 10'><rect width='5' height='5'><animate attributeName='opacity' values='0;1' dur='1s'/></rect></svg>",
            &mut diag,
        )
        .unwrap();

        let animations = collect(&mut doc, &mut diag);
        assert_eq!(animations.len(), 1);

        let a = &animations[0];
        assert_eq!(a.values, vec!["0", "1"]);
        assert_eq!(a.timing.dur, 1.0);
        assert!(matches!(a.kind, AnimationKind::Attribute(ref name) if name == "opacity"));

        // The anonymous target got a synthetic id.
        assert!(doc.node_by_element_id(&a.target_id).is_some());
    }
}
