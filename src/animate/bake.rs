// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Keyframe baking.
//!
//! Timelines PowerPoint cannot express are evaluated at a fixed sample
//! rate; each sample becomes an IR scene the packager emits as its own
//! slide. The baked frame count times the frame period equals the
//! resolved timeline duration.

use std::rc::Rc;

use svg2pptx_ir::animate::{AnimationKind, FillMode, Repeat, TransformType};
use svg2pptx_ir::{Group, Node, Opacity, Paint, Point, Scene, Transform};

use super::interpolate::{self, Value};
use super::ResolvedAnimation;
use crate::Options;

/// Samples the timeline into per-frame scenes.
pub(crate) fn bake(
    scene: &Scene,
    effects: &[ResolvedAnimation],
    total: f64,
    opt: &Options,
) -> Vec<Scene> {
    let fps = opt.bake_fps.clamp(1, 60) as f64;
    let cap = opt.bake_max_keyframes.clamp(1, 120) as usize;

    let frames = ((total * fps).round() as usize).clamp(1, cap);
    let period = total / frames as f64;

    let mut scenes = Vec::with_capacity(frames);
    for i in 0..frames {
        let t = period * i as f64;
        let mut frame = scene.clone();
        apply_at_time(&mut frame, effects, t);
        scenes.push(frame);
    }

    scenes
}

/// Applies every animation's state at an absolute time to the scene.
pub(crate) fn apply_at_time(scene: &mut Scene, effects: &[ResolvedAnimation], t: f64) {
    for resolved in effects {
        let progress = match progress_at(resolved, t) {
            Some(progress) => progress,
            None => continue,
        };

        apply_animation(scene, resolved, progress);
    }
}

/// The normalized progress over the simple duration at time `t`,
/// or `None` when the animation contributes nothing.
fn progress_at(resolved: &ResolvedAnimation, t: f64) -> Option<f64> {
    let timing = &resolved.animation.timing;

    if t < resolved.begin {
        return None;
    }

    let after_end = t >= resolved.end && !matches!(timing.repeat, Repeat::Indefinite);
    if after_end {
        // A frozen animation holds its final value; a removed one
        // reverts to the base state.
        return match timing.fill {
            FillMode::Freeze => Some(1.0),
            FillMode::Remove => None,
        };
    }

    if timing.dur <= 0.0 {
        return Some(1.0);
    }

    let local = (t - resolved.begin) % timing.dur;
    Some(local / timing.dur)
}

fn apply_animation(scene: &mut Scene, resolved: &ResolvedAnimation, progress: f64) {
    let animation = &resolved.animation;

    match &animation.kind {
        AnimationKind::Attribute(name) => {
            if let Some(value) = interpolate::sample(animation, progress) {
                apply_attribute(scene, &animation.target_id, name, &value);
            }
        }
        AnimationKind::Set(name) => {
            if let Some(raw) = animation.values.first() {
                apply_set(scene, &animation.target_id, name, raw);
            }
        }
        AnimationKind::Transform(kind) => {
            if let Some(value) = interpolate::sample(animation, progress) {
                let ts = transform_from_value(*kind, &value.to_list());
                apply_transform(scene, &animation.target_id, ts);
            }
        }
        AnimationKind::Motion { path } => {
            if let Some(point) = path.point_at(progress) {
                let start = path.point_at(0.0).unwrap_or(Point::new(0.0, 0.0));
                let ts = Transform::new_translate(point.x - start.x, point.y - start.y);
                apply_transform(scene, &animation.target_id, ts);
            }
        }
    }
}

fn transform_from_value(kind: TransformType, args: &[f64]) -> Transform {
    let a = args.first().copied().unwrap_or(0.0);
    match kind {
        TransformType::Translate => {
            Transform::new_translate(a, args.get(1).copied().unwrap_or(0.0))
        }
        TransformType::Scale => {
            let sy = args.get(1).copied().unwrap_or(a);
            Transform::new_scale(a, sy)
        }
        TransformType::Rotate => match args {
            [angle, cx, cy] => Transform::new_rotate_at(*angle, *cx, *cy),
            _ => Transform::new_rotate(a),
        },
        TransformType::SkewX => Transform::new_skew_x(a),
        TransformType::SkewY => Transform::new_skew_y(a),
    }
}

fn apply_attribute(scene: &mut Scene, target_id: &str, name: &str, value: &Value) {
    let node = match node_by_id_mut(&mut scene.root, target_id) {
        Some(node) => node,
        None => return,
    };

    match name {
        "opacity" => {
            if let Some(n) = value.as_number() {
                let opacity = Opacity::new(n);
                match node {
                    Node::Path(path) => path.opacity = opacity,
                    Node::Group(group) => group.opacity = opacity,
                    Node::Text(frame) => {
                        for run in &mut frame.runs {
                            run.alpha = opacity;
                        }
                    }
                    Node::Image(_) => {}
                }
            }
        }
        "fill" => {
            if let Value::Color(color) = value {
                match node {
                    Node::Path(path) => {
                        if let Some(ref mut fill) = path.fill {
                            fill.paint = Paint::Color(*color);
                        }
                    }
                    Node::Text(frame) => {
                        for run in &mut frame.runs {
                            run.color = *color;
                        }
                    }
                    _ => {}
                }
            }
        }
        "stroke" => {
            if let Value::Color(color) = value {
                if let Node::Path(path) = node {
                    if let Some(ref mut stroke) = path.stroke {
                        stroke.paint = Paint::Color(*color);
                    }
                }
            }
        }
        _ => {}
    }
}

fn apply_set(scene: &mut Scene, target_id: &str, name: &str, raw: &str) {
    match name {
        "visibility" => {
            let node = match node_by_id_mut(&mut scene.root, target_id) {
                Some(node) => node,
                None => return,
            };

            let opacity = if raw == "hidden" {
                Opacity::new(0.0)
            } else {
                Opacity::ONE
            };

            match node {
                Node::Path(path) => path.opacity = opacity,
                Node::Group(group) => group.opacity = opacity,
                Node::Text(frame) => {
                    for run in &mut frame.runs {
                        run.alpha = opacity;
                    }
                }
                Node::Image(_) => {}
            }
        }
        _ => {
            if let Some(value) = interpolate::parse_value(raw) {
                apply_attribute(scene, target_id, name, &value);
            }
        }
    }
}

fn apply_transform(scene: &mut Scene, target_id: &str, ts: Transform) {
    let node = match node_by_id_mut(&mut scene.root, target_id) {
        Some(node) => node,
        None => return,
    };

    match node {
        Node::Group(group) => {
            group.transform.append(&ts);
        }
        Node::Path(path) => {
            // The scene is a per-frame clone, so the shared path data
            // is unshared before mutation.
            let data = Rc::make_mut(&mut path.data);
            let mut lowered = data.lower_arcs();
            lowered.transform(ts);
            *data = lowered;
        }
        Node::Text(frame) => {
            frame.origin = ts.apply_to(frame.origin);
        }
        Node::Image(image) => {
            if let Some(rect) = image.rect.transform(ts) {
                image.rect = rect;
            }
        }
    }
}

fn node_by_id_mut<'a>(parent: &'a mut Group, id: &str) -> Option<&'a mut Node> {
    for child in parent.children.iter_mut() {
        if child.id() == id {
            return Some(child);
        }

        if let Node::Group(ref mut g) = child {
            if let Some(found) = node_by_id_mut(g, id) {
                return Some(found);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use svg2pptx_ir::animate::{Animation, CalcMode, Timing};
    use svg2pptx_ir::{Fill, Path, PathData, Rect};

    fn scene_with_rect(id: &str) -> Scene {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0).unwrap();
        let path = Path {
            id: id.to_string(),
            data: Rc::new(PathData::from_rect(rect)),
            fill: Some(Fill::default()),
            stroke: None,
            opacity: Opacity::ONE,
            clip: None,
            filter: None,
        };

        let mut root = Group::default();
        root.children.push(Node::Path(Box::new(path)));

        Scene {
            size: (100, 100),
            view_box: Rect::new(0.0, 0.0, 100.0, 100.0).unwrap(),
            root,
            clip_paths: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    fn opacity_animation(target: &str, begin: f64, dur: f64) -> ResolvedAnimation {
        ResolvedAnimation {
            animation: Animation {
                id: format!("{}-anim", target),
                target_id: target.to_string(),
                kind: AnimationKind::Attribute("opacity".to_string()),
                values: vec!["0".to_string(), "1".to_string()],
                timing: Timing {
                    dur,
                    ..Timing::default()
                },
                key_times: None,
                key_splines: None,
                calc_mode: CalcMode::Linear,
            },
            begin,
            end: begin + dur,
        }
    }

    fn path_opacity(scene: &Scene) -> f64 {
        match &scene.root.children[0] {
            Node::Path(path) => path.opacity.get(),
            _ => panic!("expected a path"),
        }
    }

    #[test]
    fn midpoint_state() {
        let mut scene = scene_with_rect("r");
        apply_at_time(&mut scene, &[opacity_animation("r", 0.0, 2.0)], 1.0);
        assert!((path_opacity(&scene) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn removed_animation_reverts() {
        let mut scene = scene_with_rect("r");
        apply_at_time(&mut scene, &[opacity_animation("r", 0.0, 1.0)], 5.0);
        assert_eq!(path_opacity(&scene), 1.0);
    }

    #[test]
    fn frozen_animation_holds() {
        let mut scene = scene_with_rect("r");
        let mut anim = opacity_animation("r", 0.0, 1.0);
        anim.animation.timing.fill = FillMode::Freeze;
        anim.animation.values = vec!["1".to_string(), "0.25".to_string()];
        apply_at_time(&mut scene, &[anim], 5.0);
        assert!((path_opacity(&scene) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn frame_count_respects_cap_and_duration() {
        let scene = scene_with_rect("r");
        let effects = vec![opacity_animation("r", 0.0, 6.0)];

        let mut opt = Options::default();
        opt.bake_fps = 24;
        opt.bake_max_keyframes = 30;
        let scenes = bake(&scene, &effects, 6.0, &opt);
        // 6 s at 24 Hz exceeds the cap, so the cap wins.
        assert_eq!(scenes.len(), 30);

        opt.bake_max_keyframes = 120;
        opt.bake_fps = 4;
        let scenes = bake(&scene, &effects, 6.0, &opt);
        assert_eq!(scenes.len(), 24);
    }

    #[test]
    fn translate_moves_geometry() {
        let mut scene = scene_with_rect("r");
        let anim = ResolvedAnimation {
            animation: Animation {
                id: "m".to_string(),
                target_id: "r".to_string(),
                kind: AnimationKind::Transform(TransformType::Translate),
                values: vec!["0 0".to_string(), "10 20".to_string()],
                timing: Timing {
                    dur: 1.0,
                    ..Timing::default()
                },
                key_times: None,
                key_splines: None,
                calc_mode: CalcMode::Linear,
            },
            begin: 0.0,
            end: 1.0,
        };

        apply_at_time(&mut scene, &[anim], 0.5);
        match &scene.root.children[0] {
            Node::Path(path) => {
                let bbox = path.data.bounding_box().unwrap();
                assert!((bbox.x() - 15.0).abs() < 1e-9);
                assert!((bbox.y() - 20.0).abs() < 1e-9);
            }
            _ => panic!("expected a path"),
        }
    }
}
