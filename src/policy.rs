// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-element policy engine.
//!
//! For each node the engine decides between native DrawingML emission
//! and the metafile fallback. Decisions are pure functions of the node
//! and a `PolicyConfig`, recorded in a side table keyed by the node's
//! pre-order index; the IR itself is never mutated.

use svg2pptx_ir::{Direction, ImageKind, Node, Paint, Scene};

use crate::Profile;

/// A per-element policy decision.
#[derive(Clone, Debug)]
pub struct Decision {
    /// `true` for native DrawingML, `false` for the metafile fallback.
    pub use_native: bool,

    /// Why the fallback was chosen. Empty for native decisions.
    pub reasons: Vec<String>,
}

impl Decision {
    fn native() -> Self {
        Decision {
            use_native: true,
            reasons: Vec::new(),
        }
    }

    fn fallback(reason: String) -> Self {
        Decision {
            use_native: false,
            reasons: vec![reason],
        }
    }
}

/// Complexity thresholds for one profile.
#[derive(Clone, Copy, Debug)]
pub struct PolicyConfig {
    /// Maximum per-path segment count emitted natively.
    pub max_segments: usize,

    /// Maximum custom dash entries PowerPoint is trusted with.
    pub max_dash_entries: usize,

    /// Ceiling on a group's total descendant segment count; beyond it
    /// the whole group becomes one metafile to avoid exploding
    /// single-shape blobs.
    pub group_segment_budget: usize,
}

impl PolicyConfig {
    /// Returns the thresholds of the given profile.
    ///
    /// The profiles are strictly ordered, so the set of natively
    /// emitted elements under `quality` is a subset of `balanced`,
    /// which is a subset of `speed`.
    pub fn from_profile(profile: Profile) -> Self {
        match profile {
            Profile::Speed => PolicyConfig {
                max_segments: 5000,
                max_dash_entries: 8,
                group_segment_budget: 20_000,
            },
            Profile::Balanced => PolicyConfig {
                max_segments: 1000,
                max_dash_entries: 6,
                group_segment_budget: 8000,
            },
            Profile::Quality => PolicyConfig {
                max_segments: 200,
                max_dash_entries: 4,
                group_segment_budget: 2000,
            },
        }
    }
}

/// Produces the decision side table for a scene.
///
/// The table is indexed by the node's stable pre-order position, the
/// same order `Scene::walk` uses. Given the same IR and config the
/// result is bit-identical across runs and platforms.
pub fn decide(scene: &Scene, config: &PolicyConfig) -> Vec<Decision> {
    let mut decisions = Vec::new();
    scene.walk(|_, node| {
        decisions.push(decide_node(scene, node, config));
    });

    decisions
}

fn decide_node(scene: &Scene, node: &Node, config: &PolicyConfig) -> Decision {
    match node {
        Node::Path(ref path) => {
            let segments = path.data.len();
            if segments > config.max_segments {
                return Decision::fallback(format!(
                    "path has {} segments, above the {} limit",
                    segments, config.max_segments
                ));
            }

            if has_pattern_paint(path.fill.as_ref().map(|f| &f.paint))
                || has_pattern_paint(path.stroke.as_ref().map(|s| &s.paint))
            {
                return Decision::fallback("pattern paint requires a metafile tile".to_string());
            }

            if let Some(ref stroke) = path.stroke {
                if let Some(ref dash) = stroke.dash_array {
                    if dash.len() > config.max_dash_entries {
                        return Decision::fallback(format!(
                            "dash array has {} entries, above the {} limit",
                            dash.len(),
                            config.max_dash_entries
                        ));
                    }
                }
            }

            if let Some(ref id) = path.filter {
                match scene.filters.get(id) {
                    Some(filter) if filter.is_vector_expressible() => {}
                    Some(_) => {
                        return Decision::fallback(format!(
                            "filter '{}' has primitives that require rasterization",
                            id
                        ));
                    }
                    // A missing filter reference is reported by the mapper;
                    // it does not force a fallback.
                    None => {}
                }
            }

            Decision::native()
        }
        Node::Text(ref frame) => {
            if frame.runs.iter().any(|r| r.direction != Direction::Ltr) {
                return Decision::fallback("right-to-left text".to_string());
            }

            let mut families = frame.runs.iter().map(|r| r.font_family.as_str());
            let first = families.next().unwrap_or("");
            if families.any(|f| f != first) {
                return Decision::fallback("runs use multiple font families".to_string());
            }

            Decision::native()
        }
        Node::Image(ref image) => match image.kind {
            ImageKind::PNG(_) | ImageKind::JPEG(_) => Decision::native(),
            // Nested vectors are converted recursively and inlined.
            ImageKind::SVG(_) => Decision::native(),
        },
        Node::Group(ref group) => {
            // The group decision is the meet over its children plus
            // a budget on descendant complexity.
            let mut segments = 0usize;
            let mut child_reason = None;
            for child in &group.children {
                let d = decide_node(scene, child, config);
                if !d.use_native && child_reason.is_none() {
                    child_reason = d.reasons.into_iter().next();
                }
                segments += descendant_segments(child);
            }

            if segments > config.group_segment_budget {
                return Decision::fallback(format!(
                    "group has {} descendant segments, above the {} budget",
                    segments, config.group_segment_budget
                ));
            }

            if let Some(ref id) = group.filter {
                if let Some(filter) = scene.filters.get(id) {
                    if !filter.is_vector_expressible() {
                        return Decision::fallback(format!(
                            "filter '{}' has primitives that require rasterization",
                            id
                        ));
                    }
                }
            }

            match child_reason {
                Some(reason) => Decision::fallback(format!("child fallback: {}", reason)),
                None => Decision::native(),
            }
        }
    }
}

fn has_pattern_paint(paint: Option<&Paint>) -> bool {
    matches!(paint, Some(Paint::Pattern(_)))
}

fn descendant_segments(node: &Node) -> usize {
    match node {
        Node::Path(ref path) => path.data.len(),
        Node::Group(ref group) => group.children.iter().map(descendant_segments).sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::rc::Rc;

    use svg2pptx_ir::{Fill, Group, Opacity, Path, PathData, Point, Rect, Segment};

    fn path_with_segments(n: usize) -> Node {
        let mut segments = Vec::with_capacity(n);
        for i in 0..n {
            segments.push(Segment::Line {
                start: Point::new(i as f64, 0.0),
                end: Point::new(i as f64 + 1.0, 0.0),
            });
        }

        Node::Path(Box::new(Path {
            id: String::new(),
            data: Rc::new(PathData {
                segments,
                closed: false,
            }),
            fill: Some(Fill::default()),
            stroke: None,
            opacity: Opacity::ONE,
            clip: None,
            filter: None,
        }))
    }

    fn scene_with(children: Vec<Node>) -> Scene {
        let mut root = Group::default();
        root.children = children;
        Scene {
            size: (100, 100),
            view_box: Rect::new(0.0, 0.0, 100.0, 100.0).unwrap(),
            root,
            clip_paths: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    #[test]
    fn simple_path_is_native() {
        let scene = scene_with(vec![path_with_segments(4)]);
        let decisions = decide(&scene, &PolicyConfig::from_profile(Profile::Balanced));
        assert!(decisions[0].use_native);
        assert!(decisions[0].reasons.is_empty());
    }

    #[test]
    fn oversized_path_falls_back() {
        let scene = scene_with(vec![path_with_segments(1500)]);
        let decisions = decide(&scene, &PolicyConfig::from_profile(Profile::Balanced));
        assert!(!decisions[0].use_native);
        assert!(!decisions[0].reasons.is_empty());
    }

    #[test]
    fn profiles_are_monotonic() {
        // A path size accepted by speed but not by quality.
        let scene = scene_with(vec![path_with_segments(800)]);

        let native = |profile: Profile| -> bool {
            decide(&scene, &PolicyConfig::from_profile(profile))[0].use_native
        };

        let speed = native(Profile::Speed);
        let balanced = native(Profile::Balanced);
        let quality = native(Profile::Quality);

        // quality-native is a subset of balanced-native is a subset
        // of speed-native.
        assert!(!quality || balanced);
        assert!(!balanced || speed);
        assert!(speed);
        assert!(!quality);
    }

    #[test]
    fn group_meet_over_children() {
        let mut group = Group::default();
        group.children.push(path_with_segments(4));
        group.children.push(path_with_segments(1500));
        let scene = scene_with(vec![Node::Group(Box::new(group))]);

        let decisions = decide(&scene, &PolicyConfig::from_profile(Profile::Balanced));
        assert!(!decisions[0].use_native);
    }
}
