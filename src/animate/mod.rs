// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The SMIL animation compiler.
//!
//! Collected animations are resolved against a global timeline, then
//! either lowered to PowerPoint timing nodes or baked into a sequence
//! of scenes emitted as successive slides.

pub(crate) mod bake;
pub(crate) mod interpolate;
pub(crate) mod lower;
pub(crate) mod timeline;

use svg2pptx_ir::animate::Animation;
use svg2pptx_ir::Scene;

use crate::{AnimationMode, Diagnostics, Options};
use svg2pptx_parser::ParsedSvg;

/// The flattening time used when the timeline is dropped in favor of
/// a single static slide.
pub(crate) const STATIC_EXTRACTION_TIME: f64 = 0.5;

/// An animation with its resolved absolute timing.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedAnimation {
    /// The collected animation data.
    pub animation: Animation,

    /// Resolved absolute begin, in seconds.
    pub begin: f64,

    /// Resolved absolute end of the active duration, in seconds.
    /// Indefinite repeats count a single iteration here.
    pub end: f64,
}

/// The slide plan produced by the compiler.
#[derive(Debug)]
pub(crate) struct Plan {
    /// The scenes to emit, one slide each. Baked timelines produce
    /// several; everything else produces one.
    pub scenes: Vec<Scene>,

    /// Timing effects bound to the first slide, when the timeline is
    /// expressible as PowerPoint animations.
    pub effects: Option<Vec<ResolvedAnimation>>,
}

/// Builds the slide plan for a parsed document.
pub(crate) fn plan(parsed: ParsedSvg, opt: &Options, diag: &mut Diagnostics) -> Plan {
    let ParsedSvg {
        mut scene,
        animations,
    } = parsed;

    let animations = drop_unbound(&scene, animations, diag);

    if animations.is_empty() {
        return Plan {
            scenes: vec![scene],
            effects: None,
        };
    }

    let (resolved, total) = timeline::resolve(&animations, diag);
    if resolved.is_empty() {
        return Plan {
            scenes: vec![scene],
            effects: None,
        };
    }

    if !opt.preserve_animations {
        // Dropped animations leave their last-frame state behind.
        bake::apply_at_time(&mut scene, &resolved, total);
        return Plan {
            scenes: vec![scene],
            effects: None,
        };
    }

    match opt.animation_mode {
        AnimationMode::Static => {
            bake::apply_at_time(&mut scene, &resolved, STATIC_EXTRACTION_TIME);
            Plan {
                scenes: vec![scene],
                effects: None,
            }
        }
        AnimationMode::PowerPoint => {
            if resolved.iter().all(lower::is_expressible) {
                Plan {
                    scenes: vec![scene],
                    effects: Some(resolved),
                }
            } else {
                diag.warn(
                    "The timeline is not expressible as PowerPoint effects; baking keyframes."
                        .to_string(),
                );
                Plan {
                    scenes: bake::bake(&scene, &resolved, total, opt),
                    effects: None,
                }
            }
        }
        AnimationMode::Baked => Plan {
            scenes: bake::bake(&scene, &resolved, total, opt),
            effects: None,
        },
    }
}

/// Drops animations whose target does not exist in the scene.
fn drop_unbound(
    scene: &Scene,
    animations: Vec<Animation>,
    diag: &mut Diagnostics,
) -> Vec<Animation> {
    animations
        .into_iter()
        .filter(|a| {
            if scene.node_by_id(&a.target_id).is_none() {
                diag.warn(format!(
                    "Animation '{}' targets a missing element '{}'. Dropped.",
                    a.id, a.target_id
                ));
                return false;
            }

            if !a.is_evaluable() {
                diag.warn(format!("Animation '{}' has no usable values. Dropped.", a.id));
                return false;
            }

            true
        })
        .collect()
}
