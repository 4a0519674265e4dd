// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Global timeline resolution.
//!
//! `begin` values may reference other animations (`foo.begin+1s`),
//! forming a potentially cyclic graph. The graph is resolved by a
//! bounded fixpoint over the stable animation-id space; references
//! still unresolved at the cap are dropped and warned about.

use std::collections::HashMap;

use svg2pptx_ir::animate::{Animation, Begin, BeginEvent, Repeat};

use super::ResolvedAnimation;
use crate::Diagnostics;

/// The fixpoint pass cap.
const RESOLUTION_PASS_LIMIT: usize = 256;

/// Resolves event-based begins and returns the animations with
/// absolute timing, plus the total timeline duration.
pub(crate) fn resolve(
    animations: &[Animation],
    diag: &mut Diagnostics,
) -> (Vec<ResolvedAnimation>, f64) {
    // id -> (begin, end), filled as begins resolve.
    let mut resolved: HashMap<&str, (f64, f64)> = HashMap::new();

    // Plain offsets resolve immediately.
    for animation in animations {
        if let Begin::Offset(offset) = animation.timing.begin {
            let begin = offset.max(0.0);
            resolved.insert(&animation.id, (begin, begin + active_duration(animation)));
        }
    }

    // Event-based begins resolve once their reference has resolved.
    // Each pass settles at least one animation or the set is stuck.
    for _ in 0..RESOLUTION_PASS_LIMIT {
        let mut changed = false;

        for animation in animations {
            if resolved.contains_key(animation.id.as_str()) {
                continue;
            }

            let (reference, event, offset) = match animation.timing.begin {
                Begin::Event {
                    ref reference,
                    event,
                    offset,
                } => (reference, event, offset),
                Begin::Offset(_) => continue,
            };

            if let Some(&(ref_begin, ref_end)) = resolved.get(reference.as_str()) {
                let base = match event {
                    BeginEvent::Begin => ref_begin,
                    BeginEvent::End => ref_end,
                };
                let begin = (base + offset).max(0.0);
                resolved.insert(&animation.id, (begin, begin + active_duration(animation)));
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    let mut out = Vec::with_capacity(animations.len());
    let mut total: f64 = 0.0;

    for animation in animations {
        match resolved.get(animation.id.as_str()) {
            Some(&(begin, end)) => {
                total = total.max(end);
                out.push(ResolvedAnimation {
                    animation: animation.clone(),
                    begin,
                    end,
                });
            }
            None => {
                // Cyclic or dangling references end up here.
                diag.warn(format!(
                    "Animation '{}' has an unresolvable 'begin' reference. Dropped.",
                    animation.id
                ));
            }
        }
    }

    (out, total)
}

/// The active duration: the simple duration times the repeat count.
/// Indefinite repeats contribute one iteration to timeline bounds.
fn active_duration(animation: &Animation) -> f64 {
    let dur = animation.timing.dur.max(0.0);
    match animation.timing.repeat {
        Repeat::Finite(n) => dur * n.max(1) as f64,
        Repeat::Indefinite => dur,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svg2pptx_ir::animate::{AnimationKind, CalcMode, FillMode, Timing};

    fn animation(id: &str, begin: Begin, dur: f64) -> Animation {
        Animation {
            id: id.to_string(),
            target_id: "t".to_string(),
            kind: AnimationKind::Attribute("opacity".to_string()),
            values: vec!["0".to_string(), "1".to_string()],
            timing: Timing {
                begin,
                dur,
                repeat: Repeat::Finite(1),
                fill: FillMode::Remove,
            },
            key_times: None,
            key_splines: None,
            calc_mode: CalcMode::Linear,
        }
    }

    #[test]
    fn offsets_resolve_directly() {
        let mut diag = Diagnostics::default();
        let (resolved, total) = resolve(&[animation("a", Begin::Offset(1.0), 2.0)], &mut diag);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].begin, 1.0);
        assert_eq!(resolved[0].end, 3.0);
        assert_eq!(total, 3.0);
    }

    #[test]
    fn event_chain_resolves() {
        let mut diag = Diagnostics::default();
        let list = vec![
            animation("a", Begin::Offset(0.0), 1.0),
            animation(
                "b",
                Begin::Event {
                    reference: "a".to_string(),
                    event: BeginEvent::End,
                    offset: 0.5,
                },
                2.0,
            ),
            animation(
                "c",
                Begin::Event {
                    reference: "b".to_string(),
                    event: BeginEvent::Begin,
                    offset: 1.0,
                },
                1.0,
            ),
        ];

        let (resolved, total) = resolve(&list, &mut diag);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[1].begin, 1.5);
        assert_eq!(resolved[2].begin, 2.5);
        assert_eq!(total, 3.5);
        assert!(diag.is_empty());
    }

    #[test]
    fn cycles_are_broken() {
        let mut diag = Diagnostics::default();
        let list = vec![
            animation(
                "a",
                Begin::Event {
                    reference: "b".to_string(),
                    event: BeginEvent::Begin,
                    offset: 0.0,
                },
                1.0,
            ),
            animation(
                "b",
                Begin::Event {
                    reference: "a".to_string(),
                    event: BeginEvent::Begin,
                    offset: 0.0,
                },
                1.0,
            ),
        ];

        let (resolved, _) = resolve(&list, &mut diag);
        assert!(resolved.is_empty());
        assert_eq!(diag.messages().len(), 2);
    }

    #[test]
    fn repeat_extends_the_active_duration() {
        let mut list = vec![animation("a", Begin::Offset(0.0), 2.0)];
        list[0].timing.repeat = Repeat::Finite(3);

        let mut diag = Diagnostics::default();
        let (resolved, total) = resolve(&list, &mut diag);
        assert_eq!(resolved[0].end, 6.0);
        assert_eq!(total, 6.0);
    }
}
