// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The timed-animation data model.
//!
//! SVG inherits its animation vocabulary from SMIL. The parser collects
//! `animate`, `animateTransform`, `animateColor`, `animateMotion` and
//! `set` elements into this representation; the compiler resolves the
//! timeline and lowers it to PowerPoint timing nodes or baked scenes.

use crate::path::PathData;

/// The event a `begin` value can reference on another animation.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum BeginEvent {
    Begin,
    End,
}

/// An animation start condition.
#[derive(Clone, Debug)]
pub enum Begin {
    /// A plain offset from the document start, in seconds.
    Offset(f64),

    /// An event-based begin, like `foo.begin+1s`.
    ///
    /// Potentially cyclic; resolved by a bounded fixpoint.
    Event {
        /// The id of the referenced animation.
        reference: String,
        /// Which edge of the referenced animation fires this one.
        event: BeginEvent,
        /// An additional offset in seconds. May be negative.
        offset: f64,
    },
}

impl Default for Begin {
    fn default() -> Self {
        Begin::Offset(0.0)
    }
}

/// A repeat count.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Repeat {
    Finite(u32),
    Indefinite,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Finite(1)
    }
}

/// The `fill` timing attribute.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FillMode {
    Freeze,
    Remove,
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::Remove
    }
}

/// Resolved-enough timing of a single animation.
#[derive(Clone, Debug)]
pub struct Timing {
    /// Start condition.
    pub begin: Begin,

    /// Simple duration in seconds.
    pub dur: f64,

    /// Repeat count.
    pub repeat: Repeat,

    /// Whether the final value freezes or reverts.
    pub fill: FillMode,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            begin: Begin::default(),
            dur: 1.0,
            repeat: Repeat::default(),
            fill: FillMode::default(),
        }
    }
}

/// The interpolation mode.
///
/// `calcMode` attribute in SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CalcMode {
    Discrete,
    Linear,
    Paced,
    Spline,
}

impl Default for CalcMode {
    fn default() -> Self {
        CalcMode::Linear
    }
}

/// A cubic Bezier easing control pair.
///
/// One `keySplines` entry: `(x1 y1 x2 y2)` between two key times.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug)]
pub struct KeySpline {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// The transform component an `animateTransform` targets.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TransformType {
    Translate,
    Scale,
    Rotate,
    SkewX,
    SkewY,
}

/// What an animation animates.
#[derive(Clone, Debug)]
pub enum AnimationKind {
    /// A plain attribute animation (`animate`, `animateColor`).
    Attribute(String),

    /// An `animateTransform`.
    Transform(TransformType),

    /// An `animateMotion` along the provided path.
    Motion {
        /// The motion path, from `path` or a resolved `mpath` href.
        path: PathData,
    },

    /// A `set` element.
    Set(String),
}

/// A single collected animation element.
#[derive(Clone, Debug)]
pub struct Animation {
    /// The element's own id. Synthesized when absent, so event
    /// references always have a stable id space to resolve against.
    pub id: String,

    /// The id of the animated target element.
    pub target_id: String,

    /// What is animated.
    pub kind: AnimationKind,

    /// The raw `values` list (or the `from`/`to` pair).
    pub values: Vec<String>,

    /// Timing attributes.
    pub timing: Timing,

    /// Optional monotonic `[0,1]` key times, one per value.
    ///
    /// Even spacing is implied when absent.
    pub key_times: Option<Vec<f64>>,

    /// Optional easing splines, one per inter-key segment.
    pub key_splines: Option<Vec<KeySpline>>,

    /// Interpolation mode.
    pub calc_mode: CalcMode,
}

impl Animation {
    /// Returns `true` when the animation has enough data to evaluate.
    pub fn is_evaluable(&self) -> bool {
        match self.kind {
            AnimationKind::Motion { ref path } => !path.is_empty(),
            AnimationKind::Set(_) => !self.values.is_empty(),
            _ => self.values.len() >= 2 || (self.values.len() == 1 && self.timing.dur > 0.0),
        }
    }
}
