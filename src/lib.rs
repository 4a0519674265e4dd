// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svg2pptx` converts SVG documents into PowerPoint presentations while
preserving vector fidelity.

The pipeline: SVG bytes are parsed into an intermediate scene tree,
a policy engine decides per element whether to emit native DrawingML
or an embedded metafile, a mapper emits DrawingML fragments, and the
OOXML packager assembles the final `.pptx` container. Timed SMIL
animations are lowered to PowerPoint timing nodes or baked into
successive slides.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::too_many_arguments)]

mod animate;
mod emf;
mod mapper;
mod ooxml;
mod policy;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

pub use svg2pptx_ir as ir;
pub use svg2pptx_parser as parser;

pub use crate::policy::{Decision, PolicyConfig};
pub use svg2pptx_parser::Diagnostics;

/// A policy profile.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Profile {
    /// Aggressive native emission; tolerates minor fidelity loss.
    Speed,
    /// Complexity thresholds tuned to typical PowerPoint capability.
    Balanced,
    /// Conservative native emission; falls back to metafiles earlier.
    Quality,
}

impl Default for Profile {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::str::FromStr for Profile {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speed" => Ok(Profile::Speed),
            "balanced" => Ok(Profile::Balanced),
            "quality" => Ok(Profile::Quality),
            _ => Err("invalid"),
        }
    }
}

/// The animation lowering strategy.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AnimationMode {
    /// Lower to PowerPoint timing nodes when expressible,
    /// bake otherwise.
    PowerPoint,
    /// Always bake the timeline into successive slides.
    Baked,
    /// Drop the timeline; sample a single static state.
    Static,
}

impl Default for AnimationMode {
    fn default() -> Self {
        Self::PowerPoint
    }
}

impl std::str::FromStr for AnimationMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "powerpoint" => Ok(AnimationMode::PowerPoint),
            "baked" => Ok(AnimationMode::Baked),
            "static" => Ok(AnimationMode::Static),
            _ => Err("invalid"),
        }
    }
}

/// The widescreen 16:9 slide size in EMU.
pub const WIDESCREEN_SLIDE: (u64, u64) = (12_192_000, 6_858_000);

/// Conversion options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Policy profile.
    ///
    /// Default: balanced
    pub profile: Profile,

    /// Target slide width in EMU; the height is derived from the
    /// viewBox aspect ratio.
    ///
    /// Default: 12192000 (a widescreen slide)
    pub slide_width_emu: u64,

    /// When `false`, animations are dropped and the last-frame state
    /// is used.
    ///
    /// Default: true
    pub preserve_animations: bool,

    /// The animation lowering strategy.
    ///
    /// Default: powerpoint
    pub animation_mode: AnimationMode,

    /// Sample rate for baked animations, in frames per second.
    ///
    /// Default: 24 [possible values: 1..60]
    pub bake_fps: u32,

    /// The baked keyframe cap; the timeline is truncated after.
    ///
    /// Default: 30 [possible values: 1..120]
    pub bake_max_keyframes: u32,

    /// Font substitutions applied during text lowering.
    pub font_fallback: HashMap<String, String>,

    /// Front-end options.
    pub parser: parser::Options,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            profile: Profile::default(),
            slide_width_emu: WIDESCREEN_SLIDE.0,
            preserve_animations: true,
            animation_mode: AnimationMode::default(),
            bake_fps: 24,
            bake_max_keyframes: 30,
            font_fallback: HashMap::new(),
            parser: parser::Options::default(),
        }
    }
}

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// The input SVG could not be parsed.
    Parse(parser::Error),

    /// The conversion was cancelled; no partial output was produced.
    Cancelled,

    /// The document converted to nothing renderable.
    NoContent,

    /// OOXML packaging failed.
    Packaging(String),
}

impl From<parser::Error> for Error {
    fn from(e: parser::Error) -> Self {
        Error::Parse(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Packaging(e.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::Parse(ref e) => write!(f, "SVG parsing failed cause {}", e),
            Error::Cancelled => write!(f, "the conversion was cancelled"),
            Error::NoContent => write!(f, "the document has no renderable content"),
            Error::Packaging(ref e) => write!(f, "OOXML packaging failed cause {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// The result of a conversion.
#[derive(Debug)]
pub struct Conversion {
    /// The finished `.pptx` byte stream.
    pub pptx: Vec<u8>,

    /// Per-request diagnostics. They never mutate the output; every
    /// dropped element is named here.
    pub diagnostics: Vec<String>,
}

/// Converts an SVG byte stream into a `.pptx` byte stream.
pub fn convert(data: &[u8], opt: &Options) -> Result<Conversion, Error> {
    let cancel = AtomicBool::new(false);
    convert_with_cancel(data, opt, &cancel)
}

/// Converts with a cooperative cancellation signal.
///
/// The signal is checked at stage boundaries. A cancelled conversion
/// releases all per-request resources and produces no partial output.
pub fn convert_with_cancel(
    data: &[u8],
    opt: &Options,
    cancel: &AtomicBool,
) -> Result<Conversion, Error> {
    fn check(cancel: &AtomicBool) -> Result<(), Error> {
        if cancel.load(Ordering::Relaxed) {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    let mut diag = Diagnostics::default();

    check(cancel)?;
    let parsed = parser::parse(data, &opt.parser, &mut diag)?;

    check(cancel)?;
    let plan = animate::plan(parsed, opt, &mut diag);

    check(cancel)?;
    let config = policy::PolicyConfig::from_profile(opt.profile);

    let mut mapped = Vec::with_capacity(plan.scenes.len());
    for (index, scene) in plan.scenes.iter().enumerate() {
        check(cancel)?;

        let decisions = policy::decide(scene, &config);
        let effects = if index == 0 {
            plan.effects.as_deref()
        } else {
            None
        };
        mapped.push(mapper::map_slide(
            scene, &decisions, opt, effects, &mut diag,
        ));
    }

    if mapped.is_empty() {
        return Err(Error::NoContent);
    }

    check(cancel)?;
    let view_box = plan.scenes[0].view_box;
    let pptx = ooxml::Package::new(opt.slide_width_emu, view_box, mapped).write()?;

    Ok(Conversion {
        pptx,
        diagnostics: diag.take(),
    })
}
