// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svg2pptx-parser` is the SVG front end used by `svg2pptx`.

It parses SVG (or SVGZ) bytes into a simplified document, runs the
preprocessing passes, and constructs the `svg2pptx-ir` scene tree
together with the collected SMIL animations.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::question_mark)]
#![allow(clippy::too_many_arguments)]

mod animation;
mod converter;
mod filter;
mod image;
mod paint_server;
mod path;
mod preprocess;
mod style;
pub mod svgtree;
mod text;
mod units;

pub use crate::path::{parse_path, PathParseError};
pub use roxmltree;

use svg2pptx_ir::Scene;

/// Front-end failures that abort the whole request.
///
/// Per-element problems never surface here; they are recovered into
/// the [`Diagnostics`] sink instead.
#[derive(Debug)]
pub enum Error {
    /// The input bytes are not valid UTF-8.
    NotAnUtf8Str,

    /// The input looked gzip-compressed but did not inflate.
    MalformedGZip,

    /// The document crossed the element-count ceiling that guards
    /// against decompression bombs and adversarial trees.
    ElementsLimitReached,

    /// No usable viewport: the outermost `svg` is missing, or its
    /// resolved size is degenerate.
    InvalidSize,

    /// The XML itself is malformed.
    ParsingFailed(roxmltree::Error),
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::ParsingFailed(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::NotAnUtf8Str => {
                write!(f, "the input is not UTF-8")
            }
            Error::MalformedGZip => {
                write!(f, "the gzip stream is corrupted")
            }
            Error::ElementsLimitReached => {
                write!(f, "the document exceeds the element limit")
            }
            Error::InvalidSize => {
                write!(f, "the document has no usable viewport")
            }
            Error::ParsingFailed(ref e) => {
                write!(f, "malformed XML: {}", e)
            }
        }
    }
}

impl std::error::Error for Error {}

/// A per-request diagnostics sink.
///
/// Every skipped element, dropped reference and recovered failure is
/// recorded here; nothing is lost silently. Messages are also mirrored
/// to the `log` facade.
#[derive(Clone, Default, Debug)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    /// Records a warning.
    pub fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.messages.push(message);
    }

    /// Returns all recorded messages.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Returns `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Moves all messages out of the sink.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

/// Processing options.
#[derive(Clone, Debug)]
pub struct Options {
    /// Target DPI, used during relative units conversion.
    ///
    /// Default: 96.0
    pub dpi: f64,

    /// The default font family, used when no `font-family` is present.
    ///
    /// Default: Arial
    pub font_family: String,

    /// The default font size, used when no `font-size` is present.
    ///
    /// Default: 12
    pub font_size: f64,

    /// The default viewport size, used when the document has neither
    /// `width`/`height` nor `viewBox`.
    ///
    /// Default: 100x100
    pub default_size: (f64, f64),
}

impl Default for Options {
    fn default() -> Self {
        Options {
            dpi: 96.0,
            font_family: "Arial".to_string(),
            font_size: 12.0,
            default_size: (100.0, 100.0),
        }
    }
}

/// The result of a parse: the scene plus its collected animations.
#[derive(Debug)]
pub struct ParsedSvg {
    /// The IR scene.
    pub scene: Scene,

    /// Collected SMIL animations in document order.
    pub animations: Vec<svg2pptx_ir::animate::Animation>,
}

/// Parses SVG bytes into an IR scene.
///
/// SVGZ input is detected by the gzip magic and inflated first.
pub fn parse(data: &[u8], opt: &Options, diag: &mut Diagnostics) -> Result<ParsedSvg, Error> {
    let inflated;
    let data = if data.starts_with(&[0x1f, 0x8b]) {
        inflated = inflate(data)?;
        inflated.as_slice()
    } else {
        data
    };

    let text = std::str::from_utf8(data).map_err(|_| Error::NotAnUtf8Str)?;
    parse_str(text, opt, diag)
}

/// Parses an SVG string into an IR scene.
pub fn parse_str(text: &str, opt: &Options, diag: &mut Diagnostics) -> Result<ParsedSvg, Error> {
    let mut doc = svgtree::Document::parse(text, diag)?;
    preprocess::preprocess(&mut doc, opt, diag)?;
    let animations = animation::collect(&mut doc, diag);
    let scene = converter::convert_doc(&doc, opt, diag)?;
    Ok(ParsedSvg { scene, animations })
}

/// Inflates an SVGZ payload.
fn inflate(data: &[u8]) -> Result<Vec<u8>, Error> {
    use std::io::Read;

    let mut out = Vec::new();
    flate2::read::GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| Error::MalformedGZip)?;
    Ok(out)
}

