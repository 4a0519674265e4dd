// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::geom::{is_finite_positive, nearly_equal, Rect, Transform};

/// A 24-bit sRGB color.
///
/// Alpha never lives here; it travels separately as an [`Opacity`] so
/// color math and transparency stay independent.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    /// Builds a color from its channels.
    #[inline]
    pub fn new_rgb(red: u8, green: u8, blue: u8) -> Color {
        Color { red, green, blue }
    }

    /// Opaque black, the SVG default paint.
    #[inline]
    pub fn black() -> Color {
        Color::new_rgb(0, 0, 0)
    }

    /// Opaque white.
    #[inline]
    pub fn white() -> Color {
        Color::new_rgb(255, 255, 255)
    }

    /// Formats the color as an `RRGGBB` hex string, as used by DrawingML.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// A normalized alpha value.
///
/// Construction clamps into `0.0..=1.0`, so a stored opacity can be
/// multiplied and emitted without further range checks.
#[derive(Clone, Copy, Debug)]
pub struct Opacity(f64);

impl Opacity {
    /// Full coverage.
    pub const ONE: Opacity = Opacity(1.0);

    /// Clamps the input into the valid range; non-finite input maps
    /// to full coverage.
    #[inline]
    pub fn new(n: f64) -> Self {
        if n.is_finite() {
            Opacity(n.clamp(0.0, 1.0))
        } else {
            Opacity(1.0)
        }
    }

    /// Converts an 8-bit alpha channel.
    #[inline]
    pub fn new_u8(n: u8) -> Self {
        Opacity(n as f64 / 255.0)
    }

    /// The stored value.
    #[inline]
    pub fn get(&self) -> f64 {
        self.0
    }

    /// Whether the value rounds to full coverage.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        nearly_equal(self.0, 1.0)
    }
}

impl Default for Opacity {
    #[inline]
    fn default() -> Self {
        Opacity::ONE
    }
}

impl PartialEq for Opacity {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        nearly_equal(self.0, other.0)
    }
}

impl std::ops::Mul for Opacity {
    type Output = Opacity;

    #[inline]
    fn mul(self, rhs: Opacity) -> Opacity {
        Opacity::new(self.0 * rhs.0)
    }
}

/// An alias to `Opacity`.
pub type StopOffset = Opacity;

/// The coordinate space a paint server or clip resolves against.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Units {
    UserSpaceOnUse,
    ObjectBoundingBox,
}

// No `Default` on purpose: which space is implied differs per element
// kind, so every construction site must pick one.

/// A spread method.
///
/// `spreadMethod` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SpreadMethod {
    Pad,
    Reflect,
    Repeat,
}

impl Default for SpreadMethod {
    fn default() -> Self {
        Self::Pad
    }
}

/// One color stop of a gradient ramp.
#[derive(Clone, Copy, Debug)]
pub struct Stop {
    /// Position along the ramp, normalized to `0..=1`.
    pub offset: StopOffset,

    /// The stop color.
    pub color: Color,

    /// The stop's own transparency.
    pub opacity: Opacity,
}

/// The fields every gradient flavor carries.
#[derive(Clone, Debug)]
pub struct BaseGradient {
    /// The source element's id; used for diagnostics only.
    pub id: String,

    /// Coordinate system units.
    pub units: Units,

    /// Gradient transform.
    pub transform: Transform,

    /// Gradient spreading method.
    pub spread_method: SpreadMethod,

    /// A list of `stop` elements.
    ///
    /// Guaranteed to have at least two stops with monotonically
    /// non-decreasing offsets.
    pub stops: Vec<Stop>,
}

/// A linear gradient.
///
/// `linearGradient` element in SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct LinearGradient {
    /// Base gradient data.
    pub base: BaseGradient,

    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl std::ops::Deref for LinearGradient {
    type Target = BaseGradient;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// A radial gradient.
///
/// `radialGradient` element in SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct RadialGradient {
    /// Base gradient data.
    pub base: BaseGradient,

    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fx: f64,
    pub fy: f64,
}

impl std::ops::Deref for RadialGradient {
    type Target = BaseGradient;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// A tile preset recovered from a pattern's content.
///
/// PowerPoint has no direct counterpart of SVG patterns, so pattern
/// children are classified into one of the supported tile kinds.
/// Unrecognized content degrades to a solid fill.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TileKind {
    HorizontalLines,
    VerticalLines,
    DiagonalLines,
    CrossHatch,
    Grid,
    Brick,
    Dots,
    Solid(Color),
}

/// A pattern element.
///
/// `pattern` element in SVG.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// The source element's id; used for diagnostics only.
    pub id: String,

    /// Coordinate system units.
    pub units: Units,

    /// Pattern transform.
    pub transform: Transform,

    /// Pattern tile rectangle.
    pub rect: Rect,

    /// The classified tile content.
    pub tile: TileKind,

    /// Tile foreground color.
    pub color: Color,
}

/// A paint style.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Paint {
    Color(Color),
    LinearGradient(Rc<LinearGradient>),
    RadialGradient(Rc<RadialGradient>),
    Pattern(Rc<Pattern>),
}

impl Paint {
    /// The coordinate space of the backing paint server; plain colors
    /// have none.
    #[inline]
    pub fn units(&self) -> Option<Units> {
        match self {
            Self::Color(_) => None,
            Self::LinearGradient(ref lg) => Some(lg.units),
            Self::RadialGradient(ref rg) => Some(rg.units),
            Self::Pattern(ref patt) => Some(patt.units),
        }
    }
}

impl PartialEq for Paint {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Color(lc), Self::Color(rc)) => lc == rc,
            (Self::LinearGradient(ref lg1), Self::LinearGradient(ref lg2)) => Rc::ptr_eq(lg1, lg2),
            (Self::RadialGradient(ref rg1), Self::RadialGradient(ref rg2)) => Rc::ptr_eq(rg1, rg2),
            (Self::Pattern(ref p1), Self::Pattern(ref p2)) => Rc::ptr_eq(p1, p2),
            _ => false,
        }
    }
}

/// A fill style.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct Fill {
    pub paint: Paint,
    pub opacity: Opacity,
}

impl Fill {
    /// Wraps a paint with full opacity.
    pub fn from_paint(paint: Paint) -> Self {
        Fill {
            paint,
            ..Fill::default()
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        // Black is what an unstyled SVG shape paints with.
        Fill {
            paint: Paint::Color(Color::black()),
            opacity: Opacity::ONE,
        }
    }
}

/// A stroke width.
///
/// The spec invariant: a stroke that exists has a usable width, so
/// zero, negative and non-finite candidates are rejected at the
/// boundary rather than carried around.
#[derive(Clone, Copy, Debug)]
pub struct StrokeWidth(f64);

impl StrokeWidth {
    /// Validates a candidate width.
    #[inline]
    pub fn new(n: f64) -> Option<Self> {
        if is_finite_positive(n) {
            Some(StrokeWidth(n))
        } else {
            None
        }
    }

    /// The width in user units.
    #[inline]
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for StrokeWidth {
    /// The SVG initial value of `stroke-width`.
    #[inline]
    fn default() -> Self {
        StrokeWidth(1.0)
    }
}

/// A miter limit.
///
/// SVG declares values below 1.0 erroneous; this type absorbs them by
/// clamping to the floor instead of failing, since a bad limit is not
/// worth dropping an element over.
#[derive(Clone, Copy, Debug)]
pub struct MiterLimit(f64);

impl MiterLimit {
    /// Clamps a candidate to the valid range.
    #[inline]
    pub fn new(n: f64) -> Self {
        if n.is_finite() && n > 1.0 {
            MiterLimit(n)
        } else {
            MiterLimit(1.0)
        }
    }

    /// The limit as a plain number.
    #[inline]
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for MiterLimit {
    /// The SVG initial value of `stroke-miterlimit`.
    #[inline]
    fn default() -> Self {
        MiterLimit(4.0)
    }
}

/// How open stroke ends are finished.
///
/// `stroke-linecap` attribute in the SVG; `butt` is the initial value.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl Default for LineCap {
    fn default() -> Self {
        Self::Butt
    }
}

/// How stroke segments are joined.
///
/// `stroke-linejoin` attribute in the SVG; `miter` is the initial value.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

impl Default for LineJoin {
    fn default() -> Self {
        Self::Miter
    }
}

/// A fully resolved stroke.
///
/// Only built when the element actually strokes; there is no default
/// instance, because "no stroke" is `Option::None` at the use sites.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct Stroke {
    pub paint: Paint,
    pub width: StrokeWidth,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: MiterLimit,
    pub dash_array: Option<Vec<f64>>,
    pub dash_offset: f64,
    pub opacity: Opacity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_is_clamped() {
        assert_eq!(Opacity::new(1.5).get(), 1.0);
        assert_eq!(Opacity::new(-0.5).get(), 0.0);
        assert_eq!(Opacity::new(f64::NAN).get(), 1.0);
    }

    #[test]
    fn color_hex() {
        assert_eq!(Color::new_rgb(0x00, 0x66, 0xCC).to_hex(), "0066CC");
        assert_eq!(Color::black().to_hex(), "000000");
    }

    #[test]
    fn stroke_width_rejects_bad_input() {
        assert!(StrokeWidth::new(0.0).is_none());
        assert!(StrokeWidth::new(-2.0).is_none());
        assert!(StrokeWidth::new(f64::NAN).is_none());
        assert_eq!(StrokeWidth::new(2.5).unwrap().get(), 2.5);
        assert_eq!(StrokeWidth::default().get(), 1.0);
    }

    #[test]
    fn miter_limit_floor() {
        assert_eq!(MiterLimit::new(0.5).get(), 1.0);
        assert_eq!(MiterLimit::new(f64::NAN).get(), 1.0);
        assert_eq!(MiterLimit::new(10.0).get(), 10.0);
    }
}
