// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use float_cmp::{ApproxEq, F64Margin};

/// The slop used when comparing user-space coordinates: a couple of
/// representable steps for large magnitudes, an absolute tolerance of
/// 1e-9 near zero.
const COORD_MARGIN: F64Margin = F64Margin {
    epsilon: 1e-9,
    ulps: 2,
};

/// Compares two coordinates within [`COORD_MARGIN`].
///
/// Geometry in this crate never relies on exact float equality;
/// every equality check on coordinate-carrying types routes through
/// this helper.
#[inline]
pub fn nearly_equal(a: f64, b: f64) -> bool {
    a.approx_eq(b, COORD_MARGIN)
}

/// Tests a coordinate against zero with an absolute tolerance.
///
/// ULP-style comparison degenerates around zero, so this is a plain
/// magnitude check.
#[inline]
pub fn nearly_zero(n: f64) -> bool {
    n.abs() <= 1e-9
}

/// Tests that a value can serve as a width, height or radius:
/// finite and strictly greater than zero.
#[inline]
pub fn is_finite_positive(n: f64) -> bool {
    n.is_finite() && n > 0.0
}

/// A 2D point in user-space units.
#[allow(missing_docs)]
#[derive(Clone, Copy, Default, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl PartialEq for Point {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        nearly_equal(self.x, other.x) && nearly_equal(self.y, other.y)
    }
}

/// A width/height pair, both finite and positive.
#[derive(Clone, Copy, Debug)]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    /// Creates a size; dimensions that are zero, negative or
    /// non-finite are rejected.
    #[inline]
    pub fn new(width: f64, height: f64) -> Option<Self> {
        if is_finite_positive(width) && is_finite_positive(height) {
            Some(Size { width, height })
        } else {
            None
        }
    }

    /// The width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// The height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Places the size at a position, producing a rect.
    #[inline]
    pub fn to_rect(&self, x: f64, y: f64) -> Rect {
        // Dimensions were validated at construction.
        Rect::new(x, y, self.width, self.height).unwrap()
    }
}

impl PartialEq for Size {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        nearly_equal(self.width, other.width) && nearly_equal(self.height, other.height)
    }
}

/// An axis-aligned rectangle with a finite origin and positive,
/// finite dimensions.
#[derive(Clone, Copy, Debug)]
pub struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Rect {
    /// Creates a rect; degenerate or non-finite inputs are rejected.
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        if x.is_finite()
            && y.is_finite()
            && is_finite_positive(width)
            && is_finite_positive(height)
        {
            Some(Rect {
                x,
                y,
                width,
                height,
            })
        } else {
            None
        }
    }

    /// The left edge.
    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// The top edge.
    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// The horizontal extent.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// The vertical extent.
    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// The rect's dimensions.
    #[inline]
    pub fn size(&self) -> Size {
        // A rect's dimensions always form a valid size.
        Size::new(self.width, self.height).unwrap()
    }

    /// The smallest rect covering both `self` and `r`.
    pub fn expand(&self, r: Rect) -> Rect {
        let x = self.x.min(r.x);
        let y = self.y.min(r.y);
        let right = self.right().max(r.right());
        let bottom = self.bottom().max(r.bottom());

        // The union covers `self`, so it cannot be degenerate.
        Rect::new(x, y, right - x, bottom - y).unwrap()
    }

    /// Maps the rect through an affine transform and returns the
    /// bounding rect of the four mapped corners.
    pub fn transform(&self, ts: Transform) -> Option<Rect> {
        let (x1, y1) = ts.apply(self.x, self.y);
        let (x2, y2) = ts.apply(self.right(), self.y);
        let (x3, y3) = ts.apply(self.right(), self.bottom());
        let (x4, y4) = ts.apply(self.x, self.bottom());

        let minx = x1.min(x2).min(x3).min(x4);
        let miny = y1.min(y2).min(y3).min(y4);
        let maxx = x1.max(x2).max(x3).max(x4);
        let maxy = y1.max(y2).max(y3).max(y4);

        Rect::new(minx, miny, maxx - minx, maxy - miny)
    }
}

impl PartialEq for Rect {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        nearly_equal(self.x, other.x)
            && nearly_equal(self.y, other.y)
            && nearly_equal(self.width, other.width)
            && nearly_equal(self.height, other.height)
    }
}

/// A 2x3 affine matrix, the in-memory form of the SVG `transform`
/// attribute: `[a c e; b d f]` applied as column vectors.
#[derive(Clone, Copy, Debug)]
#[allow(missing_docs)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl From<svgtypes::Transform> for Transform {
    fn from(ts: svgtypes::Transform) -> Self {
        Transform::new(ts.a, ts.b, ts.c, ts.d, ts.e, ts.f)
    }
}

impl Transform {
    /// Builds a matrix from its six members.
    #[inline]
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Transform { a, b, c, d, e, f }
    }

    /// A pure translation.
    #[inline]
    pub fn new_translate(x: f64, y: f64) -> Self {
        Transform::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// A pure scale about the origin.
    #[inline]
    pub fn new_scale(sx: f64, sy: f64) -> Self {
        Transform::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// A rotation about the origin, in degrees.
    #[inline]
    pub fn new_rotate(angle: f64) -> Self {
        let v = angle.to_radians();
        let a = v.cos();
        let b = v.sin();
        let c = -b;
        let d = a;
        Transform::new(a, b, c, d, 0.0, 0.0)
    }

    /// A rotation about an arbitrary center, in degrees.
    #[inline]
    pub fn new_rotate_at(angle: f64, x: f64, y: f64) -> Self {
        let mut ts = Self::default();
        ts.translate(x, y);
        ts.rotate(angle);
        ts.translate(-x, -y);
        ts
    }

    /// A shear along the X axis, in degrees.
    #[inline]
    pub fn new_skew_x(angle: f64) -> Self {
        let c = angle.to_radians().tan();
        Transform::new(1.0, 0.0, c, 1.0, 0.0, 0.0)
    }

    /// A shear along the Y axis, in degrees.
    #[inline]
    pub fn new_skew_y(angle: f64) -> Self {
        let b = angle.to_radians().tan();
        Transform::new(1.0, b, 0.0, 1.0, 0.0, 0.0)
    }

    /// Composes a translation onto this matrix.
    #[inline]
    pub fn translate(&mut self, x: f64, y: f64) {
        self.append(&Transform::new_translate(x, y));
    }

    /// Composes a scale onto this matrix.
    #[inline]
    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.append(&Transform::new_scale(sx, sy));
    }

    /// Composes a rotation onto this matrix.
    #[inline]
    pub fn rotate(&mut self, angle: f64) {
        self.append(&Transform::new_rotate(angle));
    }

    /// Composes `other` after this matrix: points pass through
    /// `other` first.
    #[inline]
    pub fn append(&mut self, other: &Transform) {
        *self = multiply(self, other);
    }

    /// Composes `other` before this matrix: points pass through
    /// `self` first.
    #[inline]
    pub fn prepend(&mut self, other: &Transform) {
        *self = multiply(other, self);
    }

    /// Whether this is the identity matrix.
    pub fn is_default(&self) -> bool {
        nearly_equal(self.a, 1.0)
            && nearly_zero(self.b)
            && nearly_zero(self.c)
            && nearly_equal(self.d, 1.0)
            && nearly_zero(self.e)
            && nearly_zero(self.f)
    }

    /// Whether the matrix moves points without scaling, rotating
    /// or shearing them.
    pub fn is_translate(&self) -> bool {
        nearly_equal(self.a, 1.0)
            && nearly_zero(self.b)
            && nearly_zero(self.c)
            && nearly_equal(self.d, 1.0)
    }

    /// Whether the matrix is free of rotation and shear, i.e. of the
    /// `(sx 0 0 sy x y)` form that can be folded into geometry.
    pub fn is_scale_translate(&self) -> bool {
        nearly_zero(self.b) && nearly_zero(self.c)
    }

    /// The translation members.
    #[inline]
    pub fn get_translate(&self) -> (f64, f64) {
        (self.e, self.f)
    }

    /// The per-axis scale factors, rotation included.
    #[inline]
    pub fn get_scale(&self) -> (f64, f64) {
        let x_scale = (self.a * self.a + self.c * self.c).sqrt();
        let y_scale = (self.b * self.b + self.d * self.d).sqrt();
        (x_scale, y_scale)
    }

    /// The inverse matrix, unless this one is singular.
    pub fn invert(&self) -> Option<Transform> {
        let det = self.a * self.d - self.b * self.c;
        if nearly_zero(det) {
            return None;
        }

        let inv_det = 1.0 / det;
        Some(Transform::new(
            self.d * inv_det,
            -self.b * inv_det,
            -self.c * inv_det,
            self.a * inv_det,
            (self.c * self.f - self.d * self.e) * inv_det,
            (self.b * self.e - self.a * self.f) * inv_det,
        ))
    }

    /// Maps a coordinate pair through the matrix.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let new_x = self.a * x + self.c * y + self.e;
        let new_y = self.b * x + self.d * y + self.f;
        (new_x, new_y)
    }

    /// Maps a point through the matrix.
    #[inline]
    pub fn apply_to(&self, p: Point) -> Point {
        let (x, y) = self.apply(p.x, p.y);
        Point::new(x, y)
    }

    /// Whether every member is finite.
    pub fn is_valid(&self) -> bool {
        self.a.is_finite()
            && self.b.is_finite()
            && self.c.is_finite()
            && self.d.is_finite()
            && self.e.is_finite()
            && self.f.is_finite()
    }
}

#[inline(never)]
fn multiply(ts1: &Transform, ts2: &Transform) -> Transform {
    Transform {
        a: ts1.a * ts2.a + ts1.c * ts2.b,
        b: ts1.b * ts2.a + ts1.d * ts2.b,
        c: ts1.a * ts2.c + ts1.c * ts2.d,
        d: ts1.b * ts2.c + ts1.d * ts2.d,
        e: ts1.a * ts2.e + ts1.c * ts2.f + ts1.e,
        f: ts1.b * ts2.e + ts1.d * ts2.f + ts1.f,
    }
}

impl Default for Transform {
    #[inline]
    fn default() -> Transform {
        Transform::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        nearly_equal(self.a, other.a)
            && nearly_equal(self.b, other.b)
            && nearly_equal(self.c, other.c)
            && nearly_equal(self.d, other.d)
            && nearly_equal(self.e, other.e)
            && nearly_equal(self.f, other.f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_append() {
        let mut ts = Transform::default();
        ts.translate(10.0, 20.0);
        ts.scale(2.0, 3.0);

        assert_eq!(ts.apply(1.0, 1.0), (12.0, 23.0));
    }

    #[test]
    fn transform_invert() {
        let mut ts = Transform::new_translate(10.0, 20.0);
        ts.scale(2.0, 4.0);

        let inv = ts.invert().unwrap();
        let (fx, fy) = ts.apply(3.0, 5.0);
        let (x, y) = inv.apply(fx, fy);
        assert!(nearly_equal(x, 3.0));
        assert!(nearly_equal(y, 5.0));
    }

    #[test]
    fn degenerate_transform_invert() {
        let ts = Transform::new_scale(0.0, 1.0);
        assert!(ts.invert().is_none());
    }

    #[test]
    fn rect_transform() {
        let r = Rect::new(10.0, 10.0, 20.0, 10.0).unwrap();
        let r = r.transform(Transform::new_scale(2.0, 2.0)).unwrap();
        assert_eq!(r, Rect::new(20.0, 20.0, 40.0, 20.0).unwrap());
    }

    #[test]
    fn invalid_rect() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_none());
        assert!(Rect::new(0.0, 0.0, -1.0, 10.0).is_none());
        assert!(Rect::new(f64::NAN, 0.0, 1.0, 10.0).is_none());
    }

    #[test]
    fn comparison_tolerances() {
        assert!(nearly_equal(1.0, 1.0 + 1e-12));
        assert!(!nearly_equal(1.0, 1.0001));
        assert!(nearly_zero(1e-12));
        assert!(!nearly_zero(1e-6));
        assert!(is_finite_positive(0.5));
        assert!(!is_finite_positive(0.0));
        assert!(!is_finite_positive(f64::INFINITY));
    }
}
