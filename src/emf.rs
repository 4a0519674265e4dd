// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Windows Enhanced Metafile synthesis.
//!
//! The metafile is the vector-compatible fallback for content
//! PowerPoint cannot express natively: a small record subset is enough
//! to carry filled and stroked path geometry plus the pattern tile
//! library.

use std::collections::HashMap;
use std::hash::Hasher;

use once_cell::sync::Lazy;
use siphasher::sip::SipHasher13;

use svg2pptx_ir::{Color, PathData, Point, Rect, Segment, TileKind};

/// EMF record types (subset).
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
#[repr(u32)]
enum RecordType {
    Header = 1,
    Eof = 14,
    MoveToEx = 27,
    SelectObject = 37,
    CreatePen = 38,
    CreateBrushIndirect = 39,
    Rectangle = 43,
    LineTo = 54,
    PolyBezier16 = 85,
    Polygon16 = 86,
}

/// EMF brush styles.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
#[repr(u32)]
enum BrushStyle {
    Solid = 0,
    Null = 1,
    Hatched = 2,
}

/// EMF hatch styles.
#[derive(Clone, Copy, Debug)]
#[repr(u32)]
enum HatchStyle {
    Horizontal = 0,
    Vertical = 1,
    ForwardDiagonal = 2,
    Cross = 4,
}

/// Size of the fixed header record, in bytes.
const HEADER_SIZE: usize = 108;

/// Device resolution the frame rectangle is computed against.
const DEVICE_DPI: u32 = 96;

/// EMUs per 0.01 millimeter.
const EMU_PER_CENTIMM: i64 = 360;

/// COLORREF is 0x00BBGGRR.
fn colorref(color: Color) -> u32 {
    (color.red as u32) | ((color.green as u32) << 8) | ((color.blue as u32) << 16)
}

/// An EMF record accumulator.
///
/// `finalize` patches the header with the total size, record count and
/// handle count, and returns the complete blob.
#[derive(Debug)]
pub struct EmfBuilder {
    /// Canvas width in EMU.
    width: i64,
    /// Canvas height in EMU.
    height: i64,
    records: Vec<Vec<u8>>,
    next_handle: u32,
}

impl EmfBuilder {
    /// Creates a builder with the given canvas size in EMU.
    pub fn new(width: i64, height: i64) -> Self {
        let mut builder = EmfBuilder {
            width: width.max(1),
            height: height.max(1),
            records: Vec::new(),
            next_handle: 1,
        };
        builder.push_header();
        builder
    }

    fn push_header(&mut self) {
        let mut data = Vec::with_capacity(HEADER_SIZE);
        put_u32(&mut data, RecordType::Header as u32);
        put_u32(&mut data, HEADER_SIZE as u32);

        // Bounds rectangle, logical units.
        put_i32(&mut data, 0);
        put_i32(&mut data, 0);
        put_i32(&mut data, self.width as i32);
        put_i32(&mut data, self.height as i32);

        // Frame rectangle, 0.01 mm device units.
        let frame_w = (self.width / EMU_PER_CENTIMM) as i32;
        let frame_h = (self.height / EMU_PER_CENTIMM) as i32;
        put_i32(&mut data, 0);
        put_i32(&mut data, 0);
        put_i32(&mut data, frame_w);
        put_i32(&mut data, frame_h);

        // Signature.
        data.extend_from_slice(b"ENHMETA ");

        // Version; total size and record count are patched in finalize().
        put_u32(&mut data, 0x10000);
        put_u32(&mut data, 0);
        put_u32(&mut data, 0);

        // Handle count (patched), reserved, description length/offset.
        put_u16(&mut data, 0);
        put_u16(&mut data, 0);
        put_u16(&mut data, 0);
        put_u16(&mut data, 0);

        // Palette entries and the device size in pixels.
        put_u32(&mut data, 0);
        put_u32(&mut data, (frame_w / 100).max(1) as u32);
        put_u32(&mut data, (frame_h / 100).max(1) as u32);

        // Device resolution.
        put_u32(&mut data, DEVICE_DPI);
        put_u32(&mut data, DEVICE_DPI);

        // Millimeter size.
        put_u32(&mut data, (frame_w / 100).max(1) as u32);
        put_u32(&mut data, (frame_h / 100).max(1) as u32);

        data.resize(HEADER_SIZE, 0);
        self.records.push(data);
    }

    /// Appends a record; the size includes the 8-byte record header
    /// and is padded to a multiple of 4.
    fn push_record(&mut self, kind: RecordType, payload: &[u8]) {
        let mut padded = payload.len();
        while padded % 4 != 0 {
            padded += 1;
        }

        let mut record = Vec::with_capacity(8 + padded);
        put_u32(&mut record, kind as u32);
        put_u32(&mut record, (8 + padded) as u32);
        record.extend_from_slice(payload);
        record.resize(8 + padded, 0);
        self.records.push(record);
    }

    fn allocate_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Creates a solid brush and returns its handle.
    pub fn create_solid_brush(&mut self, color: Color) -> u32 {
        self.create_brush(BrushStyle::Solid, color, 0)
    }

    /// Creates a hatched brush for the given tile kind.
    ///
    /// Dots degrade to a solid brush and grids to a crosshatch,
    /// matching the tile library presets.
    pub fn create_tile_brush(&mut self, tile: TileKind, color: Color) -> u32 {
        match tile {
            TileKind::HorizontalLines => {
                self.create_brush(BrushStyle::Hatched, color, HatchStyle::Horizontal as u32)
            }
            TileKind::VerticalLines => {
                self.create_brush(BrushStyle::Hatched, color, HatchStyle::Vertical as u32)
            }
            TileKind::DiagonalLines => self.create_brush(
                BrushStyle::Hatched,
                color,
                HatchStyle::ForwardDiagonal as u32,
            ),
            TileKind::CrossHatch | TileKind::Grid => {
                self.create_brush(BrushStyle::Hatched, color, HatchStyle::Cross as u32)
            }
            TileKind::Dots | TileKind::Brick => self.create_solid_brush(color),
            TileKind::Solid(c) => self.create_solid_brush(c),
        }
    }

    fn create_brush(&mut self, style: BrushStyle, color: Color, hatch: u32) -> u32 {
        let handle = self.allocate_handle();

        let mut payload = Vec::with_capacity(16);
        put_u32(&mut payload, handle);
        put_u32(&mut payload, style as u32);
        put_u32(&mut payload, colorref(color));
        put_u32(&mut payload, hatch);
        self.push_record(RecordType::CreateBrushIndirect, &payload);

        handle
    }

    /// Creates a solid pen and returns its handle.
    pub fn create_pen(&mut self, color: Color, width: i32) -> u32 {
        let handle = self.allocate_handle();

        let mut payload = Vec::with_capacity(20);
        put_u32(&mut payload, handle);
        // PS_SOLID.
        put_u32(&mut payload, 0);
        // Width as a POINTL; only x is used.
        put_i32(&mut payload, width.max(1));
        put_i32(&mut payload, 0);
        put_u32(&mut payload, colorref(color));
        self.push_record(RecordType::CreatePen, &payload);

        handle
    }

    /// Selects a previously created object.
    pub fn select_object(&mut self, handle: u32) {
        let mut payload = Vec::with_capacity(4);
        put_u32(&mut payload, handle);
        self.push_record(RecordType::SelectObject, &payload);
    }

    /// Fills a rectangle with the selected brush.
    pub fn rectangle(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let mut payload = Vec::with_capacity(16);
        put_i32(&mut payload, x);
        put_i32(&mut payload, y);
        put_i32(&mut payload, x + width);
        put_i32(&mut payload, y + height);
        self.push_record(RecordType::Rectangle, &payload);
    }

    /// Emits a filled polygon from 16-bit points.
    pub fn polygon16(&mut self, points: &[(i16, i16)]) {
        if points.is_empty() {
            return;
        }

        let mut payload = Vec::with_capacity(24 + points.len() * 4);
        self.put_point_block(&mut payload, points);
        self.push_record(RecordType::Polygon16, &payload);
    }

    /// Emits a Bezier chain: the start point plus control triples.
    pub fn polybezier16(&mut self, points: &[(i16, i16)]) {
        if points.len() < 4 || (points.len() - 1) % 3 != 0 {
            return;
        }

        let mut payload = Vec::with_capacity(24 + points.len() * 4);
        self.put_point_block(&mut payload, points);
        self.push_record(RecordType::PolyBezier16, &payload);
    }

    fn put_point_block(&self, payload: &mut Vec<u8>, points: &[(i16, i16)]) {
        let min_x = points.iter().map(|p| p.0).min().unwrap_or(0);
        let min_y = points.iter().map(|p| p.1).min().unwrap_or(0);
        let max_x = points.iter().map(|p| p.0).max().unwrap_or(0);
        let max_y = points.iter().map(|p| p.1).max().unwrap_or(0);

        put_i32(payload, min_x as i32);
        put_i32(payload, min_y as i32);
        put_i32(payload, max_x as i32);
        put_i32(payload, max_y as i32);
        put_u32(payload, points.len() as u32);
        for (x, y) in points {
            put_i16(payload, *x);
            put_i16(payload, *y);
        }
    }

    /// Moves the current position.
    pub fn move_to(&mut self, x: i32, y: i32) {
        let mut payload = Vec::with_capacity(8);
        put_i32(&mut payload, x);
        put_i32(&mut payload, y);
        self.push_record(RecordType::MoveToEx, &payload);
    }

    /// Draws a line from the current position.
    pub fn line_to(&mut self, x: i32, y: i32) {
        let mut payload = Vec::with_capacity(8);
        put_i32(&mut payload, x);
        put_i32(&mut payload, y);
        self.push_record(RecordType::LineTo, &payload);
    }

    /// Appends the EOF record and returns the blob with a patched
    /// header.
    pub fn finalize(mut self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(12);
        put_u32(&mut payload, 0);
        put_u32(&mut payload, 0);
        put_u32(&mut payload, 0);
        self.push_record(RecordType::Eof, &payload);

        let total_size: usize = self.records.iter().map(Vec::len).sum();
        let record_count = self.records.len() as u32;
        let handle_count = self.next_handle - 1;

        let header = &mut self.records[0];
        patch_u32(header, 52, total_size as u32);
        patch_u32(header, 56, record_count);
        patch_u16(header, 60, handle_count as u16);

        self.records.concat()
    }
}

fn put_u32(buf: &mut Vec<u8>, n: u32) {
    buf.extend_from_slice(&n.to_le_bytes());
}

fn put_i32(buf: &mut Vec<u8>, n: i32) {
    buf.extend_from_slice(&n.to_le_bytes());
}

fn put_u16(buf: &mut Vec<u8>, n: u16) {
    buf.extend_from_slice(&n.to_le_bytes());
}

fn put_i16(buf: &mut Vec<u8>, n: i16) {
    buf.extend_from_slice(&n.to_le_bytes());
}

fn patch_u32(buf: &mut [u8], offset: usize, n: u32) {
    buf[offset..offset + 4].copy_from_slice(&n.to_le_bytes());
}

fn patch_u16(buf: &mut [u8], offset: usize, n: u16) {
    buf[offset..offset + 2].copy_from_slice(&n.to_le_bytes());
}

/// Content-hashes a blob for media deduplication.
pub fn blob_hash(data: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(data);
    hasher.finish()
}

// ----------------------------------------------------------------------------
// Pattern tile library.

/// Side of the square tile canvas, in EMU.
const TILE_SIZE: i64 = 100;

/// The precomputed black-on-white tile starter pack.
///
/// Effectively immutable once initialized and safely shared between
/// conversion requests.
static TILE_LIBRARY: Lazy<HashMap<&'static str, Vec<u8>>> = Lazy::new(|| {
    let mut tiles = HashMap::new();
    tiles.insert(
        "horizontal_lines",
        build_tile(TileKind::HorizontalLines, Color::black()),
    );
    tiles.insert(
        "vertical_lines",
        build_tile(TileKind::VerticalLines, Color::black()),
    );
    tiles.insert(
        "diagonal_lines",
        build_tile(TileKind::DiagonalLines, Color::black()),
    );
    tiles.insert("crosshatch", build_tile(TileKind::CrossHatch, Color::black()));
    tiles.insert("grid", build_tile(TileKind::Grid, Color::black()));
    tiles.insert("dots", build_tile(TileKind::Dots, Color::black()));
    tiles.insert(
        "brick",
        build_tile(TileKind::Brick, Color::new_rgb(0x8B, 0x45, 0x13)),
    );
    tiles
});

fn build_tile(tile: TileKind, color: Color) -> Vec<u8> {
    let mut builder = EmfBuilder::new(TILE_SIZE, TILE_SIZE);
    let brush = builder.create_tile_brush(tile, color);
    builder.select_object(brush);
    builder.rectangle(0, 0, TILE_SIZE as i32, TILE_SIZE as i32);
    builder.finalize()
}

/// Returns the tile blob for a pattern.
///
/// Black tiles come from the precomputed library; custom colors are
/// synthesized on demand.
pub fn pattern_tile(tile: TileKind, color: Color) -> Vec<u8> {
    if color == Color::black() || matches!(tile, TileKind::Brick | TileKind::Solid(_)) {
        let key = match tile {
            TileKind::HorizontalLines => "horizontal_lines",
            TileKind::VerticalLines => "vertical_lines",
            TileKind::DiagonalLines => "diagonal_lines",
            TileKind::CrossHatch => "crosshatch",
            TileKind::Grid => "grid",
            TileKind::Dots => "dots",
            TileKind::Brick => "brick",
            TileKind::Solid(_) => "",
        };
        if let Some(blob) = TILE_LIBRARY.get(key) {
            return blob.clone();
        }
    }

    build_tile(tile, color)
}

// ----------------------------------------------------------------------------
// Path rendering.

/// Renders filled/stroked path geometry into a fresh metafile.
///
/// Coordinates are mapped from the path bounding box onto the canvas.
pub fn render_paths(
    paths: &[(&PathData, Option<Color>, Option<(Color, f64)>)],
    bounds: Rect,
    width_emu: i64,
    height_emu: i64,
) -> Vec<u8> {
    let mut builder = EmfBuilder::new(width_emu, height_emu);

    let to_canvas = |p: Point| -> (i16, i16) {
        let nx = (p.x - bounds.x()) / bounds.width() * width_emu as f64;
        let ny = (p.y - bounds.y()) / bounds.height() * height_emu as f64;
        (clamp_i16(nx), clamp_i16(ny))
    };

    for (path, fill, stroke) in paths {
        let lowered = path.lower_arcs();

        if let Some(color) = fill {
            let brush = builder.create_solid_brush(*color);
            builder.select_object(brush);

            for subpath in lowered.subpaths() {
                let points = flatten_subpath(subpath, &to_canvas);
                builder.polygon16(&points);
            }
        }

        if let Some((color, width)) = stroke {
            let scale = width_emu as f64 / bounds.width();
            let pen = builder.create_pen(*color, (*width * scale).round() as i32);
            builder.select_object(pen);

            for subpath in lowered.subpaths() {
                emit_stroked_subpath(&mut builder, subpath, lowered.closed, &to_canvas);
            }
        }
    }

    builder.finalize()
}

fn clamp_i16(n: f64) -> i16 {
    n.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Flattens a subpath into polygon vertices; curves are sampled.
fn flatten_subpath(
    subpath: &[Segment],
    to_canvas: &dyn Fn(Point) -> (i16, i16),
) -> Vec<(i16, i16)> {
    const CURVE_STEPS: usize = 8;

    let mut points = Vec::new();
    if let Some(first) = subpath.first() {
        points.push(to_canvas(first.start()));
    }

    for seg in subpath {
        match *seg {
            Segment::Line { end, .. } => points.push(to_canvas(end)),
            Segment::Cubic { start, c1, c2, end } => {
                for i in 1..=CURVE_STEPS {
                    let t = i as f64 / CURVE_STEPS as f64;
                    points.push(to_canvas(cubic_at(start, c1, c2, end, t)));
                }
            }
            Segment::Arc { .. } => {}
        }
    }

    points.dedup();
    points
}

fn emit_stroked_subpath(
    builder: &mut EmfBuilder,
    subpath: &[Segment],
    closed: bool,
    to_canvas: &dyn Fn(Point) -> (i16, i16),
) {
    let first = match subpath.first() {
        Some(first) => first,
        None => return,
    };

    let start = to_canvas(first.start());
    builder.move_to(start.0 as i32, start.1 as i32);

    for seg in subpath {
        match *seg {
            Segment::Line { end, .. } => {
                let p = to_canvas(end);
                builder.line_to(p.0 as i32, p.1 as i32);
            }
            Segment::Cubic { start, c1, c2, end } => {
                let points = vec![to_canvas(start), to_canvas(c1), to_canvas(c2), to_canvas(end)];
                builder.polybezier16(&points);
                let p = to_canvas(end);
                builder.move_to(p.0 as i32, p.1 as i32);
            }
            Segment::Arc { .. } => {}
        }
    }

    if closed {
        builder.line_to(start.0 as i32, start.1 as i32);
    }
}

fn cubic_at(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryInto;

    fn read_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn header_is_patched() {
        let mut builder = EmfBuilder::new(100, 100);
        let brush = builder.create_solid_brush(Color::black());
        builder.select_object(brush);
        builder.rectangle(0, 0, 100, 100);
        let blob = builder.finalize();

        // Signature.
        assert_eq!(&blob[40..48], b"ENHMETA ");
        // Total size.
        assert_eq!(read_u32(&blob, 52) as usize, blob.len());
        // Record count: header + brush + select + rect + eof.
        assert_eq!(read_u32(&blob, 56), 5);
        // Handle count.
        assert_eq!(u16::from_le_bytes(blob[60..62].try_into().unwrap()), 1);
    }

    #[test]
    fn records_are_aligned() {
        let mut builder = EmfBuilder::new(100, 100);
        builder.polygon16(&[(0, 0), (10, 0), (10, 10)]);
        let blob = builder.finalize();

        // Walk the record stream and verify sizes.
        let mut offset = 0;
        let mut count = 0;
        while offset < blob.len() {
            let size = read_u32(&blob, offset + 4) as usize;
            assert_eq!(size % 4, 0);
            offset += size;
            count += 1;
        }
        assert_eq!(offset, blob.len());
        assert_eq!(count, 3);
    }

    #[test]
    fn handles_are_monotonic() {
        let mut builder = EmfBuilder::new(10, 10);
        assert_eq!(builder.create_solid_brush(Color::black()), 1);
        assert_eq!(builder.create_pen(Color::black(), 1), 2);
        assert_eq!(builder.create_solid_brush(Color::white()), 3);
    }

    #[test]
    fn identical_tiles_share_a_hash() {
        let a = pattern_tile(TileKind::CrossHatch, Color::black());
        let b = pattern_tile(TileKind::CrossHatch, Color::black());
        assert_eq!(blob_hash(&a), blob_hash(&b));

        let c = pattern_tile(TileKind::Dots, Color::black());
        // Dots degrade to solid, so the blob differs from the hatch.
        assert_ne!(blob_hash(&a), blob_hash(&c));
    }
}
