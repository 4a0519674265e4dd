// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! DrawingML emission.
//!
//! Consumes the policy-annotated scene and produces one slide part per
//! scene, plus the binary media parts the packager embeds. All XML goes
//! through `xmlwriter`; nothing is string-concatenated.

mod effects;
mod paint;
mod text;

use std::collections::HashMap;

use xmlwriter::XmlWriter;

use svg2pptx_ir::{
    ClipRef, Color, Group, Image, ImageKind, Node, Opacity, Paint, Path, PathData, Point, Rect,
    Scene, Segment, Transform,
};

use crate::animate::lower;
use crate::animate::ResolvedAnimation;
use crate::emf;
use crate::policy::Decision;
use crate::{Diagnostics, Options};

/// The XML declaration every part starts with.
pub const XML_DECLARATION: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A binary media part referenced from a slide.
#[derive(Clone, Debug)]
pub struct Media {
    /// The relationship id inside the owning slide.
    pub rid: u32,
    /// Content hash; identical blobs share one media part.
    pub hash: u64,
    /// File extension of the media part.
    pub ext: &'static str,
    /// The raw bytes.
    pub data: Vec<u8>,
}

/// One mapped slide: the XML part plus its media.
#[derive(Clone, Debug)]
pub struct MappedSlide {
    /// The `slideN.xml` content.
    pub xml: String,
    /// Media parts referenced by this slide, in first-reference order.
    pub media: Vec<Media>,
}

/// Creates a writer with the project-wide output settings.
pub(crate) fn new_writer() -> XmlWriter {
    XmlWriter::new(xmlwriter::Options {
        use_single_quote: false,
        indent: xmlwriter::Indent::None,
        attributes_indent: xmlwriter::Indent::None,
    })
}

/// Finishes a writer into a part with the standalone declaration.
pub(crate) fn finish(xml: XmlWriter) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push_str(&xml.end_document());
    out
}

/// Derives the slide size in EMU from the configured width and the
/// scene viewBox. An approximately 16:9 source snaps to the exact
/// widescreen preset.
pub(crate) fn slide_size(slide_width_emu: u64, view_box: Rect) -> (u64, u64) {
    let aspect = view_box.width() / view_box.height();
    if (aspect - 16.0 / 9.0).abs() < 0.01 {
        return crate::WIDESCREEN_SLIDE;
    }

    let height = (slide_width_emu as f64 / aspect).round() as u64;
    (slide_width_emu, height.max(1))
}

/// Maps one scene into a slide part.
pub(crate) fn map_slide(
    scene: &Scene,
    decisions: &[Decision],
    opt: &Options,
    effects: Option<&[ResolvedAnimation]>,
    diag: &mut Diagnostics,
) -> MappedSlide {
    let (slide_w, slide_h) = slide_size(opt.slide_width_emu, scene.view_box);

    let mut writer = SlideWriter {
        xml: new_writer(),
        scene,
        decisions,
        opt,
        scale_x: slide_w as f64 / scene.view_box.width(),
        scale_y: slide_h as f64 / scene.view_box.height(),
        // Shape id 1 is reserved for the spTree root.
        next_shape_id: 2,
        next_rid: 2,
        media: Vec::new(),
        shape_ids: HashMap::new(),
        preorder: 0,
    };

    writer.xml.start_element("p:sld");
    writer.xml.write_attribute("xmlns:a", NS_A);
    writer.xml.write_attribute("xmlns:r", NS_R);
    writer.xml.write_attribute("xmlns:p", NS_P);

    writer.xml.start_element("p:cSld");
    writer.xml.start_element("p:spTree");

    writer.xml.start_element("p:nvGrpSpPr");
    writer.xml.start_element("p:cNvPr");
    writer.xml.write_attribute("id", "1");
    writer.xml.write_attribute("name", "");
    writer.xml.end_element();
    writer.xml.start_element("p:cNvGrpSpPr");
    writer.xml.end_element();
    writer.xml.start_element("p:nvPr");
    writer.xml.end_element();
    writer.xml.end_element();

    writer.xml.start_element("p:grpSpPr");
    writer.xml.start_element("a:xfrm");
    writer.write_point_element("a:off", 0, 0);
    writer.write_ext_element("a:ext", 0, 0);
    writer.write_point_element("a:chOff", 0, 0);
    writer.write_ext_element("a:chExt", 0, 0);
    writer.xml.end_element();
    writer.xml.end_element();

    // Emitted shape order equals preprocessed-document order.
    writer.emit_children(&scene.root, Transform::default(), Opacity::ONE, diag);

    writer.xml.end_element(); // p:spTree
    writer.xml.end_element(); // p:cSld

    writer.xml.start_element("p:clrMapOvr");
    writer.xml.start_element("a:masterClrMapping");
    writer.xml.end_element();
    writer.xml.end_element();

    if let Some(effects) = effects {
        lower::write_timing(
            &mut writer.xml,
            effects,
            &writer.shape_ids,
            scene.view_box,
            diag,
        );
    }

    writer.xml.end_element(); // p:sld

    MappedSlide {
        xml: finish(writer.xml),
        media: writer.media,
    }
}

pub(crate) struct SlideWriter<'a> {
    pub xml: XmlWriter,
    scene: &'a Scene,
    decisions: &'a [Decision],
    opt: &'a Options,
    scale_x: f64,
    scale_y: f64,
    next_shape_id: u32,
    next_rid: u32,
    media: Vec<Media>,
    /// Element id to emitted shape id, for animation binding.
    shape_ids: HashMap<String, u32>,
    preorder: usize,
}

impl<'a> SlideWriter<'a> {
    fn decision(&self) -> &Decision {
        static NATIVE: Decision = Decision {
            use_native: true,
            reasons: Vec::new(),
        };
        self.decisions.get(self.preorder).unwrap_or(&NATIVE)
    }

    fn allocate_shape_id(&mut self, element_id: &str) -> u32 {
        let id = self.next_shape_id;
        self.next_shape_id += 1;
        if !element_id.is_empty() {
            self.shape_ids.insert(element_id.to_string(), id);
        }
        id
    }

    /// Registers a media blob and returns its relationship id.
    /// Identical blobs within a slide share one relationship.
    fn register_media(&mut self, data: Vec<u8>, ext: &'static str) -> u32 {
        let hash = emf::blob_hash(&data);
        if let Some(existing) = self.media.iter().find(|m| m.hash == hash) {
            return existing.rid;
        }

        let rid = self.next_rid;
        self.next_rid += 1;
        self.media.push(Media {
            rid,
            hash,
            ext,
            data,
        });
        rid
    }

    // EMU conversion. Offsets are viewBox-relative.
    fn emu_x(&self, x: f64) -> i64 {
        ((x - self.scene.view_box.x()) * self.scale_x).round() as i64
    }

    fn emu_y(&self, y: f64) -> i64 {
        ((y - self.scene.view_box.y()) * self.scale_y).round() as i64
    }

    fn emu_w(&self, w: f64) -> i64 {
        (w * self.scale_x).round().max(1.0) as i64
    }

    fn emu_h(&self, h: f64) -> i64 {
        (h * self.scale_y).round().max(1.0) as i64
    }

    pub(crate) fn scale_x(&self) -> f64 {
        self.scale_x
    }

    fn write_point_element(&mut self, name: &str, x: i64, y: i64) {
        self.xml.start_element(name);
        self.xml.write_attribute("x", &x);
        self.xml.write_attribute("y", &y);
        self.xml.end_element();
    }

    fn write_ext_element(&mut self, name: &str, cx: i64, cy: i64) {
        self.xml.start_element(name);
        self.xml.write_attribute("cx", &cx);
        self.xml.write_attribute("cy", &cy);
        self.xml.end_element();
    }

    fn write_xfrm(&mut self, rect: Rect) {
        let x = self.emu_x(rect.x());
        let y = self.emu_y(rect.y());
        let w = self.emu_w(rect.width());
        let h = self.emu_h(rect.height());

        self.xml.start_element("a:xfrm");
        self.write_point_element("a:off", x, y);
        self.write_ext_element("a:ext", w, h);
        self.xml.end_element();
    }

    fn emit_children(
        &mut self,
        parent: &Group,
        ts: Transform,
        opacity: Opacity,
        diag: &mut Diagnostics,
    ) {
        for node in &parent.children {
            self.emit_node(node, ts, opacity, diag);
        }
    }

    fn emit_node(&mut self, node: &Node, ts: Transform, opacity: Opacity, diag: &mut Diagnostics) {
        let decision = self.decision().clone();
        self.preorder += 1;

        match node {
            Node::Group(ref group) => {
                if decision.use_native {
                    self.emit_group(group, ts, opacity, diag);
                } else {
                    self.emit_group_fallback(group, ts, &decision, diag);
                    self.preorder += count_nodes(group);
                }
            }
            Node::Path(ref path) => {
                self.check_clip(path.clip.as_ref(), diag);
                let opacity = opacity * path.opacity;
                if decision.use_native {
                    self.emit_path(path, ts, opacity, diag);
                } else {
                    self.emit_path_fallback(path, ts, opacity, &decision, diag);
                }
            }
            Node::Text(ref frame) => {
                if !decision.use_native {
                    // The metafile record subset has no text output,
                    // so unsupported text still goes out natively.
                    diag.warn(format!(
                        "Text '{}' exceeds native capabilities ({}); emitted approximately.",
                        frame.id,
                        decision.reasons.join(", ")
                    ));
                }
                text::emit_text(self, frame, ts, opacity);
            }
            Node::Image(ref image) => {
                self.emit_image(image, ts, opacity, diag);
            }
        }
    }

    fn emit_group(
        &mut self,
        group: &Group,
        parent_ts: Transform,
        parent_opacity: Opacity,
        diag: &mut Diagnostics,
    ) {
        self.check_clip(group.clip.as_ref(), diag);

        let mut ts = parent_ts;
        ts.append(&group.transform);
        let opacity = parent_opacity * group.opacity;

        let bbox = match group_bbox(group, ts) {
            Some(bbox) => bbox,
            None => {
                // Nothing measurable inside; emit children flat.
                self.emit_children(group, ts, opacity, diag);
                return;
            }
        };

        let shape_id = self.allocate_shape_id(&group.id);
        let name = shape_name("Group", &group.id, shape_id);

        self.xml.start_element("p:grpSp");
        self.xml.start_element("p:nvGrpSpPr");
        self.xml.start_element("p:cNvPr");
        self.xml.write_attribute("id", &shape_id);
        self.xml.write_attribute("name", &name);
        self.xml.end_element();
        self.xml.start_element("p:cNvGrpSpPr");
        self.xml.end_element();
        self.xml.start_element("p:nvPr");
        self.xml.end_element();
        self.xml.end_element();

        // The transform is flattened into child geometry, so the group
        // frame maps its children one-to-one.
        let x = self.emu_x(bbox.x());
        let y = self.emu_y(bbox.y());
        let w = self.emu_w(bbox.width());
        let h = self.emu_h(bbox.height());

        self.xml.start_element("p:grpSpPr");
        self.xml.start_element("a:xfrm");
        self.write_point_element("a:off", x, y);
        self.write_ext_element("a:ext", w, h);
        self.write_point_element("a:chOff", x, y);
        self.write_ext_element("a:chExt", w, h);
        self.xml.end_element();
        self.xml.end_element();

        self.emit_children(group, ts, opacity, diag);

        self.xml.end_element(); // p:grpSp
    }

    fn emit_path(
        &mut self,
        path: &Path,
        ts: Transform,
        opacity: Opacity,
        diag: &mut Diagnostics,
    ) {
        let mut data = path.data.lower_arcs();
        if !ts.is_default() {
            data.transform(ts);
        }

        let bbox = match path_frame(&data) {
            Some(bbox) => bbox,
            None => {
                diag.warn(format!("Path '{}' has no bounding box. Skipped.", path.id));
                return;
            }
        };

        let shape_id = self.allocate_shape_id(&path.id);
        let name = shape_name("Path", &path.id, shape_id);

        self.xml.start_element("p:sp");
        self.xml.start_element("p:nvSpPr");
        self.xml.start_element("p:cNvPr");
        self.xml.write_attribute("id", &shape_id);
        self.xml.write_attribute("name", &name);
        self.xml.end_element();
        self.xml.start_element("p:cNvSpPr");
        self.xml.end_element();
        self.xml.start_element("p:nvPr");
        self.xml.end_element();
        self.xml.end_element();

        self.xml.start_element("p:spPr");
        self.write_xfrm(bbox);
        self.write_cust_geom(&data, bbox);

        match path.fill {
            Some(ref fill) => paint::write_fill(self, &fill.paint, fill.opacity * opacity),
            None => {
                self.xml.start_element("a:noFill");
                self.xml.end_element();
            }
        }

        if let Some(ref stroke) = path.stroke {
            paint::write_stroke(self, stroke, opacity);
        }

        if let Some(ref filter_id) = path.filter {
            self.write_filter_effects(filter_id, diag);
        }

        self.xml.end_element(); // p:spPr
        self.xml.end_element(); // p:sp
    }

    /// Emits `<a:custGeom>` with one `<a:path>` per subpath.
    /// Coordinates are EMU offsets from the shape frame.
    fn write_cust_geom(&mut self, data: &PathData, bbox: Rect) {
        let w = self.emu_w(bbox.width());
        let h = self.emu_h(bbox.height());

        let px = |p: Point, this: &Self| -> (i64, i64) {
            (
                ((p.x - bbox.x()) * this.scale_x).round().max(0.0) as i64,
                ((p.y - bbox.y()) * this.scale_y).round().max(0.0) as i64,
            )
        };

        self.xml.start_element("a:custGeom");
        self.xml.start_element("a:avLst");
        self.xml.end_element();
        self.xml.start_element("a:gdLst");
        self.xml.end_element();
        self.xml.start_element("a:ahLst");
        self.xml.end_element();
        self.xml.start_element("a:cxnLst");
        self.xml.end_element();

        self.xml.start_element("a:rect");
        self.xml.write_attribute("l", "0");
        self.xml.write_attribute("t", "0");
        self.xml.write_attribute("r", &w);
        self.xml.write_attribute("b", &h);
        self.xml.end_element();

        self.xml.start_element("a:pathLst");
        for subpath in data.subpaths() {
            self.xml.start_element("a:path");
            self.xml.write_attribute("w", &w);
            self.xml.write_attribute("h", &h);

            if let Some(first) = subpath.first() {
                let (x, y) = px(first.start(), self);
                self.xml.start_element("a:moveTo");
                self.write_pt(x, y);
                self.xml.end_element();
            }

            for seg in subpath {
                match *seg {
                    Segment::Line { end, .. } => {
                        let (x, y) = px(end, self);
                        self.xml.start_element("a:lnTo");
                        self.write_pt(x, y);
                        self.xml.end_element();
                    }
                    Segment::Cubic { c1, c2, end, .. } => {
                        let (x1, y1) = px(c1, self);
                        let (x2, y2) = px(c2, self);
                        let (x, y) = px(end, self);
                        self.xml.start_element("a:cubicBezTo");
                        self.write_pt(x1, y1);
                        self.write_pt(x2, y2);
                        self.write_pt(x, y);
                        self.xml.end_element();
                    }
                    // Arcs were lowered before emission.
                    Segment::Arc { .. } => {}
                }
            }

            if data.closed {
                self.xml.start_element("a:close");
                self.xml.end_element();
            }

            self.xml.end_element(); // a:path
        }
        self.xml.end_element(); // a:pathLst
        self.xml.end_element(); // a:custGeom
    }

    fn write_pt(&mut self, x: i64, y: i64) {
        self.xml.start_element("a:pt");
        self.xml.write_attribute("x", &x);
        self.xml.write_attribute("y", &y);
        self.xml.end_element();
    }

    /// A path the policy rejected: pattern fills keep native geometry
    /// with a tiled metafile fill; everything else becomes one
    /// metafile picture.
    fn emit_path_fallback(
        &mut self,
        path: &Path,
        ts: Transform,
        opacity: Opacity,
        decision: &Decision,
        diag: &mut Diagnostics,
    ) {
        let pattern_fill = path
            .fill
            .as_ref()
            .map(|f| matches!(f.paint, Paint::Pattern(_)))
            .unwrap_or(false);

        if pattern_fill {
            self.emit_path(path, ts, opacity, diag);
            return;
        }

        let mut data = path.data.lower_arcs();
        if !ts.is_default() {
            data.transform(ts);
        }

        let bbox = match path_frame(&data) {
            Some(bbox) => bbox,
            None => return,
        };

        let fill_color = path.fill.as_ref().map(|f| paint::paint_color(&f.paint));
        let stroke = path
            .stroke
            .as_ref()
            .map(|s| (paint::paint_color(&s.paint), s.width.get()));

        let blob = emf::render_paths(
            &[(&data, fill_color, stroke)],
            bbox,
            self.emu_w(bbox.width()),
            self.emu_h(bbox.height()),
        );

        diag.warn(format!(
            "Path '{}' emitted as a metafile: {}.",
            path.id,
            decision.reasons.join(", ")
        ));

        self.emit_emf_picture(&path.id, blob, bbox);
    }

    fn emit_group_fallback(
        &mut self,
        group: &Group,
        parent_ts: Transform,
        decision: &Decision,
        diag: &mut Diagnostics,
    ) {
        let mut ts = parent_ts;
        ts.append(&group.transform);

        let bbox = match group_bbox(group, ts) {
            Some(bbox) => bbox,
            None => return,
        };

        // Collect all descendant path geometry into one blob.
        let mut flattened: Vec<(PathData, Option<Color>, Option<(Color, f64)>)> = Vec::new();
        collect_group_paths(group, ts, &mut flattened, diag);

        let parts: Vec<(&PathData, Option<Color>, Option<(Color, f64)>)> = flattened
            .iter()
            .map(|(data, fill, stroke)| (data, *fill, *stroke))
            .collect();

        let blob = emf::render_paths(
            &parts,
            bbox,
            self.emu_w(bbox.width()),
            self.emu_h(bbox.height()),
        );

        diag.warn(format!(
            "Group '{}' emitted as a metafile: {}.",
            group.id,
            decision.reasons.join(", ")
        ));

        self.emit_emf_picture(&group.id, blob, bbox);
    }

    /// Emits a `<p:pic>` referencing an embedded metafile.
    fn emit_emf_picture(&mut self, element_id: &str, blob: Vec<u8>, bbox: Rect) {
        let rid = self.register_media(blob, "emf");
        let shape_id = self.allocate_shape_id(element_id);
        let name = shape_name("Picture", element_id, shape_id);

        self.xml.start_element("p:pic");
        self.xml.start_element("p:nvPicPr");
        self.xml.start_element("p:cNvPr");
        self.xml.write_attribute("id", &shape_id);
        self.xml.write_attribute("name", &name);
        self.xml.end_element();
        self.xml.start_element("p:cNvPicPr");
        self.xml.end_element();
        self.xml.start_element("p:nvPr");
        self.xml.end_element();
        self.xml.end_element();

        self.xml.start_element("p:blipFill");
        self.xml.start_element("a:blip");
        self.xml
            .write_attribute("r:embed", &format!("rId{}", rid));
        self.xml.end_element();
        self.xml.start_element("a:stretch");
        self.xml.start_element("a:fillRect");
        self.xml.end_element();
        self.xml.end_element();
        self.xml.end_element(); // p:blipFill

        self.xml.start_element("p:spPr");
        self.write_xfrm(bbox);
        self.xml.start_element("a:prstGeom");
        self.xml.write_attribute("prst", "rect");
        self.xml.start_element("a:avLst");
        self.xml.end_element();
        self.xml.end_element();
        self.xml.end_element(); // p:spPr

        self.xml.end_element(); // p:pic
    }

    fn emit_image(
        &mut self,
        image: &Image,
        ts: Transform,
        opacity: Opacity,
        diag: &mut Diagnostics,
    ) {
        let rect = match image.rect.transform(ts) {
            Some(rect) => rect,
            None => return,
        };

        match image.kind {
            ImageKind::PNG(ref data) => {
                let blob = data.as_ref().clone();
                self.emit_raster_picture(&image.id, blob, "png", rect);
            }
            ImageKind::JPEG(ref data) => {
                let blob = data.as_ref().clone();
                self.emit_raster_picture(&image.id, blob, "jpeg", rect);
            }
            ImageKind::SVG(ref scene) => {
                // A nested vector inlines as a group scaled into the
                // image rectangle.
                let nested = scene.as_ref();
                let sx = rect.width() / nested.view_box.width();
                let sy = rect.height() / nested.view_box.height();

                let mut inner_ts = ts;
                inner_ts.append(&Transform::new_translate(rect.x(), rect.y()));
                inner_ts.append(&Transform::new_scale(sx, sy));
                inner_ts.append(&Transform::new_translate(
                    -nested.view_box.x(),
                    -nested.view_box.y(),
                ));

                // Nested decisions are not in this slide's side table;
                // nested content is emitted natively.
                let saved = self.preorder;
                self.preorder = usize::MAX - count_nodes(&nested.root);
                self.emit_children(&nested.root, inner_ts, opacity, diag);
                self.preorder = saved;
            }
        }
    }

    fn emit_raster_picture(&mut self, element_id: &str, blob: Vec<u8>, ext: &'static str, rect: Rect) {
        let rid = self.register_media(blob, ext);
        let shape_id = self.allocate_shape_id(element_id);
        let name = shape_name("Picture", element_id, shape_id);

        self.xml.start_element("p:pic");
        self.xml.start_element("p:nvPicPr");
        self.xml.start_element("p:cNvPr");
        self.xml.write_attribute("id", &shape_id);
        self.xml.write_attribute("name", &name);
        self.xml.end_element();
        self.xml.start_element("p:cNvPicPr");
        self.xml.end_element();
        self.xml.start_element("p:nvPr");
        self.xml.end_element();
        self.xml.end_element();

        self.xml.start_element("p:blipFill");
        self.xml.start_element("a:blip");
        self.xml
            .write_attribute("r:embed", &format!("rId{}", rid));
        self.xml.end_element();
        self.xml.start_element("a:stretch");
        self.xml.start_element("a:fillRect");
        self.xml.end_element();
        self.xml.end_element();
        self.xml.end_element();

        self.xml.start_element("p:spPr");
        self.write_xfrm(rect);
        self.xml.start_element("a:prstGeom");
        self.xml.write_attribute("prst", "rect");
        self.xml.start_element("a:avLst");
        self.xml.end_element();
        self.xml.end_element();
        self.xml.end_element();

        self.xml.end_element(); // p:pic
    }

    fn write_filter_effects(&mut self, filter_id: &str, diag: &mut Diagnostics) {
        match self.scene.filters.get(filter_id) {
            Some(filter) => {
                let filter = filter.clone();
                effects::write_effects(self, &filter);
            }
            None => {
                diag.warn(format!(
                    "Filter reference '{}' cannot be resolved. Ignored.",
                    filter_id
                ));
            }
        }
    }

    /// Validates a clip reference against the scene clip table.
    fn check_clip(&mut self, clip: Option<&ClipRef>, diag: &mut Diagnostics) {
        let clip = match clip {
            Some(clip) => clip,
            None => return,
        };

        if !self.scene.clip_paths.contains_key(&clip.id) {
            diag.warn(format!(
                "Clip path reference '{}' cannot be resolved. No clip is applied.",
                clip.id
            ));
        } else {
            // DrawingML has no geometric clip for custom shapes; the
            // clip degrades to its bounding rectangle.
            diag.warn(format!(
                "Clip path '{}' is approximated by its bounding rectangle.",
                clip.id
            ));
        }
    }

    pub(crate) fn opt(&self) -> &Options {
        self.opt
    }
}

/// The shape frame of a path: its bounding box, padded when the
/// geometry is degenerate (an axis-aligned line has no area but still
/// renders as a stroke).
fn path_frame(data: &PathData) -> Option<Rect> {
    if let Some(bbox) = data.bounding_box() {
        return Some(bbox);
    }

    let first = data.segments.first()?;
    let mut minx = first.start().x;
    let mut miny = first.start().y;
    let mut maxx = minx;
    let mut maxy = miny;
    for seg in &data.segments {
        for p in [seg.start(), seg.end()] {
            minx = minx.min(p.x);
            miny = miny.min(p.y);
            maxx = maxx.max(p.x);
            maxy = maxy.max(p.y);
        }
    }

    Rect::new(minx, miny, (maxx - minx).max(1e-3), (maxy - miny).max(1e-3))
}

fn shape_name(kind: &str, element_id: &str, shape_id: u32) -> String {
    if element_id.is_empty() {
        format!("{} {}", kind, shape_id)
    } else {
        element_id.to_string()
    }
}

fn count_nodes(group: &Group) -> usize {
    let mut count = 0;
    for child in &group.children {
        count += 1;
        if let Node::Group(ref g) = child {
            count += count_nodes(g);
        }
    }
    count
}

fn group_bbox(group: &Group, ts: Transform) -> Option<Rect> {
    let node = Node::Group(Box::new(group.clone()));
    let bbox = node.bounding_box()?;
    bbox.transform(ts)
}

fn collect_group_paths(
    group: &Group,
    ts: Transform,
    out: &mut Vec<(PathData, Option<Color>, Option<(Color, f64)>)>,
    diag: &mut Diagnostics,
) {
    for node in &group.children {
        match node {
            Node::Group(ref g) => {
                let mut child_ts = ts;
                child_ts.append(&g.transform);
                collect_group_paths(g, child_ts, out, diag);
            }
            Node::Path(ref path) => {
                let mut data = path.data.lower_arcs();
                data.transform(ts);

                let fill = path.fill.as_ref().map(|f| paint::paint_color(&f.paint));
                let stroke = path
                    .stroke
                    .as_ref()
                    .map(|s| (paint::paint_color(&s.paint), s.width.get()));
                out.push((data, fill, stroke));
            }
            Node::Text(ref frame) => {
                diag.warn(format!(
                    "Text '{}' inside a metafile group was dropped.",
                    frame.id
                ));
            }
            Node::Image(ref image) => {
                diag.warn(format!(
                    "Image '{}' inside a metafile group was dropped.",
                    image.id
                ));
            }
        }
    }
}
