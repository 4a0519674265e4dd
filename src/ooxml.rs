// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The OOXML packager.
//!
//! Assembles slide parts, shared media and the relationship graph into
//! the final `.pptx` ZIP. Output is deterministic: fixed entry
//! timestamps, a fixed compression level and a stable entry order.

use std::io::{Cursor, Write};

use xmlwriter::XmlWriter;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use svg2pptx_ir::Rect;

use crate::mapper::{finish, new_writer, slide_size, MappedSlide, NS_A, NS_P, NS_R};
use crate::Error;

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";

/// A shared media part inside the package.
struct MediaPart {
    hash: u64,
    ext: &'static str,
    path: String,
    data: Vec<u8>,
}

/// The package assembler.
pub(crate) struct Package {
    slide_width: u64,
    slide_height: u64,
    slides: Vec<MappedSlide>,
}

impl Package {
    pub fn new(slide_width_emu: u64, view_box: Rect, slides: Vec<MappedSlide>) -> Self {
        let (slide_width, slide_height) = slide_size(slide_width_emu, view_box);
        Package {
            slide_width,
            slide_height,
            slides,
        }
    }

    /// Produces the final `.pptx` byte stream.
    pub fn write(self) -> Result<Vec<u8>, Error> {
        let media = self.collect_media();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        // Zeroed timestamps and a fixed compression level keep reruns
        // byte-identical.
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>,
                       name: &str,
                       data: &[u8]|
         -> Result<(), Error> {
            zip.start_file(name, options)?;
            zip.write_all(data)
                .map_err(|e| Error::Packaging(e.to_string()))?;
            Ok(())
        };

        // Some consumers require the content types part first.
        put(
            &mut zip,
            "[Content_Types].xml",
            self.content_types(&media).as_bytes(),
        )?;
        put(&mut zip, "_rels/.rels", root_rels().as_bytes())?;

        // Relationship parts precede the parts that cite them.
        put(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            self.presentation_rels().as_bytes(),
        )?;
        put(&mut zip, "ppt/presentation.xml", self.presentation().as_bytes())?;

        put(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            master_rels().as_bytes(),
        )?;
        put(
            &mut zip,
            "ppt/slideMasters/slideMaster1.xml",
            slide_master().as_bytes(),
        )?;

        put(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            layout_rels().as_bytes(),
        )?;
        put(
            &mut zip,
            "ppt/slideLayouts/slideLayout1.xml",
            slide_layout().as_bytes(),
        )?;

        for (index, slide) in self.slides.iter().enumerate() {
            let n = index + 1;
            put(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", n),
                slide_rels(slide, &media).as_bytes(),
            )?;
            put(
                &mut zip,
                &format!("ppt/slides/slide{}.xml", n),
                slide.xml.as_bytes(),
            )?;
        }

        // Media entries are sorted by path for stable output.
        let mut sorted: Vec<&MediaPart> = media.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        for part in sorted {
            put(&mut zip, &part.path, &part.data)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    /// Deduplicates media blobs across slides; identical blobs share
    /// one part.
    fn collect_media(&self) -> Vec<MediaPart> {
        let mut media: Vec<MediaPart> = Vec::new();

        for slide in &self.slides {
            for item in &slide.media {
                if media.iter().any(|m| m.hash == item.hash) {
                    continue;
                }

                let prefix = if item.ext == "emf" { "emf" } else { "image" };
                media.push(MediaPart {
                    hash: item.hash,
                    ext: item.ext,
                    path: format!("ppt/media/{}_{:016x}.{}", prefix, item.hash, item.ext),
                    data: item.data.clone(),
                });
            }
        }

        media
    }

    fn content_types(&self, media: &[MediaPart]) -> String {
        let mut xml = new_writer();
        xml.start_element("Types");
        xml.write_attribute("xmlns", NS_CONTENT_TYPES);

        let mut default = |xml: &mut XmlWriter, ext: &str, ct: &str| {
            xml.start_element("Default");
            xml.write_attribute("Extension", ext);
            xml.write_attribute("ContentType", ct);
            xml.end_element();
        };

        default(
            &mut xml,
            "rels",
            "application/vnd.openxmlformats-package.relationships+xml",
        );
        default(&mut xml, "xml", "application/xml");

        // One default per used media extension.
        let mut exts: Vec<&str> = media.iter().map(|m| m.ext).collect();
        exts.sort_unstable();
        exts.dedup();
        for ext in exts {
            let ct = match ext {
                "emf" => "image/x-emf",
                "png" => "image/png",
                "jpeg" => "image/jpeg",
                _ => "application/octet-stream",
            };
            default(&mut xml, ext, ct);
        }

        let mut over = |xml: &mut XmlWriter, part: &str, ct: &str| {
            xml.start_element("Override");
            xml.write_attribute("PartName", part);
            xml.write_attribute("ContentType", ct);
            xml.end_element();
        };

        over(&mut xml, "/ppt/presentation.xml", CT_PRESENTATION);
        over(&mut xml, "/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER);
        over(&mut xml, "/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT);
        for index in 0..self.slides.len() {
            over(
                &mut xml,
                &format!("/ppt/slides/slide{}.xml", index + 1),
                CT_SLIDE,
            );
        }

        finish(xml)
    }

    fn presentation(&self) -> String {
        let mut xml = new_writer();
        xml.start_element("p:presentation");
        xml.write_attribute("xmlns:a", NS_A);
        xml.write_attribute("xmlns:r", NS_R);
        xml.write_attribute("xmlns:p", NS_P);

        xml.start_element("p:sldMasterIdLst");
        xml.start_element("p:sldMasterId");
        xml.write_attribute("id", "2147483648");
        xml.write_attribute("r:id", "rId1");
        xml.end_element();
        xml.end_element();

        xml.start_element("p:sldIdLst");
        for index in 0..self.slides.len() {
            xml.start_element("p:sldId");
            xml.write_attribute("id", &(256 + index as u32));
            xml.write_attribute("r:id", &format!("rId{}", index + 2));
            xml.end_element();
        }
        xml.end_element();

        xml.start_element("p:sldSz");
        xml.write_attribute("cx", &self.slide_width);
        xml.write_attribute("cy", &self.slide_height);
        if (self.slide_width, self.slide_height) == crate::WIDESCREEN_SLIDE {
            xml.write_attribute("type", "screen16x9");
        }
        xml.end_element();

        // Notes pages are the 90-degree rotated counterpart.
        xml.start_element("p:notesSz");
        xml.write_attribute("cx", &self.slide_height);
        xml.write_attribute("cy", &self.slide_width);
        xml.end_element();

        xml.start_element("p:defaultTextStyle");
        xml.start_element("a:defPPr");
        xml.start_element("a:defRPr");
        xml.write_attribute("lang", "en-US");
        xml.end_element();
        xml.end_element();
        xml.end_element();

        xml.end_element(); // p:presentation
        finish(xml)
    }

    /// Relationship ids are assigned in first-reference order:
    /// the master first, then the slides.
    fn presentation_rels(&self) -> String {
        let mut xml = new_writer();
        xml.start_element("Relationships");
        xml.write_attribute("xmlns", NS_RELATIONSHIPS);

        write_relationship(
            &mut xml,
            "rId1",
            REL_SLIDE_MASTER,
            "slideMasters/slideMaster1.xml",
        );
        for index in 0..self.slides.len() {
            write_relationship(
                &mut xml,
                &format!("rId{}", index + 2),
                REL_SLIDE,
                &format!("slides/slide{}.xml", index + 1),
            );
        }

        xml.end_element();
        finish(xml)
    }
}

fn write_relationship(xml: &mut XmlWriter, id: &str, rel_type: &str, target: &str) {
    xml.start_element("Relationship");
    xml.write_attribute("Id", id);
    xml.write_attribute("Type", rel_type);
    xml.write_attribute("Target", target);
    xml.end_element();
}

fn root_rels() -> String {
    let mut xml = new_writer();
    xml.start_element("Relationships");
    xml.write_attribute("xmlns", NS_RELATIONSHIPS);
    write_relationship(&mut xml, "rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml");
    xml.end_element();
    finish(xml)
}

fn master_rels() -> String {
    let mut xml = new_writer();
    xml.start_element("Relationships");
    xml.write_attribute("xmlns", NS_RELATIONSHIPS);
    write_relationship(
        &mut xml,
        "rId1",
        REL_SLIDE_LAYOUT,
        "../slideLayouts/slideLayout1.xml",
    );
    xml.end_element();
    finish(xml)
}

fn layout_rels() -> String {
    let mut xml = new_writer();
    xml.start_element("Relationships");
    xml.write_attribute("xmlns", NS_RELATIONSHIPS);
    write_relationship(
        &mut xml,
        "rId1",
        REL_SLIDE_MASTER,
        "../slideMasters/slideMaster1.xml",
    );
    xml.end_element();
    finish(xml)
}

fn slide_rels(slide: &MappedSlide, media: &[MediaPart]) -> String {
    let mut xml = new_writer();
    xml.start_element("Relationships");
    xml.write_attribute("xmlns", NS_RELATIONSHIPS);

    write_relationship(
        &mut xml,
        "rId1",
        REL_SLIDE_LAYOUT,
        "../slideLayouts/slideLayout1.xml",
    );

    for item in &slide.media {
        // The shared part this blob was deduplicated into.
        let part = media
            .iter()
            .find(|m| m.hash == item.hash)
            .expect("media part was collected");
        let target = format!("../media/{}", part.path.trim_start_matches("ppt/media/"));
        write_relationship(&mut xml, &format!("rId{}", item.rid), REL_IMAGE, &target);
    }

    xml.end_element();
    finish(xml)
}

/// Writes the empty `spTree` skeleton shared by the master and
/// the layout.
fn write_sp_tree_skeleton(xml: &mut XmlWriter) {
    xml.start_element("p:spTree");
    xml.start_element("p:nvGrpSpPr");
    xml.start_element("p:cNvPr");
    xml.write_attribute("id", "1");
    xml.write_attribute("name", "");
    xml.end_element();
    xml.start_element("p:cNvGrpSpPr");
    xml.end_element();
    xml.start_element("p:nvPr");
    xml.end_element();
    xml.end_element();

    xml.start_element("p:grpSpPr");
    xml.start_element("a:xfrm");
    xml.start_element("a:off");
    xml.write_attribute("x", "0");
    xml.write_attribute("y", "0");
    xml.end_element();
    xml.start_element("a:ext");
    xml.write_attribute("cx", "0");
    xml.write_attribute("cy", "0");
    xml.end_element();
    xml.end_element();
    xml.end_element();

    xml.end_element(); // p:spTree
}

fn slide_master() -> String {
    let mut xml = new_writer();
    xml.start_element("p:sldMaster");
    xml.write_attribute("xmlns:a", NS_A);
    xml.write_attribute("xmlns:r", NS_R);
    xml.write_attribute("xmlns:p", NS_P);

    xml.start_element("p:cSld");
    write_sp_tree_skeleton(&mut xml);
    xml.end_element();

    xml.start_element("p:clrMap");
    xml.write_attribute("bg1", "lt1");
    xml.write_attribute("tx1", "dk1");
    xml.write_attribute("bg2", "lt2");
    xml.write_attribute("tx2", "dk2");
    xml.write_attribute("accent1", "accent1");
    xml.write_attribute("accent2", "accent2");
    xml.write_attribute("accent3", "accent3");
    xml.write_attribute("accent4", "accent4");
    xml.write_attribute("accent5", "accent5");
    xml.write_attribute("accent6", "accent6");
    xml.write_attribute("hlink", "hlink");
    xml.write_attribute("folHlink", "folHlink");
    xml.end_element();

    xml.start_element("p:sldLayoutIdLst");
    xml.start_element("p:sldLayoutId");
    xml.write_attribute("id", "2147483649");
    xml.write_attribute("r:id", "rId1");
    xml.end_element();
    xml.end_element();

    xml.start_element("p:txStyles");
    for style in ["p:titleStyle", "p:bodyStyle", "p:otherStyle"] {
        xml.start_element(style);
        xml.start_element("a:lvl1pPr");
        xml.start_element("a:defRPr");
        xml.write_attribute("lang", "en-US");
        xml.end_element();
        xml.end_element();
        xml.end_element();
    }
    xml.end_element();

    xml.end_element(); // p:sldMaster
    finish(xml)
}

fn slide_layout() -> String {
    let mut xml = new_writer();
    xml.start_element("p:sldLayout");
    xml.write_attribute("xmlns:a", NS_A);
    xml.write_attribute("xmlns:r", NS_R);
    xml.write_attribute("xmlns:p", NS_P);
    xml.write_attribute("type", "blank");
    xml.write_attribute("preserve", "1");

    xml.start_element("p:cSld");
    xml.write_attribute("name", "Blank");
    write_sp_tree_skeleton(&mut xml);
    xml.end_element();

    xml.start_element("p:clrMapOvr");
    xml.start_element("a:masterClrMapping");
    xml.end_element();
    xml.end_element();

    xml.end_element(); // p:sldLayout
    finish(xml)
}
