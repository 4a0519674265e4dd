// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Text frame emission.

use svg2pptx_ir::{Opacity, Rect, TextAnchor, TextFrame, Transform};

use super::{paint, shape_name, SlideWriter};

pub(super) fn emit_text(
    w: &mut SlideWriter,
    frame: &TextFrame,
    ts: Transform,
    opacity: Opacity,
) {
    let rect = Rect::new(
        frame.origin.x,
        frame.origin.y,
        frame.width.max(1e-3),
        frame.height.max(1e-3),
    );
    let rect = match rect.and_then(|r| r.transform(ts)) {
        Some(rect) => rect,
        None => return,
    };

    let shape_id = w.allocate_shape_id(&frame.id);
    let name = shape_name("Text", &frame.id, shape_id);

    w.xml.start_element("p:sp");
    w.xml.start_element("p:nvSpPr");
    w.xml.start_element("p:cNvPr");
    w.xml.write_attribute("id", &shape_id);
    w.xml.write_attribute("name", &name);
    w.xml.end_element();
    w.xml.start_element("p:cNvSpPr");
    w.xml.write_attribute("txBox", "1");
    w.xml.end_element();
    w.xml.start_element("p:nvPr");
    w.xml.end_element();
    w.xml.end_element();

    w.xml.start_element("p:spPr");
    w.write_xfrm(rect);
    w.xml.start_element("a:prstGeom");
    w.xml.write_attribute("prst", "rect");
    w.xml.start_element("a:avLst");
    w.xml.end_element();
    w.xml.end_element();
    w.xml.start_element("a:noFill");
    w.xml.end_element();
    w.xml.end_element(); // p:spPr

    w.xml.start_element("p:txBody");
    w.xml.start_element("a:bodyPr");
    w.xml.write_attribute("wrap", "none");
    w.xml.write_attribute("anchor", "t");
    w.xml.end_element();
    w.xml.start_element("a:lstStyle");
    w.xml.end_element();

    // One logical line per frame; one run per span.
    w.xml.start_element("a:p");

    w.xml.start_element("a:pPr");
    w.xml.write_attribute(
        "algn",
        match frame.anchor {
            TextAnchor::Start => "l",
            TextAnchor::Middle => "ctr",
            TextAnchor::End => "r",
        },
    );
    w.xml.end_element();

    for run in &frame.runs {
        w.xml.start_element("a:r");

        w.xml.start_element("a:rPr");
        w.xml.write_attribute("lang", "en-US");
        // Font size is expressed in hundredths of a point.
        let size = (run.size_pt * 100.0).round().max(100.0) as i64;
        w.xml.write_attribute("sz", &size);
        if run.bold {
            w.xml.write_attribute("b", "1");
        }
        if run.italic {
            w.xml.write_attribute("i", "1");
        }

        w.xml.start_element("a:solidFill");
        paint::write_srgb(w, run.color, run.alpha * opacity);
        w.xml.end_element();

        // The configured substitution map wins over the source family.
        let family = w
            .opt()
            .font_fallback
            .get(&run.font_family)
            .cloned()
            .unwrap_or_else(|| run.font_family.clone());
        w.xml.start_element("a:latin");
        w.xml.write_attribute("typeface", &family);
        w.xml.end_element();

        w.xml.end_element(); // a:rPr

        w.xml.start_element("a:t");
        w.xml.write_text(&run.text);
        w.xml.end_element();

        w.xml.end_element(); // a:r
    }

    w.xml.end_element(); // a:p
    w.xml.end_element(); // p:txBody
    w.xml.end_element(); // p:sp
}
