// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::io::{Cursor, Read};

use zip::ZipArchive;

fn convert(svg: &str) -> Vec<u8> {
    convert_with(svg, &svg2pptx::Options::default())
}

fn convert_with(svg: &str, opt: &svg2pptx::Options) -> Vec<u8> {
    svg2pptx::convert(svg.as_bytes(), opt)
        .expect("conversion failed")
        .pptx
}

fn archive(pptx: &[u8]) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(pptx.to_vec())).expect("not a zip")
}

fn read_part(pptx: &[u8], name: &str) -> String {
    let mut archive = archive(pptx);
    let mut file = archive.by_name(name).unwrap_or_else(|_| panic!("missing part {}", name));
    let mut text = String::new();
    file.read_to_string(&mut text).expect("non-utf8 part");
    text
}

fn part_names(pptx: &[u8]) -> Vec<String> {
    let mut archive = archive(pptx);
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn basic_rectangle() {
    let pptx = convert(
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60"><rect x="10" y="10" width="80" height="40" fill="#0066CC"/></svg>"##,
    );

    let slide = read_part(&pptx, "ppt/slides/slide1.xml");
    assert_eq!(slide.matches("<p:sp>").count(), 1);
    assert_eq!(slide.matches("<a:custGeom>").count(), 1);
    assert_eq!(slide.matches("<a:lnTo>").count(), 4);
    assert_eq!(slide.matches("<a:moveTo>").count(), 1);
    assert_eq!(slide.matches("<a:close/>").count(), 1);
    assert!(slide.contains(r#"<a:srgbClr val="0066CC"/>"#));
    assert!(!slide.contains("<a:ln "));

    // One slide only.
    assert!(read_part(&pptx, "ppt/presentation.xml").contains("slide1"));
    assert!(!part_names(&pptx).iter().any(|n| n.contains("slide2")));
}

#[test]
fn arc_path_is_split_into_cubics() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 140 100"><path d="M 20 50 A 50 30 0 0 1 120 50" fill="none" stroke="black"/></svg>"#,
    );

    let slide = read_part(&pptx, "ppt/slides/slide1.xml");
    // A half-turn arc splits into at least two sub-arc cubics.
    assert_eq!(slide.matches("<a:path ").count(), 1);
    assert!(slide.matches("<a:cubicBezTo>").count() >= 2);
    assert!(slide.contains("<a:noFill/>"));
    assert!(slide.contains("<a:ln "));
}

#[test]
fn gradient_rectangle() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <defs><linearGradient id="g" x1="0%" x2="100%">
                <stop offset="0%" stop-color="yellow"/>
                <stop offset="100%" stop-color="red"/>
            </linearGradient></defs>
            <rect x="0" y="0" width="100" height="60" fill="url(#g)"/>
        </svg>"#,
    );

    let slide = read_part(&pptx, "ppt/slides/slide1.xml");
    assert!(slide.contains("<a:gradFill"));
    assert!(slide.contains(r#"<a:gs pos="0"><a:srgbClr val="FFFF00"/></a:gs>"#));
    assert!(slide.contains(r#"<a:gs pos="100000"><a:srgbClr val="FF0000"/></a:gs>"#));
    assert!(slide.contains(r#"<a:lin ang="0""#));
}

#[test]
fn opacity_animation_becomes_fade() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60"><rect id="r" width="80" height="40" fill="red"><animate attributeName="opacity" values="0;1" dur="1s"/></rect></svg>"#,
    );

    let slide = read_part(&pptx, "ppt/slides/slide1.xml");
    assert!(slide.contains("<p:timing>"));
    assert!(slide.contains(r#"<p:animEffect transition="in" filter="fade">"#));
    assert!(slide.contains(r#"dur="1000""#));

    // The effect targets the rect's shape id.
    let spid_pos = slide.find("<p:spTgt").expect("no shape target");
    let spid = &slide[spid_pos..spid_pos + 40];
    assert!(spid.contains(r#"spid="2""#), "target was {}", spid);
}

#[test]
fn morphology_dilate_becomes_outer_shadow() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <defs><filter id="f"><feMorphology operator="dilate" radius="3"/></filter></defs>
            <rect width="50" height="30" fill="black" filter="url(#f)"/>
        </svg>"#,
    );

    let slide = read_part(&pptx, "ppt/slides/slide1.xml");
    assert!(slide.contains("<a:effectLst>"));
    // 3 px at 25400 EMU per pixel.
    assert!(slide.contains(r#"<a:outerShdw blurRad="0" dist="76200""#));
}

#[test]
fn staggered_opacity_bakes_into_three_slides() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
        <rect id="r1" x="0" width="20" height="20" fill="red" opacity="0">
            <animate attributeName="opacity" values="1;1" begin="0s" dur="2s"/>
        </rect>
        <rect id="r2" x="30" width="20" height="20" fill="green" opacity="0">
            <animate attributeName="opacity" values="1;1" begin="2s" dur="2s"/>
        </rect>
        <rect id="r3" x="60" width="20" height="20" fill="blue" opacity="0">
            <animate attributeName="opacity" values="1;1" begin="4s" dur="2s"/>
        </rect>
    </svg>"#;

    let mut opt = svg2pptx::Options::default();
    opt.animation_mode = svg2pptx::AnimationMode::Baked;
    opt.bake_fps = 1;
    opt.bake_max_keyframes = 3;
    let pptx = convert_with(svg, &opt);

    let names = part_names(&pptx);
    assert!(names.contains(&"ppt/slides/slide1.xml".to_string()));
    assert!(names.contains(&"ppt/slides/slide3.xml".to_string()));
    assert!(!names.iter().any(|n| n.contains("slide4")));

    // Each frame shows exactly one opaque rectangle.
    let visible = |slide: &str, id: &str| -> bool {
        let pos = slide.find(&format!(r#"name="{}""#, id)).expect("shape missing");
        let tail = &slide[pos..];
        let fill = tail.find("<a:solidFill>").expect("no fill");
        !tail[fill..fill + 80].contains("<a:alpha")
    };

    let s1 = read_part(&pptx, "ppt/slides/slide1.xml");
    assert!(visible(&s1, "r1") && !visible(&s1, "r2") && !visible(&s1, "r3"));

    let s2 = read_part(&pptx, "ppt/slides/slide2.xml");
    assert!(!visible(&s2, "r1") && visible(&s2, "r2") && !visible(&s2, "r3"));

    let s3 = read_part(&pptx, "ppt/slides/slide3.xml");
    assert!(!visible(&s3, "r1") && !visible(&s3, "r2") && visible(&s3, "r3"));
}

#[test]
fn pattern_fill_references_a_metafile() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <defs><pattern id="p" width="10" height="10">
                <line x1="0" y1="0" x2="10" y2="0" stroke="black"/>
            </pattern></defs>
            <rect width="100" height="60" fill="url(#p)"/>
        </svg>"#,
    );

    let slide = read_part(&pptx, "ppt/slides/slide1.xml");
    assert!(slide.contains("<a:blipFill>"));
    assert!(slide.contains("<a:tile "));

    let names = part_names(&pptx);
    assert!(names.iter().any(|n| n.starts_with("ppt/media/emf_") && n.ends_with(".emf")));
}

#[test]
fn shared_patterns_share_one_media_part() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <defs><pattern id="p" width="10" height="10">
                <line x1="0" y1="0" x2="10" y2="0" stroke="black"/>
            </pattern></defs>
            <rect width="40" height="60" fill="url(#p)"/>
            <rect x="50" width="40" height="60" fill="url(#p)"/>
        </svg>"#,
    );

    let emf_parts: Vec<String> = part_names(&pptx)
        .into_iter()
        .filter(|n| n.starts_with("ppt/media/"))
        .collect();
    assert_eq!(emf_parts.len(), 1);
}

#[test]
fn relationship_integrity() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <defs><pattern id="p" width="10" height="10"><circle cx="5" cy="5" r="2"/></pattern></defs>
            <rect width="100" height="60" fill="url(#p)"/>
        </svg>"#,
    );

    let names: HashSet<String> = part_names(&pptx).into_iter().collect();

    for part in ["ppt/slides/slide1.xml", "ppt/presentation.xml"] {
        let dir = &part[..part.rfind('/').unwrap()];
        let base = &part[part.rfind('/').unwrap() + 1..];
        let rels_name = format!("{}/_rels/{}.rels", dir, base);
        let rels_text = read_part(&pptx, &rels_name);
        let rels = roxmltree::Document::parse(&rels_text).unwrap();

        let mut declared = HashSet::new();
        for rel in rels.descendants().filter(|n| n.has_tag_name("Relationship")) {
            declared.insert(rel.attribute("Id").unwrap().to_string());

            // Every relationship target exists in the package.
            let target = rel.attribute("Target").unwrap();
            let resolved = if let Some(stripped) = target.strip_prefix("../") {
                format!("ppt/{}", stripped)
            } else {
                format!("{}/{}", dir, target)
            };
            assert!(names.contains(&resolved), "missing target {}", resolved);
        }

        // Every referenced id resolves in the part's rels.
        let text = read_part(&pptx, part);
        let mut rest = text.as_str();
        while let Some(pos) = rest.find("r:embed=\"").or_else(|| rest.find("r:id=\"")) {
            let tail = &rest[pos..];
            let start = tail.find('"').unwrap() + 1;
            let end = tail[start..].find('"').unwrap() + start;
            let rid = &tail[start..end];
            assert!(declared.contains(rid), "undeclared {}", rid);
            rest = &tail[end..];
        }
    }
}

#[test]
fn content_types_cover_every_extension() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <defs><pattern id="p" width="10" height="10"><circle cx="5" cy="5" r="2"/></pattern></defs>
            <rect width="100" height="60" fill="url(#p)"/>
        </svg>"#,
    );

    let content_types = read_part(&pptx, "[Content_Types].xml");
    let mut extensions: HashSet<String> = HashSet::new();
    for name in part_names(&pptx) {
        if name == "[Content_Types].xml" {
            continue;
        }
        if let Some(pos) = name.rfind('.') {
            extensions.insert(name[pos + 1..].to_string());
        }
    }

    for ext in extensions {
        assert!(
            content_types.contains(&format!(r#"Extension="{}""#, ext)),
            "extension {} is not declared",
            ext
        );
    }

    // The content types part is the first zip entry.
    assert_eq!(part_names(&pptx)[0], "[Content_Types].xml");
}

#[test]
fn conversion_is_deterministic() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 160 90">
        <rect x="10" y="10" width="50" height="30" fill="#336699"/>
        <circle cx="100" cy="45" r="20" fill="red" stroke="black" stroke-width="2"/>
        <text x="10" y="80" font-size="10">hello</text>
    </svg>"##;

    let first = convert(svg);
    let second = convert(svg);
    assert_eq!(first, second);
}

#[test]
fn widescreen_slide_size() {
    let pptx = convert(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 160 90"><rect width="160" height="90" fill="black"/></svg>"#,
    );

    let presentation = read_part(&pptx, "ppt/presentation.xml");
    assert!(presentation.contains(r#"<p:sldSz cx="12192000" cy="6858000" type="screen16x9"/>"#));
    assert!(presentation.contains(r#"<p:notesSz cx="6858000" cy="12192000"/>"#));
}

#[test]
fn malformed_xml_is_fatal() {
    let result = svg2pptx::convert(b"<svg><rect", &svg2pptx::Options::default());
    assert!(matches!(result, Err(svg2pptx::Error::Parse(_))));
}

#[test]
fn bad_path_data_skips_the_element_only() {
    let conversion = svg2pptx::convert(
        br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 60">
            <path d="M 10 10 L zz" fill="red"/>
            <rect x="10" y="10" width="50" height="30" fill="blue"/>
        </svg>"#,
        &svg2pptx::Options::default(),
    )
    .expect("conversion should survive one bad element");

    assert!(!conversion.diagnostics.is_empty());

    let slide = read_part(&conversion.pptx, "ppt/slides/slide1.xml");
    assert_eq!(slide.matches("<p:sp>").count(), 1);
    assert!(slide.contains(r#"<a:srgbClr val="0000FF"/>"#));
}

#[test]
fn cancellation_produces_no_output() {
    use std::sync::atomic::AtomicBool;

    let cancel = AtomicBool::new(true);
    let result = svg2pptx::convert_with_cancel(
        br#"<svg viewBox="0 0 10 10"><rect width="5" height="5"/></svg>"#,
        &svg2pptx::Options::default(),
        &cancel,
    );
    assert!(matches!(result, Err(svg2pptx::Error::Cancelled)));
}
