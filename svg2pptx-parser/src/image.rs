// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use svgtypes::Length;

use svg2pptx_ir::{Image, ImageKind, Rect};

use crate::converter::State;
use crate::svgtree::{AId, Document, NodeId};
use crate::units;
use crate::Diagnostics;

pub(crate) fn convert(
    doc: &Document,
    node: NodeId,
    state: &State,
    diag: &mut Diagnostics,
) -> Option<Image> {
    let href = match doc.attribute(node, AId::Href) {
        Some(href) => href,
        None => {
            diag.warn(format!(
                "Image '{}' has no 'href'. Skipped.",
                doc.element_id(node)
            ));
            return None;
        }
    };

    let length = |aid: AId| -> f64 {
        doc.parse_attribute::<Length>(node, aid)
            .map(|l| units::convert_user_length(l, doc, node, aid, state))
            .unwrap_or(0.0)
    };

    let rect = Rect::new(
        length(AId::X),
        length(AId::Y),
        length(AId::Width),
        length(AId::Height),
    );
    let rect = match rect {
        Some(rect) => rect,
        None => {
            diag.warn(format!(
                "Image '{}' has an invalid size. Skipped.",
                doc.element_id(node)
            ));
            return None;
        }
    };

    let kind = match load_href(href, state, diag) {
        Some(kind) => kind,
        None => {
            diag.warn(format!(
                "Image '{}' has an unsupported 'href'. Skipped.",
                doc.element_id(node)
            ));
            return None;
        }
    };

    let aspect = doc
        .parse_attribute::<svgtypes::AspectRatio>(node, AId::PreserveAspectRatio)
        .unwrap_or_default();

    Some(Image {
        id: doc.element_id(node).to_string(),
        rect,
        aspect,
        kind,
    })
}

/// Decodes a `data:` URL into an image kind.
///
/// Only embedded images are supported; file references belong to the
/// collaborator layer that owns I/O.
fn load_href(href: &str, state: &State, diag: &mut Diagnostics) -> Option<ImageKind> {
    let url = data_url::DataUrl::process(href).ok()?;
    let (data, _) = url.decode_to_vec().ok()?;

    let mime = format!("{}/{}", url.mime_type().type_, url.mime_type().subtype);
    match mime.as_str() {
        "image/png" => {
            probe(&data, diag);
            Some(ImageKind::PNG(Arc::new(data)))
        }
        "image/jpeg" | "image/jpg" => {
            probe(&data, diag);
            Some(ImageKind::JPEG(Arc::new(data)))
        }
        "image/svg+xml" => {
            // SVG-referenced images are recursively converted and inlined.
            let mut inner_diag = Diagnostics::default();
            match crate::parse(&data, &state.opt, &mut inner_diag) {
                Ok(parsed) => {
                    for message in inner_diag.take() {
                        diag.warn(message);
                    }
                    Some(ImageKind::SVG(Box::new(parsed.scene)))
                }
                Err(e) => {
                    diag.warn(format!("Failed to parse a nested SVG image: {}.", e));
                    None
                }
            }
        }
        _ => None,
    }
}

fn probe(data: &[u8], diag: &mut Diagnostics) {
    if imagesize::blob_size(data).is_err() {
        diag.warn("Embedded raster image has a malformed header.".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svgtree::{Document, EId};
    use crate::Options;

    // A 1x1 black PNG.
    const PNG_1X1: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn data_url_png() {
        let text = format!(
            "<svg viewBox='0 0 10 10'><image x='0' y='0' width='10' height='10' href='{}'/></svg>",
            PNG_1X1
        );
        let mut diag = Diagnostics::default();
        let doc = Document::parse(&text, &mut diag).unwrap();
        let svg = doc.svg_element().unwrap();
        let node = doc
            .descendants(svg)
            .into_iter()
            .find(|&n| doc.tag(n) == Some(EId::Image))
            .unwrap();

        let state = State {
            view_box: svg2pptx_ir::Rect::new(0.0, 0.0, 10.0, 10.0).unwrap(),
            opt: Options::default(),
        };
        let image = convert(&doc, node, &state, &mut diag).unwrap();
        assert!(matches!(image.kind, ImageKind::PNG(_)));
    }
}
