// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! IR construction: walks the normalized document and emits the scene tree.

use std::collections::HashMap;
use std::rc::Rc;

use svg2pptx_ir::{ClipRef, ClipStrategy, Group, Node, Paint, Path, Rect, Scene, Transform};

use crate::path::parse_path;
use crate::style;
use crate::svgtree::{AId, Document, EId, NodeId};
use crate::{filter, image, paint_server, text, Diagnostics, Error, Options};

/// Shared conversion state.
#[derive(Clone, Debug)]
pub(crate) struct State {
    /// A viewBox of the parent SVG element.
    pub view_box: Rect,
    pub opt: Options,
}

/// Per-request conversion caches.
#[derive(Default, Debug)]
pub(crate) struct Cache {
    /// Lazily converted paint servers, keyed by element id.
    ///
    /// `None` marks servers that failed to convert, so broken references
    /// are reported once.
    pub paint: HashMap<String, Option<Paint>>,
}

/// Converts a preprocessed `Document` into a `Scene`.
pub(crate) fn convert_doc(
    doc: &Document,
    opt: &Options,
    diag: &mut Diagnostics,
) -> Result<Scene, Error> {
    let svg = doc.svg_element().ok_or(Error::InvalidSize)?;

    // The preprocessor normalized the viewport, so both attributes
    // are guaranteed to be present and absolute.
    let vb = doc
        .parse_attribute::<svgtypes::ViewBox>(svg, AId::ViewBox)
        .ok_or(Error::InvalidSize)?;
    let view_box = Rect::new(vb.x, vb.y, vb.w, vb.h).ok_or(Error::InvalidSize)?;

    let width = doc
        .parse_attribute::<f64>(svg, AId::Width)
        .unwrap_or_else(|| view_box.width());
    let height = doc
        .parse_attribute::<f64>(svg, AId::Height)
        .unwrap_or_else(|| view_box.height());
    if width < 1.0 || height < 1.0 {
        return Err(Error::InvalidSize);
    }

    let state = State {
        view_box,
        opt: opt.clone(),
    };
    let mut cache = Cache::default();

    let mut clip_paths = HashMap::new();
    let mut filters = HashMap::new();
    for node in doc.descendants(svg) {
        match doc.tag(node) {
            Some(EId::ClipPath) => {
                if let Some(clip) = paint_server::convert_clip_path(doc, node, diag) {
                    clip_paths.insert(clip.id.clone(), clip);
                }
            }
            Some(EId::Filter) => {
                if let Some(filter) = filter::convert(doc, node, diag) {
                    filters.insert(filter.id.clone(), filter);
                }
            }
            _ => {}
        }
    }

    let mut root = Group::default();
    convert_children(doc, svg, &state, &mut cache, diag, &mut root);

    Ok(Scene {
        size: (width.round() as u32, height.round() as u32),
        view_box,
        root,
        clip_paths,
        filters,
    })
}

pub(crate) fn convert_children(
    doc: &Document,
    parent: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
    group: &mut Group,
) {
    for node in doc.element_children(parent) {
        convert_element(doc, node, state, cache, diag, group);
    }
}

fn convert_element(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
    group: &mut Group,
) {
    let tag = match doc.tag(node) {
        Some(tag) => tag,
        None => return,
    };

    if !is_visible(doc, node) {
        return;
    }

    match tag {
        EId::G => convert_group(doc, node, state, cache, diag, group),
        EId::Path => {
            if let Some(path) = convert_path(doc, node, state, cache, diag) {
                group.children.push(Node::Path(Box::new(path)));
            }
        }
        EId::Text => {
            if let Some(frame) = text::convert(doc, node, state, cache, diag) {
                group.children.push(Node::Text(Box::new(frame)));
            }
        }
        EId::Image => {
            if let Some(img) = image::convert(doc, node, state, diag) {
                group.children.push(Node::Image(Box::new(img)));
            }
        }
        // Referenced content is resolved on demand, not rendered in place.
        EId::Defs
        | EId::LinearGradient
        | EId::RadialGradient
        | EId::Stop
        | EId::Pattern
        | EId::ClipPath
        | EId::Filter
        | EId::Title
        | EId::Desc
        | EId::Metadata
        | EId::Style => {}
        tag if tag.is_animation() => {}
        tag if tag.is_filter_primitive() => {}
        EId::Mpath
        | EId::FeDistantLight
        | EId::FePointLight
        | EId::FeSpotLight
        | EId::FeMergeNode => {}
        EId::Use | EId::Symbol | EId::Marker | EId::Mask => {
            diag.warn(format!(
                "Element '{}' of type '{}' is not supported. Ignored.",
                doc.element_id(node),
                tag
            ));
        }
        tag if tag.is_shape() => {
            // Shapes were rewritten by the preprocessor; a leftover one
            // means it was invalid and already reported.
        }
        EId::Svg => {
            diag.warn("Nested 'svg' elements are not supported. Ignored.".to_string());
        }
        EId::Tspan => {}
        _ => {}
    }
}

fn convert_group(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
    parent: &mut Group,
) {
    let mut group = Group {
        id: doc.element_id(node).to_string(),
        transform: node_transform(doc, node),
        opacity: style::resolve_element_opacity(doc, node),
        clip: clip_ref(doc, node),
        filter: filter_id(doc, node),
        children: Vec::new(),
    };

    convert_children(doc, node, state, cache, diag, &mut group);

    if group.has_children() {
        parent.children.push(Node::Group(Box::new(group)));
    }
}

fn convert_path(
    doc: &Document,
    node: NodeId,
    state: &State,
    cache: &mut Cache,
    diag: &mut Diagnostics,
) -> Option<Path> {
    let d = doc.attribute(node, AId::D)?;

    // A bad `d` poisons only this element, never the slide.
    let data = match parse_path(d) {
        Ok(data) => data,
        Err(e) => {
            diag.warn(format!(
                "Path '{}' has invalid path data: {}. Skipped.",
                doc.element_id(node),
                e
            ));
            return None;
        }
    };

    if data.is_empty() {
        return None;
    }

    let fill = style::resolve_fill(doc, node, state, cache, diag);
    let stroke = style::resolve_stroke(doc, node, state, cache, diag);

    Some(Path {
        id: doc.element_id(node).to_string(),
        data: Rc::new(data),
        fill,
        stroke,
        opacity: style::resolve_element_opacity(doc, node),
        clip: clip_ref(doc, node),
        filter: filter_id(doc, node),
    })
}

fn node_transform(doc: &Document, node: NodeId) -> Transform {
    doc.attribute(node, AId::Transform)
        .and_then(|v| v.parse::<svgtypes::Transform>().ok())
        .map(Transform::from)
        .filter(|ts| ts.is_valid())
        .unwrap_or_default()
}

fn clip_ref(doc: &Document, node: NodeId) -> Option<ClipRef> {
    let value = doc.attribute(node, AId::ClipPath)?;
    let id = parse_func_iri(value)?;

    Some(ClipRef {
        id: id.to_string(),
        strategy: ClipStrategy::BoundingRect,
    })
}

/// Parses a `url(#id)` reference.
pub(crate) fn parse_func_iri(value: &str) -> Option<&str> {
    let value = value.trim();
    let inner = value.strip_prefix("url(")?.strip_suffix(')')?;
    let inner = inner.trim().trim_matches('\'').trim_matches('"');
    inner.strip_prefix('#')
}

fn is_visible(doc: &Document, node: NodeId) -> bool {
    if doc.attribute(node, AId::Display) == Some("none") {
        return false;
    }

    if doc.find_attribute(node, AId::Visibility) == Some("hidden") {
        return false;
    }

    true
}

/// Resolves the `filter` reference of an element, if any.
fn filter_id(doc: &Document, node: NodeId) -> Option<String> {
    let value = doc.attribute(node, AId::Filter)?;
    Some(parse_func_iri(value)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_iri() {
        assert_eq!(parse_func_iri("url(#grad)"), Some("grad"));
        assert_eq!(parse_func_iri("url( '#grad' )"), Some("grad"));
        assert_eq!(parse_func_iri("none"), None);
        assert_eq!(parse_func_iri("url(grad)"), None);
    }
}
