// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A mutable, simplified SVG document model.
//!
//! Built from `roxmltree` with namespace prefixes stripped down to the
//! supported vocabulary. Mutable on purpose: the preprocessor rewrites
//! shapes into paths, folds transforms and drops identity wrappers
//! before IR construction.

use std::str::FromStr;

use crate::{Diagnostics, Error};

macro_rules! svg_enum {
    ($(#[$doc:meta])* $name:ident, $($string:pat => $variant:ident on $to:expr),+ $(,)?) => {
        $(#[$doc])*
        #[allow(missing_docs)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Parses the value from a string.
            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $($string => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Returns the SVG name of the value.
            pub fn to_str(self) -> &'static str {
                match self {
                    $($name::$variant => $to,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.to_str())
            }
        }
    };
}

svg_enum!(
    /// Supported SVG element names.
    EId,
    "svg" => Svg on "svg",
    "g" => G on "g",
    "defs" => Defs on "defs",
    "path" => Path on "path",
    "rect" => Rect on "rect",
    "circle" => Circle on "circle",
    "ellipse" => Ellipse on "ellipse",
    "line" => Line on "line",
    "polyline" => Polyline on "polyline",
    "polygon" => Polygon on "polygon",
    "text" => Text on "text",
    "tspan" => Tspan on "tspan",
    "image" => Image on "image",
    "linearGradient" => LinearGradient on "linearGradient",
    "radialGradient" => RadialGradient on "radialGradient",
    "stop" => Stop on "stop",
    "pattern" => Pattern on "pattern",
    "clipPath" => ClipPath on "clipPath",
    "filter" => Filter on "filter",
    "feMorphology" => FeMorphology on "feMorphology",
    "feDiffuseLighting" => FeDiffuseLighting on "feDiffuseLighting",
    "feDistantLight" => FeDistantLight on "feDistantLight",
    "fePointLight" => FePointLight on "fePointLight",
    "feSpotLight" => FeSpotLight on "feSpotLight",
    "feGaussianBlur" => FeGaussianBlur on "feGaussianBlur",
    "feFlood" => FeFlood on "feFlood",
    "feBlend" => FeBlend on "feBlend",
    "feColorMatrix" => FeColorMatrix on "feColorMatrix",
    "feComposite" => FeComposite on "feComposite",
    "feOffset" => FeOffset on "feOffset",
    "feTurbulence" => FeTurbulence on "feTurbulence",
    "feImage" => FeImage on "feImage",
    "feMerge" => FeMerge on "feMerge",
    "feMergeNode" => FeMergeNode on "feMergeNode",
    "animate" => Animate on "animate",
    "animateTransform" => AnimateTransform on "animateTransform",
    "animateColor" => AnimateColor on "animateColor",
    "animateMotion" => AnimateMotion on "animateMotion",
    "set" => Set on "set",
    "mpath" => Mpath on "mpath",
    "title" => Title on "title",
    "desc" => Desc on "desc",
    "metadata" => Metadata on "metadata",
    "style" => Style on "style",
    "use" => Use on "use",
    "symbol" => Symbol on "symbol",
    "marker" => Marker on "marker",
    "mask" => Mask on "mask",
);

impl EId {
    /// Returns `true` for basic shapes the preprocessor expands to paths.
    pub fn is_shape(self) -> bool {
        matches!(
            self,
            EId::Rect | EId::Circle | EId::Ellipse | EId::Line | EId::Polyline | EId::Polygon
        )
    }

    /// Returns `true` for SMIL animation elements.
    pub fn is_animation(self) -> bool {
        matches!(
            self,
            EId::Animate | EId::AnimateTransform | EId::AnimateColor | EId::AnimateMotion | EId::Set
        )
    }

    /// Returns `true` for filter primitive elements.
    pub fn is_filter_primitive(self) -> bool {
        matches!(
            self,
            EId::FeMorphology
                | EId::FeDiffuseLighting
                | EId::FeGaussianBlur
                | EId::FeFlood
                | EId::FeBlend
                | EId::FeColorMatrix
                | EId::FeComposite
                | EId::FeOffset
                | EId::FeTurbulence
                | EId::FeImage
                | EId::FeMerge
        )
    }
}

svg_enum!(
    /// Supported SVG attribute names.
    AId,
    "id" => Id on "id",
    "x" => X on "x",
    "y" => Y on "y",
    "x1" => X1 on "x1",
    "y1" => Y1 on "y1",
    "x2" => X2 on "x2",
    "y2" => Y2 on "y2",
    "cx" => Cx on "cx",
    "cy" => Cy on "cy",
    "r" => R on "r",
    "rx" => Rx on "rx",
    "ry" => Ry on "ry",
    "fx" => Fx on "fx",
    "fy" => Fy on "fy",
    "width" => Width on "width",
    "height" => Height on "height",
    "d" => D on "d",
    "points" => Points on "points",
    "transform" => Transform on "transform",
    "gradientTransform" => GradientTransform on "gradientTransform",
    "gradientUnits" => GradientUnits on "gradientUnits",
    "patternTransform" => PatternTransform on "patternTransform",
    "patternUnits" => PatternUnits on "patternUnits",
    "patternContentUnits" => PatternContentUnits on "patternContentUnits",
    "spreadMethod" => SpreadMethod on "spreadMethod",
    "offset" => Offset on "offset",
    "stop-color" => StopColor on "stop-color",
    "stop-opacity" => StopOpacity on "stop-opacity",
    "fill" => Fill on "fill",
    "fill-opacity" => FillOpacity on "fill-opacity",
    "fill-rule" => FillRule on "fill-rule",
    "stroke" => Stroke on "stroke",
    "stroke-width" => StrokeWidth on "stroke-width",
    "stroke-linecap" => StrokeLinecap on "stroke-linecap",
    "stroke-linejoin" => StrokeLinejoin on "stroke-linejoin",
    "stroke-miterlimit" => StrokeMiterlimit on "stroke-miterlimit",
    "stroke-dasharray" => StrokeDasharray on "stroke-dasharray",
    "stroke-dashoffset" => StrokeDashoffset on "stroke-dashoffset",
    "stroke-opacity" => StrokeOpacity on "stroke-opacity",
    "opacity" => Opacity on "opacity",
    "viewBox" => ViewBox on "viewBox",
    "preserveAspectRatio" => PreserveAspectRatio on "preserveAspectRatio",
    "font-family" => FontFamily on "font-family",
    "font-size" => FontSize on "font-size",
    "font-weight" => FontWeight on "font-weight",
    "font-style" => FontStyle on "font-style",
    "text-anchor" => TextAnchor on "text-anchor",
    "direction" => Direction on "direction",
    "clip-path" => ClipPath on "clip-path",
    "clipPathUnits" => ClipPathUnits on "clipPathUnits",
    "clip-rule" => ClipRule on "clip-rule",
    "href" => Href on "href",
    "filter" => Filter on "filter",
    "display" => Display on "display",
    "visibility" => Visibility on "visibility",
    "color" => Color on "color",
    "operator" => Operator on "operator",
    "radius" => Radius on "radius",
    "in" => In on "in",
    "result" => Result on "result",
    "surfaceScale" => SurfaceScale on "surfaceScale",
    "diffuseConstant" => DiffuseConstant on "diffuseConstant",
    "lighting-color" => LightingColor on "lighting-color",
    "azimuth" => Azimuth on "azimuth",
    "elevation" => Elevation on "elevation",
    "z" => Z on "z",
    "pointsAtX" => PointsAtX on "pointsAtX",
    "pointsAtY" => PointsAtY on "pointsAtY",
    "pointsAtZ" => PointsAtZ on "pointsAtZ",
    "limitingConeAngle" => LimitingConeAngle on "limitingConeAngle",
    "specularExponent" => SpecularExponent on "specularExponent",
    "stdDeviation" => StdDeviation on "stdDeviation",
    "attributeName" => AttributeName on "attributeName",
    "attributeType" => AttributeType on "attributeType",
    "values" => Values on "values",
    "from" => From on "from",
    "to" => To on "to",
    "by" => By on "by",
    "begin" => Begin on "begin",
    "dur" => Dur on "dur",
    "end" => End on "end",
    "min" => Min on "min",
    "max" => Max on "max",
    "repeatCount" => RepeatCount on "repeatCount",
    "repeatDur" => RepeatDur on "repeatDur",
    "calcMode" => CalcMode on "calcMode",
    "keyTimes" => KeyTimes on "keyTimes",
    "keySplines" => KeySplines on "keySplines",
    "type" => Type on "type",
    "path" => Path on "path",
    "rotate" => Rotate on "rotate",
    "data-source" => DataSource on "data-source",
);

impl AId {
    /// Returns `true` for attributes that are inherited from ancestors.
    pub fn is_inheritable(self) -> bool {
        matches!(
            self,
            AId::Fill
                | AId::FillOpacity
                | AId::FillRule
                | AId::Stroke
                | AId::StrokeWidth
                | AId::StrokeLinecap
                | AId::StrokeLinejoin
                | AId::StrokeMiterlimit
                | AId::StrokeDasharray
                | AId::StrokeDashoffset
                | AId::StrokeOpacity
                | AId::FontFamily
                | AId::FontSize
                | AId::FontWeight
                | AId::FontStyle
                | AId::TextAnchor
                | AId::Direction
                | AId::Color
                | AId::Visibility
        )
    }
}

/// A node identifier inside a `Document`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn get(self) -> usize {
        self.0 as usize
    }
}

/// An element attribute.
#[derive(Clone, Debug)]
pub struct Attribute {
    /// Attribute name.
    pub name: AId,
    /// Attribute value.
    pub value: String,
}

#[derive(Clone, Debug)]
enum NodeKind {
    Root,
    Element { tag: EId, attributes: Vec<Attribute> },
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Ceiling on the node count, so decompression bombs and adversarial
/// trees fail fast instead of exhausting memory.
const ELEMENTS_LIMIT: usize = 1_000_000;

/// A mutable, simplified SVG document.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Parses a `Document` from an SVG string.
    pub fn parse(text: &str, diag: &mut Diagnostics) -> Result<Document, Error> {
        let xml_opt = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };

        let xml =
            roxmltree::Document::parse_with_options(text, xml_opt).map_err(Error::ParsingFailed)?;

        Self::parse_tree(&xml, diag)
    }

    /// Parses a `Document` from a parsed XML tree.
    pub fn parse_tree(
        xml: &roxmltree::Document,
        diag: &mut Diagnostics,
    ) -> Result<Document, Error> {
        let mut doc = Document {
            nodes: vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Root,
            }],
        };

        let root = NodeId(0);
        append_xml_children(&mut doc, xml.root(), root, diag)?;

        if doc.svg_element().is_none() {
            return Err(Error::InvalidSize);
        }

        Ok(doc)
    }

    /// Returns the synthetic root node.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the outermost `svg` element.
    pub fn svg_element(&self) -> Option<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&id| self.tag(id) == Some(EId::Svg))
    }

    /// Returns the number of nodes, including detached ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the document has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Returns the element tag, if the node is an element.
    pub fn tag(&self, id: NodeId) -> Option<EId> {
        match self.nodes[id.get()].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Replaces the element tag.
    pub fn set_tag(&mut self, id: NodeId, tag: EId) {
        if let NodeKind::Element { tag: ref mut t, .. } = self.nodes[id.get()].kind {
            *t = tag;
        }
    }

    /// Returns the text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes[id.get()].kind {
            NodeKind::Text(ref text) => Some(text),
            _ => None,
        }
    }

    /// Returns the node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.get()].parent
    }

    /// Returns the node's children.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.get()].children.clone()
    }

    /// Returns the node's element children.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.get()]
            .children
            .iter()
            .copied()
            .filter(|&c| self.tag(c).is_some())
            .collect()
    }

    /// Returns all element descendants in document order, starting with `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut list = Vec::new();
        self.collect_descendants(id, &mut list);
        list
    }

    fn collect_descendants(&self, id: NodeId, list: &mut Vec<NodeId>) {
        if self.tag(id).is_some() {
            list.push(id);
        }
        for child in &self.nodes[id.get()].children {
            self.collect_descendants(*child, list);
        }
    }

    /// Returns an attribute value.
    pub fn attribute(&self, id: NodeId, aid: AId) -> Option<&str> {
        match self.nodes[id.get()].kind {
            NodeKind::Element { ref attributes, .. } => attributes
                .iter()
                .find(|a| a.name == aid)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Parses an attribute value.
    pub fn parse_attribute<T: FromStr>(&self, id: NodeId, aid: AId) -> Option<T> {
        self.attribute(id, aid).and_then(|v| v.parse().ok())
    }

    /// Returns `true` when the attribute is present.
    pub fn has_attribute(&self, id: NodeId, aid: AId) -> bool {
        self.attribute(id, aid).is_some()
    }

    /// Sets an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, id: NodeId, aid: AId, value: String) {
        if let NodeKind::Element { ref mut attributes, .. } = self.nodes[id.get()].kind {
            if let Some(attr) = attributes.iter_mut().find(|a| a.name == aid) {
                attr.value = value;
            } else {
                attributes.push(Attribute { name: aid, value });
            }
        }
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, id: NodeId, aid: AId) {
        if let NodeKind::Element { ref mut attributes, .. } = self.nodes[id.get()].kind {
            attributes.retain(|a| a.name != aid);
        }
    }

    /// Returns the `id` attribute value or an empty string.
    pub fn element_id(&self, id: NodeId) -> &str {
        self.attribute(id, AId::Id).unwrap_or("")
    }

    /// Finds an element by its `id` attribute.
    pub fn node_by_element_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }

        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.element_id(n) == id)
    }

    /// Finds an attribute on the node or its closest ancestor.
    pub fn find_attribute(&self, id: NodeId, aid: AId) -> Option<&str> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = self.attribute(node, aid) {
                if value != "inherit" {
                    return Some(value);
                }
            }

            if !aid.is_inheritable() && node != id {
                return None;
            }

            current = self.parent(node);
        }

        None
    }

    /// Returns the concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.append_text(id, &mut out);
        out
    }

    fn append_text(&self, id: NodeId, out: &mut String) {
        for child in &self.nodes[id.get()].children {
            match self.nodes[child.get()].kind {
                NodeKind::Text(ref text) => out.push_str(text),
                _ => self.append_text(*child, out),
            }
        }
    }

    /// Detaches a node from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.get()].parent {
            self.nodes[parent.get()].children.retain(|&c| c != id);
        }
        self.nodes[id.get()].parent = None;
    }

    /// Replaces a node with its own children, preserving document order.
    ///
    /// Used to drop identity `g` wrappers.
    pub fn replace_with_children(&mut self, id: NodeId) {
        let parent = match self.nodes[id.get()].parent {
            Some(p) => p,
            None => return,
        };

        let children = std::mem::take(&mut self.nodes[id.get()].children);
        for &child in &children {
            self.nodes[child.get()].parent = Some(parent);
        }

        let pos = self.nodes[parent.get()]
            .children
            .iter()
            .position(|&c| c == id)
            .unwrap();
        self.nodes[parent.get()]
            .children
            .splice(pos..=pos, children);
        self.nodes[id.get()].parent = None;
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, Error> {
        if self.nodes.len() >= ELEMENTS_LIMIT {
            return Err(Error::ElementsLimitReached);
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.get()].children.push(id);
        Ok(id)
    }
}

fn append_xml_children(
    doc: &mut Document,
    xml_parent: roxmltree::Node,
    parent: NodeId,
    diag: &mut Diagnostics,
) -> Result<(), Error> {
    for xml_node in xml_parent.children() {
        if xml_node.is_text() {
            let text = xml_node.text().unwrap_or("");
            if !text.trim().is_empty() {
                doc.push_node(parent, NodeKind::Text(text.to_string()))?;
            }
            continue;
        }

        if !xml_node.is_element() {
            continue;
        }

        // Namespace resolution: prefixes collapse to local names; anything
        // outside the SVG/XLink namespaces is dropped.
        let tag = match EId::from_str(xml_node.tag_name().name()) {
            Some(tag) => tag,
            None => {
                diag.warn(format!(
                    "Unknown element '{}'. Skipped.",
                    xml_node.tag_name().name()
                ));
                continue;
            }
        };

        let mut attributes = Vec::new();
        for attr in xml_node.attributes() {
            match AId::from_str(attr.name()) {
                Some(aid) => attributes.push(Attribute {
                    name: aid,
                    value: attr.value().to_string(),
                }),
                None if attr.name() == "style" => {}
                None => {
                    // `xmlns`-like metadata is noise, not data loss.
                    if !attr.name().starts_with("xml") {
                        diag.warn(format!(
                            "Unknown attribute '{}' on '{}'. Ignored.",
                            attr.name(),
                            tag
                        ));
                    }
                }
            }
        }

        // The `style` attribute overrides presentation attributes.
        if let Some(style) = xml_node.attribute("style") {
            for decl in simplecss::DeclarationTokenizer::from(style) {
                if let Some(aid) = AId::from_str(decl.name) {
                    attributes.retain(|a| a.name != aid);
                    attributes.push(Attribute {
                        name: aid,
                        value: decl.value.to_string(),
                    });
                }
            }
        }

        let id = doc.push_node(parent, NodeKind::Element { tag, attributes })?;
        append_xml_children(doc, xml_node, id, diag)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Document {
        let mut diag = Diagnostics::default();
        Document::parse(text, &mut diag).unwrap()
    }

    #[test]
    fn basic_structure() {
        let doc = parse("<svg xmlns='http://www.w3.org/2000/svg'><g><rect width='1' height='1'/></g></svg>");
        let svg = doc.svg_element().unwrap();
        let g = doc.element_children(svg)[0];
        assert_eq!(doc.tag(g), Some(EId::G));
        let rect = doc.element_children(g)[0];
        assert_eq!(doc.tag(rect), Some(EId::Rect));
        assert_eq!(doc.attribute(rect, AId::Width), Some("1"));
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let mut diag = Diagnostics::default();
        let doc = Document::parse(
            "<svg xmlns='http://www.w3.org/2000/svg'><foreignObject><div/></foreignObject></svg>",
            &mut diag,
        )
        .unwrap();
        let svg = doc.svg_element().unwrap();
        assert!(doc.element_children(svg).is_empty());
        assert!(!diag.is_empty());
    }

    #[test]
    fn style_attribute_overrides() {
        let doc = parse("<svg><rect fill='red' style='fill:blue' width='1' height='1'/></svg>");
        let svg = doc.svg_element().unwrap();
        let rect = doc.element_children(svg)[0];
        assert_eq!(doc.attribute(rect, AId::Fill), Some("blue"));
    }

    #[test]
    fn attribute_inheritance() {
        let doc = parse("<svg fill='green'><g><rect width='1' height='1'/></g></svg>");
        let svg = doc.svg_element().unwrap();
        let g = doc.element_children(svg)[0];
        let rect = doc.element_children(g)[0];
        assert_eq!(doc.find_attribute(rect, AId::Fill), Some("green"));
    }

    #[test]
    fn ungroup_preserves_order() {
        let mut doc = parse(
            "<svg><rect id='a' width='1' height='1'/><g id='g'><rect id='b' width='1' height='1'/></g><rect id='c' width='1' height='1'/></svg>",
        );
        let svg = doc.svg_element().unwrap();
        let g = doc.node_by_element_id("g").unwrap();
        doc.replace_with_children(g);

        let ids: Vec<_> = doc
            .element_children(svg)
            .into_iter()
            .map(|n| doc.element_id(n).to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
