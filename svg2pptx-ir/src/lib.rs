// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svg2pptx-ir` is the graphics tree representation used by `svg2pptx`.

The tree sits between SVG parsing and DrawingML mapping: immutable value
types, tagged variants for nodes, segments and paints, and exclusive
ownership from the `Scene` down. Paint servers are shared via `Rc`;
clip geometry is owned by a scene-level table and referenced by id.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::too_many_arguments)]

pub mod animate;
pub mod filter;
mod geom;
mod paint;
mod path;

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub use crate::geom::*;
pub use crate::paint::*;
pub use crate::path::*;

/// A text anchor.
///
/// `text-anchor` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl Default for TextAnchor {
    fn default() -> Self {
        Self::Start
    }
}

/// A text direction.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Ltr
    }
}

/// A styled text run.
#[derive(Clone, Debug)]
pub struct Run {
    /// The run's text content.
    pub text: String,

    /// Font family name.
    pub font_family: String,

    /// Font size in points.
    pub size_pt: f64,

    /// Bold flag, from `font-weight`.
    pub bold: bool,

    /// Italic flag, from `font-style`.
    pub italic: bool,

    /// Text color.
    pub color: Color,

    /// Text opacity.
    pub alpha: Opacity,

    /// Writing direction.
    pub direction: Direction,
}

/// A block of text.
///
/// `text` element and its `tspan` children in SVG.
#[derive(Clone, Debug)]
pub struct TextFrame {
    /// The source element's id; may be empty.
    pub id: String,

    /// The anchor position in user space.
    pub origin: Point,

    /// Frame width in user units.
    pub width: f64,

    /// Frame height in user units.
    pub height: f64,

    /// Horizontal anchoring.
    pub anchor: TextAnchor,

    /// Styled runs, one per `tspan` (or one for plain text).
    pub runs: Vec<Run>,
}

/// The strategy used when applying a clip.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ClipStrategy {
    /// Intersect with the clip geometry's bounding rectangle.
    BoundingRect,
    /// Use the clip geometry as is.
    Geometry,
}

/// A weak reference into the scene's clip table.
///
/// The geometry is owned by the table, not by the referring node.
#[derive(Clone, Debug)]
pub struct ClipRef {
    /// The referenced `clipPath` id.
    pub id: String,

    /// How the clip is applied.
    pub strategy: ClipStrategy,
}

/// A clip path entry in the scene's clip table.
#[derive(Clone, Debug)]
pub struct ClipPath {
    /// The id referring nodes look this entry up by.
    pub id: String,

    /// Coordinate system units.
    pub units: Units,

    /// Clip path transform.
    pub transform: Transform,

    /// The clip geometry.
    pub paths: Vec<PathData>,
}

/// An embedded image kind.
#[derive(Clone)]
pub enum ImageKind {
    /// A reference to raw JPEG data. Embedded as is.
    JPEG(Arc<Vec<u8>>),
    /// A reference to raw PNG data. Embedded as is.
    PNG(Arc<Vec<u8>>),
    /// A nested SVG scene, converted recursively and inlined.
    SVG(Box<Scene>),
}

impl std::fmt::Debug for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ImageKind::JPEG(_) => f.write_str("ImageKind::JPEG(..)"),
            ImageKind::PNG(_) => f.write_str("ImageKind::PNG(..)"),
            ImageKind::SVG(_) => f.write_str("ImageKind::SVG(..)"),
        }
    }
}

/// A raster or nested-vector image element.
///
/// `image` element in SVG.
#[derive(Clone, Debug)]
pub struct Image {
    /// The source element's id; may be empty.
    pub id: String,

    /// The rectangle the image is fit into.
    pub rect: Rect,

    /// `preserveAspectRatio` in SVG.
    pub aspect: svgtypes::AspectRatio,

    /// Image data.
    pub kind: ImageKind,
}

/// A path element.
#[derive(Clone, Debug)]
pub struct Path {
    /// The source element's id; may be empty.
    pub id: String,

    /// The geometry, shared via `Rc`: segment lists dominate the IR's
    /// memory, and frame baking clones scenes wholesale.
    pub data: Rc<PathData>,

    /// Fill style.
    pub fill: Option<Fill>,

    /// Stroke style.
    pub stroke: Option<Stroke>,

    /// Element opacity.
    pub opacity: Opacity,

    /// Element's clip path.
    pub clip: Option<ClipRef>,

    /// A reference into the scene's filter table.
    pub filter: Option<String>,
}

/// A group container, the only composite node.
///
/// By the time the IR exists, plain wrapper groups are gone; any group
/// that survives carries a transform, an opacity or a clip.
#[derive(Clone, Debug)]
pub struct Group {
    /// The source element's id; may be empty.
    pub id: String,

    /// Element's transform.
    pub transform: Transform,

    /// Group opacity.
    pub opacity: Opacity,

    /// Element's clip path.
    pub clip: Option<ClipRef>,

    /// A reference into the scene's filter table.
    pub filter: Option<String>,

    /// Group's children.
    pub children: Vec<Node>,
}

impl Default for Group {
    fn default() -> Self {
        Group {
            id: String::new(),
            transform: Transform::default(),
            opacity: Opacity::ONE,
            clip: None,
            filter: None,
            children: Vec::new(),
        }
    }
}

impl Group {
    /// Returns `true` if the group has any children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Node's kind.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Node {
    Group(Box<Group>),
    Path(Box<Path>),
    Text(Box<TextFrame>),
    Image(Box<Image>),
}

impl Node {
    /// The source element's id; empty when the SVG had none.
    pub fn id(&self) -> &str {
        match self {
            Node::Group(ref e) => e.id.as_str(),
            Node::Path(ref e) => e.id.as_str(),
            Node::Text(ref e) => e.id.as_str(),
            Node::Image(ref e) => e.id.as_str(),
        }
    }

    /// Returns node's bounding box in user space, if any.
    pub fn bounding_box(&self) -> Option<Rect> {
        match self {
            Node::Group(ref g) => {
                let mut bbox: Option<Rect> = None;
                for child in &g.children {
                    if let Some(mut r) = child.bounding_box() {
                        if let Node::Group(ref cg) = child {
                            if let Some(t) = r.transform(cg.transform) {
                                r = t;
                            }
                        }
                        bbox = Some(match bbox {
                            Some(b) => b.expand(r),
                            None => r,
                        });
                    }
                }
                bbox
            }
            Node::Path(ref p) => p.data.bounding_box(),
            Node::Text(ref t) => Rect::new(t.origin.x, t.origin.y, t.width, t.height),
            Node::Image(ref img) => Some(img.rect),
        }
    }
}

/// A scene: the root of the IR.
///
/// Exclusively owns its element tree. Acyclicity is structural:
/// children are owned by value, so a group can never contain
/// an ancestor.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Output size in pixels.
    pub size: (u32, u32),

    /// The source viewBox.
    pub view_box: Rect,

    /// The root element.
    pub root: Group,

    /// Scene-level clip geometry, referenced by `ClipRef`.
    pub clip_paths: HashMap<String, ClipPath>,

    /// Scene-level filters, referenced by node filter ids.
    pub filters: HashMap<String, filter::Filter>,
}

impl Scene {
    /// Looks up a node by its source element id.
    ///
    /// The empty id never matches, so anonymous nodes stay
    /// unaddressable.
    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        if id.is_empty() {
            return None;
        }

        node_by_id(&self.root, id)
    }

    /// Calls a closure for every node in document order.
    ///
    /// The passed index is the node's stable pre-order position;
    /// it is the identity the policy side-table is keyed by.
    pub fn walk<F: FnMut(usize, &Node)>(&self, mut f: F) {
        let mut index = 0;
        walk_group(&self.root, &mut index, &mut f);
    }
}

fn walk_group<F: FnMut(usize, &Node)>(parent: &Group, index: &mut usize, f: &mut F) {
    for node in &parent.children {
        f(*index, node);
        *index += 1;

        if let Node::Group(ref g) = node {
            walk_group(g, index, f);
        }
    }
}

fn node_by_id<'a>(parent: &'a Group, id: &str) -> Option<&'a Node> {
    for child in &parent.children {
        if child.id() == id {
            return Some(child);
        }

        if let Node::Group(ref g) = child {
            if let Some(n) = node_by_id(g, id) {
                return Some(n);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> Scene {
        let rect = Rect::new(10.0, 10.0, 80.0, 40.0).unwrap();
        let path = Path {
            id: "r1".to_string(),
            data: Rc::new(PathData::from_rect(rect)),
            fill: Some(Fill::default()),
            stroke: None,
            opacity: Opacity::ONE,
            clip: None,
            filter: None,
        };

        let mut inner = Group::default();
        inner.id = "g1".to_string();
        inner.children.push(Node::Path(Box::new(path)));

        let mut root = Group::default();
        root.children.push(Node::Group(Box::new(inner)));

        Scene {
            size: (100, 60),
            view_box: Rect::new(0.0, 0.0, 100.0, 60.0).unwrap(),
            root,
            clip_paths: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    #[test]
    fn node_lookup() {
        let scene = sample_scene();
        assert!(scene.node_by_id("r1").is_some());
        assert!(scene.node_by_id("g1").is_some());
        assert!(scene.node_by_id("missing").is_none());
        assert!(scene.node_by_id("").is_none());
    }

    #[test]
    fn walk_is_preorder() {
        let scene = sample_scene();
        let mut ids = Vec::new();
        scene.walk(|index, node| ids.push((index, node.id().to_string())));

        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], (0, "g1".to_string()));
        assert_eq!(ids[1], (1, "r1".to_string()));
    }

    #[test]
    fn group_bbox() {
        let scene = sample_scene();
        let bbox = Node::Group(Box::new(scene.root.clone())).bounding_box().unwrap();
        assert_eq!(bbox, Rect::new(10.0, 10.0, 80.0, 40.0).unwrap());
    }
}
