// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svg2pptx_ir::filter::{Filter, FilterPrimitive, LightSource, MorphologyOperator};
use svg2pptx_ir::Color;

use crate::svgtree::{AId, Document, EId, NodeId};
use crate::Diagnostics;

/// Converts a `filter` element into the IR filter model.
pub(crate) fn convert(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> Option<Filter> {
    let mut primitives = Vec::new();

    for child in doc.element_children(node) {
        let tag = match doc.tag(child) {
            Some(tag) => tag,
            None => continue,
        };

        match tag {
            EId::FeMorphology => primitives.push(convert_morphology(doc, child, diag)),
            EId::FeDiffuseLighting => primitives.push(convert_diffuse_lighting(doc, child)),
            tag if tag.is_filter_primitive() => {
                primitives.push(FilterPrimitive::Unsupported(tag.to_str().to_string()));
            }
            _ => {}
        }
    }

    if primitives.is_empty() {
        diag.warn(format!(
            "Filter '{}' has no primitives. Ignored.",
            doc.element_id(node)
        ));
        return None;
    }

    Some(Filter {
        id: doc.element_id(node).to_string(),
        primitives,
    })
}

fn convert_morphology(doc: &Document, node: NodeId, diag: &mut Diagnostics) -> FilterPrimitive {
    // The SVG default operator is erode.
    let operator = match doc.attribute(node, AId::Operator) {
        Some("dilate") => MorphologyOperator::Dilate,
        _ => MorphologyOperator::Erode,
    };

    // `radius` is one number or an x/y pair.
    let (radius_x, radius_y) = match doc.attribute(node, AId::Radius) {
        Some(value) => {
            let parts: Vec<f64> = value
                .split_whitespace()
                .filter_map(|p| p.parse().ok())
                .collect();
            match parts.as_slice() {
                [r] => (*r, *r),
                [rx, ry] => (*rx, *ry),
                _ => {
                    diag.warn(format!("Invalid morphology radius '{}'. Zero is used.", value));
                    (0.0, 0.0)
                }
            }
        }
        None => (0.0, 0.0),
    };

    // Negative radii invalidate the whole primitive per the spec;
    // we degrade to a no-op instead.
    let radius_x = radius_x.max(0.0);
    let radius_y = radius_y.max(0.0);

    FilterPrimitive::Morphology {
        operator,
        radius_x,
        radius_y,
    }
}

fn convert_diffuse_lighting(doc: &Document, node: NodeId) -> FilterPrimitive {
    let float = |n: NodeId, aid: AId, def: f64| -> f64 {
        doc.parse_attribute::<f64>(n, aid).unwrap_or(def)
    };

    let surface_scale = float(node, AId::SurfaceScale, 1.0);
    let diffuse_constant = float(node, AId::DiffuseConstant, 1.0).max(0.0);

    let color = doc
        .attribute(node, AId::LightingColor)
        .and_then(|v| v.parse::<svgtypes::Color>().ok())
        .map(|c| Color::new_rgb(c.red, c.green, c.blue))
        .unwrap_or_else(Color::white);

    // The default light is a distant one at 45 degrees elevation.
    let mut light = LightSource::Distant {
        azimuth: 0.0,
        elevation: 45.0,
    };

    for child in doc.element_children(node) {
        match doc.tag(child) {
            Some(EId::FeDistantLight) => {
                light = LightSource::Distant {
                    azimuth: float(child, AId::Azimuth, 0.0),
                    elevation: float(child, AId::Elevation, 45.0),
                };
            }
            Some(EId::FePointLight) => {
                light = LightSource::Point {
                    x: float(child, AId::X, 0.0),
                    y: float(child, AId::Y, 0.0),
                    z: float(child, AId::Z, 0.0),
                };
            }
            Some(EId::FeSpotLight) => {
                light = LightSource::Spot {
                    x: float(child, AId::X, 0.0),
                    y: float(child, AId::Y, 0.0),
                    z: float(child, AId::Z, 0.0),
                    points_at_x: float(child, AId::PointsAtX, 0.0),
                    points_at_y: float(child, AId::PointsAtY, 0.0),
                    points_at_z: float(child, AId::PointsAtZ, 0.0),
                    cone_angle: float(child, AId::LimitingConeAngle, 90.0),
                    specular_exponent: float(child, AId::SpecularExponent, 1.0),
                };
            }
            _ => {}
        }
    }

    FilterPrimitive::DiffuseLighting {
        surface_scale,
        diffuse_constant,
        color,
        light,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svgtree::Document;

    fn first_filter(text: &str) -> Filter {
        let mut diag = Diagnostics::default();
        let doc = Document::parse(text, &mut diag).unwrap();
        let svg = doc.svg_element().unwrap();
        let node = doc
            .descendants(svg)
            .into_iter()
            .find(|&n| doc.tag(n) == Some(EId::Filter))
            .unwrap();
        convert(&doc, node, &mut diag).unwrap()
    }

    #[test]
    fn morphology_radius_pair() {
        let filter = first_filter(
            "<svg><filter id='f'><feMorphology operator='dilate' radius='3 2'/></filter></svg>",
        );
        match filter.primitives[0] {
            FilterPrimitive::Morphology {
                operator,
                radius_x,
                radius_y,
            } => {
                assert_eq!(operator, MorphologyOperator::Dilate);
                assert_eq!(radius_x, 3.0);
                assert_eq!(radius_y, 2.0);
            }
            _ => panic!("expected a morphology primitive"),
        }
        assert!(filter.is_vector_expressible());
    }

    #[test]
    fn lighting_defaults() {
        let filter = first_filter(
            "<svg><filter id='f'><feDiffuseLighting surfaceScale='4'/></filter></svg>",
        );
        match filter.primitives[0] {
            FilterPrimitive::DiffuseLighting {
                surface_scale,
                diffuse_constant,
                light: LightSource::Distant { elevation, .. },
                ..
            } => {
                assert_eq!(surface_scale, 4.0);
                assert_eq!(diffuse_constant, 1.0);
                assert_eq!(elevation, 45.0);
            }
            _ => panic!("expected a lighting primitive"),
        }
    }

    #[test]
    fn unsupported_primitive_blocks_vector_path() {
        let filter = first_filter(
            "<svg><filter id='f'><feGaussianBlur stdDeviation='2'/></filter></svg>",
        );
        assert!(!filter.is_vector_expressible());
    }
}
