// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filter elements.
//!
//! Only the two vector-expressible primitives carry parameters; all
//! other primitives are kept by name so the policy engine can route
//! the element to the metafile fallback.

use crate::paint::Color;

/// A morphology operator.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum MorphologyOperator {
    Dilate,
    Erode,
}

/// A light source of a lighting filter.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug)]
pub enum LightSource {
    /// `feDistantLight`.
    Distant { azimuth: f64, elevation: f64 },

    /// `fePointLight`.
    Point { x: f64, y: f64, z: f64 },

    /// `feSpotLight`.
    Spot {
        x: f64,
        y: f64,
        z: f64,
        points_at_x: f64,
        points_at_y: f64,
        points_at_z: f64,
        cone_angle: f64,
        specular_exponent: f64,
    },
}

/// A single filter primitive.
#[derive(Clone, Debug)]
pub enum FilterPrimitive {
    /// `feMorphology`.
    Morphology {
        /// The operator; erode is the SVG default.
        operator: MorphologyOperator,
        /// X-axis radius in user units.
        radius_x: f64,
        /// Y-axis radius in user units.
        radius_y: f64,
    },

    /// `feDiffuseLighting` with its light source child.
    DiffuseLighting {
        /// Surface elevation scaling.
        surface_scale: f64,
        /// Material diffuse reflection constant.
        diffuse_constant: f64,
        /// The lighting color.
        color: Color,
        /// The light source.
        light: LightSource,
    },

    /// Any other primitive, kept by name.
    ///
    /// Not expressible as a vector effect; forces the metafile fallback.
    Unsupported(String),
}

impl FilterPrimitive {
    /// Returns `true` when the primitive lowers to a DrawingML effect.
    pub fn is_vector_expressible(&self) -> bool {
        !matches!(self, FilterPrimitive::Unsupported(_))
    }
}

/// A filter element: an ordered list of primitives.
#[derive(Clone, Debug)]
pub struct Filter {
    /// The source element's id, used for diagnostics and lookups.
    pub id: String,

    /// The primitives, in document order.
    pub primitives: Vec<FilterPrimitive>,
}

impl Filter {
    /// Returns `true` when every primitive lowers to a vector effect.
    pub fn is_vector_expressible(&self) -> bool {
        self.primitives.iter().all(|p| p.is_vector_expressible())
    }
}
