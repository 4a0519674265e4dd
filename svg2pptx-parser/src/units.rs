// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgtypes::{Length, LengthUnit as Unit};

use svg2pptx_ir::Units;

use crate::converter::State;
use crate::svgtree::{AId, Document, NodeId};

pub(crate) fn convert_length(
    length: Length,
    doc: &Document,
    node: NodeId,
    aid: AId,
    object_units: Units,
    state: &State,
) -> f64 {
    let dpi = state.opt.dpi;
    let n = length.number;
    match length.unit {
        Unit::None | Unit::Px => n,
        Unit::Em => n * resolve_font_size(doc, node, state),
        Unit::Ex => n * resolve_font_size(doc, node, state) / 2.0,
        Unit::In => n * dpi,
        Unit::Cm => n * dpi / 2.54,
        Unit::Mm => n * dpi / 25.4,
        Unit::Pt => n * dpi / 72.0,
        Unit::Pc => n * dpi / 6.0,
        Unit::Percent => {
            if object_units == Units::ObjectBoundingBox {
                n / 100.0
            } else {
                let view_box = state.view_box;

                match aid {
                    AId::X | AId::Cx | AId::X1 | AId::X2 | AId::Fx | AId::Width => {
                        convert_percent(length, view_box.width())
                    }
                    AId::Y | AId::Cy | AId::Y1 | AId::Y2 | AId::Fy | AId::Height => {
                        convert_percent(length, view_box.height())
                    }
                    _ => {
                        let vb_len = (view_box.width() * view_box.width()
                            + view_box.height() * view_box.height())
                        .sqrt()
                            / std::f64::consts::SQRT_2;

                        convert_percent(length, vb_len)
                    }
                }
            }
        }
    }
}

pub(crate) fn convert_user_length(
    length: Length,
    doc: &Document,
    node: NodeId,
    aid: AId,
    state: &State,
) -> f64 {
    convert_length(length, doc, node, aid, Units::UserSpaceOnUse, state)
}

fn convert_percent(length: Length, base: f64) -> f64 {
    base * length.number / 100.0
}

pub(crate) fn resolve_font_size(doc: &Document, node: NodeId, state: &State) -> f64 {
    // Walk ancestors root-first so `em` chains resolve against
    // the parent size.
    let mut chain = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        chain.push(n);
        current = doc.parent(n);
    }

    let mut font_size = state.opt.font_size;
    for n in chain.iter().rev() {
        let value = match doc.attribute(*n, AId::FontSize) {
            Some(v) => v,
            None => continue,
        };

        if let Ok(length) = value.parse::<Length>() {
            let dpi = state.opt.dpi;
            let n = length.number;
            font_size = match length.unit {
                Unit::None | Unit::Px => n,
                Unit::Em => n * font_size,
                Unit::Ex => n * font_size / 2.0,
                Unit::In => n * dpi,
                Unit::Cm => n * dpi / 2.54,
                Unit::Mm => n * dpi / 25.4,
                Unit::Pt => n * dpi / 72.0,
                Unit::Pc => n * dpi / 6.0,
                // A percent `font-size` is relative to the parent's size.
                Unit::Percent => length.number * font_size * 0.01,
            }
        } else {
            font_size = named_font_size(value, font_size);
        }
    }

    font_size
}

/// Maps the CSS absolute/relative size keywords onto the parent size.
///
/// Each keyword step scales by 1.2, the ratio CSS suggests for
/// adjacent sizes on screen media.
fn named_font_size(name: &str, parent_font_size: f64) -> f64 {
    let steps = match name {
        "xx-small" => -3,
        "x-small" => -2,
        "small" => -1,
        "medium" => 0,
        "large" => 1,
        "x-large" => 2,
        "xx-large" => 3,
        "smaller" => -1,
        "larger" => 1,
        _ => {
            log::warn!("Unrecognized 'font-size' keyword '{}'; keeping the inherited size.", name);
            0
        }
    };

    parent_font_size * 1.2f64.powi(steps)
}
