// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Value interpolation.
//!
//! Implements the four SMIL calculation modes. Colors blend
//! component-wise in linear sRGB and are re-encoded; transforms blend
//! component-wise on their declared argument lists.

use svg2pptx_ir::animate::{Animation, CalcMode, KeySpline};
use svg2pptx_ir::Color;

/// A parsed animation value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value {
    /// A plain scalar.
    Number(f64),
    /// An sRGB color.
    Color(Color),
    /// A transform argument list, e.g. `rotate(a cx cy)`.
    List(Vec<f64>),
}

impl Value {
    /// The scalar view, when the value is one.
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// The list view; a scalar counts as a one-element list.
    pub fn to_list(&self) -> Vec<f64> {
        match self {
            Value::Number(n) => vec![*n],
            Value::List(list) => list.clone(),
            Value::Color(c) => vec![c.red as f64, c.green as f64, c.blue as f64],
        }
    }
}

/// Parses an animation value: a number, a color, or a number list.
pub(crate) fn parse_value(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(n) = text.parse::<f64>() {
        return Some(Value::Number(n));
    }

    if let Ok(c) = text.parse::<svgtypes::Color>() {
        return Some(Value::Color(Color::new_rgb(c.red, c.green, c.blue)));
    }

    let list: Vec<f64> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;

    if list.is_empty() {
        None
    } else {
        Some(Value::List(list))
    }
}

/// Samples an animation at a normalized time over its simple duration.
pub(crate) fn sample(animation: &Animation, t: f64) -> Option<Value> {
    let values: Vec<Value> = animation
        .values
        .iter()
        .filter_map(|v| parse_value(v))
        .collect();

    match values.len() {
        0 => return None,
        1 => return Some(values[0].clone()),
        _ => {}
    }

    let t = t.clamp(0.0, 1.0);
    let key_times = effective_key_times(animation, &values);

    // Find the active inter-key segment.
    let mut segment = key_times.len().saturating_sub(2);
    for i in 0..key_times.len() - 1 {
        if t <= key_times[i + 1] {
            segment = i;
            break;
        }
    }

    let t0 = key_times[segment];
    let t1 = key_times[segment + 1];
    let span = (t1 - t0).max(f64::EPSILON);
    let mut local = ((t - t0) / span).clamp(0.0, 1.0);

    match animation.calc_mode {
        CalcMode::Discrete => {
            // A step function: the segment's start value holds until
            // the next key time.
            let index = if t >= *key_times.last().unwrap() {
                values.len() - 1
            } else {
                segment
            };
            return Some(values[index].clone());
        }
        CalcMode::Spline => {
            if let Some(ref splines) = animation.key_splines {
                if let Some(spline) = splines.get(segment) {
                    local = spline_remap(*spline, local);
                }
            }
        }
        CalcMode::Linear | CalcMode::Paced => {}
    }

    Some(blend(&values[segment], &values[segment + 1], local))
}

/// Returns the key-time sequence, synthesizing even or paced spacing
/// when the animation declares none.
fn effective_key_times(animation: &Animation, values: &[Value]) -> Vec<f64> {
    if let Some(ref times) = animation.key_times {
        if times.len() == values.len() {
            return times.clone();
        }
    }

    if animation.calc_mode == CalcMode::Paced {
        // Reparameterize by the cumulative distance between values.
        let mut distances = Vec::with_capacity(values.len());
        distances.push(0.0);
        let mut total = 0.0;
        for pair in values.windows(2) {
            total += distance(&pair[0], &pair[1]);
            distances.push(total);
        }

        if total > 0.0 {
            return distances.into_iter().map(|d| d / total).collect();
        }
    }

    // Even spacing.
    let n = (values.len() - 1) as f64;
    (0..values.len()).map(|i| i as f64 / n).collect()
}

fn distance(a: &Value, b: &Value) -> f64 {
    let av = a.to_list();
    let bv = b.to_list();
    av.iter()
        .zip(bv.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn blend(a: &Value, b: &Value, t: f64) -> Value {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Value::Number(x + (y - x) * t),
        (Value::Color(x), Value::Color(y)) => Value::Color(blend_colors(*x, *y, t)),
        _ => {
            let av = a.to_list();
            let bv = b.to_list();
            let blended: Vec<f64> = av
                .iter()
                .zip(bv.iter())
                .map(|(x, y)| x + (y - x) * t)
                .collect();
            Value::List(blended)
        }
    }
}

/// Blends two colors component-wise in linear sRGB.
pub(crate) fn blend_colors(a: Color, b: Color, t: f64) -> Color {
    let mix = |x: u8, y: u8| -> u8 {
        let lx = srgb_to_linear(x as f64 / 255.0);
        let ly = srgb_to_linear(y as f64 / 255.0);
        let blended = lx + (ly - lx) * t;
        (linear_to_srgb(blended) * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Color::new_rgb(mix(a.red, b.red), mix(a.green, b.green), mix(a.blue, b.blue))
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> f64 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// The bisection iteration cap for spline remapping.
const SPLINE_ITERATIONS: usize = 10;

/// The bisection tolerance on the x axis.
const SPLINE_EPSILON: f64 = 1e-3;

/// Remaps a normalized time through a cubic Bezier easing curve by
/// bisecting on x.
pub(crate) fn spline_remap(spline: KeySpline, t: f64) -> f64 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }

    let bezier = |p1: f64, p2: f64, u: f64| -> f64 {
        let mu = 1.0 - u;
        3.0 * mu * mu * u * p1 + 3.0 * mu * u * u * p2 + u * u * u
    };

    let mut lo = 0.0;
    let mut hi = 1.0;
    let mut u = t;
    for _ in 0..SPLINE_ITERATIONS {
        let x = bezier(spline.x1, spline.x2, u);
        if (x - t).abs() < SPLINE_EPSILON {
            break;
        }
        if x < t {
            lo = u;
        } else {
            hi = u;
        }
        u = (lo + hi) / 2.0;
    }

    bezier(spline.y1, spline.y2, u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svg2pptx_ir::animate::{AnimationKind, Timing};

    fn animation(values: &[&str], calc_mode: CalcMode) -> Animation {
        Animation {
            id: "a".to_string(),
            target_id: "t".to_string(),
            kind: AnimationKind::Attribute("opacity".to_string()),
            values: values.iter().map(|v| v.to_string()).collect(),
            timing: Timing::default(),
            key_times: None,
            key_splines: None,
            calc_mode,
        }
    }

    #[test]
    fn linear_blend() {
        let a = animation(&["0", "1"], CalcMode::Linear);
        assert_eq!(sample(&a, 0.5).unwrap().as_number().unwrap(), 0.5);
        assert_eq!(sample(&a, 0.0).unwrap().as_number().unwrap(), 0.0);
        assert_eq!(sample(&a, 1.0).unwrap().as_number().unwrap(), 1.0);
    }

    #[test]
    fn discrete_steps() {
        let a = animation(&["0", "5", "10"], CalcMode::Discrete);
        assert_eq!(sample(&a, 0.1).unwrap().as_number().unwrap(), 0.0);
        assert_eq!(sample(&a, 0.6).unwrap().as_number().unwrap(), 5.0);
        assert_eq!(sample(&a, 1.0).unwrap().as_number().unwrap(), 10.0);
    }

    #[test]
    fn paced_reparameterizes() {
        // Values 0, 1, 11: the first segment covers a tenth of
        // the distance.
        let a = animation(&["0", "1", "11"], CalcMode::Paced);
        let mid = sample(&a, 1.0 / 11.0).unwrap().as_number().unwrap();
        assert!((mid - 1.0).abs() < 0.2, "got {}", mid);
    }

    #[test]
    fn spline_easing_is_monotonic() {
        let spline = KeySpline {
            x1: 0.42,
            y1: 0.0,
            x2: 0.58,
            y2: 1.0,
        };

        let mut prev = 0.0;
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let eased = spline_remap(spline, t);
            assert!(eased >= prev - 1e-6);
            prev = eased;
        }

        // Ease-in-out is slower than linear at the start.
        assert!(spline_remap(spline, 0.2) < 0.2);
    }

    #[test]
    fn color_blend_in_linear_space() {
        let mid = blend_colors(Color::black(), Color::white(), 0.5);
        // The linear midpoint re-encodes to a light gray, not 0x80.
        assert!(mid.red > 0x80);
        assert_eq!(mid.red, mid.green);
        assert_eq!(mid.green, mid.blue);
    }

    #[test]
    fn value_parsing() {
        assert_eq!(parse_value("1.5"), Some(Value::Number(1.5)));
        assert_eq!(
            parse_value("red"),
            Some(Value::Color(Color::new_rgb(255, 0, 0)))
        );
        assert_eq!(
            parse_value("10, 20"),
            Some(Value::List(vec![10.0, 20.0]))
        );
        assert_eq!(parse_value(""), None);
    }
}
