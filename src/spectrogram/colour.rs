//! Colour scales and colour-map construction for spectrogram rendering.
//!
//! Control colours follow Plotly's built-in scales, ordered loudest-first:
//! the first entry is drawn for the strongest magnitudes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default step between distinct intensity levels (1001 discrete colours).
pub const DEFAULT_INTENSITY_PRECISION: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColourScale {
    #[default]
    Viridis,
    Cividis,
    Inferno,
    Magma,
    Plasma,
    Turbo,
    Blues,
    Oranges,
    Thermal,
    Haline,
    Solar,
    Ice,
}

impl ColourScale {
    /// Fixed control colours of the scale as packed `0xRRGGBB` values.
    pub fn control_colours(self) -> &'static [u32] {
        match self {
            ColourScale::Viridis => &[
                0xfde725, 0xb5de2b, 0x6ece58, 0x35b779, 0x1f9e89, 0x26828e, 0x31688e, 0x3e4989,
                0x482878, 0x440154,
            ],
            ColourScale::Cividis => &[
                0xfee838, 0xe1cc55, 0xc3b369, 0xa59c74, 0x8a8678, 0x707173, 0x575d6d, 0x3b496c,
                0x123570, 0x00224e,
            ],
            ColourScale::Inferno => &[
                0xfcffa4, 0xf7d13d, 0xfb9b06, 0xed6925, 0xcf4446, 0xa52c60, 0x781c6d, 0x4a0c6b,
                0x1b0c41, 0x000004,
            ],
            ColourScale::Magma => &[
                0xfcfdbf, 0xfeca8d, 0xfd9668, 0xf1605d, 0xcd4071, 0x9e2f7f, 0x721f81, 0x440f76,
                0x180f3d, 0x000004,
            ],
            ColourScale::Plasma => &[
                0xf0f921, 0xfdca26, 0xfb9f3a, 0xed7953, 0xd8576b, 0xbd3786, 0x9c179e, 0x7201a8,
                0x46039f, 0x0d0887,
            ],
            ColourScale::Turbo => &[
                0x7a0402, 0xb11901, 0xd93806, 0xf36315, 0xfe9b2d, 0xf3c63a, 0xd1e834, 0xa4fc3b,
                0x61fc6c, 0x24eca6, 0x1bcfd4, 0x39a2fc, 0x4675ed, 0x4145ab, 0x30123b,
            ],
            ColourScale::Blues => &[
                0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c,
                0x08306b,
            ],
            ColourScale::Oranges => &[
                0xfff5eb, 0xfee6ce, 0xfdd0a2, 0xfdae6b, 0xfd8d3c, 0xf16913, 0xd94801, 0xa63603,
                0x7f2704,
            ],
            ColourScale::Thermal => &[
                0xe7fa5a, 0xf6d346, 0xfbad3c, 0xf68b45, 0xe17161, 0xc16479, 0x9e5987, 0x7e4d8f,
                0x5d3e99, 0x35329b, 0x0d3064, 0x032333,
            ],
            ColourScale::Haline => &[
                0xfdee99, 0xd4e170, 0xa0d65b, 0x6fc66b, 0x51b27c, 0x419d85, 0x358888, 0x267489,
                0x125f8e, 0x0f4799, 0x2a23a0, 0x29186b,
            ],
            ColourScale::Solar => &[
                0xe0fd4a, 0xdede3b, 0xd9c02c, 0xd1a420, 0xc78916, 0xbc6f13, 0xae5814, 0x9d4219,
                0x872f20, 0x6c2424, 0x4f1c21, 0x331317,
            ],
            ColourScale::Ice => &[
                0xeafcfd, 0xc0e5e8, 0x95cfd8, 0x72b8cd, 0x599fc4, 0x4886bb, 0x3e6db2, 0x3e53a0,
                0x3a3c7d, 0x2c2a57, 0x191933, 0x030512,
            ],
        }
    }
}

impl fmt::Display for ColourScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColourScale::Viridis => "Viridis",
            ColourScale::Cividis => "Cividis",
            ColourScale::Inferno => "Inferno",
            ColourScale::Magma => "Magma",
            ColourScale::Plasma => "Plasma",
            ColourScale::Turbo => "Turbo",
            ColourScale::Blues => "Blues",
            ColourScale::Oranges => "Oranges",
            ColourScale::Thermal => "Thermal",
            ColourScale::Haline => "Haline",
            ColourScale::Solar => "Solar",
            ColourScale::Ice => "Ice",
        };
        f.write_str(name)
    }
}

/// Discrete lookup table from intensity index to packed RGB colour.
///
/// The steps partition into `controls - 1` equal segments with R, G and B
/// interpolated independently inside each segment, so endpoints reproduce the
/// first and last control colours exactly.
#[derive(Debug, Clone)]
pub struct ColourMap {
    colours: Vec<u32>,
}

impl ColourMap {
    /// Build a map with `1/intensity_precision + 1` discrete colours.
    pub fn build(scale: ColourScale, intensity_precision: f64) -> Self {
        let inverse = if intensity_precision > 0.0 {
            (1.0 / intensity_precision).max(1.0)
        } else {
            1.0 / DEFAULT_INTENSITY_PRECISION
        };
        Self::with_steps(scale, inverse as usize + 1)
    }

    pub fn with_steps(scale: ColourScale, num_colours: usize) -> Self {
        let controls = scale.control_colours();
        let segments = (controls.len() - 1) as f64;
        let num_colours = num_colours.max(2);

        let colours = (0..num_colours)
            .map(|i| {
                let position = i as f64 / (num_colours - 1) as f64 * segments;
                let segment = (position as usize).min(controls.len() - 2);
                let x = position - segment as f64;
                lerp_colour(controls[segment], controls[segment + 1], x)
            })
            .collect();

        tracing::trace!(num_colours, scale = %scale, "colour map generated");
        Self { colours }
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    /// Colour at `index`, clamped into the table.
    pub fn colour_at(&self, index: usize) -> u32 {
        self.colours[index.min(self.colours.len() - 1)]
    }
}

fn lerp_colour(from: u32, to: u32, x: f64) -> u32 {
    let r = int_lerp((from >> 16) & 0xff, (to >> 16) & 0xff, x);
    let g = int_lerp((from >> 8) & 0xff, (to >> 8) & 0xff, x);
    let b = int_lerp(from & 0xff, to & 0xff, x);
    (r << 16) | (g << 8) | b
}

fn int_lerp(a: u32, b: u32, x: f64) -> u32 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * x) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_the_first_and_last_control_colours() {
        for scale in [
            ColourScale::Viridis,
            ColourScale::Turbo,
            ColourScale::Blues,
            ColourScale::Ice,
        ] {
            let map = ColourMap::build(scale, DEFAULT_INTENSITY_PRECISION);
            let controls = scale.control_colours();
            assert_eq!(map.colour_at(0), controls[0], "{scale}");
            assert_eq!(map.colour_at(map.len() - 1), *controls.last().unwrap(), "{scale}");
        }
    }

    #[test]
    fn build_uses_the_inverse_precision_plus_one() {
        let map = ColourMap::build(ColourScale::Viridis, 1e-3);
        assert_eq!(map.len(), 1001);
    }

    #[test]
    fn channels_are_monotonic_within_each_segment() {
        let map = ColourMap::with_steps(ColourScale::Viridis, 91);
        let controls = ColourScale::Viridis.control_colours();
        let segments = (controls.len() - 1) as f64;

        let segment_of = |i: usize| {
            let position = i as f64 / (map.len() - 1) as f64 * segments;
            (position as usize).min(controls.len() - 2)
        };
        let channels = |c: u32| [(c >> 16) & 0xff, (c >> 8) & 0xff, c & 0xff];

        for i in 1..map.len() {
            if segment_of(i) != segment_of(i - 1) {
                continue;
            }
            let seg = segment_of(i);
            let prev = channels(map.colour_at(i - 1));
            let next = channels(map.colour_at(i));
            let from = channels(controls[seg]);
            let to = channels(controls[seg + 1]);
            for ch in 0..3 {
                if from[ch] <= to[ch] {
                    assert!(prev[ch] <= next[ch]);
                } else {
                    assert!(prev[ch] >= next[ch]);
                }
            }
        }
    }

    #[test]
    fn index_lookup_clamps_to_the_table() {
        let map = ColourMap::with_steps(ColourScale::Oranges, 11);
        assert_eq!(map.colour_at(10_000), map.colour_at(map.len() - 1));
    }
}
