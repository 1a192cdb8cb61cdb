//! Pixel-buffer synthesis from compressed magnitude matrices.

use crate::spectrogram::colour::ColourMap;
use crate::spectrogram::error::RenderError;
use crate::spectrogram::interpolate::Interpolation;
use crate::spectrogram::magnitude::MagnitudeMatrix;

/// Packed-RGB image produced by a render call. Row 0 holds the highest
/// frequencies, matching conventional top-down spectrogram display.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major packed `0xRRGGBB` pixels, exactly `width * height` of them.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }
}

/// Interpolate the magnitude matrix onto a `width x height` pixel grid,
/// normalize, and map every cell through the colour table.
pub fn render(
    magnitudes: &MagnitudeMatrix,
    width: usize,
    height: usize,
    interpolation: Interpolation,
    colour_map: &ColourMap,
) -> Result<PixelBuffer, RenderError> {
    // (bins, frames) -> (height, width), then transpose for pixel-major
    // addressing.
    let interpolated = interpolation.interpolate(magnitudes.rows(), height, width)?;
    let packets = transpose(&interpolated);

    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for column in &packets {
        for &value in column {
            min = min.min(value);
            max = max.max(value);
        }
    }

    let num_colours = colour_map.len();
    let inverse_precision = (num_colours - 1) as f64;
    let mut pixels = vec![0u32; width * height];

    for h in 0..height {
        for w in 0..width {
            // Flip vertically: image row 0 is the highest frequency.
            let normalized = normalize(packets[w][height - h - 1], min, max);
            let intensity = (normalized * inverse_precision).ceil() as usize;
            // Reverse the intensity order: loud cells take the scale's first
            // colours.
            let index = (num_colours - 1).saturating_sub(intensity);
            pixels[h * width + w] = colour_map.colour_at(index);
        }
    }

    tracing::debug!(width, height, "pixel buffer rendered");
    Ok(PixelBuffer {
        width,
        height,
        pixels,
    })
}

fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);
    (0..cols)
        .map(|j| (0..rows).map(|i| matrix[i][j]).collect())
        .collect()
}

/// Position of `value` inside [min, max], with zero-variance input collapsing
/// to zero instead of dividing by zero.
fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::colour::ColourScale;

    fn ramp_matrix(bins: usize, frames: usize) -> MagnitudeMatrix {
        let rows = (0..bins)
            .map(|i| {
                (0..frames)
                    .map(|j| (i * frames + j) as f64)
                    .collect::<Vec<f64>>()
            })
            .collect::<Vec<_>>();
        MagnitudeMatrix::from_saved(rows, 0.0, (bins * frames - 1) as f64)
    }

    #[test]
    fn buffer_size_matches_the_requested_shape() {
        let matrix = ramp_matrix(25, 50);
        let map = ColourMap::with_steps(ColourScale::Viridis, 101);
        let buffer = render(&matrix, 100, 50, Interpolation::Bilinear, &map).expect("render");
        assert_eq!(buffer.width(), 100);
        assert_eq!(buffer.height(), 50);
        assert_eq!(buffer.pixels().len(), 100 * 50);
    }

    #[test]
    fn too_small_targets_propagate_shape_errors() {
        let matrix = ramp_matrix(25, 50);
        let map = ColourMap::with_steps(ColourScale::Viridis, 101);
        let err = render(&matrix, 10, 5, Interpolation::Bilinear, &map).unwrap_err();
        assert!(matches!(err, RenderError::ShapeTooSmall { .. }));
    }

    #[test]
    fn loudest_cell_takes_the_first_scale_colour_on_the_top_row() {
        // Highest bin (last row) carries the maximum, so after the vertical
        // flip the image's top row shows the scale's first colour.
        let rows = vec![vec![0.0, 0.0], vec![0.0, 10.0]];
        let matrix = MagnitudeMatrix::from_saved(rows, 0.0, 10.0);
        let map = ColourMap::with_steps(ColourScale::Viridis, 11);
        let buffer = render(&matrix, 2, 2, Interpolation::NearestNeighbour, &map).expect("render");

        let controls = ColourScale::Viridis.control_colours();
        assert_eq!(buffer.pixel(1, 0), controls[0]);
        // Quiet cells land on the last colour.
        assert_eq!(buffer.pixel(0, 1), *controls.last().unwrap());
    }

    #[test]
    fn flat_matrices_render_without_nan_and_use_one_colour() {
        let matrix = MagnitudeMatrix::from_saved(vec![vec![-80.0; 4]; 4], -80.0, -80.0);
        let map = ColourMap::with_steps(ColourScale::Magma, 11);
        let buffer = render(&matrix, 8, 8, Interpolation::Bilinear, &map).expect("render");
        let first = buffer.pixels()[0];
        assert!(buffer.pixels().iter().all(|&p| p == first));
    }
}
