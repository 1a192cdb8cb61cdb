//! 2-D upscaling interpolation over magnitude matrices.

use serde::{Deserialize, Serialize};

use crate::spectrogram::error::RenderError;

/// Strategy used to stretch the magnitude matrix onto the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    NearestNeighbour,
    #[default]
    Bilinear,
}

impl Interpolation {
    /// Interpolate `z` to the shape `(new_rows, new_cols)`. Both target
    /// dimensions must be at least as large as the source: this is an
    /// upscaling operation only.
    pub fn interpolate(
        self,
        z: &[Vec<f64>],
        new_rows: usize,
        new_cols: usize,
    ) -> Result<Vec<Vec<f64>>, RenderError> {
        let rows = z.len();
        if rows == 0 || z[0].is_empty() {
            return Err(RenderError::EmptyMatrix);
        }
        let cols = z[0].len();
        if new_rows < rows || new_cols < cols {
            return Err(RenderError::ShapeTooSmall {
                rows,
                cols,
                new_rows,
                new_cols,
            });
        }

        let row_ratio = grid_ratio(rows, new_rows);
        let col_ratio = grid_ratio(cols, new_cols);

        let out = match self {
            Interpolation::NearestNeighbour => {
                nearest_neighbour(z, new_rows, new_cols, row_ratio, col_ratio)
            }
            Interpolation::Bilinear => bilinear(z, new_rows, new_cols, row_ratio, col_ratio),
        };
        Ok(out)
    }
}

/// Source steps per target step along one axis, over the shared 0-based grid.
fn grid_ratio(len: usize, new_len: usize) -> f64 {
    if new_len > 1 {
        (len - 1) as f64 / (new_len - 1) as f64
    } else {
        0.0
    }
}

fn nearest_neighbour(
    z: &[Vec<f64>],
    new_rows: usize,
    new_cols: usize,
    row_ratio: f64,
    col_ratio: f64,
) -> Vec<Vec<f64>> {
    let rows = z.len();
    let cols = z[0].len();

    (0..new_rows)
        .map(|i_new| {
            let x = i_new as f64 * row_ratio;
            let i = nearest_index(x, rows);
            (0..new_cols)
                .map(|j_new| {
                    let y = j_new as f64 * col_ratio;
                    z[i][nearest_index(y, cols)]
                })
                .collect()
        })
        .collect()
}

/// Round to the closest grid index; exact halves round down.
fn nearest_index(position: f64, len: usize) -> usize {
    let base = position as usize;
    let index = if position - base as f64 > 0.5 {
        base + 1
    } else {
        base
    };
    index.min(len - 1)
}

fn bilinear(
    z: &[Vec<f64>],
    new_rows: usize,
    new_cols: usize,
    row_ratio: f64,
    col_ratio: f64,
) -> Vec<Vec<f64>> {
    let rows = z.len();
    let cols = z[0].len();

    (0..new_rows)
        .map(|i_new| {
            let x = i_new as f64 * row_ratio;
            let i0 = (x as usize).min(rows - 1);
            let i1 = (i0 + 1).min(rows - 1);
            let dx = x - i0 as f64;

            (0..new_cols)
                .map(|j_new| {
                    let y = j_new as f64 * col_ratio;
                    let j0 = (y as usize).min(cols - 1);
                    let j1 = (j0 + 1).min(cols - 1);
                    let dy = y - j0 as f64;

                    let top = z[i0][j0] * (1.0 - dy) + z[i0][j1] * dy;
                    let bottom = z[i1][j0] * (1.0 - dy) + z[i1][j1] * dy;
                    top * (1.0 - dx) + bottom * dx
                })
                .collect()
        })
        .collect()
}
