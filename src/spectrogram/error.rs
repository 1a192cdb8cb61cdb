//! Error types for the rendering stages and the assembled pipeline.

use thiserror::Error;

use crate::signal::extract::ExtractError;
use crate::signal::freq::NoteRangeError;
use crate::signal::resample::ResampleError;
use crate::signal::vqt::TransformError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(
        "Target shape {new_rows}x{new_cols} is smaller than the source shape {rows}x{cols}; \
         interpolation only upscales"
    )]
    ShapeTooSmall {
        rows: usize,
        cols: usize,
        new_rows: usize,
        new_cols: usize,
    },
    #[error("Cannot interpolate an empty matrix")]
    EmptyMatrix,
}

/// Pipeline-level error covering every stage from note planning to pixels.
#[derive(Debug, Error)]
pub enum SpectrogramError {
    #[error(transparent)]
    NoteRange(#[from] NoteRangeError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
