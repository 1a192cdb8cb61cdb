//! Log-frequency spectrogram engine: PCM extraction, adaptive wavelet
//! filter banks, the Variable-Q transform, and colour-mapped rendering.

/// Logging setup for the command-line tools.
pub mod logging;
/// Progress reporting and cooperative cancellation hooks.
pub mod progress;
/// Signal-side processing: extraction, resampling, filter banks, transform.
pub mod signal;
/// Image-side processing: magnitudes, interpolation, colour, rendering.
pub mod spectrogram;
