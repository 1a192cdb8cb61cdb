//! Variable-Q / Constant-Q spectral transform engine.
//!
//! Correlates the signal against the wavelet filter bank at every hop to
//! produce a complex time-frequency matrix. The two convolution modes are
//! numerically equivalent and differ only in cost profile: the time-domain
//! path touches each filter's true support, the FFT path reuses one frame
//! spectrum for every bin (the transform of a boxcar-framed signal against
//! the frequency-domain filter basis).

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::TransformHooks;
use crate::signal::wavelet::{self, QMode, WaveletBank};
use crate::signal::window::WindowFunction;

/// Tolerance when matching bin centre frequencies against the cutoff.
const CUTOFF_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConvolutionMode {
    #[default]
    TimeDomain,
    Fft,
}

/// Parameters of one transform run. `gamma = 0` derives the bandwidth offset
/// automatically; `max_freq` bounds the bins kept after the transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformParams {
    pub hop_length: usize,
    pub min_freq: f64,
    pub max_freq: f64,
    pub num_bins: usize,
    pub bins_per_octave: usize,
    pub filter_scale: f64,
    pub gamma: f64,
    pub mode: QMode,
    pub window: WindowFunction,
    pub convolution: ConvolutionMode,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Hop length {hop} must be a positive power of two")]
    InvalidHopLength { hop: usize },
    #[error("{num_bins} bins is not a positive multiple of {bins_per_octave} bins per octave")]
    InvalidBinLayout {
        num_bins: usize,
        bins_per_octave: usize,
    },
    #[error(
        "Wavelet basis cutoff {cutoff:.1} Hz exceeds the Nyquist frequency {nyquist:.1} Hz; \
         reduce the number of frequency bins"
    )]
    NyquistExceeded { cutoff: f64, nyquist: f64 },
    #[error("No frequency bin lies at or below the maximum frequency {max_freq:.2} Hz")]
    FrequencyNotFound { max_freq: f64 },
    #[error("Transform cancelled")]
    Cancelled,
}

/// Complex time-frequency matrix: rows are bins, columns are frames.
pub type SpectralMatrix = Vec<Vec<Complex<f64>>>;

/// Run the Q-transform over `samples`, returning the spectral matrix
/// truncated to the bins at or below `params.max_freq`.
///
/// Frames are centred every `hop_length` samples; the signal is treated as
/// zero outside its bounds. Each row is scaled by the square root of its
/// filter's true length, the constant-Q amplitude convention.
pub fn transform(
    samples: &[f64],
    sample_rate: f64,
    params: &TransformParams,
    hooks: &mut TransformHooks<'_>,
) -> Result<SpectralMatrix, TransformError> {
    if params.hop_length == 0 || !params.hop_length.is_power_of_two() {
        return Err(TransformError::InvalidHopLength {
            hop: params.hop_length,
        });
    }
    if params.num_bins == 0
        || params.bins_per_octave == 0
        || params.num_bins % params.bins_per_octave != 0
    {
        return Err(TransformError::InvalidBinLayout {
            num_bins: params.num_bins,
            bins_per_octave: params.bins_per_octave,
        });
    }

    let freqs = crate::signal::freq::q_transform_freq_bins(
        params.num_bins,
        params.bins_per_octave,
        params.min_freq,
    );

    let lengths = wavelet::wavelet_lengths(
        &freqs,
        sample_rate,
        params.window,
        params.filter_scale,
        params.mode,
        params.gamma,
        params.bins_per_octave as f64,
    );
    let nyquist = sample_rate / 2.0;
    if lengths.cutoff > nyquist {
        return Err(TransformError::NyquistExceeded {
            cutoff: lengths.cutoff,
            nyquist,
        });
    }

    let bank = wavelet::wavelet_basis(
        &freqs,
        sample_rate,
        params.window,
        params.filter_scale,
        params.mode,
        params.gamma,
        params.bins_per_octave as f64,
        true,
    );

    let num_frames = samples.len() / params.hop_length + 1;
    let mut matrix = match params.convolution {
        ConvolutionMode::TimeDomain => {
            correlate_time_domain(samples, &bank, params.hop_length, num_frames, hooks)?
        }
        ConvolutionMode::Fft => {
            correlate_fft(samples, &bank, params.hop_length, num_frames, hooks)?
        }
    };

    let highest = highest_permitted_bin(&freqs, params.max_freq)?;
    matrix.truncate(highest + 1);

    tracing::debug!(
        bins = matrix.len(),
        frames = num_frames,
        padded_len = bank.padded_len,
        "spectral matrix generated"
    );

    Ok(matrix)
}

/// Highest bin index whose centre frequency stays at or below `max_freq`
/// within tolerance. The filter bank may be built slightly wider than the
/// requested note range; trimming here keeps the displayed octave count
/// exact.
fn highest_permitted_bin(freqs: &[f64], max_freq: f64) -> Result<usize, TransformError> {
    for i in (1..freqs.len()).rev() {
        if freqs[i] - max_freq <= CUTOFF_EPSILON {
            return Ok(i);
        }
    }
    Err(TransformError::FrequencyNotFound { max_freq })
}

fn correlate_time_domain(
    samples: &[f64],
    bank: &WaveletBank,
    hop: usize,
    num_frames: usize,
    hooks: &mut TransformHooks<'_>,
) -> Result<SpectralMatrix, TransformError> {
    let num_bins = bank.filters.len();
    let half = (bank.padded_len / 2) as i64;
    let signal_len = samples.len() as i64;

    let mut matrix = Vec::with_capacity(num_bins);
    for bin in 0..num_bins {
        if hooks.cancelled() {
            return Err(TransformError::Cancelled);
        }

        let offset = bank.offsets[bin];
        let support = bank.supports[bin];
        let kernel = &bank.filters[bin][offset..offset + support];
        let row_scale = bank.lengths[bin].sqrt();

        let mut row = Vec::with_capacity(num_frames);
        for frame in 0..num_frames {
            let centre = (frame * hop) as i64;
            let start = centre - half + offset as i64;
            let begin = start.max(0);
            let end = (start + support as i64).min(signal_len);

            let mut acc = Complex::new(0.0, 0.0);
            for index in begin..end {
                let coeff = kernel[(index - start) as usize];
                acc += coeff.conj() * samples[index as usize];
            }
            row.push(acc * row_scale);
        }
        matrix.push(row);
        hooks.report(bin + 1, num_bins);
    }

    Ok(matrix)
}

fn correlate_fft(
    samples: &[f64],
    bank: &WaveletBank,
    hop: usize,
    num_frames: usize,
    hooks: &mut TransformHooks<'_>,
) -> Result<SpectralMatrix, TransformError> {
    let num_bins = bank.filters.len();
    let n = bank.padded_len;
    let half = (n / 2) as i64;
    let signal_len = samples.len() as i64;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    // Frequency-domain filter basis, one spectrum per bin.
    let mut basis: Vec<Vec<Complex<f64>>> = Vec::with_capacity(num_bins);
    for filter in &bank.filters {
        let mut spectrum = filter.clone();
        fft.process(&mut spectrum);
        basis.push(spectrum);
    }

    let row_scales: Vec<f64> = bank.lengths.iter().map(|&len| len.sqrt()).collect();
    let inverse_n = 1.0 / n as f64;

    let mut matrix = vec![Vec::with_capacity(num_frames); num_bins];
    let mut frame_buf = vec![Complex::new(0.0, 0.0); n];

    for frame in 0..num_frames {
        if hooks.cancelled() {
            return Err(TransformError::Cancelled);
        }

        let start = (frame * hop) as i64 - half;
        for (j, cell) in frame_buf.iter_mut().enumerate() {
            let index = start + j as i64;
            let value = if index >= 0 && index < signal_len {
                samples[index as usize]
            } else {
                0.0
            };
            *cell = Complex::new(value, 0.0);
        }
        fft.process(&mut frame_buf);

        // Parseval: the frequency-domain dot product equals the time-domain
        // correlation over the padded support.
        for bin in 0..num_bins {
            let mut acc = Complex::new(0.0, 0.0);
            for (filter_coeff, frame_coeff) in basis[bin].iter().zip(frame_buf.iter()) {
                acc += filter_coeff.conj() * frame_coeff;
            }
            matrix[bin].push(acc * inverse_n * row_scales[bin]);
        }
        hooks.report(frame + 1, num_frames);
    }

    Ok(matrix)
}
