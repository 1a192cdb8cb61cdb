//! Adaptive wavelet filter bank construction.
//!
//! Each frequency bin gets a windowed complex sinusoid whose length adapts to
//! the local octave resolution: narrow (long) filters at low frequencies,
//! wide (short) filters at high frequencies, with a gamma bandwidth offset
//! keeping low bins from overlapping.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::signal::window::WindowFunction;

/// Auditory filter constant from Glasberg & Moore's notched-noise data,
/// used to derive gamma when the caller leaves it unset.
const AUDITORY_GAMMA_COEFFICIENT: f64 = 24.7 / 0.108;

/// Variable-Q adapts the bandwidth offset per bin; constant-Q pins gamma to
/// zero so every filter keeps the same quality factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QMode {
    #[default]
    Variable,
    Constant,
}

/// Bandwidth-shape coefficient for a given octave resolution:
/// `(r^2 - 1) / (r^2 + 1)` with `r = 2^(1/bins_per_octave)`.
pub fn compute_alpha(bins_per_octave: f64) -> f64 {
    let r = 2f64.powf(1.0 / bins_per_octave);
    (r * r - 1.0) / (r * r + 1.0)
}

/// Per-bin filter lengths (fractional) plus the highest frequency the bank
/// touches. The cutoff must stay at or below Nyquist for the bank to be
/// usable at the given sample rate.
#[derive(Debug, Clone)]
pub struct WaveletLengths {
    pub lengths: Vec<f64>,
    pub cutoff: f64,
}

/// Derive the adaptive per-bin lengths for `freqs`.
///
/// Frequencies are assumed positive and strictly ascending. With fewer than
/// two frequencies the local octave resolution cannot be estimated, so
/// `fallback_bins_per_octave` stands in.
pub fn wavelet_lengths(
    freqs: &[f64],
    sample_rate: f64,
    window: WindowFunction,
    filter_scale: f64,
    mode: QMode,
    gamma: f64,
    fallback_bins_per_octave: f64,
) -> WaveletLengths {
    let num_freqs = freqs.len();

    let alphas: Vec<f64> = if num_freqs >= 2 {
        let log_freqs: Vec<f64> = freqs.iter().map(|f| f.log2()).collect();
        let mut bpo = vec![0.0; num_freqs];
        bpo[0] = 1.0 / (log_freqs[1] - log_freqs[0]);
        bpo[num_freqs - 1] = 1.0 / (log_freqs[num_freqs - 1] - log_freqs[num_freqs - 2]);
        for i in 1..num_freqs - 1 {
            bpo[i] = 2.0 / (log_freqs[i + 1] - log_freqs[i - 1]);
        }
        bpo.iter().map(|&b| compute_alpha(b)).collect()
    } else {
        vec![compute_alpha(fallback_bins_per_octave); num_freqs]
    };

    let gammas: Vec<f64> = match mode {
        QMode::Constant => vec![0.0; num_freqs],
        QMode::Variable if gamma == 0.0 => alphas
            .iter()
            .map(|&alpha| AUDITORY_GAMMA_COEFFICIENT * alpha)
            .collect(),
        QMode::Variable => vec![gamma; num_freqs],
    };

    let q_factors: Vec<f64> = alphas.iter().map(|&alpha| filter_scale / alpha).collect();

    let bandwidth = window.bandwidth();
    let mut cutoff = f64::MIN;
    for i in 0..num_freqs {
        let candidate = freqs[i] * (1.0 + 0.5 * bandwidth / q_factors[i]) + 0.5 * gammas[i];
        cutoff = cutoff.max(candidate);
    }

    let lengths = (0..num_freqs)
        .map(|i| q_factors[i] * sample_rate / (freqs[i] + gammas[i] / alphas[i]))
        .collect();

    WaveletLengths { lengths, cutoff }
}

/// A bank of complex wavelet filters padded to a common length.
///
/// `supports` holds each filter's true (pre-padding) length and `offsets` the
/// left padding, both needed for correct convolution alignment later.
#[derive(Debug, Clone)]
pub struct WaveletBank {
    pub filters: Vec<Vec<Complex<f64>>>,
    pub lengths: Vec<f64>,
    pub supports: Vec<usize>,
    pub offsets: Vec<usize>,
    pub padded_len: usize,
    pub cutoff: f64,
}

/// Build the wavelet basis for `freqs`: one L1-normalized windowed complex
/// sinusoid per bin, centred at time zero and zero-padded to a shared length
/// (the next power of two of the longest filter when `pad_to_power_of_two`
/// is set, for FFT alignment).
pub fn wavelet_basis(
    freqs: &[f64],
    sample_rate: f64,
    window: WindowFunction,
    filter_scale: f64,
    mode: QMode,
    gamma: f64,
    fallback_bins_per_octave: f64,
    pad_to_power_of_two: bool,
) -> WaveletBank {
    let WaveletLengths { lengths, cutoff } = wavelet_lengths(
        freqs,
        sample_rate,
        window,
        filter_scale,
        mode,
        gamma,
        fallback_bins_per_octave,
    );

    let mut kernels: Vec<Vec<Complex<f64>>> = Vec::with_capacity(freqs.len());
    for (i, &freq) in freqs.iter().enumerate() {
        let ilen = lengths[i];
        let lower = (-ilen / 2.0).floor() as i64;
        let upper = (ilen / 2.0).floor() as i64;
        let support = (upper - lower).max(0) as usize;

        let taps = window.taps(support, false);
        let angular_step = 2.0 * PI * freq / sample_rate;
        let mut kernel: Vec<Complex<f64>> = (0..support)
            .map(|j| {
                let time_index = j as i64 + lower;
                Complex::from_polar(taps[j], time_index as f64 * angular_step)
            })
            .collect();
        l1_normalize(&mut kernel);
        kernels.push(kernel);
    }

    let max_len = lengths.iter().copied().fold(0.0f64, f64::max);
    let padded_len = if pad_to_power_of_two {
        (max_len.ceil() as usize).next_power_of_two()
    } else {
        max_len.ceil() as usize
    };

    let mut filters = Vec::with_capacity(kernels.len());
    let mut supports = Vec::with_capacity(kernels.len());
    let mut offsets = Vec::with_capacity(kernels.len());
    for kernel in kernels {
        let support = kernel.len();
        let offset = (padded_len - support) / 2;
        let mut padded = vec![Complex::new(0.0, 0.0); padded_len];
        padded[offset..offset + support].copy_from_slice(&kernel);
        filters.push(padded);
        supports.push(support);
        offsets.push(offset);
    }

    WaveletBank {
        filters,
        lengths,
        supports,
        offsets,
        padded_len,
        cutoff,
    }
}

fn l1_normalize(kernel: &mut [Complex<f64>]) {
    let norm: f64 = kernel.iter().map(|c| c.norm()).sum();
    if norm > f64::MIN_POSITIVE {
        let inverse = 1.0 / norm;
        for coeff in kernel.iter_mut() {
            *coeff *= inverse;
        }
    }
}
