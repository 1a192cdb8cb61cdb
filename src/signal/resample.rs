//! Band-limited resampling with a windowed-sinc interpolation filter.
//!
//! The interpolation windows are synthesized at construction instead of being
//! shipped as data tables: a Kaiser-windowed sinc sampled at a fixed number of
//! subdivisions per zero crossing, linearly interpolated between taps at run
//! time.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("Invalid sample rate {rate}")]
    InvalidRate { rate: f64 },
    #[error("Input of {input_len} samples is too short to resample from {from} Hz to {to} Hz")]
    SignalTooShort {
        input_len: usize,
        from: f64,
        to: f64,
    },
}

/// Stock interpolation windows, trading stop-band rejection against speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResampleQuality {
    #[default]
    KaiserBest,
    KaiserFast,
}

impl ResampleQuality {
    pub fn window(self) -> InterpolationWindow {
        match self {
            ResampleQuality::KaiserBest => {
                InterpolationWindow::new(64, 512, 0.9475937167399596, 14.769656459379492)
            }
            ResampleQuality::KaiserFast => {
                InterpolationWindow::new(16, 512, 0.85, 8.555504641634386)
            }
        }
    }
}

/// Right wing of a symmetric windowed-sinc interpolation filter.
///
/// `precision` is the number of taps between consecutive zero crossings; the
/// left wing is obtained by time reversal.
#[derive(Debug, Clone)]
pub struct InterpolationWindow {
    half_window: Vec<f64>,
    precision: usize,
    rolloff: f64,
}

impl InterpolationWindow {
    /// Build a Kaiser-windowed sinc half-window with `num_zeros` zero
    /// crossings sampled at `precision` subdivisions each. `num_zeros` and
    /// `precision` must be positive.
    pub fn new(num_zeros: usize, precision: usize, rolloff: f64, beta: f64) -> Self {
        let taps = (num_zeros * precision).max(1);
        let i0_beta = bessel_i0(beta);
        let mut half_window = Vec::with_capacity(taps + 1);
        for i in 0..=taps {
            let t = i as f64 / precision as f64;
            let fraction = i as f64 / taps as f64;
            let kaiser = bessel_i0(beta * (1.0 - fraction * fraction).sqrt()) / i0_beta;
            half_window.push(rolloff * sinc(rolloff * t) * kaiser);
        }
        Self {
            half_window,
            precision,
            rolloff,
        }
    }

    pub fn half_window(&self) -> &[f64] {
        &self.half_window
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn rolloff(&self) -> f64 {
        self.rolloff
    }
}

/// Resample `x` from `sr_orig` to `sr_final`.
///
/// The output holds `ceil(ratio * x.len())` samples. When decimating, the
/// interpolation window is time-scaled by the ratio to stay below the output
/// Nyquist frequency. With `scale` set, every output sample is divided by
/// `sqrt(ratio)` so total energy is approximately preserved.
pub fn resample(
    x: &[f64],
    sr_orig: f64,
    sr_final: f64,
    window: &InterpolationWindow,
    scale: bool,
) -> Result<Vec<f64>, ResampleError> {
    if sr_orig <= 0.0 {
        return Err(ResampleError::InvalidRate { rate: sr_orig });
    }
    if sr_final <= 0.0 {
        return Err(ResampleError::InvalidRate { rate: sr_final });
    }

    let ratio = sr_final / sr_orig;
    let base_len = (ratio * x.len() as f64) as usize;
    if base_len < 1 {
        return Err(ResampleError::SignalTooShort {
            input_len: x.len(),
            from: sr_orig,
            to: sr_final,
        });
    }

    let mut interp_win = window.half_window.clone();
    if ratio < 1.0 {
        for tap in &mut interp_win {
            *tap *= ratio;
        }
    }

    let n_win = interp_win.len();
    let mut deltas = vec![0.0; n_win];
    for i in 0..n_win - 1 {
        deltas[i] = interp_win[i + 1] - interp_win[i];
    }

    let time_scale = ratio.min(1.0);
    let index_step = ((time_scale * window.precision as f64) as usize).max(1);
    let time_increment = 1.0 / ratio;

    let mut y = vec![0.0; base_len];
    let mut time_register = 0.0f64;

    for t in 0..base_len {
        let n = time_register as usize;
        if n >= x.len() {
            break;
        }

        // Left wing of the filter response.
        let frac = time_scale * (time_register - n as f64);
        let index_frac = frac * window.precision as f64;
        let offset = index_frac as usize;
        let eta = index_frac - offset as f64;

        let i_max = (n + 1).min((n_win - offset) / index_step);
        for i in 0..i_max {
            let tap = offset + i * index_step;
            let weight = interp_win[tap] + eta * deltas[tap];
            y[t] += weight * x[n - i];
        }

        // Right wing uses the time-reversed window.
        let frac = time_scale - frac;
        let index_frac = frac * window.precision as f64;
        let offset = index_frac as usize;
        let eta = index_frac - offset as f64;

        let j_max = x.len().saturating_sub(n + 1).min((n_win - offset) / index_step);
        for j in 0..j_max {
            let tap = offset + j * index_step;
            let weight = interp_win[tap] + eta * deltas[tap];
            y[t] += weight * x[n + j + 1];
        }

        time_register += time_increment;
    }

    let final_len = (ratio * x.len() as f64).ceil() as usize;
    y.resize(final_len, 0.0);

    if scale {
        let factor = ratio.sqrt();
        for sample in &mut y {
            *sample /= factor;
        }
    }

    Ok(y)
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Modified Bessel function of the first kind, order zero, via its power
/// series. Converges in a few dozen terms for the beta values in use.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..=64 {
        let factor = half / k as f64;
        term *= factor * factor;
        sum += term;
        if term < sum * 1e-16 {
            break;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn energy(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    #[test]
    fn half_window_is_unit_peaked_and_decays() {
        let window = ResampleQuality::KaiserBest.window();
        let taps = window.half_window();
        assert!((taps[0] - window.rolloff()).abs() < 1e-12);
        assert!(taps[0] > taps.last().copied().unwrap_or(0.0).abs());
        // The envelope decays across zero crossings.
        let precision = window.precision();
        assert!(taps[0] > taps[precision / 2].abs());
        assert!(taps[precision / 2].abs() > taps[taps.len() - 1].abs());
    }

    #[test]
    fn output_length_is_ceil_of_ratio_times_input() {
        let window = ResampleQuality::KaiserFast.window();
        let x = vec![0.0; 1000];
        for (from, to) in [(44100.0, 22050.0), (22050.0, 44100.0), (44100.0, 48000.0)] {
            let out = resample(&x, from, to, &window, false).expect("resample");
            let expected = (to / from * 1000.0).ceil() as usize;
            assert_eq!(out.len(), expected);
        }
    }

    #[test]
    fn invalid_rates_are_rejected() {
        let window = ResampleQuality::KaiserFast.window();
        assert!(matches!(
            resample(&[0.0; 8], 0.0, 8000.0, &window, false),
            Err(ResampleError::InvalidRate { .. })
        ));
        assert!(matches!(
            resample(&[0.0; 8], 8000.0, -1.0, &window, false),
            Err(ResampleError::InvalidRate { .. })
        ));
    }

    #[test]
    fn too_short_input_is_rejected() {
        let window = ResampleQuality::KaiserFast.window();
        let err = resample(&[0.0; 4], 44100.0, 8000.0, &window, false).unwrap_err();
        assert!(matches!(err, ResampleError::SignalTooShort { input_len: 4, .. }));
    }

    #[test]
    fn round_trip_with_scaling_preserves_energy() {
        let window = ResampleQuality::KaiserBest.window();
        let x = sine(440.0, 8000.0, 8000);
        let down = resample(&x, 8000.0, 4000.0, &window, true).expect("downsample");
        let up = resample(&down, 4000.0, 8000.0, &window, true).expect("upsample");
        let ratio = energy(&up) / energy(&x);
        assert!((ratio - 1.0).abs() < 0.05, "energy ratio {ratio}");
    }

    #[test]
    fn identity_ratio_reproduces_a_low_frequency_tone() {
        let window = ResampleQuality::KaiserBest.window();
        let x = sine(50.0, 8000.0, 4000);
        let y = resample(&x, 8000.0, 8000.0, &window, false).expect("resample");
        assert_eq!(y.len(), x.len());
        // Compare away from the edges where the window is truncated.
        for i in 200..3800 {
            assert!((y[i] - x[i]).abs() < 5e-3, "sample {i}: {} vs {}", y[i], x[i]);
        }
    }
}
