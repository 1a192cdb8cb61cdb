//! End-to-end spectrogram pipeline: mono samples in, coloured pixels out.
//!
//! The pipeline plans the note-range frequency bins, optionally resamples the
//! signal to a dedicated transform rate, runs the Q-transform, compresses the
//! magnitudes, and renders them through a colour map. A second entry point
//! rebuilds the pipeline state from a persisted magnitude matrix, skipping
//! everything up to rendering.

pub mod colour;
pub mod error;
pub mod interpolate;
pub mod magnitude;
pub mod render;

use serde::{Deserialize, Serialize};

use crate::progress::TransformHooks;
use crate::signal::extract::SampleBuffer;
use crate::signal::freq::FrequencyBinSet;
use crate::signal::resample::{self, ResampleQuality};
use crate::signal::vqt::{self, ConvolutionMode, TransformParams};
use crate::signal::wavelet::{self, QMode};
use crate::signal::window::WindowFunction;
use colour::{ColourMap, ColourScale};
use error::SpectrogramError;
use interpolate::Interpolation;
use magnitude::MagnitudeMatrix;
use render::PixelBuffer;

/// Fraction of Nyquist under which the fast resampling window is safe.
const FAST_RESAMPLE_BANDWIDTH: f64 = 0.85;

/// Settings of one spectrogram computation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramSettings {
    /// Lowest note of the displayed range (C0 = 0).
    pub min_note: i32,
    /// Highest note of the displayed range.
    pub max_note: i32,
    pub bins_per_octave: usize,
    /// Frame stride in samples; must be a power of two.
    pub hop_length: usize,
    pub px_per_second: f64,
    pub px_per_octave: f64,
    pub filter_scale: f64,
    /// Bandwidth offset for the filter lengths; 0 derives it automatically.
    pub gamma: f64,
    pub mode: QMode,
    pub window: WindowFunction,
    pub convolution: ConvolutionMode,
    /// Resample to this rate before the transform when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_sample_rate: Option<f64>,
    pub colour_scale: ColourScale,
    pub interpolation: Interpolation,
    pub intensity_precision: f64,
}

impl Default for SpectrogramSettings {
    fn default() -> Self {
        Self {
            min_note: 0,
            max_note: 107,
            bins_per_octave: 60,
            hop_length: 1024,
            px_per_second: 120.0,
            px_per_octave: 72.0,
            filter_scale: 1.0,
            gamma: 0.0,
            mode: QMode::Variable,
            window: WindowFunction::Hann,
            convolution: ConvolutionMode::TimeDomain,
            transform_sample_rate: None,
            colour_scale: ColourScale::Viridis,
            interpolation: Interpolation::Bilinear,
            intensity_precision: colour::DEFAULT_INTENSITY_PRECISION,
        }
    }
}

/// A computed (or reloaded) spectrogram, ready to render.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    settings: SpectrogramSettings,
    sample_rate: f64,
    duration_secs: f64,
    width: usize,
    height: usize,
    bins: FrequencyBinSet,
    colour_map: ColourMap,
    magnitudes: MagnitudeMatrix,
}

impl Spectrogram {
    /// Run the full pipeline over an extracted sample buffer.
    pub fn from_samples(
        buffer: &SampleBuffer,
        settings: SpectrogramSettings,
        hooks: &mut TransformHooks<'_>,
    ) -> Result<Self, SpectrogramError> {
        let bins = FrequencyBinSet::plan(
            settings.min_note,
            settings.max_note,
            settings.bins_per_octave,
        )?;

        let (samples, sample_rate) = prepare_signal(buffer, &settings, &bins)?;

        let params = TransformParams {
            hop_length: settings.hop_length,
            min_freq: bins.min_freq(),
            max_freq: bins.max_freq(),
            num_bins: bins.len(),
            bins_per_octave: settings.bins_per_octave,
            filter_scale: settings.filter_scale,
            gamma: settings.gamma,
            mode: settings.mode,
            window: settings.window,
            convolution: settings.convolution,
        };
        let spectral = vqt::transform(&samples, sample_rate, &params, hooks)?;
        let magnitudes = MagnitudeMatrix::compress(&spectral);

        let duration_secs = round_to_millis(buffer.duration_secs());
        let (width, height) = image_dimensions(&settings, duration_secs, bins.num_octaves());
        let colour_map = ColourMap::build(settings.colour_scale, settings.intensity_precision);

        Ok(Self {
            settings,
            sample_rate,
            duration_secs,
            width,
            height,
            bins,
            colour_map,
            magnitudes,
        })
    }

    /// Rebuild a spectrogram from a persisted magnitude matrix and its
    /// recorded value range, bypassing extraction, resampling, the transform
    /// and compression.
    pub fn from_saved(
        rows: Vec<Vec<f64>>,
        min: f64,
        max: f64,
        sample_rate: f64,
        duration_secs: f64,
        settings: SpectrogramSettings,
    ) -> Result<Self, SpectrogramError> {
        let bins = FrequencyBinSet::plan(
            settings.min_note,
            settings.max_note,
            settings.bins_per_octave,
        )?;
        let duration_secs = round_to_millis(duration_secs);
        let (width, height) = image_dimensions(&settings, duration_secs, bins.num_octaves());
        let colour_map = ColourMap::build(settings.colour_scale, settings.intensity_precision);

        Ok(Self {
            settings,
            sample_rate,
            duration_secs,
            width,
            height,
            bins,
            colour_map,
            magnitudes: MagnitudeMatrix::from_saved(rows, min, max),
        })
    }

    /// Render at the dimensions derived from the settings.
    pub fn render(&self) -> Result<PixelBuffer, SpectrogramError> {
        self.render_sized(self.width, self.height)
    }

    /// Render at an explicit pixel size. The colour map is built once with
    /// the spectrogram and shared across renders.
    pub fn render_sized(
        &self,
        width: usize,
        height: usize,
    ) -> Result<PixelBuffer, SpectrogramError> {
        let buffer = render::render(
            &self.magnitudes,
            width,
            height,
            self.settings.interpolation,
            &self.colour_map,
        )?;
        Ok(buffer)
    }

    pub fn magnitudes(&self) -> &MagnitudeMatrix {
        &self.magnitudes
    }

    pub fn frequency_bins(&self) -> &FrequencyBinSet {
        &self.bins
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

/// Resample to the configured transform rate when one is set, picking the
/// fast interpolation window whenever the filter bank's cutoff leaves enough
/// headroom below Nyquist.
fn prepare_signal(
    buffer: &SampleBuffer,
    settings: &SpectrogramSettings,
    bins: &FrequencyBinSet,
) -> Result<(Vec<f64>, f64), SpectrogramError> {
    let Some(target_rate) = settings.transform_sample_rate else {
        return Ok((buffer.samples().to_vec(), buffer.sample_rate()));
    };
    if target_rate == buffer.sample_rate() {
        return Ok((buffer.samples().to_vec(), buffer.sample_rate()));
    }

    let lengths = wavelet::wavelet_lengths(
        bins.frequencies(),
        target_rate,
        settings.window,
        settings.filter_scale,
        settings.mode,
        settings.gamma,
        settings.bins_per_octave as f64,
    );
    let quality = if lengths.cutoff < FAST_RESAMPLE_BANDWIDTH * (target_rate / 2.0) {
        ResampleQuality::KaiserFast
    } else {
        ResampleQuality::KaiserBest
    };

    tracing::debug!(
        from = buffer.sample_rate(),
        to = target_rate,
        ?quality,
        "resampling before transform"
    );

    let resampled = resample::resample(
        buffer.samples(),
        buffer.sample_rate(),
        target_rate,
        &quality.window(),
        true,
    )?;
    Ok((resampled, target_rate))
}

fn image_dimensions(
    settings: &SpectrogramSettings,
    duration_secs: f64,
    num_octaves: usize,
) -> (usize, usize) {
    let width = (duration_secs * settings.px_per_second) as usize;
    let height = (num_octaves as f64 * settings.px_per_octave) as usize;
    (width, height)
}

/// Durations are reported to the nearest millisecond.
fn round_to_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_follow_the_display_conventions() {
        let settings = SpectrogramSettings::default();
        assert_eq!(settings.min_note, 0);
        assert_eq!(settings.max_note, 107);
        assert_eq!(settings.bins_per_octave, 60);
        assert!(settings.hop_length.is_power_of_two());
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let settings = SpectrogramSettings::default();
        let encoded = toml::to_string(&settings).expect("serialize");
        let decoded: SpectrogramSettings = toml::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded.min_note, settings.min_note);
        assert_eq!(decoded.bins_per_octave, settings.bins_per_octave);
        assert_eq!(decoded.colour_scale, settings.colour_scale);
    }

    #[test]
    fn partial_settings_fall_back_to_defaults() {
        let decoded: SpectrogramSettings =
            toml::from_str("min_note = 24\nmax_note = 83\nbins_per_octave = 12\n")
                .expect("deserialize");
        assert_eq!(decoded.min_note, 24);
        assert_eq!(decoded.max_note, 83);
        assert_eq!(decoded.bins_per_octave, 12);
        assert_eq!(decoded.hop_length, 1024);
        assert_eq!(decoded.window, WindowFunction::Hann);
    }

    #[test]
    fn image_dimensions_scale_with_duration_and_octaves() {
        let settings = SpectrogramSettings::default();
        let (width, height) = image_dimensions(&settings, 2.5, 9);
        assert_eq!(width, 300);
        assert_eq!(height, 648);
    }
}
