//! Decibel conversion and dynamic-range compression of spectral magnitudes.

use rustfft::num_complex::Complex;

/// Dynamic-range budget: every magnitude is clamped to within this many
/// decibels of the matrix peak.
pub const TOP_DB: f64 = 80.0;

/// Floor applied before taking logarithms, so exact zeros never become
/// negative infinity.
const AMPLITUDE_FLOOR: f64 = 1e-10;

/// Decibel value of `power` relative to `reference`, floored on both sides.
pub fn power_to_db(power: f64, reference: f64) -> f64 {
    let reference = reference.abs();
    10.0 * power.max(AMPLITUDE_FLOOR).log10() - 10.0 * reference.max(AMPLITUDE_FLOOR).log10()
}

/// Decibel value of an amplitude relative to a reference amplitude:
/// `20·log10(amplitude/reference)` with the same zero protection.
pub fn amplitude_to_db(amplitude: f64, reference: f64) -> f64 {
    power_to_db(amplitude * amplitude, reference * reference)
}

/// Rectangular matrix of decibel-scale magnitudes, rows = bins,
/// columns = frames. Every value is at least `max - TOP_DB`.
///
/// This is the stable artifact handed to persistence and rendering; the
/// recorded (min, max) range travels with it.
#[derive(Debug, Clone)]
pub struct MagnitudeMatrix {
    rows: Vec<Vec<f64>>,
    min: f64,
    max: f64,
}

impl MagnitudeMatrix {
    /// Compress a spectral matrix: modulus, decibels relative to the peak
    /// modulus, then the top-dB floor.
    pub fn compress(spectral: &[Vec<Complex<f64>>]) -> Self {
        let mut max_modulus = 0.0f64;
        let moduli: Vec<Vec<f64>> = spectral
            .iter()
            .map(|row| {
                row.iter()
                    .map(|value| {
                        let modulus = value.norm();
                        max_modulus = max_modulus.max(modulus);
                        modulus
                    })
                    .collect()
            })
            .collect();

        let mut max_db = f64::MIN;
        let mut rows: Vec<Vec<f64>> = moduli
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&modulus| {
                        let db = amplitude_to_db(modulus, max_modulus);
                        max_db = max_db.max(db);
                        db
                    })
                    .collect()
            })
            .collect();

        let floor = max_db - TOP_DB;
        let mut min_db = f64::MAX;
        for row in &mut rows {
            for value in row.iter_mut() {
                *value = value.max(floor);
                min_db = min_db.min(*value);
            }
        }

        if rows.is_empty() || rows[0].is_empty() {
            min_db = 0.0;
            max_db = 0.0;
        }

        tracing::debug!(
            bins = rows.len(),
            frames = rows.first().map_or(0, Vec::len),
            min_db,
            max_db,
            "magnitudes compressed"
        );

        Self {
            rows,
            min: min_db,
            max: max_db,
        }
    }

    /// Rebuild a matrix from persisted values and their recorded range,
    /// bypassing extraction and the transform entirely. Rows are assumed
    /// rectangular, as guaranteed when the matrix was produced.
    pub fn from_saved(rows: Vec<Vec<f64>>, min: f64, max: f64) -> Self {
        Self { rows, min, max }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn num_bins(&self) -> usize {
        self.rows.len()
    }

    pub fn num_frames(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
