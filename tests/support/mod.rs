pub mod wav;

use std::f64::consts::PI;

/// A pure sine tone, unit amplitude.
pub fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
        .collect()
}
