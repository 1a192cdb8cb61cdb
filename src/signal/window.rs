//! Signal window functions used to shape the wavelet filters.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window applied to each complex sinusoid in the wavelet basis.
///
/// Each variant carries the main-lobe bandwidth constant used when deriving
/// filter cutoffs, and generates its own taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Hann,
    Hamming,
    Rectangular,
}

impl WindowFunction {
    /// Equivalent noise bandwidth of the window, in FFT bins.
    pub fn bandwidth(self) -> f64 {
        match self {
            WindowFunction::Hann => 1.50018310546875,
            WindowFunction::Hamming => 1.3629455320350348,
            WindowFunction::Rectangular => 1.0,
        }
    }

    /// Generate `length` window taps.
    ///
    /// A non-symmetric (periodic) window is generated one sample longer and
    /// truncated, which keeps DFT-even symmetry. Lengths 0 and 1 degenerate
    /// to all-ones.
    pub fn taps(self, length: usize, symmetric: bool) -> Vec<f64> {
        if length <= 1 {
            return vec![1.0; length];
        }
        let extended = if symmetric { length } else { length + 1 };
        let mut taps: Vec<f64> = (0..extended).map(|n| self.value_at(n, extended)).collect();
        taps.truncate(length);
        taps
    }

    fn value_at(self, n: usize, length: usize) -> f64 {
        let phase = 2.0 * PI * n as f64 / (length - 1) as f64;
        match self {
            WindowFunction::Hann => 0.5 - 0.5 * phase.cos(),
            WindowFunction::Hamming => 0.54 - 0.46 * phase.cos(),
            WindowFunction::Rectangular => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_hann_is_zero_at_edges_and_symmetric() {
        let taps = WindowFunction::Hann.taps(9, true);
        assert_eq!(taps.len(), 9);
        assert!(taps[0].abs() < 1e-12);
        assert!(taps[8].abs() < 1e-12);
        for i in 0..4 {
            assert!((taps[i] - taps[8 - i]).abs() < 1e-12);
        }
        assert!((taps[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn periodic_window_matches_truncated_symmetric_window() {
        let periodic = WindowFunction::Hamming.taps(8, false);
        let symmetric = WindowFunction::Hamming.taps(9, true);
        assert_eq!(periodic.len(), 8);
        for i in 0..8 {
            assert!((periodic[i] - symmetric[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn degenerate_lengths_are_all_ones() {
        assert!(WindowFunction::Hann.taps(0, true).is_empty());
        assert_eq!(WindowFunction::Hann.taps(1, false), vec![1.0]);
    }

    #[test]
    fn rectangular_window_is_flat() {
        assert!(
            WindowFunction::Rectangular
                .taps(16, false)
                .iter()
                .all(|&t| t == 1.0)
        );
    }
}
