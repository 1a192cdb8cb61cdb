//! Note-anchored frequency bin planning for the Q-transform.

use thiserror::Error;

/// Reference pitch A4 = 440 Hz, note number 57 when C0 is note 0.
const REFERENCE_PITCH_HZ: f64 = 440.0;
const REFERENCE_NOTE_NUMBER: f64 = 57.0;

#[derive(Debug, Error)]
pub enum NoteRangeError {
    #[error(
        "Note span of {span} notes ({min_note}..={max_note}) is not a positive multiple of 12"
    )]
    InvalidNoteRange {
        min_note: i32,
        max_note: i32,
        span: i32,
    },
    #[error("Bins per octave must be positive")]
    ZeroBinsPerOctave,
}

/// Frequency of the given note number in A440 equal temperament.
pub fn note_number_to_freq(note_number: i32) -> f64 {
    REFERENCE_PITCH_HZ * 2f64.powf((f64::from(note_number) - REFERENCE_NOTE_NUMBER) / 12.0)
}

/// Fractional note number for a frequency. Rounding is left to the caller.
pub fn freq_to_note_number(freq: f64) -> f64 {
    12.0 * (freq / REFERENCE_PITCH_HZ).log2() + REFERENCE_NOTE_NUMBER
}

/// Centre frequencies of `num_bins` geometrically spaced Q-transform bins.
pub fn q_transform_freq_bins(num_bins: usize, bins_per_octave: usize, min_freq: f64) -> Vec<f64> {
    let octaves_per_bin = 1.0 / bins_per_octave as f64;
    (0..num_bins)
        .map(|i| min_freq * 2f64.powf(i as f64 * octaves_per_bin))
        .collect()
}

/// Geometrically spaced centre frequencies covering a whole number of octaves.
///
/// Derived once from a note range and immutable afterwards. The covered range
/// always spans complete octaves, one semitone of granularity per octave.
#[derive(Debug, Clone)]
pub struct FrequencyBinSet {
    frequencies: Vec<f64>,
    bins_per_octave: usize,
    num_octaves: usize,
    min_freq: f64,
    max_freq: f64,
}

impl FrequencyBinSet {
    pub fn plan(
        min_note: i32,
        max_note: i32,
        bins_per_octave: usize,
    ) -> Result<Self, NoteRangeError> {
        let span = max_note - min_note + 1;
        if span <= 0 || span % 12 != 0 {
            return Err(NoteRangeError::InvalidNoteRange {
                min_note,
                max_note,
                span,
            });
        }
        if bins_per_octave == 0 {
            return Err(NoteRangeError::ZeroBinsPerOctave);
        }

        let num_octaves = (span / 12) as usize;
        let min_freq = note_number_to_freq(min_note);
        let max_freq = note_number_to_freq(max_note);
        let frequencies =
            q_transform_freq_bins(bins_per_octave * num_octaves, bins_per_octave, min_freq);

        Ok(Self {
            frequencies,
            bins_per_octave,
            num_octaves,
            min_freq,
            max_freq,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn bins_per_octave(&self) -> usize {
        self.bins_per_octave
    }

    pub fn num_octaves(&self) -> usize {
        self.num_octaves
    }

    /// Frequency of the lowest note in the planned range.
    pub fn min_freq(&self) -> f64 {
        self.min_freq
    }

    /// Frequency of the highest note in the planned range. Bins above this
    /// frequency are trimmed after the transform.
    pub fn max_freq(&self) -> f64 {
        self.max_freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_number_round_trip_hits_reference_pitch() {
        assert!((note_number_to_freq(57) - 440.0).abs() < 1e-9);
        assert!((freq_to_note_number(440.0) - 57.0).abs() < 1e-9);
        // C0 per the A440 tuning table.
        assert!((note_number_to_freq(0) - 16.351597831287414).abs() < 1e-9);
    }

    #[test]
    fn plan_produces_strictly_increasing_bins_of_expected_length() {
        let bins = FrequencyBinSet::plan(24, 83, 12).expect("valid range");
        assert_eq!(bins.len(), 60);
        assert_eq!(bins.num_octaves(), 5);
        for pair in bins.frequencies().windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!((bins.frequencies()[0] - bins.min_freq()).abs() < 1e-12);
    }

    #[test]
    fn successive_bins_are_spaced_by_the_octave_ratio() {
        let bins = FrequencyBinSet::plan(0, 35, 24).expect("valid range");
        let ratio = 2f64.powf(1.0 / 24.0);
        for pair in bins.frequencies().windows(2) {
            assert!((pair[1] / pair[0] - ratio).abs() < 1e-12);
        }
    }

    #[test]
    fn plan_rejects_partial_octaves() {
        let err = FrequencyBinSet::plan(24, 80, 12).unwrap_err();
        assert!(matches!(err, NoteRangeError::InvalidNoteRange { span: 57, .. }));
        assert!(FrequencyBinSet::plan(40, 30, 12).is_err());
    }
}
