//! Signal-side processing: PCM extraction, resampling, frequency planning,
//! the wavelet filter bank, and the Q-transform engine.

pub mod extract;
pub mod freq;
pub mod resample;
pub mod vqt;
pub mod wav;
pub mod wavelet;
pub mod window;
