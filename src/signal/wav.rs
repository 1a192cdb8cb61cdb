//! WAV adapter feeding hound-decoded audio into the PCM extraction seam.

use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::signal::extract::{ByteOrder, PcmSource, PcmSpec, SampleEncoding};

#[derive(Debug, Error)]
pub enum WavSourceError {
    #[error("Failed to read WAV: {0}")]
    Wav(#[from] hound::Error),
}

/// A WAV file decoded by `hound` and re-presented as a raw little-endian PCM
/// stream. Integer WAV data is normalized to signed samples regardless of the
/// container's native signedness, so the descriptor always reports signed PCM
/// or IEEE float.
pub struct WavPcmSource {
    spec: PcmSpec,
    frames: u64,
    bytes: std::io::Cursor<Vec<u8>>,
}

impl WavPcmSource {
    pub fn open(path: &Path) -> Result<Self, WavSourceError> {
        let mut reader = hound::WavReader::open(path)?;
        let wav_spec = reader.spec();
        let frames = u64::from(reader.duration());

        let (encoding, bits, bytes) = match wav_spec.sample_format {
            hound::SampleFormat::Float => {
                let mut data = Vec::with_capacity(reader.len() as usize * 4);
                for sample in reader.samples::<f32>() {
                    data.extend_from_slice(&sample?.to_le_bytes());
                }
                (SampleEncoding::Float, 32, data)
            }
            hound::SampleFormat::Int => {
                let width = usize::from((wav_spec.bits_per_sample + 7) >> 3);
                let mut data = Vec::with_capacity(reader.len() as usize * width);
                for sample in reader.samples::<i32>() {
                    data.extend_from_slice(&sample?.to_le_bytes()[..width]);
                }
                (SampleEncoding::PcmSigned, wav_spec.bits_per_sample, data)
            }
        };

        Ok(Self {
            spec: PcmSpec {
                sample_rate: f64::from(wav_spec.sample_rate),
                channels: wav_spec.channels,
                bits_per_sample: bits,
                byte_order: ByteOrder::Little,
                encoding,
            },
            frames,
            bytes: std::io::Cursor::new(bytes),
        })
    }
}

impl PcmSource for WavPcmSource {
    fn spec(&self) -> PcmSpec {
        self.spec
    }

    fn total_frames(&self) -> u64 {
        self.frames
    }

    fn read_block(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.bytes.read(buf)
    }
}
