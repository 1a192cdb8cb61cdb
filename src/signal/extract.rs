//! PCM sample extraction and normalization.
//!
//! Consumes a decoded PCM byte stream through the [`PcmSource`] seam, unpacks
//! it into native-width integers honouring byte order and signedness, and
//! normalizes everything into a mono [`SampleBuffer`] with values in [-1, 1].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Samples unpacked per channel per block read.
pub const SAMPLES_PER_BLOCK: usize = 1024;

/// Default maximum audio length accepted for extraction, in seconds.
pub const DEFAULT_MAX_DURATION_SECS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    PcmSigned,
    PcmUnsigned,
    /// IEEE float payload; already decoded, so bit unpacking is skipped.
    Float,
    ALaw,
    MuLaw,
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleEncoding::PcmSigned => "signed PCM",
            SampleEncoding::PcmUnsigned => "unsigned PCM",
            SampleEncoding::Float => "IEEE float",
            SampleEncoding::ALaw => "A-law",
            SampleEncoding::MuLaw => "mu-law",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Descriptor of a decoded PCM stream, supplied by the decoding collaborator.
#[derive(Debug, Clone, Copy)]
pub struct PcmSpec {
    pub sample_rate: f64,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub byte_order: ByteOrder,
    pub encoding: SampleEncoding,
}

impl PcmSpec {
    pub fn bytes_per_sample(&self) -> usize {
        usize::from((self.bits_per_sample + 7) >> 3)
    }
}

/// Extraction limits imposed by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ExtractPolicy {
    pub max_duration_secs: f64,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Audio runs {seconds:.3} s but the configured maximum is {limit:.3} s")]
    DurationExceeded { seconds: f64, limit: f64 },
    #[error("Unsupported PCM encoding: {encoding}")]
    UnsupportedEncoding { encoding: SampleEncoding },
    #[error("Invalid PCM stream: {message}")]
    InvalidStream { message: String },
    #[error("Failed to read PCM block: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },
}

/// Injected decoding interface. The core never spawns decoders itself; it
/// reads fixed-size byte blocks from whatever the caller plugs in.
pub trait PcmSource {
    fn spec(&self) -> PcmSpec;
    /// Total frame count of the stream, known up front.
    fn total_frames(&self) -> u64;
    /// Fill `buf` with the next block of raw bytes, returning the number of
    /// bytes written. Zero signals end of stream.
    fn read_block(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// In-memory PCM source backing tests and already-buffered callers.
#[derive(Debug, Clone)]
pub struct MemoryPcm {
    spec: PcmSpec,
    bytes: Vec<u8>,
    cursor: usize,
}

impl MemoryPcm {
    pub fn new(spec: PcmSpec, bytes: Vec<u8>) -> Self {
        Self {
            spec,
            bytes,
            cursor: 0,
        }
    }
}

impl PcmSource for MemoryPcm {
    fn spec(&self) -> PcmSpec {
        self.spec
    }

    fn total_frames(&self) -> u64 {
        let frame_bytes = self.spec.bytes_per_sample() * usize::from(self.spec.channels.max(1));
        (self.bytes.len() / frame_bytes.max(1)) as u64
    }

    fn read_block(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.bytes.len() - self.cursor;
        let take = remaining.min(buf.len());
        buf[..take].copy_from_slice(&self.bytes[self.cursor..self.cursor + take]);
        self.cursor += take;
        Ok(take)
    }
}

/// Normalized mono samples plus the source timing metadata.
///
/// Created once per source and immutable afterwards.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: f64,
    duration_secs: f64,
}

impl SampleBuffer {
    /// Wrap an already-mono signal, e.g. synthesized test input or the output
    /// of a resampling pass.
    pub fn from_mono(samples: Vec<f64>, sample_rate: f64) -> Self {
        let duration_secs = if sample_rate > 0.0 {
            samples.len() as f64 / sample_rate
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration_secs,
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Extract, normalize, and downmix a PCM stream into a mono sample buffer.
pub fn extract(
    source: &mut dyn PcmSource,
    policy: &ExtractPolicy,
) -> Result<SampleBuffer, ExtractError> {
    let spec = source.spec();
    validate_spec(&spec)?;

    let channels = usize::from(spec.channels);
    let frames = source.total_frames();
    let seconds = frames as f64 / spec.sample_rate;
    if seconds > policy.max_duration_secs {
        return Err(ExtractError::DurationExceeded {
            seconds,
            limit: policy.max_duration_secs,
        });
    }

    let block_len = SAMPLES_PER_BLOCK * channels * spec.bytes_per_sample();
    let mut block = vec![0u8; block_len];
    let mut interleaved: Vec<f64> = Vec::with_capacity(frames as usize * channels);

    loop {
        let read = source
            .read_block(&mut block)
            .map_err(|source| ExtractError::Read { source })?;
        if read == 0 {
            break;
        }
        unpack_block(&block[..read], &spec, &mut interleaved);
    }

    tracing::debug!(
        frames,
        channels,
        sample_rate = spec.sample_rate,
        "extracted PCM stream"
    );

    Ok(SampleBuffer {
        samples: downmix(&interleaved, channels),
        sample_rate: spec.sample_rate,
        duration_secs: seconds,
    })
}

fn validate_spec(spec: &PcmSpec) -> Result<(), ExtractError> {
    match spec.encoding {
        SampleEncoding::ALaw | SampleEncoding::MuLaw => {
            return Err(ExtractError::UnsupportedEncoding {
                encoding: spec.encoding,
            });
        }
        SampleEncoding::Float => {
            if spec.bits_per_sample != 32 && spec.bits_per_sample != 64 {
                return Err(ExtractError::InvalidStream {
                    message: format!("{}-bit float samples are not supported", spec.bits_per_sample),
                });
            }
        }
        SampleEncoding::PcmSigned | SampleEncoding::PcmUnsigned => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(ExtractError::InvalidStream {
                    message: format!("{} bits per sample out of range", spec.bits_per_sample),
                });
            }
        }
    }
    if spec.channels == 0 {
        return Err(ExtractError::InvalidStream {
            message: "stream has no channels".into(),
        });
    }
    if spec.sample_rate <= 0.0 {
        return Err(ExtractError::InvalidStream {
            message: format!("invalid sample rate {}", spec.sample_rate),
        });
    }
    Ok(())
}

fn unpack_block(bytes: &[u8], spec: &PcmSpec, out: &mut Vec<f64>) {
    match spec.encoding {
        SampleEncoding::Float => unpack_float_block(bytes, spec, out),
        SampleEncoding::PcmSigned | SampleEncoding::PcmUnsigned => {
            unpack_integer_block(bytes, spec, out);
        }
        // Rejected up front in validate_spec.
        SampleEncoding::ALaw | SampleEncoding::MuLaw => {}
    }
}

fn unpack_float_block(bytes: &[u8], spec: &PcmSpec, out: &mut Vec<f64>) {
    if spec.bits_per_sample == 32 {
        for chunk in bytes.chunks_exact(4) {
            let raw = match spec.byte_order {
                ByteOrder::Little => f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                ByteOrder::Big => f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            };
            out.push(clamp_unit(f64::from(raw)));
        }
    } else {
        for chunk in bytes.chunks_exact(8) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            let value = match spec.byte_order {
                ByteOrder::Little => f64::from_le_bytes(raw),
                ByteOrder::Big => f64::from_be_bytes(raw),
            };
            out.push(clamp_unit(value));
        }
    }
}

fn unpack_integer_block(bytes: &[u8], spec: &PcmSpec, out: &mut Vec<f64>) {
    let width = spec.bytes_per_sample();
    let bits = u32::from(spec.bits_per_sample);
    let full_scale = 1i64 << (bits - 1);
    let sign_shift = 64 - bits;

    for chunk in bytes.chunks_exact(width) {
        let mut raw = 0u64;
        match spec.byte_order {
            ByteOrder::Little => {
                for (b, &byte) in chunk.iter().enumerate() {
                    raw |= u64::from(byte) << (8 * b);
                }
            }
            ByteOrder::Big => {
                // Most significant byte first; assemble from the tail.
                for (b, &byte) in chunk.iter().rev().enumerate() {
                    raw |= u64::from(byte) << (8 * b);
                }
            }
        }

        let value = if spec.encoding == SampleEncoding::PcmSigned {
            // Sign-extend through the full native width and back.
            ((raw << sign_shift) as i64) >> sign_shift
        } else {
            // Re-centre unsigned samples around zero.
            raw as i64 - full_scale
        };

        out.push(value as f64 / full_scale as f64);
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn downmix(interleaved: &[f64], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(
        channels: u16,
        bits: u16,
        byte_order: ByteOrder,
        encoding: SampleEncoding,
    ) -> PcmSpec {
        PcmSpec {
            sample_rate: 8000.0,
            channels,
            bits_per_sample: bits,
            byte_order,
            encoding,
        }
    }

    fn extract_bytes(spec: PcmSpec, bytes: Vec<u8>) -> Result<SampleBuffer, ExtractError> {
        let mut source = MemoryPcm::new(spec, bytes);
        extract(&mut source, &ExtractPolicy::default())
    }

    #[test]
    fn signed_16_bit_little_endian_normalizes_to_unit_range() {
        let bytes = [0i16, i16::MAX, i16::MIN, -1]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect::<Vec<u8>>();
        let buffer = extract_bytes(
            spec(1, 16, ByteOrder::Little, SampleEncoding::PcmSigned),
            bytes,
        )
        .expect("extract");
        assert_eq!(buffer.len(), 4);
        assert!((buffer.samples()[0] - 0.0).abs() < 1e-12);
        assert!((buffer.samples()[1] - 32767.0 / 32768.0).abs() < 1e-12);
        assert!((buffer.samples()[2] + 1.0).abs() < 1e-12);
        assert!((buffer.samples()[3] + 1.0 / 32768.0).abs() < 1e-12);
    }

    #[test]
    fn signed_24_bit_big_endian_sign_extends() {
        // -2 as a 24-bit big-endian integer.
        let bytes = vec![0xff, 0xff, 0xfe, 0x00, 0x00, 0x01];
        let buffer = extract_bytes(
            spec(1, 24, ByteOrder::Big, SampleEncoding::PcmSigned),
            bytes,
        )
        .expect("extract");
        let full_scale = f64::from(1 << 23);
        assert!((buffer.samples()[0] + 2.0 / full_scale).abs() < 1e-15);
        assert!((buffer.samples()[1] - 1.0 / full_scale).abs() < 1e-15);
    }

    #[test]
    fn unsigned_8_bit_recentres_around_zero() {
        let buffer = extract_bytes(
            spec(1, 8, ByteOrder::Little, SampleEncoding::PcmUnsigned),
            vec![128, 255, 0, 64],
        )
        .expect("extract");
        assert!((buffer.samples()[0] - 0.0).abs() < 1e-12);
        assert!((buffer.samples()[1] - 127.0 / 128.0).abs() < 1e-12);
        assert!((buffer.samples()[2] + 1.0).abs() < 1e-12);
        assert!((buffer.samples()[3] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn float_samples_pass_through_clamped() {
        let bytes = [0.25f32, -0.5, 1.5, -2.0]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect::<Vec<u8>>();
        let buffer = extract_bytes(spec(1, 32, ByteOrder::Little, SampleEncoding::Float), bytes)
            .expect("extract");
        assert_eq!(buffer.samples(), &[0.25, -0.5, 1.0, -1.0]);
    }

    #[test]
    fn identical_stereo_channels_downmix_to_one_channel() {
        let frames = [1000i16, -2000, 3000, -4000];
        let bytes = frames
            .iter()
            .flat_map(|s| [s.to_le_bytes(), s.to_le_bytes()].concat())
            .collect::<Vec<u8>>();
        let stereo = extract_bytes(
            spec(2, 16, ByteOrder::Little, SampleEncoding::PcmSigned),
            bytes,
        )
        .expect("extract stereo");

        let mono_bytes = frames
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect::<Vec<u8>>();
        let mono = extract_bytes(
            spec(1, 16, ByteOrder::Little, SampleEncoding::PcmSigned),
            mono_bytes,
        )
        .expect("extract mono");

        assert_eq!(stereo.len(), frames.len());
        assert_eq!(stereo.samples(), mono.samples());
    }

    #[test]
    fn stereo_output_is_half_the_sample_count() {
        let bytes = vec![0u8; 16 * 2 * 2];
        let buffer = extract_bytes(
            spec(2, 16, ByteOrder::Little, SampleEncoding::PcmSigned),
            bytes,
        )
        .expect("extract");
        assert_eq!(buffer.len(), 16);
    }

    #[test]
    fn over_long_audio_is_rejected() {
        let mut source = MemoryPcm::new(
            spec(1, 16, ByteOrder::Little, SampleEncoding::PcmSigned),
            vec![0u8; 2 * 8000 * 3],
        );
        let policy = ExtractPolicy {
            max_duration_secs: 2.0,
        };
        let err = extract(&mut source, &policy).unwrap_err();
        assert!(matches!(err, ExtractError::DurationExceeded { .. }));
    }

    #[test]
    fn alaw_streams_are_unsupported() {
        let err = extract_bytes(spec(1, 8, ByteOrder::Little, SampleEncoding::ALaw), vec![0; 8])
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::UnsupportedEncoding {
                encoding: SampleEncoding::ALaw
            }
        ));
    }
}
