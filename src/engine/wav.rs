//! WAV encoding
//!
//! Serializes a mono buffer into a canonical 44-byte-header PCM WAV:
//!
//! | offset | field                          |
//! |--------|--------------------------------|
//! | 0      | "RIFF"                         |
//! | 4      | chunk size = 36 + data size    |
//! | 8      | "WAVE"                         |
//! | 12     | "fmt "                         |
//! | 16     | 16 (fmt chunk size)            |
//! | 20     | 1 (PCM)                        |
//! | 22     | 1 (mono)                       |
//! | 24     | sample rate                    |
//! | 28     | byte rate = rate * block align |
//! | 32     | 2 (block align)                |
//! | 34     | 16 (bits per sample)           |
//! | 36     | "data"                         |
//! | 40     | data size = samples * 2        |
//! | 44     | little-endian i16 samples      |

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::engine::buffer::MonoBuffer;
use crate::error::{Result, VoicePrepError};

/// Size of the canonical header in bytes
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = 2;
const PCM_FORMAT: u16 = 1;

/// Encoded WAV file
///
/// Produced once by [`encode_wav`]; treated as an opaque artifact afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavContainer {
    bytes: Vec<u8>,
}

impl WavContainer {
    /// The encoded file
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take ownership of the encoded file
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of PCM samples in the data chunk
    pub fn sample_count(&self) -> usize {
        (self.bytes.len().saturating_sub(WAV_HEADER_LEN)) / BLOCK_ALIGN as usize
    }
}

impl AsRef<[u8]> for WavContainer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Convert a float sample to 16-bit PCM
///
/// Clamps to [-1, 1], scales negatives by 32768 and the rest by 32767, then
/// rounds to the nearest integer.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
    scaled.round() as i16
}

/// Encode a mono buffer as 16-bit PCM WAV
pub fn encode_wav(buffer: &MonoBuffer) -> Result<WavContainer> {
    let data_size = u32::try_from(buffer.len() * BLOCK_ALIGN as usize)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| {
            VoicePrepError::invalid_param(
                "sample_count",
                buffer.len(),
                "fits a 4 GiB WAV data chunk",
            )
        })?;
    let sample_rate = buffer.sample_rate();
    let byte_rate = sample_rate
        .checked_mul(BLOCK_ALIGN as u32)
        .ok_or_else(|| VoicePrepError::invalid_param("sample_rate", sample_rate, "< 2^31 Hz"))?;

    let mut out = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + data_size as usize));

    // RIFF header
    out.write_all(b"RIFF")?;
    out.write_u32::<LittleEndian>(36 + data_size)?;
    out.write_all(b"WAVE")?;

    // fmt chunk
    out.write_all(b"fmt ")?;
    out.write_u32::<LittleEndian>(16)?;
    out.write_u16::<LittleEndian>(PCM_FORMAT)?;
    out.write_u16::<LittleEndian>(1)?;
    out.write_u32::<LittleEndian>(sample_rate)?;
    out.write_u32::<LittleEndian>(byte_rate)?;
    out.write_u16::<LittleEndian>(BLOCK_ALIGN)?;
    out.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;

    // data chunk
    out.write_all(b"data")?;
    out.write_u32::<LittleEndian>(data_size)?;
    for &sample in buffer.samples() {
        out.write_i16::<LittleEndian>(sample_to_i16(sample))?;
    }

    let bytes = out.into_inner();
    verify_header(&bytes)?;

    Ok(WavContainer { bytes })
}

/// Check the RIFF/WAVE magic of an encoded blob
///
/// A failure here means the encoder itself is broken.
pub fn verify_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < WAV_HEADER_LEN {
        return Err(VoicePrepError::EncodeIntegrity {
            reason: format!("header truncated to {} bytes", bytes.len()),
        });
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(VoicePrepError::EncodeIntegrity {
            reason: format!(
                "bad magic {:?}/{:?}",
                String::from_utf8_lossy(&bytes[0..4]),
                String::from_utf8_lossy(&bytes[8..12])
            ),
        });
    }
    Ok(())
}

// ============================================================================
// Inspection
// ============================================================================

/// Format details read back from a WAV blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Samples per channel
    pub frames: u32,
    pub duration_secs: f64,
}

/// Parse a WAV blob's header
pub fn inspect_wav(bytes: &[u8]) -> Result<WavInfo> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| VoicePrepError::decode("failed to parse WAV header", e))?;

    let spec = reader.spec();
    let frames = reader.duration();
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        frames,
        duration_secs: frames as f64 / spec.sample_rate as f64,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0.0, 0 ; "zero")]
    #[test_case(1.0, 32767 ; "full positive")]
    #[test_case(-1.0, -32768 ; "full negative")]
    #[test_case(2.5, 32767 ; "clamped positive")]
    #[test_case(-7.0, -32768 ; "clamped negative")]
    #[test_case(0.5, 16384 ; "half positive rounds up")]
    #[test_case(-0.5, -16384 ; "half negative")]
    #[test_case(0.25, 8192 ; "quarter positive")]
    fn test_sample_to_i16(input: f32, expected: i16) {
        assert_eq!(sample_to_i16(input), expected);
    }

    #[test]
    fn test_nan_encodes_as_silence() {
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_header_layout() {
        let buffer = MonoBuffer::new(vec![0.0, 0.5, -0.5], 22050);
        let wav = encode_wav(&buffer).unwrap();
        let b = wav.as_bytes();

        assert_eq!(b.len(), 44 + 6);
        assert_eq!(&b[0..4], b"RIFF");
        assert_eq!(LittleEndian::read_u32(&b[4..8]), 36 + 6);
        assert_eq!(&b[8..12], b"WAVE");
        assert_eq!(&b[12..16], b"fmt ");
        assert_eq!(LittleEndian::read_u32(&b[16..20]), 16);
        assert_eq!(LittleEndian::read_u16(&b[20..22]), 1);
        assert_eq!(LittleEndian::read_u16(&b[22..24]), 1);
        assert_eq!(LittleEndian::read_u32(&b[24..28]), 22050);
        assert_eq!(LittleEndian::read_u32(&b[28..32]), 44100);
        assert_eq!(LittleEndian::read_u16(&b[32..34]), 2);
        assert_eq!(LittleEndian::read_u16(&b[34..36]), 16);
        assert_eq!(&b[36..40], b"data");
        assert_eq!(LittleEndian::read_u32(&b[40..44]), 6);
        assert_eq!(LittleEndian::read_i16(&b[44..46]), 0);
        assert_eq!(LittleEndian::read_i16(&b[46..48]), 16384);
        assert_eq!(LittleEndian::read_i16(&b[48..50]), -16384);
        assert_eq!(wav.sample_count(), 3);
    }

    #[test]
    fn test_empty_buffer_encodes_header_only() {
        let wav = encode_wav(&MonoBuffer::new(Vec::new(), 44100)).unwrap();
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(LittleEndian::read_u32(&wav.as_bytes()[40..44]), 0);
    }

    #[test]
    fn test_hound_reads_encoded_samples() {
        let input: Vec<f32> = (0..480).map(|i| ((i as f32) / 240.0) - 1.0).collect();
        let wav = encode_wav(&MonoBuffer::new(input.clone(), 48000)).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(wav.as_bytes())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let expected: Vec<i16> = input.iter().map(|&s| sample_to_i16(s)).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_inspect_wav() {
        let wav = encode_wav(&MonoBuffer::new(vec![0.1; 8000], 16000)).unwrap();
        let info = inspect_wav(wav.as_bytes()).unwrap();
        assert_eq!(
            info,
            WavInfo {
                channels: 1,
                sample_rate: 16000,
                bits_per_sample: 16,
                frames: 8000,
                duration_secs: 0.5,
            }
        );
    }

    #[test]
    fn test_verify_header_rejects_bad_magic() {
        let mut bytes = encode_wav(&MonoBuffer::new(vec![0.0; 4], 8000)).unwrap().into_bytes();
        bytes[8..12].copy_from_slice(b"AVI ");
        let err = verify_header(&bytes).unwrap_err();
        assert_eq!(err.error_code(), "ENCODE_INTEGRITY");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_verify_header_rejects_truncated() {
        assert!(verify_header(b"RIFF").is_err());
    }
}
