//! Opus packet decoding
//!
//! Symphonia demuxes Ogg and WebM/Matroska but has no Opus codec, so Opus
//! tracks are decoded with libopus. Output is always 48 kHz interleaved
//! float, with the stream's pre-skip dropped from the front.

use symphonia::core::codecs::CodecParameters;

use crate::error::{Result, VoicePrepError};

/// Opus always decodes at 48 kHz
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// Longest Opus packet: 120 ms at 48 kHz
const MAX_FRAME_SAMPLES: usize = 5760;

/// Identification header fields we need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpusHead {
    channels: usize,
    pre_skip: usize,
}

impl OpusHead {
    /// Parse an `OpusHead` identification header
    fn parse(header: &[u8]) -> Option<Self> {
        if header.len() < 19 || !header.starts_with(b"OpusHead") {
            return None;
        }
        Some(Self {
            channels: header[9] as usize,
            pre_skip: u16::from_le_bytes([header[10], header[11]]) as usize,
        })
    }
}

/// libopus decoder for one track
pub(crate) struct OpusPacketDecoder {
    decoder: opus::Decoder,
    channels: usize,
    pre_skip: usize,
    buffer: Vec<f32>,
}

impl OpusPacketDecoder {
    pub(crate) fn new(params: &CodecParameters) -> Result<Self> {
        let head = params.extra_data.as_deref().and_then(OpusHead::parse);
        let channels = head
            .map(|h| h.channels)
            .or_else(|| params.channels.map(|c| c.count()))
            .unwrap_or(0);

        let layout = match channels {
            1 => opus::Channels::Mono,
            2 => opus::Channels::Stereo,
            n => {
                return Err(VoicePrepError::Decode {
                    reason: format!("unsupported Opus channel count {}", n),
                    source: None,
                })
            }
        };

        let decoder = opus::Decoder::new(OPUS_SAMPLE_RATE, layout)
            .map_err(|e| VoicePrepError::decode("failed to create Opus decoder", e))?;

        Ok(Self {
            decoder,
            channels,
            pre_skip: head.map_or(0, |h| h.pre_skip),
            buffer: vec![0.0; MAX_FRAME_SAMPLES * channels],
        })
    }

    pub(crate) fn channels(&self) -> usize {
        self.channels
    }

    /// Decode one packet into interleaved samples
    pub(crate) fn decode(&mut self, packet: &[u8]) -> std::result::Result<&[f32], opus::Error> {
        let frames = self.decoder.decode_float(packet, &mut self.buffer, false)?;
        let skip = self.pre_skip.min(frames);
        self.pre_skip -= skip;
        Ok(&self.buffer[skip * self.channels..frames * self.channels])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(channels: u8, pre_skip: u16) -> Vec<u8> {
        let mut bytes = b"OpusHead".to_vec();
        bytes.push(1);
        bytes.push(channels);
        bytes.extend_from_slice(&pre_skip.to_le_bytes());
        bytes.extend_from_slice(&48000u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0]);
        bytes
    }

    #[test]
    fn test_parse_head() {
        assert_eq!(
            OpusHead::parse(&head(2, 312)),
            Some(OpusHead {
                channels: 2,
                pre_skip: 312
            })
        );
        assert_eq!(OpusHead::parse(b"OpusTags"), None);
    }

    #[test]
    fn test_pre_skip_dropped_once() {
        let mut params = CodecParameters::new();
        params.extra_data = Some(head(1, 312).into_boxed_slice());
        let mut decoder = OpusPacketDecoder::new(&params).unwrap();
        let mut encoder =
            opus::Encoder::new(OPUS_SAMPLE_RATE, opus::Channels::Mono, opus::Application::Voip)
                .unwrap();
        let mut packet = vec![0u8; 4000];
        let len = encoder.encode_float(&[0.1; 960], &mut packet).unwrap();

        assert_eq!(decoder.decode(&packet[..len]).unwrap().len(), 960 - 312);
        assert_eq!(decoder.decode(&packet[..len]).unwrap().len(), 960);
    }

    #[test]
    fn test_multichannel_rejected() {
        let mut params = CodecParameters::new();
        params.extra_data = Some(head(6, 0).into_boxed_slice());
        assert!(OpusPacketDecoder::new(&params).is_err());
    }
}
