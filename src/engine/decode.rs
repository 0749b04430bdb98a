//! Audio decoding
//!
//! Turns an opaque compressed-audio blob into a [`RawAudioBuffer`] using
//! Symphonia for container probing and codec decoding. The format reader and
//! codec state live in a [`DecodeSession`], created once per call and
//! released when it goes out of scope, whichever way the call ends.
//!
//! Opus tracks (browser captures in WebM or Ogg) need the `opus` feature,
//! which decodes them with libopus.
//!
//! The decoding context runs at a fixed rate: decoded audio is brought to
//! the requested rate with linear interpolation.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL, CODEC_TYPE_OPUS};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::buffer::{RawAudioBuffer, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
#[cfg(feature = "opus")]
use crate::engine::opus_decoder::{OpusPacketDecoder, OPUS_SAMPLE_RATE};
use crate::error::{Result, VoicePrepError};
use crate::pipeline::PipelineObserver;

/// Codec state of the selected track
enum PacketDecoder {
    Symphonia(Box<dyn Decoder>),
    #[cfg(feature = "opus")]
    Opus(OpusPacketDecoder),
}

/// Scoped decoding context
///
/// Owns the demuxer and codec for a single blob. Dropping the session
/// releases both and notifies the observer.
pub struct DecodeSession<'a> {
    format: Box<dyn FormatReader>,
    decoder: PacketDecoder,
    track_id: u32,
    observer: &'a dyn PipelineObserver,
}

impl<'a> DecodeSession<'a> {
    /// Probe the blob and set up a decoder for its first audio track
    pub fn open(bytes: Vec<u8>, observer: &'a dyn PipelineObserver) -> Result<Self> {
        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(bytes)),
            MediaSourceStreamOptions::default(),
        );

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| VoicePrepError::decode("failed to probe audio format", e))?;

        let format = probed.format;

        let (track_id, codec_params) = {
            let track = format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
                .ok_or_else(|| VoicePrepError::Decode {
                    reason: "no decodable audio track found".to_string(),
                    source: None,
                })?;
            (track.id, track.codec_params.clone())
        };

        let decoder = if codec_params.codec == CODEC_TYPE_OPUS {
            open_opus(&codec_params)?
        } else {
            let decoder = symphonia::default::get_codecs()
                .make(&codec_params, &DecoderOptions::default())
                .map_err(|e| VoicePrepError::decode("unsupported codec", e))?;
            PacketDecoder::Symphonia(decoder)
        };

        Ok(Self {
            format,
            decoder,
            track_id,
            observer,
        })
    }

    /// Decode every packet of the selected track
    ///
    /// Packets that fail with a recoverable decode error are dropped and
    /// reported to the observer. Returns the native-rate buffer.
    pub fn decode_all(&mut self) -> Result<RawAudioBuffer> {
        let mut interleaved: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let (mut channels, mut sample_rate) = match &self.decoder {
            PacketDecoder::Symphonia(decoder) => (
                decoder.codec_params().channels.map(|c| c.count()).unwrap_or(0),
                decoder.codec_params().sample_rate.unwrap_or(0),
            ),
            #[cfg(feature = "opus")]
            PacketDecoder::Opus(decoder) => (decoder.channels(), OPUS_SAMPLE_RATE),
        };
        let mut packet_index = 0usize;

        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(VoicePrepError::decode("failed to read audio packet", e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }
            packet_index += 1;

            match &mut self.decoder {
                PacketDecoder::Symphonia(decoder) => {
                    let decoded = match decoder.decode(&packet) {
                        Ok(d) => d,
                        Err(SymphoniaError::DecodeError(e)) => {
                            self.observer.packet_skipped(packet_index - 1, e);
                            continue;
                        }
                        Err(e) => return Err(VoicePrepError::decode("fatal decode error", e)),
                    };

                    let spec = *decoded.spec();
                    channels = spec.channels.count();
                    sample_rate = spec.rate;

                    let needs_alloc = sample_buf
                        .as_ref()
                        .map_or(true, |buf| buf.capacity() < decoded.capacity() * channels);
                    if needs_alloc {
                        sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }

                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        interleaved.extend_from_slice(buf.samples());
                    }
                }
                #[cfg(feature = "opus")]
                PacketDecoder::Opus(decoder) => match decoder.decode(packet.buf()) {
                    Ok(samples) => interleaved.extend_from_slice(samples),
                    Err(e) => {
                        self.observer.packet_skipped(packet_index - 1, &e.to_string());
                        continue;
                    }
                },
            }
        }

        if interleaved.is_empty() || channels == 0 {
            return Err(VoicePrepError::EmptyAudio);
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(VoicePrepError::Decode {
                reason: format!(
                    "unsupported sample rate {} Hz (expected {} to {} Hz)",
                    sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
                ),
                source: None,
            });
        }

        RawAudioBuffer::from_interleaved(&interleaved, channels, sample_rate)
    }
}

#[cfg(feature = "opus")]
fn open_opus(params: &symphonia::core::codecs::CodecParameters) -> Result<PacketDecoder> {
    Ok(PacketDecoder::Opus(OpusPacketDecoder::new(params)?))
}

#[cfg(not(feature = "opus"))]
fn open_opus(_params: &symphonia::core::codecs::CodecParameters) -> Result<PacketDecoder> {
    Err(VoicePrepError::Decode {
        reason: "Opus audio needs a build with the `opus` feature".to_string(),
        source: None,
    })
}

impl Drop for DecodeSession<'_> {
    fn drop(&mut self) {
        self.observer.decoder_released();
    }
}

/// Decode a blob at its native sample rate
pub fn decode_native(bytes: &[u8], observer: &dyn PipelineObserver) -> Result<RawAudioBuffer> {
    if bytes.is_empty() {
        return Err(VoicePrepError::EmptyAudio);
    }

    let mut session = DecodeSession::open(bytes.to_vec(), observer)?;
    let raw = session.decode_all()?;
    if raw.is_empty() {
        return Err(VoicePrepError::EmptyAudio);
    }
    Ok(raw)
}

/// Decode a blob and bring it to `target_sample_rate`
pub fn decode(
    bytes: &[u8],
    target_sample_rate: u32,
    observer: &dyn PipelineObserver,
) -> Result<RawAudioBuffer> {
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&target_sample_rate) {
        return Err(VoicePrepError::invalid_param(
            "target_sample_rate",
            target_sample_rate,
            "8000 to 192000 Hz",
        ));
    }

    let raw = decode_native(bytes, observer)?;
    if raw.sample_rate == target_sample_rate {
        return Ok(raw);
    }

    tracing::debug!(
        from = raw.sample_rate,
        to = target_sample_rate,
        "resampling decoded audio"
    );
    let ratio = target_sample_rate as f64 / raw.sample_rate as f64;
    let channels = raw
        .channels
        .iter()
        .map(|channel| resample_linear(channel, ratio))
        .collect();
    RawAudioBuffer::new(channels, target_sample_rate)
}

/// Linear interpolation resampling
///
/// Produces `ceil(len * ratio)` samples. Linear interpolation aliases when
/// downsampling (48 kHz captures to 44.1 kHz); a windowed sinc resampler
/// would remove that.
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        // Output index to source position
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================
