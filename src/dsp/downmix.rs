//! Channel reduction
//!
//! Averages every channel of the decoder output into a single mono channel.

use crate::engine::{MonoBuffer, RawAudioBuffer};

/// Average all channels into one, sample by sample
///
/// Consumes the raw buffer. Mono input is moved through without copying.
pub fn downmix_to_mono(raw: RawAudioBuffer) -> MonoBuffer {
    let sample_rate = raw.sample_rate;
    let num_channels = raw.num_channels();
    let mut channels = raw.channels;

    match num_channels {
        0 => MonoBuffer::new(Vec::new(), sample_rate),
        1 => MonoBuffer::new(channels.pop().unwrap_or_default(), sample_rate),
        _ => {
            let scale = 1.0 / num_channels as f32;
            let mut mono = channels.swap_remove(0);
            for channel in &channels {
                for (acc, &sample) in mono.iter_mut().zip(channel.iter()) {
                    *acc += sample;
                }
            }
            for sample in mono.iter_mut() {
                *sample *= scale;
            }
            MonoBuffer::new(mono, sample_rate)
        }
    }
}
