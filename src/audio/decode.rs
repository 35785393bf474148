use crate::error::AudioError;

use super::{DecodedAudio, PcmFormat};

/// Decode a raw interleaved s16le payload into a planar float buffer.
///
/// Fails when the byte length is not a whole number of sample frames.
/// An empty payload decodes to an empty buffer. Samples are normalized
/// by dividing by 32768, so the positive end tops out one step short of
/// 1.0; the WAV encoder reproduces that range exactly on the way back.
pub fn decode_pcm16(bytes: &[u8], format: PcmFormat) -> Result<DecodedAudio, AudioError> {
    let channel_count = format.channel_count as usize;
    let frame_bytes = 2 * channel_count;
    if channel_count == 0 || bytes.len() % frame_bytes != 0 {
        return Err(AudioError::MalformedPayload {
            byte_len: bytes.len(),
            channel_count: format.channel_count,
        });
    }

    let frame_count = bytes.len() / frame_bytes;
    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];
    for (index, sample) in bytes.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([sample[0], sample[1]]);
        channels[index % channel_count].push(value as f32 / 32768.0);
    }

    Ok(DecodedAudio::new(format.sample_rate, channels))
}
