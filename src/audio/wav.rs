//! Uncompressed WAV container construction for clip export.

use super::DecodedAudio;

const HEADER_LEN: usize = 44;
const FORMAT_PCM: u16 = 1;
const BIT_DEPTH: u16 = 16;

/// Encode a decoded buffer as a complete RIFF/WAVE file image: the
/// fixed 44-byte header followed by interleaved frame-major s16le
/// samples. Total and deterministic; re-encoding the decode of this
/// output reproduces identical bytes.
pub fn encode_wav(audio: &DecodedAudio) -> Vec<u8> {
    let channel_count = audio.channel_count() as u32;
    let block_align = channel_count * 2;
    let byte_rate = audio.sample_rate() * block_align;
    let data_len = audio.frame_count() as u32 * block_align;
    let total_len = HEADER_LEN as u32 + data_len;

    let mut out = Vec::with_capacity(total_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(total_len - 8).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&(channel_count as u16).to_le_bytes());
    out.extend_from_slice(&audio.sample_rate().to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&BIT_DEPTH.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..audio.frame_count() {
        for channel in audio.channels() {
            out.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    out
}

/// Map a normalized sample back to signed 16-bit. Full scale is 32768
/// with the positive end clamped to 32767: every value the decoder can
/// produce maps back to the integer it came from, and only exact +1.0
/// loses the final bit.
fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 32768.0).round().min(32767.0) as i16
}

/// Download filename for an exported entry.
pub fn export_filename(entry_id: &str) -> String {
    format!("zotpot-{entry_id}.wav")
}
