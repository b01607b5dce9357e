//! WAV encoding for 16-bit stereo PCM.

use ct_engine::Frame;
use std::io::Write;

const NUM_CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;

pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&frames_to_wav(frames, sample_rate))
}

/// Encode frames as a complete WAV file. Samples are clamped to `[-1, 1]`.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
    let data_size = frames.len() as u32 * block_align as u32;

    let mut buf = Vec::with_capacity(44 + data_size as usize);
    riff_header(&mut buf, data_size);
    fmt_chunk(&mut buf, sample_rate, block_align);
    data_chunk(&mut buf, frames, data_size);
    buf
}

/// Convert a float sample to signed 16-bit PCM.
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn riff_header(buf: &mut Vec<u8>, data_size: u32) {
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
}

fn fmt_chunk(buf: &mut Vec<u8>, sample_rate: u32, block_align: u16) {
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
}

fn data_chunk(buf: &mut Vec<u8>, frames: &[Frame], data_size: u32) {
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for frame in frames {
        buf.extend_from_slice(&to_i16(frame.left).to_le_bytes());
        buf.extend_from_slice(&to_i16(frame.right).to_le_bytes());
    }
}
