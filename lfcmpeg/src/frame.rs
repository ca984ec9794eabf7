//! MPEG-1 Layer III frame header parsing

use bytes::Bytes;

/// PCM samples represented by one MPEG-1 Layer III frame.
pub const SAMPLES_PER_FRAME: u32 = 1152;

/// Bitrate table for MPEG-1 Layer III, indexed by the 4-bit bitrate field.
/// Index 0 (free format) and 15 (reserved) are invalid.
const BITRATE_KBPS: [u32; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];

/// Sample-rate table for MPEG-1, indexed by the 2-bit sample-rate field.
/// Index 3 is reserved.
const SAMPLE_RATE_HZ: [u32; 4] = [44100, 48000, 32000, 0];

/// One playable frame: the raw bytes (header included) plus the playback
/// time it represents.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame bytes, 4-byte header included
    pub payload: Bytes,
    /// Intrinsic playback duration in milliseconds (`1152·1000 / sample_rate`)
    pub duration_ms: f64,
}

/// Decoded view of a 4-byte MPEG-1 Layer III frame header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    /// Whole frame size in bytes, 4-byte header included
    pub frame_size: usize,
    /// Bitrate in kbps
    pub bitrate_kbps: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Playback duration of the frame in milliseconds
    pub duration_ms: f64,
}

impl FrameHeader {
    /// Parses a candidate 4-byte header.
    ///
    /// Returns `None` when the bytes are not a frame start: missing sync
    /// word, reserved version field, reserved layer field, invalid bitrate
    /// index, or reserved sample-rate index. Callers are expected to
    /// resynchronise by advancing one byte.
    pub fn parse(bytes: &[u8; 4]) -> Option<FrameHeader> {
        // Sync word: 11 set bits across bytes 0 and 1
        if bytes[0] != 0xFF || (bytes[1] & 0xE0) != 0xE0 {
            return None;
        }

        // Version (bits 4-3 of byte 1): 0b01 is reserved
        if (bytes[1] >> 3) & 0b11 == 0b01 {
            return None;
        }

        // Layer (bits 2-1 of byte 1): 0b00 is reserved
        if (bytes[1] >> 1) & 0b11 == 0b00 {
            return None;
        }

        let bitrate_kbps = BITRATE_KBPS[(bytes[2] >> 4) as usize];
        if bitrate_kbps == 0 {
            return None;
        }

        let sample_rate = SAMPLE_RATE_HZ[((bytes[2] >> 2) & 0b11) as usize];
        if sample_rate == 0 {
            return None;
        }

        let padding = ((bytes[2] >> 1) & 1) as usize;
        let frame_size =
            (144 * bitrate_kbps as u64 * 1000 / sample_rate as u64) as usize + padding;
        let duration_ms = SAMPLES_PER_FRAME as f64 * 1000.0 / sample_rate as f64;

        Some(FrameHeader {
            frame_size,
            bitrate_kbps,
            sample_rate,
            duration_ms,
        })
    }
}
