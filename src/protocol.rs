//! Wire protocol of the capacitance sensor board.
//!
//! # Handshake
//!
//! Each configuration command is a two-step exchange:
//!
//! 1. host sends the command's one-byte ack code, device echoes it back
//! 2. host sends the command value as UTF-8 text, device answers `'O'`
//!
//! | Command | Ack code | Payload |
//! |---|---|---|
//! | CAPDAC level | `0` | `"0"`..`"31"` |
//! | Sample count | `1` | decimal count |
//! | Start | `2` | `"S"` |
//!
//! # Data frames
//!
//! After the start trigger the device streams `sample_count` frames of 8 bytes:
//! a little-endian `u32` timestamp in microseconds since boot, then the
//! little-endian `i32` capacitance register (FDC1004 format, 24 significant bits).

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Bytes per data frame
pub const FRAME_SIZE: usize = 8;

/// Execution acknowledgment shared by every command
pub const DONE_ACK: u8 = b'O';

/// Highest CAPDAC register value
pub const CAPDAC_MAX: u8 = 31;

/// Capacitance offset per CAPDAC step, in pF (FDC1004 datasheet)
pub const CAPDAC_STEP_PF: f64 = 3.125;

/// Register counts per pF (2^19, FDC1004 datasheet)
pub const RAW_COUNTS_PER_PF: f64 = 524288.0;

const ACK_CAPDAC: u8 = 0;
const ACK_SAMPLE_COUNT: u8 = 1;
const ACK_START: u8 = 2;

// ============================================================================
// Commands
// ============================================================================

/// Host-to-device configuration commands, in the order a session sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CapdacLevel(u8),
    SampleCount(u32),
    StartTrigger,
}

impl Command {
    /// The byte announcing this command, echoed back by the device.
    pub fn ack_code(self) -> u8 {
        match self {
            Command::CapdacLevel(_) => ACK_CAPDAC,
            Command::SampleCount(_) => ACK_SAMPLE_COUNT,
            Command::StartTrigger => ACK_START,
        }
    }

    /// Text sent in the execution phase.
    pub fn payload(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CapdacLevel(level) => write!(f, "{level}"),
            Command::SampleCount(count) => write!(f, "{count}"),
            Command::StartTrigger => f.write_str("S"),
        }
    }
}

/// Clamp a requested CAPDAC setting into the register range.
pub fn clamp_capdac(requested: i64) -> u8 {
    requested.clamp(0, CAPDAC_MAX as i64) as u8
}

// ============================================================================
// Frames
// ============================================================================

/// One undecoded 8-byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    /// Device clock, microseconds since boot.
    pub timestamp: u32,
    /// Capacitance register as received.
    pub raw: i32,
}

impl RawFrame {
    pub fn parse(bytes: &[u8; FRAME_SIZE]) -> Self {
        let timestamp = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let raw = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self { timestamp, raw }
    }

    pub fn to_bytes(self) -> [u8; FRAME_SIZE] {
        let mut out = [0u8; FRAME_SIZE];
        out[..4].copy_from_slice(&self.timestamp.to_le_bytes());
        out[4..].copy_from_slice(&self.raw.to_le_bytes());
        out
    }
}

/// A decoded reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Microseconds since the first frame of the session.
    pub relative_timestamp: i64,
    pub capacitance_pf: f64,
}

/// Convert a register value to pF, rounded to 4 decimals with ties to even.
///
/// `raw / 2^19` is exact in binary, so a tie at the 5th decimal is a real tie
/// and must not round away from zero.
pub fn capacitance_pf(raw: i32, capdac: u8) -> f64 {
    let pf = raw as f64 / RAW_COUNTS_PER_PF + capdac as f64 * CAPDAC_STEP_PF;
    (pf * 10_000.0).round_ties_even() / 10_000.0
}

/// Split a buffer into raw frames. A trailing partial frame is ignored.
pub fn split_frames(buffer: &[u8]) -> impl Iterator<Item = RawFrame> + '_ {
    buffer.chunks_exact(FRAME_SIZE).map(|chunk| {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes.copy_from_slice(chunk);
        RawFrame::parse(&bytes)
    })
}

/// Decode a session buffer into samples with zero-based timestamps.
///
/// Any trailing bytes that do not fill a whole frame are dropped.
pub fn decode(buffer: &[u8], capdac: u8) -> Vec<Sample> {
    let frames: Vec<RawFrame> = split_frames(buffer).collect();
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let origin = first.timestamp as i64;

    frames
        .iter()
        .map(|frame| Sample {
            relative_timestamp: frame.timestamp as i64 - origin,
            capacitance_pf: capacitance_pf(frame.raw, capdac),
        })
        .collect()
}
