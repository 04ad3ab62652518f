//! Machine Tape Profiles
//!
//! The whole format catalogue shares one codec; what differs between target
//! machines is the write-timing constant, the synchronization byte and the
//! leader convention. A [`TapeProfile`] bundles those so container formats
//! configure the codec instead of re-deriving it.

use crate::signal::{
    self, DEFAULT_LEADER_BYTES, DEFAULT_MARKER, DEFAULT_SAMPLE_RATE, DEFAULT_WRITE_CONSTANT,
};
use serde::{Deserialize, Serialize};

/// Per-machine calibration for the cassette codec
///
/// The default profile matches the stock format catalogue: write-timing
/// constant `0x1D`, marker byte `0xE6`, 44.1 kHz output.
///
/// # Example
/// ```
/// use rktape::TapeProfile;
///
/// let profile = TapeProfile::default()
///     .with_write_constant(0x2A)
///     .with_marker(0xE6);
/// assert!(profile.tact_time() > TapeProfile::default().tact_time());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeProfile {
    /// Write-timing constant; scales the bit-cell duration
    pub write_constant: u8,
    /// Byte expected (read) or assumed (write) right after lock-on
    pub marker: u8,
    /// Sample rate for newly written recordings, in Hz
    pub sample_rate: u32,
    /// Number of encoded zero bytes emitted before the payload on write
    pub leader_bytes: usize,
}

impl TapeProfile {
    /// Create the stock catalogue profile
    pub fn new() -> Self {
        TapeProfile {
            write_constant: DEFAULT_WRITE_CONSTANT,
            marker: DEFAULT_MARKER,
            sample_rate: DEFAULT_SAMPLE_RATE,
            leader_bytes: DEFAULT_LEADER_BYTES,
        }
    }

    /// Set the write-timing constant
    pub fn with_write_constant(mut self, write_constant: u8) -> Self {
        self.write_constant = write_constant;
        self
    }

    /// Set the synchronization marker byte
    ///
    /// Lock-on expects the marker's most significant bit set: the leader is
    /// all zero bits, and the first bit value flip is what pins the byte
    /// grid to the marker's first bit.
    pub fn with_marker(mut self, marker: u8) -> Self {
        self.marker = marker;
        self
    }

    /// Set the output sample rate in Hz
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the leader length in encoded zero bytes (0 for raw streams)
    pub fn with_leader_bytes(mut self, leader_bytes: usize) -> Self {
        self.leader_bytes = leader_bytes;
        self
    }

    /// Duration of one bit cell in seconds
    pub fn tact_time(&self) -> f64 {
        signal::tact_seconds(self.write_constant)
    }

    /// Nominal duration of one half-bit in seconds
    pub fn halfbit_time(&self) -> f64 {
        self.tact_time() / 2.0
    }

    /// Duration of one sample frame in seconds at the profile sample rate
    pub fn frame_time(&self) -> f64 {
        1.0 / self.sample_rate as f64
    }
}

impl Default for TapeProfile {
    fn default() -> Self {
        Self::new()
    }
}
