//! Tape Pulse Encoder
//!
//! Turns bytes into a square-wave sample stream. Each bit occupies one bit
//! cell ("tact"): a set bit is a low half-segment followed by a high one, a
//! clear bit the opposite, so every cell carries its own clock edge in the
//! middle.
//!
//! The cell duration is not an integer number of samples. Rather than let
//! the rounding error pile up over thousands of cells, the encoder tracks
//! how far the emitted stream has drifted from the ideal timeline and sizes
//! each cell to pull the drift back toward zero.

use crate::profile::TapeProfile;
use crate::signal::PULSE_LEVEL;

/// Drift-compensated square-wave modulator
///
/// Counters persist for the encoder's lifetime, so the compensation is
/// continuous across any number of [`modulate`](PulseEncoder::modulate)
/// calls within one session.
#[derive(Debug, Clone)]
pub struct PulseEncoder {
    /// Duration of one bit cell in seconds
    tact_time: f64,
    /// Duration of one sample frame in seconds
    frame_time: f64,
    /// Total samples emitted so far
    samples_written: u64,
    /// Total bit cells emitted so far
    tacts_written: u64,
}

impl PulseEncoder {
    /// Create an encoder for the given profile
    pub fn new(profile: &TapeProfile) -> Self {
        PulseEncoder {
            tact_time: profile.tact_time(),
            frame_time: profile.frame_time(),
            samples_written: 0,
            tacts_written: 0,
        }
    }

    /// Encode `data` and return the samples
    pub fn modulate(&mut self, data: &[u8]) -> Vec<f32> {
        let mut out = Vec::new();
        self.modulate_into(data, &mut out);
        out
    }

    /// Encode `data`, appending samples to `out`
    ///
    /// Bits are taken most-significant first. Always succeeds.
    pub fn modulate_into(&mut self, data: &[u8], out: &mut Vec<f32>) {
        let frames_per_tact = self.tact_time / self.frame_time;
        out.reserve(data.len() * 8 * (frames_per_tact as usize + 1));

        // Emitted duration minus ideal duration, in seconds
        let mut drift = self.samples_written as f64 * self.frame_time
            - self.tacts_written as f64 * self.tact_time;

        for &byte in data {
            for bit in (0..8u32).rev() {
                let set = (byte >> bit) & 1 == 1;

                // Size this cell so the stream lands back on the ideal
                // timeline as closely as one sample allows
                let cell = ((self.tact_time - drift) / self.frame_time).round() as usize;
                let first_len = cell / 2;
                let second_len = cell / 2 + cell % 2;

                let (first, second) = if set {
                    (-PULSE_LEVEL, PULSE_LEVEL)
                } else {
                    (PULSE_LEVEL, -PULSE_LEVEL)
                };

                out.extend(std::iter::repeat(first).take(first_len));
                out.extend(std::iter::repeat(second).take(second_len));

                self.samples_written += cell as u64;
                self.tacts_written += 1;
                drift += cell as f64 * self.frame_time - self.tact_time;
            }
        }
    }

    /// Total samples emitted so far
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Total bit cells emitted so far
    pub fn tacts_written(&self) -> u64 {
        self.tacts_written
    }
}
