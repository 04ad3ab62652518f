//! Tape Pulse Decoder
//!
//! Recovers bytes from a recorded sample stream using nothing but amplitude
//! transitions. The recording's speed may drift from the nominal rate, so the
//! half-bit duration is re-estimated continuously as a running average of
//! everything heard so far, and the decision threshold adapts through
//! [`LevelTracker`].
//!
//! Synchronization works off one structural fact of the modulation: as long
//! as consecutive bits are equal, every edge-to-edge interval is a single
//! half-bit; the first bit value flip produces an interval twice as long.
//! That double-length interval is detected as a run exceeding 1.5x the
//! current half-bit estimate and pins down the bit grid. Its second half is
//! already the first half-bit of the next cell, so the decoder keeps it in a
//! look-ahead slot instead of consuming fresh samples.

use crate::profile::TapeProfile;
use crate::signal::{LevelTracker, DOUBLE_INTERVAL_RATIO, SILENCE_BOUND_SECS};
use crate::{Result, TapeError};

/// A pull-based source of normalized mono samples
///
/// Implementations yield amplitudes in the signed domain (roughly
/// [-1.0, 1.0], silence at 0.0) and `None` on exhaustion.
pub trait SampleSource {
    /// Produce the next sample, or `None` at the end of the stream
    fn next_sample(&mut self) -> Result<Option<f32>>;
}

/// In-memory [`SampleSource`] over a sample buffer
pub struct BufferSource {
    samples: std::vec::IntoIter<f32>,
}

impl BufferSource {
    /// Wrap a sample buffer
    pub fn new(samples: Vec<f32>) -> Self {
        BufferSource {
            samples: samples.into_iter(),
        }
    }
}

impl SampleSource for BufferSource {
    fn next_sample(&mut self) -> Result<Option<f32>> {
        Ok(self.samples.next())
    }
}

/// Self-clocking demodulator over a [`SampleSource`]
///
/// Call [`sync`](PulseDecoder::sync) once to lock onto the bit grid and
/// consume the framing marker, then read payload bytes. Estimator state is
/// never reset: the same running neutral level and half-bit average carry
/// through the whole session.
pub struct PulseDecoder<S> {
    src: S,
    levels: LevelTracker,
    /// Duration of one sample frame in seconds
    frame_time: f64,
    /// Running half-bit duration estimate in seconds
    halfbit_estimate: f64,
    /// Accumulated run time credited to the estimator
    elapsed: f64,
    /// Half-bits detected so far (seeded with one nominal half-bit)
    halfbits_seen: u64,
    /// Value of the most recent half-bit; also the level of the current run
    level: bool,
    /// Set when a double-length interval banked a half-bit for the next read
    lookahead: bool,
    /// Samples consumed from the source
    consumed: u64,
    /// Longest tolerated run without a transition, in samples
    silence_bound: usize,
    marker: u8,
    synced: bool,
}

impl<S: SampleSource> PulseDecoder<S> {
    /// Create a decoder reading from `src`
    ///
    /// `sample_rate` is the rate of the recording being decoded, which for a
    /// file session comes from the container header rather than the profile.
    pub fn new(src: S, profile: &TapeProfile, sample_rate: u32) -> Self {
        let halfbit = profile.halfbit_time();
        PulseDecoder {
            src,
            levels: LevelTracker::new(),
            frame_time: 1.0 / sample_rate as f64,
            halfbit_estimate: halfbit,
            elapsed: halfbit,
            halfbits_seen: 1,
            level: false,
            lookahead: false,
            consumed: 0,
            silence_bound: (sample_rate as f64 * SILENCE_BOUND_SECS) as usize,
            marker: profile.marker,
            synced: false,
        }
    }

    /// Lock onto the bit grid and validate the framing marker
    ///
    /// Skips the leader, acquires the half-bit clock until a double-length
    /// interval marks a stable byte boundary, then reads the first byte and
    /// checks it against the marker. No-op if already synchronized.
    ///
    /// # Errors
    /// [`TapeError::SyncTimeout`] if the stream ends or goes flat before
    /// lock-on; [`TapeError::Framing`] if the first byte is not the marker.
    pub fn sync(&mut self) -> Result<()> {
        if self.synced {
            return Ok(());
        }
        match self.acquire() {
            Ok(()) => {
                self.synced = true;
                Ok(())
            }
            // Running out of samples before lock-on means no data, not a
            // truncated payload
            Err(TapeError::UnexpectedEof) => Err(TapeError::SyncTimeout {
                samples: self.consumed as usize,
            }),
            Err(e) => Err(e),
        }
    }

    fn acquire(&mut self) -> Result<()> {
        // Leader skip: run past everything high relative to the initial
        // mid-scale threshold; the terminating low sample is consumed
        let mut skipped = 0usize;
        loop {
            let sample = self.next()?.ok_or(TapeError::UnexpectedEof)?;
            if !self.levels.is_high(sample) {
                break;
            }
            skipped += 1;
            if skipped > self.silence_bound {
                return Err(TapeError::SyncTimeout { samples: skipped });
            }
        }

        // Clock acquisition: single half-bit intervals refine the estimate
        // until the first double-length interval pins the byte boundary
        loop {
            self.read_halfbit()?;
            if self.lookahead {
                break;
            }
        }

        // The first byte after lock-on must be the framing marker
        let first = self.read_byte()?;
        if first != self.marker {
            return Err(TapeError::Framing {
                expected: self.marker,
                found: first,
            });
        }
        Ok(())
    }

    /// Decode exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_byte()?);
        }
        Ok(out)
    }

    /// Decode one byte, most-significant bit first
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut byte = 0u8;
        for i in 0..8 {
            let bit = self.read_halfbit()?;
            byte |= (bit as u8) << (7 - i);
            self.read_halfbit()?;
        }
        Ok(byte)
    }

    /// Read one half-bit interval and return its value
    ///
    /// A half-bit's value is the level the waveform assumes after its
    /// terminating edge. If the previous interval was double-length, the
    /// banked value is returned without consuming samples.
    fn read_halfbit(&mut self) -> Result<bool> {
        if self.lookahead {
            self.lookahead = false;
            return Ok(self.level);
        }

        let mut run = 1usize;
        loop {
            let sample = self.next()?.ok_or(TapeError::UnexpectedEof)?;
            let high = self.levels.classify(sample);

            if high == self.level {
                // Still inside the current run
                run += 1;
                self.elapsed += self.frame_time;
                if run > self.silence_bound {
                    return Err(TapeError::SyncTimeout { samples: run });
                }
            } else {
                // Edge: the interval is complete
                self.halfbits_seen += 1;
                self.level = high;
                if run as f64 * self.frame_time > DOUBLE_INTERVAL_RATIO * self.halfbit_estimate {
                    // Two half-bits elapsed without a mid-cell edge; bank the
                    // second one for the next read
                    self.halfbits_seen += 1;
                    self.lookahead = true;
                }
                self.halfbit_estimate = self.elapsed / self.halfbits_seen as f64;
                return Ok(self.level);
            }
        }
    }

    #[inline]
    fn next(&mut self) -> Result<Option<f32>> {
        let sample = self.src.next_sample()?;
        if sample.is_some() {
            self.consumed += 1;
        }
        Ok(sample)
    }

    /// Current adaptive threshold state
    pub fn levels(&self) -> &LevelTracker {
        &self.levels
    }

    /// Current half-bit duration estimate in seconds
    pub fn halfbit_estimate(&self) -> f64 {
        self.halfbit_estimate
    }

    /// Total samples consumed from the source
    pub fn samples_consumed(&self) -> u64 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::PulseEncoder;

    const PROFILE: TapeProfile = TapeProfile {
        write_constant: 0x1D,
        marker: 0xE6,
        sample_rate: 44_100,
        leader_bytes: 64,
    };

    /// Leader + payload + trailer, as a write session puts it on tape
    fn taped(payload: &[u8]) -> Vec<f32> {
        let mut enc = PulseEncoder::new(&PROFILE);
        let mut samples = enc.modulate(&[0u8; 64]);
        enc.modulate_into(payload, &mut samples);
        enc.modulate_into(&[0u8; 2], &mut samples);
        samples
    }

    fn decoder(samples: Vec<f32>) -> PulseDecoder<BufferSource> {
        PulseDecoder::new(BufferSource::new(samples), &PROFILE, PROFILE.sample_rate)
    }

    #[test]
    fn test_marker_roundtrip() {
        let mut dec = decoder(taped(&[0xE6, 0x01, 0x02]));
        dec.sync().unwrap();
        assert_eq!(dec.read_bytes(2).unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_all_byte_values_roundtrip() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let mut framed = vec![0xE6];
        framed.extend_from_slice(&payload);

        let mut dec = decoder(taped(&framed));
        dec.sync().unwrap();
        assert_eq!(dec.read_bytes(256).unwrap(), payload);
    }

    #[test]
    fn test_framing_error_on_wrong_first_byte() {
        let mut dec = decoder(taped(&[0x00, 0x01, 0x02]));
        match dec.sync() {
            Err(TapeError::Framing { expected, found }) => {
                assert_eq!(expected, 0xE6);
                assert_ne!(found, 0xE6);
            }
            other => panic!("expected framing error, got {other:?}"),
        }
    }

    #[test]
    fn test_alternating_bits_stress_lookahead() {
        // Every adjacent bit flips, so every cell boundary is a
        // double-length interval and the banked half-bit path runs hot
        let mut framed = vec![0xE6];
        for i in 0..200 {
            framed.push(if i % 2 == 0 { 0xAA } else { 0x55 });
        }
        let mut dec = decoder(taped(&framed));
        dec.sync().unwrap();
        assert_eq!(dec.read_bytes(200).unwrap(), &framed[1..]);
    }

    #[test]
    fn test_silence_times_out() {
        let mut dec = decoder(vec![0.0; 120_000]);
        match dec.sync() {
            Err(TapeError::SyncTimeout { samples }) => assert!(samples > 0),
            other => panic!("expected sync timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_times_out() {
        let mut dec = decoder(Vec::new());
        assert!(matches!(dec.sync(), Err(TapeError::SyncTimeout { .. })));
    }

    #[test]
    fn test_stuck_high_times_out() {
        let mut dec = decoder(vec![0.75; 120_000]);
        assert!(matches!(dec.sync(), Err(TapeError::SyncTimeout { .. })));
    }

    #[test]
    fn test_truncated_payload_is_eof() {
        // No trailer: the recording stops dead inside the payload
        let mut enc = PulseEncoder::new(&PROFILE);
        let mut samples = enc.modulate(&[0u8; 64]);
        enc.modulate_into(&[0xE6, 0x01, 0x02], &mut samples);

        let mut dec = decoder(samples);
        dec.sync().unwrap();
        assert_eq!(dec.read_byte().unwrap(), 0x01);
        assert!(matches!(dec.read_bytes(4), Err(TapeError::UnexpectedEof)));
    }

    #[test]
    fn test_tolerates_slow_tape() {
        // Duplicate every 40th sample: the recording plays ~2.5% slow
        let mut stretched = Vec::new();
        for (i, s) in taped(&[0xE6, 0xDE, 0xAD, 0xBE, 0xEF]).into_iter().enumerate() {
            stretched.push(s);
            if i % 40 == 0 {
                stretched.push(s);
            }
        }
        let mut dec = decoder(stretched);
        dec.sync().unwrap();
        assert_eq!(dec.read_bytes(4).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_halfbit_estimate_converges() {
        let mut dec = decoder(taped(&[0xE6, 0x0F, 0xF0, 0x3C]));
        dec.sync().unwrap();
        dec.read_bytes(3).unwrap();

        let nominal = PROFILE.halfbit_time();
        let estimate = dec.halfbit_estimate();
        assert!(
            (estimate - nominal).abs() / nominal < 0.2,
            "estimate {estimate} too far from nominal {nominal}"
        );
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut dec = decoder(taped(&[0xE6, 0x42]));
        dec.sync().unwrap();
        dec.sync().unwrap();
        assert_eq!(dec.read_byte().unwrap(), 0x42);
    }

    #[test]
    fn test_neutral_stays_bounded_during_decode() {
        let mut dec = decoder(taped(&[0xE6, 0x99, 0x66]));
        dec.sync().unwrap();
        dec.read_bytes(2).unwrap();

        let levels = dec.levels();
        assert!(levels.neutral() >= levels.min_seen());
        assert!(levels.neutral() <= levels.max_seen());
    }

    #[test]
    fn test_custom_marker() {
        let profile = PROFILE.with_marker(0xA5);
        let mut enc = PulseEncoder::new(&profile);
        let mut samples = enc.modulate(&[0u8; 64]);
        enc.modulate_into(&[0xA5, 0x77], &mut samples);
        enc.modulate_into(&[0u8; 2], &mut samples);

        let mut dec = PulseDecoder::new(BufferSource::new(samples), &profile, profile.sample_rate);
        dec.sync().unwrap();
        assert_eq!(dec.read_byte().unwrap(), 0x77);
    }
}
