//! Tape Read Sessions
//!
//! Opens a WAV recording, validates the container, locks onto the bit grid
//! and serves sequential byte reads.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::decoder::{PulseDecoder, SampleSource};
use crate::profile::TapeProfile;
use crate::{Result, TapeError};

/// Normalizing adapter from WAV samples to the signed f32 domain
struct WavSource<R: io::Read> {
    samples: hound::WavIntoSamples<R, i16>,
    scale: f32,
}

impl<R: io::Read> SampleSource for WavSource<R> {
    fn next_sample(&mut self) -> Result<Option<f32>> {
        match self.samples.next() {
            None => Ok(None),
            Some(Ok(v)) => Ok(Some(v as f32 * self.scale)),
            Some(Err(e)) => Err(e.into()),
        }
    }
}

/// Read session over a WAV recording
///
/// Construction performs the full lock-on: leader skip, clock acquisition
/// and framing-marker validation. A `TapeReader` you hold is therefore
/// always positioned at the first payload byte.
///
/// Timing is taken from the recording's own sample rate; the profile
/// supplies the write-timing constant and the marker byte.
pub struct TapeReader<R: io::Read> {
    decoder: PulseDecoder<WavSource<R>>,
    marker: u8,
    sample_rate: u32,
    bits_per_sample: u16,
}

impl TapeReader<BufReader<File>> {
    /// Open a recording from disk and synchronize
    pub fn open<P: AsRef<Path>>(path: P, profile: &TapeProfile) -> Result<Self> {
        Self::from_wav(hound::WavReader::open(path)?, profile)
    }
}

impl<R: io::Read> TapeReader<R> {
    /// Open a recording from any byte stream and synchronize
    pub fn new(reader: R, profile: &TapeProfile) -> Result<Self> {
        Self::from_wav(hound::WavReader::new(reader)?, profile)
    }

    fn from_wav(wav: hound::WavReader<R>, profile: &TapeProfile) -> Result<Self> {
        let spec = wav.spec();
        if spec.channels != 1 {
            return Err(TapeError::UnsupportedFormat(format!(
                "expected mono input, got {} channels",
                spec.channels
            )));
        }
        if spec.sample_rate == 0 {
            return Err(TapeError::UnsupportedFormat(
                "sample rate of zero".to_string(),
            ));
        }
        let scale = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => 1.0 / 128.0,
            (hound::SampleFormat::Int, 16) => 1.0 / 32768.0,
            (format, bits) => {
                return Err(TapeError::UnsupportedFormat(format!(
                    "{bits}-bit {format:?} samples"
                )))
            }
        };

        let source = WavSource {
            samples: wav.into_samples::<i16>(),
            scale,
        };
        let mut decoder = PulseDecoder::new(source, profile, spec.sample_rate);
        decoder.sync()?;

        Ok(TapeReader {
            decoder,
            marker: profile.marker,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        })
    }

    /// Decode exactly `n` bytes
    ///
    /// # Errors
    /// Decode errors are unrecoverable for the session; no partial output is
    /// returned.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        self.decoder.read_bytes(n)
    }

    /// Decode one byte
    pub fn read_byte(&mut self) -> Result<u8> {
        self.decoder.read_byte()
    }

    /// Decode and discard bytes until the marker byte comes up
    ///
    /// Container formats use this to find the next section of a multi-block
    /// recording. The marker itself is consumed. Returns how many bytes were
    /// discarded before it.
    pub fn skip_to_marker(&mut self) -> Result<u64> {
        let mut skipped = 0u64;
        loop {
            if self.decoder.read_byte()? == self.marker {
                return Ok(skipped);
            }
            skipped += 1;
        }
    }

    /// Sample rate of the recording in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sample width of the recording in bits
    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Total samples consumed so far
    pub fn samples_consumed(&self) -> u64 {
        self.decoder.samples_consumed()
    }

    /// Release the session
    ///
    /// Dropping the reader is equivalent; the underlying stream is released
    /// exactly once either way.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}
