//! Tape Write Sessions
//!
//! Creates a WAV recording and serves sequential byte writes. The session
//! emits the acquisition leader up front and the closing trailer on
//! `close`/drop, so any written payload comes back out of a read session
//! without the caller managing padding.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use crate::encoder::PulseEncoder;
use crate::profile::TapeProfile;
use crate::signal::TRAILER_BYTES;
use crate::{Result, TapeError};

/// Write session producing a mono 8-bit WAV recording
///
/// Bytes are modulated and appended in write order; drift compensation is
/// continuous across calls. The leader (encoded zero bytes, length from the
/// profile) goes on tape when the session is created.
pub struct TapeWriter<W: io::Write + io::Seek> {
    /// `None` only once the container has been finalized
    wav: Option<hound::WavWriter<W>>,
    encoder: PulseEncoder,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl TapeWriter<BufWriter<File>> {
    /// Create a recording on disk
    pub fn create<P: AsRef<Path>>(path: P, profile: &TapeProfile) -> Result<Self> {
        Self::from_wav(hound::WavWriter::create(path, Self::spec(profile)?)?, profile)
    }
}

impl<W: io::Write + io::Seek> TapeWriter<W> {
    /// Create a recording on any seekable byte sink
    pub fn new(writer: W, profile: &TapeProfile) -> Result<Self> {
        Self::from_wav(hound::WavWriter::new(writer, Self::spec(profile)?)?, profile)
    }

    fn spec(profile: &TapeProfile) -> Result<hound::WavSpec> {
        if profile.sample_rate == 0 {
            return Err(TapeError::UnsupportedFormat(
                "sample rate of zero".to_string(),
            ));
        }
        Ok(hound::WavSpec {
            channels: 1,
            sample_rate: profile.sample_rate,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        })
    }

    fn from_wav(wav: hound::WavWriter<W>, profile: &TapeProfile) -> Result<Self> {
        let mut writer = TapeWriter {
            wav: Some(wav),
            encoder: PulseEncoder::new(profile),
            sample_rate: profile.sample_rate,
            scratch: Vec::new(),
        };
        if profile.leader_bytes > 0 {
            writer.encode_bytes(&vec![0u8; profile.leader_bytes])?;
        }
        Ok(writer)
    }

    /// Encode `data` and append it to the recording
    ///
    /// Never fails for well-formed byte input; only a container or IO
    /// failure from the sink surfaces here.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.encode_bytes(data)
    }

    fn encode_bytes(&mut self, data: &[u8]) -> Result<()> {
        let Some(wav) = self.wav.as_mut() else {
            return Ok(());
        };
        self.scratch.clear();
        self.encoder.modulate_into(data, &mut self.scratch);
        for &sample in &self.scratch {
            let level = (sample * 128.0).round().clamp(-128.0, 127.0) as i8;
            wav.write_sample(level)?;
        }
        Ok(())
    }

    /// Finish the recording: trailer, then container finalization
    ///
    /// Dropping an unclosed writer performs the same steps best-effort; call
    /// `close` to observe errors.
    pub fn close(mut self) -> Result<()> {
        self.encode_bytes(&[0u8; TRAILER_BYTES])?;
        if let Some(wav) = self.wav.take() {
            wav.finalize()?;
        }
        Ok(())
    }

    /// Sample rate of the recording in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total samples emitted so far, leader included
    pub fn samples_written(&self) -> u64 {
        self.encoder.samples_written()
    }

    /// Duration of the recording so far in seconds
    pub fn duration_secs(&self) -> f64 {
        self.encoder.samples_written() as f64 / self.sample_rate as f64
    }
}

impl<W: io::Write + io::Seek> Drop for TapeWriter<W> {
    fn drop(&mut self) {
        if self.wav.is_some() {
            let _ = self.encode_bytes(&[0u8; TRAILER_BYTES]);
            // hound updates the header lengths when its writer drops
            self.wav.take();
        }
    }
}
