//! Cassette Tape Audio Codec for the RK-86 Family
//!
//! Converts byte streams to and from the square-wave cassette recordings
//! used by a family of historic 8-bit home computers. Every bit occupies one
//! fixed-duration cell with a transition in the middle, so the signal is
//! self-clocking: the decoder recovers both the data and the bit clock from
//! amplitude edges alone, tolerating tape speed drift and amplitude offsets.
//!
//! # Features
//! - Drift-compensated square-wave encoder (long-run timing error stays
//!   under one sample period)
//! - Self-synchronizing decoder with adaptive amplitude threshold and
//!   continuous half-bit clock re-estimation
//! - WAV read/write sessions over files or in-memory streams (mono 8-bit
//!   unsigned or 16-bit signed input, 8-bit output)
//! - Per-machine calibration through [`TapeProfile`] (write-timing constant,
//!   marker byte, sample rate, leader length)
//!
//! # Quick start
//! ## Write a tape image
//! ```no_run
//! use rktape::{TapeProfile, TapeWriter};
//!
//! let profile = TapeProfile::default();
//! let mut tape = TapeWriter::create("program.wav", &profile)?;
//! tape.write(&[0xE6, 0x01, 0x02])?;
//! tape.close()?;
//! # Ok::<(), rktape::TapeError>(())
//! ```
//!
//! ## Read it back
//! ```no_run
//! use rktape::{TapeProfile, TapeReader};
//!
//! let profile = TapeProfile::default();
//! // Synchronizes and validates the 0xE6 framing marker on open
//! let mut tape = TapeReader::open("program.wav", &profile)?;
//! let payload = tape.read(2)?;
//! assert_eq!(payload, [0x01, 0x02]);
//! # Ok::<(), rktape::TapeError>(())
//! ```

#![warn(missing_docs)]

// Domain modules
pub mod decoder; // Sample Stream Demodulation
pub mod encoder; // Bitstream Modulation
pub mod profile; // Machine Calibration Profiles
pub mod signal; // Shared Signal Model
pub mod wav; // WAV Session I/O

pub use decoder::{BufferSource, PulseDecoder, SampleSource};
pub use encoder::PulseEncoder;
pub use profile::TapeProfile;
pub use signal::LevelTracker;
pub use wav::{TapeReader, TapeWriter};

/// Error types for tape codec operations
#[derive(thiserror::Error, Debug)]
pub enum TapeError {
    /// First byte after lock-on does not match the expected marker
    #[error("framing marker mismatch: expected {expected:#04x}, found {found:#04x}")]
    Framing {
        /// Marker byte the session was configured with
        expected: u8,
        /// Byte actually decoded after synchronization
        found: u8,
    },

    /// No polarity transition within the bounded sample window
    #[error("no signal transition within {samples} samples")]
    SyncTimeout {
        /// Size of the window that contained no transition
        samples: usize,
    },

    /// Sample width or channel count outside the supported set
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Sample stream ended in the middle of the payload
    #[error("recording ended mid-decode")]
    UnexpectedEof,

    /// WAV container error
    #[error("WAV error: {0}")]
    Wav(String),

    /// IO error from the filesystem or stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for TapeError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => TapeError::Io(io),
            other => TapeError::Wav(other.to_string()),
        }
    }
}

/// Result type for tape codec operations
pub type Result<T> = std::result::Result<T, TapeError>;
