//! WAV Session I/O
//!
//! The session layer container formats talk to. A [`TapeWriter`] or
//! [`TapeReader`] is opened over a file path or any in-memory stream and then
//! used exactly like a plain binary file: sequential `write`/`read` calls,
//! with the audio modulation handled underneath.
//!
//! Sessions own their underlying stream exclusively. A writer finalizes the
//! container once, either through [`TapeWriter::close`] or on drop.

pub mod reader;
pub mod writer;

pub use reader::TapeReader;
pub use writer::TapeWriter;
