//! Error types for the MIDI I/O crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI parse error: {0}")]
    MidiFileParse(String),

    #[error("Unsupported MIDI timing format")]
    MidiUnsupportedTiming,

    #[error("MIDI port error: {0}")]
    MidiPort(String),

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("Track {index} out of range ({count} tracks)")]
    TrackOutOfRange { index: usize, count: usize },
}

impl From<midly::Error> for Error {
    fn from(e: midly::Error) -> Self {
        Error::MidiFileParse(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::MidiPort(e.to_string())
    }
}

/// Device and port failures leave the previous selection in place.
impl From<Error> for midikey_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::MidiPort(_) | Error::MidiDevice(_) => midikey_core::Error::Device(e.to_string()),
            Error::TrackOutOfRange { .. } => midikey_core::Error::Validation(e.to_string()),
            Error::Io(e) => midikey_core::Error::Io(e),
            other => midikey_core::Error::InvalidConfig(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
