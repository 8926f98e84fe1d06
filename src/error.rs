//! Centralized error type for the midikey umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] midikey_core::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] midikey_midi_io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_canceled())
    }

    pub fn is_validation(&self) -> bool {
        match self {
            Error::Core(e) => e.is_validation(),
            Error::Midi(midikey_midi_io::Error::TrackOutOfRange { .. }) => true,
            _ => false,
        }
    }

    /// HTTP-style status class: 400 for bad requests, 503 when a resource could not do
    /// the work, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        use midikey_core::Error as Core;
        use midikey_midi_io::Error as Midi;

        match self {
            Error::Core(Core::Validation(_)) => 400,
            Error::Core(Core::Canceled | Core::Device(_) | Core::TimeSync(_)) => 503,
            Error::Midi(Midi::TrackOutOfRange { .. }) => 400,
            Error::Midi(_) => 503,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
