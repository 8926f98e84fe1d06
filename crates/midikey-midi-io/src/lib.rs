//! MIDI I/O for midikey.
//!
//! Provides live note decoding, output message construction, Standard MIDI File
//! loading and the device directory.
//!
//! Feature gates: `midi-io` (hardware ports through midir).

pub mod error;
pub use error::{Error, Result};

pub mod event;
pub use event::{decode_note, LiveNote};

pub mod message;
pub use message::{MidiOutputMessage, MAX_BANK};

pub(crate) mod file;
pub use file::MidiRecording;

pub mod io;
#[cfg(feature = "midi-io")]
pub use io::MidirBackend;
pub use io::{
    InputCallback, InputConnection, MidiBackend, MidiDevice, OutputConnection, VirtualMidi,
};
