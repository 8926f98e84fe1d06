//! # midikey - MIDI notes to keystrokes
//!
//! Translates note-on/note-off input into synthetic key presses with modifier
//! bookkeeping, and replays recorded sequences at scheduled, clock-corrected times.
//!
//! ## Architecture
//!
//! midikey is an umbrella crate that coordinates:
//! - **midikey-core** - Key state tracking, idle release, task actors, playback scheduling
//! - **midikey-midi-io** - Note decoding, output messages, MIDI files, device directory
//!
//! Each shared resource (keyboard state, MIDI devices, time sync, playback) lives on
//! its own actor thread. [`MidikeyEngine`] wires them together and [`Controller`]
//! exposes validated request handling on top.
//!
//! ## Quick Start
//!
//! ```ignore
//! use midikey::prelude::*;
//!
//! let engine = MidikeyEngine::builder()
//!     .bindings_file("bindings.json")?
//!     .build()?;
//!
//! engine.select_input(0)?;
//! engine.handle_note(NoteEvent::on(60))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `midi-hardware` - Hardware MIDI devices through midir

/// Re-export of midikey-core for direct access
pub use midikey_core as core;

/// Re-export of midikey-midi-io for direct access
pub use midikey_midi_io as midi;

pub use midikey_core::{
    Actor, BindingTable, CancelToken, CorrectedTime, EngineConfig, KeyAction, KeyCode,
    KeyEmitter, Keybinding, Keyboard, LogEmitter, NoteEvent, Phase, PlaybackConfig,
    RecordingEmitter, SchedulerSettings, StaticCorrection, TimeCorrection,
    TimeCorrectionService,
};
pub use midikey_midi_io::{MidiBackend, MidiDevice, MidiRecording, VirtualMidi};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;
pub use builder::MidikeyEngineBuilder;
pub use engine::MidikeyEngine;

pub mod realtime;
pub use realtime::{DeviceSelection, MidiRealtime};

pub mod control;
pub use control::Controller;

pub mod prelude {
    pub use crate::{
        BindingTable, Controller, EngineConfig, KeyAction, KeyCode, Keybinding, MidikeyEngine,
        NoteEvent, RecordingEmitter, Result, SchedulerSettings,
    };
    pub use std::sync::Arc;
    pub use std::time::Duration;
}
