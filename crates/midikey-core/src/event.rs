//! Control events consumed by the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Note-on/note-off style event for one logical control (0-127).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEvent {
    pub note: u8,
    /// `true` for press (note-on), `false` for release (note-off).
    pub on: bool,
}

impl NoteEvent {
    pub fn on(note: u8) -> Self {
        Self { note, on: true }
    }

    pub fn off(note: u8) -> Self {
        Self { note, on: false }
    }
}

/// Event at an offset from the start of a recorded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: NoteEvent,
}

impl TimedEvent {
    pub fn new(at: Duration, event: NoteEvent) -> Self {
        Self { at, event }
    }
}
