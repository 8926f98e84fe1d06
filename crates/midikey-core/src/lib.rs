//! Note-to-keystroke translation engine with task actors and scheduled playback.
//!
//! # Primary API
//!
//! - [`Actor`] / [`CancelToken`]: one thread per resource, serialized tasks, cancellation
//! - [`Keyboard`]: bindings + [`KeyTracker`] + idle release + [`KeyEmitter`]
//! - [`Playback`]: armed/running/idle replay of a [`Recording`]
//! - [`TimeSync`]: wall-clock correction against a reference server
//! - [`EngineConfig`]: startup configuration
//!
//! # Example
//!
//! ```ignore
//! use midikey_core::prelude::*;
//!
//! let root = CancelToken::new();
//! let bindings = Arc::new(BindingTable::from_json(r#"{"60": {"key": "A"}}"#)?);
//! let keyboard = Actor::spawn(
//!     "keyboard",
//!     &root,
//!     Keyboard::new(bindings, Duration::from_millis(500), Box::new(LogEmitter)),
//! );
//! keyboard.submit(|kb| kb.handle(NoteEvent::on(60), Instant::now()))??;
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod event;
pub mod keys;
pub mod output;
pub mod playback;
pub mod time;

pub use actor::{Actor, CancelToken, Resource};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use event::{NoteEvent, TimedEvent};
pub use keys::{
    BindingTable, IdleTimer, KeyAction, KeyActions, KeyCode, KeyTracker, Keybinding, Keyboard,
    Modifier, Modifiers, NOTE_COUNT,
};
pub use output::{KeyEmitter, LogEmitter, RecordingEmitter};
pub use playback::{
    CorrectionSource, NoteSink, Phase, Playback, PlaybackConfig, Recording, SchedulerSettings,
    SequenceRecording,
};
pub use time::{
    CorrectedTime, StaticCorrection, TimeCorrection, TimeCorrectionService, TimeSync, Timestamp,
};

pub mod prelude {
    pub use crate::{
        Actor, BindingTable, CancelToken, EngineConfig, Error, KeyAction, KeyCode, KeyEmitter,
        Keybinding, Keyboard, LogEmitter, NoteEvent, Playback, Recording, Result,
        SchedulerSettings, TimeSync,
    };
    pub use std::sync::Arc;
    pub use std::time::{Duration, Instant};
}
