//! Builder for configuring and constructing a `MidikeyEngine`.

use crate::realtime::MidiRealtime;
use crate::{MidikeyEngine, Result};
use midikey_core::{
    BindingTable, CancelToken, EngineConfig, KeyEmitter, Keyboard, LogEmitter, StaticCorrection,
    TimeCorrectionService, TimeSync,
};
use midikey_midi_io::MidiBackend;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Collaborators not set here fall back to defaults: key actions are logged, the
/// clock is uncorrected, and MIDI devices come from midir when the `midi-hardware`
/// feature is compiled (otherwise there are none).
///
/// # Example
///
/// ```ignore
/// use midikey::prelude::*;
///
/// let engine = MidikeyEngine::builder()
///     .bindings(BindingTable::from_json(r#"{"60": {"key": "A", "ctrl": true}}"#)?)
///     .idle_duration(Duration::from_millis(300))
///     .emitter(RecordingEmitter::new())
///     .build()?;
/// ```
#[derive(Default)]
pub struct MidikeyEngineBuilder {
    config: EngineConfig,
    parent: Option<CancelToken>,
    emitter: Option<Box<dyn KeyEmitter>>,
    backend: Option<Box<dyn MidiBackend>>,
    time_service: Option<Box<dyn TimeCorrectionService>>,
}

impl MidikeyEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bindings(mut self, bindings: BindingTable) -> Self {
        self.config.bindings = bindings;
        self
    }

    pub fn bindings_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config.bindings = BindingTable::load(path)?;
        Ok(self)
    }

    /// Default: 500ms
    pub fn idle_duration(mut self, duration: Duration) -> Self {
        self.config.idle_duration = duration;
        self
    }

    /// Server to sync with while building. Failure is logged, not fatal.
    pub fn time_server(mut self, server: impl Into<String>) -> Self {
        self.config.time_server = Some(server.into());
        self
    }

    /// Run under `parent`: cancelling it stops the engine.
    pub fn parent(mut self, parent: &CancelToken) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn emitter(mut self, emitter: impl KeyEmitter + 'static) -> Self {
        self.emitter = Some(Box::new(emitter));
        self
    }

    pub fn midi_backend(mut self, backend: impl MidiBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn time_service(mut self, service: impl TimeCorrectionService + 'static) -> Self {
        self.time_service = Some(Box::new(service));
        self
    }

    pub fn build(self) -> Result<MidikeyEngine> {
        self.config.validate()?;

        let root = match &self.parent {
            Some(parent) => parent.child(),
            None => CancelToken::new(),
        };
        let emitter = self.emitter.unwrap_or_else(|| Box::new(LogEmitter));
        let backend = self.backend.unwrap_or_else(default_backend);
        let service = self
            .time_service
            .unwrap_or_else(|| Box::new(StaticCorrection::unsynced()));

        let keyboard = Keyboard::new(
            Arc::new(self.config.bindings),
            self.config.idle_duration,
            emitter,
        );
        let engine = MidikeyEngine::from_parts(
            root,
            keyboard,
            MidiRealtime::new(backend),
            TimeSync::new(service),
        )?;

        if let Some(server) = &self.config.time_server {
            if let Err(e) = engine.set_time_server(server) {
                warn!(server = %server, "initial time sync failed: {e}");
            }
        }
        Ok(engine)
    }
}

#[cfg(feature = "midi-hardware")]
fn default_backend() -> Box<dyn MidiBackend> {
    Box::new(midikey_midi_io::MidirBackend::new())
}

#[cfg(not(feature = "midi-hardware"))]
fn default_backend() -> Box<dyn MidiBackend> {
    Box::new(midikey_midi_io::VirtualMidi::default())
}
