//! MidikeyEngine: the four actors and the operations that reach them.

use crate::realtime::{DeviceSelection, InputRouter, MidiRealtime};
use crate::{MidikeyEngineBuilder, Result};
use midikey_core::{
    Actor, CancelToken, CorrectedTime, Error as CoreError, Keyboard, NoteEvent, Phase, Playback,
    PlaybackConfig, Recording, SchedulerSettings, TimeSync, Timestamp,
};
use midikey_midi_io::MidiRecording;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Main engine. Owns one actor per resource, all under one cancellation root:
/// - keyboard: bindings, key state, idle release, emitter
/// - MIDI realtime: devices, bank/patch/transpose, thru
/// - time sync: reference clock correction
/// - playback: recording, track, offset, scheduler
///
/// Methods block until the owning actor has run the request, except bank and patch,
/// which are queued and only logged on failure.
///
/// # Example
///
/// ```ignore
/// use midikey::prelude::*;
///
/// let engine = MidikeyEngine::builder()
///     .bindings_file("bindings.json")?
///     .build()?;
///
/// engine.select_input(0)?;
/// engine.wait()?;
/// ```
pub struct MidikeyEngine {
    root: CancelToken,
    keyboard: Actor<Keyboard>,
    realtime: Actor<MidiRealtime>,
    time_sync: Actor<TimeSync>,
    playback: Actor<Playback>,
}

impl MidikeyEngine {
    pub fn builder() -> MidikeyEngineBuilder {
        MidikeyEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        root: CancelToken,
        keyboard: Keyboard,
        realtime: MidiRealtime,
        time_sync: TimeSync,
    ) -> Result<Self> {
        let keyboard = Actor::spawn("keyboard", &root, keyboard.with_fatal_token(root.clone()));
        let realtime = Actor::spawn("midi-realtime", &root, realtime);
        let time_sync = Actor::spawn("time-sync", &root, time_sync);
        let playback = Actor::spawn(
            "playback",
            &root,
            Playback::new(Box::new(keyboard.clone()), Box::new(time_sync.clone())),
        );

        let router = InputRouter {
            keyboard: keyboard.clone(),
            thru: realtime.clone(),
        };
        realtime.submit(move |rt| rt.set_router(router))?;

        info!("engine started");
        Ok(Self {
            root,
            keyboard,
            realtime,
            time_sync,
            playback,
        })
    }

    /// Process-wide cancellation root.
    pub fn token(&self) -> &CancelToken {
        &self.root
    }

    pub fn keyboard(&self) -> &Actor<Keyboard> {
        &self.keyboard
    }

    pub fn realtime(&self) -> &Actor<MidiRealtime> {
        &self.realtime
    }

    pub fn time_sync(&self) -> &Actor<TimeSync> {
        &self.time_sync
    }

    pub fn playback(&self) -> &Actor<Playback> {
        &self.playback
    }

    /// Translate one note as if it came from the input device (no thru).
    pub fn handle_note(&self, event: NoteEvent) -> Result<()> {
        Ok(self
            .keyboard
            .submit(move |kb| kb.handle(event, Instant::now()))??)
    }

    // =========================================================================
    // MIDI devices and output parameters
    // =========================================================================

    pub fn input_devices(&self) -> Result<DeviceSelection> {
        Ok(self.realtime.submit(|rt| rt.inputs())?)
    }

    pub fn select_input(&self, index: i32) -> Result<()> {
        Ok(self.realtime.submit(move |rt| rt.select_input(index))??)
    }

    pub fn output_devices(&self) -> Result<DeviceSelection> {
        Ok(self.realtime.submit(|rt| rt.outputs())?)
    }

    pub fn select_output(&self, index: i32) -> Result<()> {
        Ok(self.realtime.submit(move |rt| rt.select_output(index))??)
    }

    pub fn bank(&self) -> Result<u16> {
        Ok(self.realtime.submit(|rt| rt.bank())?)
    }

    /// Queued; failures are logged only.
    pub fn set_bank(&self, bank: u16) {
        self.realtime
            .submit_detached("set bank", move |rt| rt.set_bank(bank));
    }

    pub fn patch(&self) -> Result<u8> {
        Ok(self.realtime.submit(|rt| rt.patch())?)
    }

    /// Queued; failures are logged only.
    pub fn set_patch(&self, patch: u8) {
        self.realtime
            .submit_detached("set patch", move |rt| rt.set_patch(patch));
    }

    pub fn transpose(&self) -> Result<i8> {
        Ok(self.realtime.submit(|rt| rt.transpose())?)
    }

    pub fn set_transpose(&self, transpose: i8) -> Result<()> {
        Ok(self.realtime.submit(move |rt| rt.set_transpose(transpose))?)
    }

    // =========================================================================
    // Time sync
    // =========================================================================

    pub fn current_time(&self) -> Result<CorrectedTime> {
        Ok(self.time_sync.submit(|sync| sync.now())?)
    }

    pub fn time_server(&self) -> Result<Option<String>> {
        Ok(self
            .time_sync
            .submit(|sync| sync.server().map(str::to_string))?)
    }

    pub fn set_time_server(&self, server: &str) -> Result<()> {
        let server = server.to_string();
        Ok(self
            .time_sync
            .submit(move |sync| sync.set_server(&server))??)
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Parse a Standard MIDI File and make it the current recording.
    pub fn load_recording(&self, reader: impl Read) -> Result<()> {
        let recording: Arc<dyn Recording> = Arc::new(MidiRecording::read(reader)?);
        self.playback
            .submit(move |p| p.set_recording(recording, Timestamp::now()))?;
        Ok(())
    }

    pub fn playback_config(&self) -> Result<PlaybackConfig> {
        Ok(self.playback.submit(|p| *p.config())?)
    }

    pub fn set_track(&self, track: u16) -> Result<()> {
        Ok(self
            .playback
            .submit(move |p| p.select_track(track, Timestamp::now()))??)
    }

    pub fn set_offset(&self, offset_secs: f64) -> Result<()> {
        Ok(self
            .playback
            .submit(move |p| p.set_offset(offset_secs, Timestamp::now()))??)
    }

    pub fn set_scheduler(&self, settings: SchedulerSettings) -> Result<()> {
        Ok(self
            .playback
            .submit(move |p| p.set_scheduler(settings, Timestamp::now()))??)
    }

    pub fn phase(&self) -> Result<Phase> {
        Ok(self.playback.submit(|p| p.phase())?)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Cancel every actor. Pending requests fail with `Canceled`.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Block until the engine is cancelled. Returns the internal consistency error
    /// that stopped it, if any.
    pub fn wait(&self) -> Result<()> {
        self.root.wait();
        match self.root.cause() {
            Some(cause) => {
                error!("engine stopped: {cause}");
                Err(CoreError::InternalConsistency(cause).into())
            }
            None => Ok(()),
        }
    }

    pub fn join(&self) {
        self.playback.join();
        self.realtime.join();
        self.time_sync.join();
        self.keyboard.join();
    }
}

impl Drop for MidikeyEngine {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
