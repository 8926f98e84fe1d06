//! Timed replay of recorded note sequences.
//!
//! [`Playback`] is the playback actor's resource. Configuration changes arrive as
//! tasks; every change interrupts whatever is armed or running and recomputes from
//! scratch with the new settings. Start instants and event deadlines are exposed
//! through [`Resource::deadline`], so waiting is done by the actor loop and is
//! cancelled with it.

pub mod scheduler;

pub use scheduler::{Phase, SchedulerSettings, MAX_LOOP_INTERVAL, MAX_START_UNIX_SECS};

use crate::actor::{Actor, Resource};
use crate::error::{Error, Result};
use crate::event::{NoteEvent, TimedEvent};
use crate::keys::{Keyboard, NOTE_COUNT};
use crate::time::{shift_instant, TimeCorrection, TimeSync, Timestamp};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A loaded recording: one or more tracks of timestamped events, sorted by time.
pub trait Recording: Send + Sync {
    fn track_count(&self) -> usize;

    fn track(&self, index: usize) -> Option<&[TimedEvent]>;
}

/// Where replayed events go.
pub trait NoteSink: Send {
    fn deliver(&mut self, event: NoteEvent) -> Result<()>;
}

impl<F> NoteSink for F
where
    F: FnMut(NoteEvent) -> Result<()> + Send,
{
    fn deliver(&mut self, event: NoteEvent) -> Result<()> {
        self(event)
    }
}

/// Straight to the keyboard actor, waiting for each event to be handled.
impl NoteSink for Actor<Keyboard> {
    fn deliver(&mut self, event: NoteEvent) -> Result<()> {
        self.submit(move |kb| kb.handle(event, Instant::now()))?
    }
}

/// Source of the clock correction applied when a start instant is computed.
pub trait CorrectionSource: Send {
    fn correction(&self) -> Result<TimeCorrection>;
}

impl CorrectionSource for TimeCorrection {
    fn correction(&self) -> Result<TimeCorrection> {
        Ok(*self)
    }
}

impl CorrectionSource for Actor<TimeSync> {
    fn correction(&self) -> Result<TimeCorrection> {
        self.submit(|sync| sync.current())
    }
}

/// User-facing playback parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackConfig {
    pub track: u16,
    /// Shift applied to every event, in nanoseconds. May be negative.
    pub offset_nanos: i64,
    pub scheduler: SchedulerSettings,
}

impl PlaybackConfig {
    pub fn offset_secs(&self) -> f64 {
        self.offset_nanos as f64 * 1e-9
    }
}

/// Playback actor state.
pub struct Playback {
    config: PlaybackConfig,
    recording: Option<Arc<dyn Recording>>,
    phase: Phase,
    last_start: Option<Instant>,
    /// Notes the replay pressed and has not released yet.
    sounding: [bool; NOTE_COUNT],
    sink: Box<dyn NoteSink>,
    clock: Box<dyn CorrectionSource>,
}

impl Playback {
    pub fn new(sink: Box<dyn NoteSink>, clock: Box<dyn CorrectionSource>) -> Self {
        Self {
            config: PlaybackConfig::default(),
            recording: None,
            phase: Phase::Idle,
            last_start: None,
            sounding: [false; NOTE_COUNT],
            sink,
            clock,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn recording(&self) -> Option<&Arc<dyn Recording>> {
        self.recording.as_ref()
    }

    /// Replace the recording. A selected track the new recording lacks falls back to 0.
    pub fn set_recording(&mut self, recording: Arc<dyn Recording>, now: Timestamp) {
        if usize::from(self.config.track) >= recording.track_count() {
            self.config.track = 0;
        }
        info!(tracks = recording.track_count(), "recording loaded");
        self.recording = Some(recording);
        self.restart(now);
    }

    pub fn select_track(&mut self, track: u16, now: Timestamp) -> Result<()> {
        if let Some(recording) = &self.recording {
            if usize::from(track) >= recording.track_count() {
                return Err(Error::Validation(format!(
                    "track {track} out of range ({} tracks)",
                    recording.track_count()
                )));
            }
        }
        self.config.track = track;
        self.restart(now);
        Ok(())
    }

    pub fn set_offset(&mut self, offset_secs: f64, now: Timestamp) -> Result<()> {
        if !offset_secs.is_finite() {
            return Err(Error::Validation(format!("offset {offset_secs} is not finite")));
        }
        self.config.offset_nanos = (offset_secs * 1e9) as i64;
        self.restart(now);
        Ok(())
    }

    pub fn set_scheduler(&mut self, settings: SchedulerSettings, now: Timestamp) -> Result<()> {
        settings.validate()?;
        self.config.scheduler = settings;
        self.restart(now);
        Ok(())
    }

    /// Interrupt the current wait or run and recompute from the current configuration.
    pub fn restart(&mut self, now: Timestamp) {
        self.release_sounding();
        self.last_start = None;
        self.phase = Phase::Idle;

        if !self.config.scheduler.enabled || self.current_track().is_none() {
            debug!("playback idle");
            return;
        }

        let correction = self.clock.correction().unwrap_or_else(|e| {
            warn!("time correction unavailable ({e}), using local clock");
            TimeCorrection::UNSYNCED
        });
        let start = self.config.scheduler.first_start(&correction, now);
        debug!(
            wait_ms = start.saturating_duration_since(now.mono).as_millis() as u64,
            "playback armed"
        );
        self.phase = Phase::Armed { start };
    }

    /// Deliver everything due by `now` and move through the phases.
    pub fn advance(&mut self, now: Instant) {
        loop {
            match self.phase {
                Phase::Idle => return,
                Phase::Armed { start } => {
                    if now < start {
                        return;
                    }
                    info!(track = self.config.track, "playback started");
                    self.last_start = Some(start);
                    self.phase = Phase::Running {
                        started: start,
                        cursor: 0,
                    };
                }
                Phase::Running { started, cursor } => {
                    let Some(recording) = self.recording.clone() else {
                        self.phase = Phase::Idle;
                        return;
                    };
                    let events = recording
                        .track(usize::from(self.config.track))
                        .unwrap_or_default();

                    let Some(next) = events.get(cursor) else {
                        self.finish(now);
                        continue;
                    };
                    if self.due(started, next) > now {
                        return;
                    }
                    self.phase = Phase::Running {
                        started,
                        cursor: cursor + 1,
                    };
                    self.deliver(next.event);
                }
            }
        }
    }

    fn finish(&mut self, now: Instant) {
        self.release_sounding();
        let settings = self.config.scheduler;
        match self.last_start {
            Some(last) if settings.loop_enabled => {
                let start = settings.next_loop_start(last, now);
                debug!("playback finished, looping");
                self.phase = Phase::Armed { start };
            }
            _ => {
                info!("playback finished");
                self.phase = Phase::Idle;
            }
        }
    }

    fn due(&self, started: Instant, event: &TimedEvent) -> Instant {
        shift_instant(started + event.at, self.config.offset_nanos)
    }

    fn current_track(&self) -> Option<&[TimedEvent]> {
        self.recording
            .as_ref()?
            .track(usize::from(self.config.track))
    }

    fn deliver(&mut self, event: NoteEvent) {
        if let Some(slot) = self.sounding.get_mut(event.note as usize) {
            *slot = event.on;
        }
        if let Err(e) = self.sink.deliver(event) {
            warn!(note = event.note, on = event.on, "replay delivery failed: {e}");
        }
    }

    fn release_sounding(&mut self) {
        for note in 0..NOTE_COUNT {
            if self.sounding[note] {
                self.deliver(NoteEvent::off(note as u8));
            }
        }
    }
}

impl Resource for Playback {
    fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Idle => None,
            Phase::Armed { start } => Some(start),
            Phase::Running { started, cursor } => {
                let next = self.current_track().and_then(|events| events.get(cursor));
                Some(next.map_or(started, |e| self.due(started, e)))
            }
        }
    }

    fn on_deadline(&mut self, now: Instant) {
        self.advance(now);
    }
}

/// In-memory recording, mostly for tests and generated sequences.
#[derive(Debug, Clone, Default)]
pub struct SequenceRecording {
    tracks: Vec<Vec<TimedEvent>>,
}

impl SequenceRecording {
    pub fn new(tracks: Vec<Vec<TimedEvent>>) -> Self {
        let mut tracks = tracks;
        for track in &mut tracks {
            track.sort_by_key(|e| e.at);
        }
        Self { tracks }
    }

    /// Single-track recording.
    pub fn single(events: Vec<TimedEvent>) -> Self {
        Self::new(vec![events])
    }

    pub fn duration(&self, track: usize) -> Option<Duration> {
        Some(self.tracks.get(track)?.last().map_or(Duration::ZERO, |e| e.at))
    }
}

impl Recording for SequenceRecording {
    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track(&self, index: usize) -> Option<&[TimedEvent]> {
        self.tracks.get(index).map(Vec::as_slice)
    }
}
