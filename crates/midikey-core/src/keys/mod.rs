//! Note-to-keystroke translation.
//!
//! - [`binding`]: static note → key + modifier table
//! - [`tracker`]: pure pressed-key/modifier state machine
//! - [`idle`]: idle deadline that releases held modifiers
//!
//! [`Keyboard`] ties them to a [`KeyEmitter`] and is meant to be owned by one
//! [`Actor`](crate::actor::Actor): live and replayed notes arrive as tasks, idle expiry
//! arrives through [`Resource::on_deadline`], so both are serialized on one thread.

pub mod binding;
pub mod idle;
pub mod tracker;

pub use binding::{BindingTable, KeyCode, Keybinding, Modifier, Modifiers, NOTE_COUNT};
pub use idle::IdleTimer;
pub use tracker::{KeyAction, KeyActions, KeyTracker};

use crate::actor::{CancelToken, Resource};
use crate::error::{Error, Result};
use crate::event::NoteEvent;
use crate::output::KeyEmitter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Output-side state: bindings, tracker and emitter.
pub struct Keyboard {
    bindings: Arc<BindingTable>,
    tracker: KeyTracker,
    emitter: Box<dyn KeyEmitter>,
    /// Cancelled on an internal consistency failure so the whole process stops emitting.
    fatal: Option<CancelToken>,
    emitted: u64,
}

impl Keyboard {
    pub fn new(
        bindings: Arc<BindingTable>,
        idle_duration: Duration,
        emitter: Box<dyn KeyEmitter>,
    ) -> Self {
        Self {
            bindings,
            tracker: KeyTracker::new(idle_duration),
            emitter,
            fatal: None,
            emitted: 0,
        }
    }

    /// Token to cancel when key state is found corrupted. Usually the process root.
    pub fn with_fatal_token(mut self, token: CancelToken) -> Self {
        self.fatal = Some(token);
        self
    }

    /// Translate one note event and emit the resulting actions.
    pub fn handle(&mut self, event: NoteEvent, now: Instant) -> Result<()> {
        if event.note as usize >= NOTE_COUNT {
            return Err(Error::Validation(format!(
                "note {} out of range (0-127)",
                event.note
            )));
        }
        let Some(binding) = self.bindings.get(event.note).copied() else {
            debug!(note = event.note, "unbound note ignored");
            return Ok(());
        };

        let actions = self.tracker.apply(event.on, &binding, now);
        self.flush(actions)
    }

    /// Release held modifiers right away, as if the idle deadline had passed.
    pub fn release_modifiers(&mut self) -> Result<()> {
        let actions = self.tracker.release_modifiers();
        self.flush(actions)
    }

    pub fn tracker(&self) -> &KeyTracker {
        &self.tracker
    }

    #[cfg(test)]
    pub(crate) fn tracker_mut(&mut self) -> &mut KeyTracker {
        &mut self.tracker
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Total number of actions handed to the emitter, failed ones included.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn flush(&mut self, actions: KeyActions) -> Result<()> {
        if actions.is_empty() {
            return self.check();
        }
        for action in actions {
            self.emitted += 1;
            if let Err(e) = self.emitter.emit(action) {
                warn!(%action, "emit failed: {e}");
            }
        }
        info!("{}", self.tracker);
        self.check()
    }

    fn check(&self) -> Result<()> {
        if let Err(e) = self.tracker.verify() {
            error!("{e}; stopping to avoid stuck keys");
            if let Some(token) = &self.fatal {
                token.cancel_with_cause(e.to_string());
            }
            return Err(e);
        }
        Ok(())
    }
}

impl Resource for Keyboard {
    fn deadline(&self) -> Option<Instant> {
        self.tracker.idle_deadline()
    }

    fn on_deadline(&mut self, now: Instant) {
        let actions = self.tracker.expire_idle(now);
        if !actions.is_empty() {
            debug!("idle timeout, releasing modifiers");
        }
        if let Err(e) = self.flush(actions) {
            error!("idle release failed: {e}");
        }
    }
}
