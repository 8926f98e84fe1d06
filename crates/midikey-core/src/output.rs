//! Synthetic key output.

use crate::error::Result;
use crate::keys::KeyAction;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Receives key actions one at a time, in the order the tracker produced them.
///
/// Implementations must not retry: a failed action is reported once and the caller
/// moves on to the next one.
pub trait KeyEmitter: Send {
    fn emit(&mut self, action: KeyAction) -> Result<()>;
}

impl<F> KeyEmitter for F
where
    F: FnMut(KeyAction) -> Result<()> + Send,
{
    fn emit(&mut self, action: KeyAction) -> Result<()> {
        self(action)
    }
}

/// Dry-run emitter that only logs.
#[derive(Debug, Default)]
pub struct LogEmitter;

impl KeyEmitter for LogEmitter {
    fn emit(&mut self, action: KeyAction) -> Result<()> {
        info!("key {action}");
        Ok(())
    }
}

/// Collects every emitted action into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    actions: Arc<Mutex<Vec<KeyAction>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<KeyAction> {
        self.actions.lock().clone()
    }

    /// Retrieve and clear recorded actions.
    pub fn drain(&self) -> Vec<KeyAction> {
        std::mem::take(&mut *self.actions.lock())
    }
}

impl KeyEmitter for RecordingEmitter {
    fn emit(&mut self, action: KeyAction) -> Result<()> {
        self.actions.lock().push(action);
        Ok(())
    }
}
