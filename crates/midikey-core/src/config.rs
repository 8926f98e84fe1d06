//! Engine configuration.

use crate::keys::BindingTable;
use crate::{Error, Result};
use std::path::Path;
use std::time::Duration;

const MIN_IDLE: Duration = Duration::from_millis(1);
const MAX_IDLE: Duration = Duration::from_secs(60);

/// Startup configuration for the translation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period after the last key release before held modifiers are dropped.
    pub idle_duration: Duration,
    pub bindings: BindingTable,
    /// Reference time server to sync with at startup.
    pub time_server: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_duration: Duration::from_millis(500),
            bindings: BindingTable::new(),
            time_server: None,
        }
    }
}

impl EngineConfig {
    pub fn with_bindings_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.bindings = BindingTable::load(path)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.idle_duration < MIN_IDLE || self.idle_duration > MAX_IDLE {
            return Err(Error::InvalidConfig(format!(
                "idle_duration {:?} out of range (1ms-60s)",
                self.idle_duration
            )));
        }
        if let Some(server) = &self.time_server {
            if server.trim().is_empty() {
                return Err(Error::InvalidConfig("time_server is empty".into()));
            }
        }
        Ok(())
    }
}
