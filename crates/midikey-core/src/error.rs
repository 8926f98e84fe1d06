//! Error types for midikey-core.

use thiserror::Error;

/// Error type for midikey-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range request payload. Raised before any actor is touched.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Device open/enumerate failure. The resource keeps its prior state.
    #[error("Device error: {0}")]
    Device(String),

    /// The owning actor (or the whole process) is shutting down.
    #[error("Canceled")]
    Canceled,

    /// Key state no longer matches what was asserted to the output.
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Time sync error: {0}")]
    TimeSync(String),

    #[error("Emit error: {0}")]
    Emit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
