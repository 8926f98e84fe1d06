//! MIDI device directory.
//!
//! [`MidiBackend`] enumerates and opens ports. Hardware access goes through midir and
//! requires the `midi-io` feature; [`VirtualMidi`] is always available for tests and
//! headless runs.

#[cfg(feature = "midi-io")]
mod hardware;
mod virtual_port;

#[cfg(feature = "midi-io")]
pub use hardware::MidirBackend;
pub use virtual_port::VirtualMidi;

use crate::error::Result;
use crate::message::MidiOutputMessage;
use serde::Serialize;

/// One enumerated port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MidiDevice {
    pub index: usize,
    pub name: String,
}

/// Receives raw bytes on the backend's input thread. Must not block.
pub type InputCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Open input port. Dropping it closes the port.
pub trait InputConnection: Send {
    fn name(&self) -> &str;
}

/// Open output port. Dropping it closes the port.
pub trait OutputConnection: Send {
    fn name(&self) -> &str;

    fn send(&mut self, message: &MidiOutputMessage) -> Result<()>;
}

pub trait MidiBackend: Send {
    fn list_inputs(&self) -> Vec<MidiDevice>;

    fn list_outputs(&self) -> Vec<MidiDevice>;

    fn open_input(
        &mut self,
        index: usize,
        callback: InputCallback,
    ) -> Result<Box<dyn InputConnection>>;

    fn open_output(&mut self, index: usize) -> Result<Box<dyn OutputConnection>>;
}

/// Device names in index order.
pub fn device_names(devices: &[MidiDevice]) -> Vec<String> {
    devices.iter().map(|d| d.name.clone()).collect()
}
