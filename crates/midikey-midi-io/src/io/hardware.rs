//! midir-backed ports.

use super::{InputCallback, InputConnection, MidiBackend, MidiDevice, OutputConnection};
use crate::error::{Error, Result};
use crate::message::MidiOutputMessage;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

const CLIENT_NAME: &str = "midikey";

#[derive(Debug, Default)]
pub struct MidirBackend;

impl MidirBackend {
    pub fn new() -> Self {
        Self
    }
}

struct HardwareInput {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl InputConnection for HardwareInput {
    fn name(&self) -> &str {
        &self.name
    }
}

struct HardwareOutput {
    name: String,
    connection: MidiOutputConnection,
}

impl OutputConnection for HardwareOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, message: &MidiOutputMessage) -> Result<()> {
        self.connection.send(message.as_bytes())?;
        Ok(())
    }
}

impl MidiBackend for MidirBackend {
    fn list_inputs(&self) -> Vec<MidiDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_input) = MidiInput::new(CLIENT_NAME) {
            for (index, port) in midi_input.ports().iter().enumerate() {
                let name = midi_input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiDevice { index, name });
            }
        }
        devices
    }

    fn list_outputs(&self) -> Vec<MidiDevice> {
        let mut devices = Vec::new();
        if let Ok(midi_output) = MidiOutput::new(CLIENT_NAME) {
            for (index, port) in midi_output.ports().iter().enumerate() {
                let name = midi_output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiDevice { index, name });
            }
        }
        devices
    }

    fn open_input(
        &mut self,
        index: usize,
        mut callback: InputCallback,
    ) -> Result<Box<dyn InputConnection>> {
        let midi_input = MidiInput::new(CLIENT_NAME)?;
        let ports = midi_input.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| Error::MidiDevice(format!("MIDI input device {} not found", index)))?;
        let name = midi_input
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", index));

        let connection = midi_input.connect(
            port,
            "midikey-input",
            move |_timestamp, message, _| callback(message),
            (),
        )?;
        debug!(device = %name, "MIDI input opened");
        Ok(Box::new(HardwareInput {
            name,
            _connection: connection,
        }))
    }

    fn open_output(&mut self, index: usize) -> Result<Box<dyn OutputConnection>> {
        let midi_output = MidiOutput::new(CLIENT_NAME)?;
        let ports = midi_output.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| Error::MidiDevice(format!("MIDI output device {} not found", index)))?;
        let name = midi_output
            .port_name(port)
            .unwrap_or_else(|_| format!("Device {}", index));

        let connection = midi_output.connect(port, "midikey-output")?;
        debug!(device = %name, "MIDI output opened");
        Ok(Box::new(HardwareOutput { name, connection }))
    }
}
