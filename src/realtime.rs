//! MIDI realtime actor: device selection, output parameters and MIDI thru.

use midikey_core::{Actor, Error as CoreError, Keyboard, Resource, Result as CoreResult};
use midikey_midi_io::{
    InputCallback, InputConnection, LiveNote, MidiBackend, MidiDevice, MidiOutputMessage,
    OutputConnection, MAX_BANK,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Selection index meaning "no device".
pub const NO_DEVICE: i32 = -1;

/// Output channel for program, bank and all-notes-off messages.
const OUTPUT_CHANNEL: u8 = 0;

/// Where live input goes: the keyboard actor, and back to this actor for thru.
#[derive(Clone)]
pub struct InputRouter {
    pub keyboard: Actor<Keyboard>,
    pub thru: Actor<MidiRealtime>,
}

impl InputRouter {
    /// Callback for an input port. Runs on the backend's thread, so it only queues work.
    pub fn callback(&self) -> InputCallback {
        let router = self.clone();
        Box::new(move |bytes| {
            let Some(note) = LiveNote::decode(bytes) else {
                return;
            };
            let event = note.event();
            router
                .keyboard
                .submit_detached("live note", move |kb| kb.handle(event, Instant::now()));
            router
                .thru
                .submit_detached("midi thru", move |rt| rt.forward(note));
        })
    }
}

/// Device list plus the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSelection {
    pub devices: Vec<MidiDevice>,
    pub selected: i32,
}

/// Owned by one actor; every field changes only inside its tasks.
pub struct MidiRealtime {
    backend: Box<dyn MidiBackend>,
    router: Option<InputRouter>,
    input: Option<Box<dyn InputConnection>>,
    input_index: i32,
    output: Option<Box<dyn OutputConnection>>,
    output_index: i32,
    bank: u16,
    patch: u8,
    transpose: i8,
}

impl MidiRealtime {
    pub fn new(backend: Box<dyn MidiBackend>) -> Self {
        Self {
            backend,
            router: None,
            input: None,
            input_index: NO_DEVICE,
            output: None,
            output_index: NO_DEVICE,
            bank: 0,
            patch: 0,
            transpose: 0,
        }
    }

    pub fn set_router(&mut self, router: InputRouter) {
        self.router = Some(router);
    }

    pub fn inputs(&self) -> DeviceSelection {
        DeviceSelection {
            devices: self.backend.list_inputs(),
            selected: self.input_index,
        }
    }

    pub fn outputs(&self) -> DeviceSelection {
        DeviceSelection {
            devices: self.backend.list_outputs(),
            selected: self.output_index,
        }
    }

    /// Open input `index`, or close it with [`NO_DEVICE`]. On failure the previous
    /// input stays open and selected.
    pub fn select_input(&mut self, index: i32) -> CoreResult<()> {
        if index == NO_DEVICE {
            if self.input.take().is_some() {
                info!("MIDI input closed");
            }
            self.input_index = NO_DEVICE;
            return Ok(());
        }
        let port = device_index(index)?;
        let router = self
            .router
            .as_ref()
            .ok_or_else(|| CoreError::Device("no input route configured".into()))?;

        let connection = self.backend.open_input(port, router.callback())?;
        info!(device = connection.name(), "MIDI input selected");
        self.input = Some(connection);
        self.input_index = index;
        Ok(())
    }

    /// Open output `index`, or close it with [`NO_DEVICE`]. On failure the previous
    /// output stays open and selected. A newly opened output gets the current bank and
    /// patch.
    pub fn select_output(&mut self, index: i32) -> CoreResult<()> {
        if index == NO_DEVICE {
            if self.output.take().is_some() {
                info!("MIDI output closed");
            }
            self.output_index = NO_DEVICE;
            return Ok(());
        }
        let port = device_index(index)?;

        let connection = self.backend.open_output(port)?;
        info!(device = connection.name(), "MIDI output selected");
        self.output = Some(connection);
        self.output_index = index;
        self.send_program();
        Ok(())
    }

    pub fn bank(&self) -> u16 {
        self.bank
    }

    pub fn set_bank(&mut self, bank: u16) -> CoreResult<()> {
        if bank > MAX_BANK {
            return Err(CoreError::Validation(format!(
                "bank {bank} out of range (0-{MAX_BANK})"
            )));
        }
        self.bank = bank;
        self.send_program();
        Ok(())
    }

    pub fn patch(&self) -> u8 {
        self.patch
    }

    pub fn set_patch(&mut self, patch: u8) -> CoreResult<()> {
        if patch > 127 {
            return Err(CoreError::Validation(format!(
                "patch {patch} out of range (0-127)"
            )));
        }
        self.patch = patch;
        self.send(&MidiOutputMessage::program_change(OUTPUT_CHANNEL, patch));
        Ok(())
    }

    pub fn transpose(&self) -> i8 {
        self.transpose
    }

    /// Changing the transpose silences the output so nothing hangs on the old pitch.
    pub fn set_transpose(&mut self, transpose: i8) {
        if transpose == self.transpose {
            return;
        }
        self.transpose = transpose;
        self.send(&MidiOutputMessage::all_notes_off(OUTPUT_CHANNEL));
    }

    /// MIDI thru for one live note. Notes transposed out of range are dropped.
    pub fn forward(&mut self, note: LiveNote) -> CoreResult<()> {
        if self.output.is_none() {
            return Ok(());
        }
        match note.transposed(self.transpose) {
            Some(note) => self.send(&MidiOutputMessage::from(&note)),
            None => debug!(note = note.note, transpose = self.transpose, "thru note out of range"),
        }
        Ok(())
    }

    fn send_program(&mut self) {
        for message in MidiOutputMessage::bank_select(OUTPUT_CHANNEL, self.bank) {
            self.send(&message);
        }
        self.send(&MidiOutputMessage::program_change(OUTPUT_CHANNEL, self.patch));
    }

    fn send(&mut self, message: &MidiOutputMessage) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if let Err(e) = output.send(message) {
            warn!(bytes = ?message.as_bytes(), "MIDI output send failed: {e}");
        }
    }
}

impl Resource for MidiRealtime {}

fn device_index(index: i32) -> CoreResult<usize> {
    usize::try_from(index)
        .map_err(|_| CoreError::Validation(format!("device index {index} is invalid")))
}
