//! In-process ports: bytes are injected by hand and output is captured.

use super::{InputCallback, InputConnection, MidiBackend, MidiDevice, OutputConnection};
use crate::error::{Error, Result};
use crate::message::MidiOutputMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

type SharedCallback = Arc<Mutex<InputCallback>>;

#[derive(Default)]
struct VirtualState {
    inputs: Vec<String>,
    outputs: Vec<String>,
    /// Open input per port, tagged with its connection id.
    listeners: Vec<Option<(u64, SharedCallback)>>,
    open_outputs: Vec<Option<u64>>,
    sent: Vec<Vec<MidiOutputMessage>>,
    fail_sends: bool,
    next_id: u64,
}

/// Cloneable handle; every clone sees the same ports.
#[derive(Clone, Default)]
pub struct VirtualMidi {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualMidi {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        let state = VirtualState {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            listeners: vec![None; inputs.len()],
            open_outputs: vec![None; outputs.len()],
            sent: vec![Vec::new(); outputs.len()],
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Deliver raw bytes as if they arrived on input `index`. Returns `false` when the
    /// port is not open.
    pub fn inject(&self, index: usize, bytes: &[u8]) -> bool {
        let callback = {
            let state = self.state.lock();
            match state.listeners.get(index) {
                Some(Some((_, callback))) => Arc::clone(callback),
                _ => return false,
            }
        };
        let mut callback = callback.lock();
        (*callback)(bytes);
        true
    }

    /// Messages sent to output `index` so far.
    pub fn sent(&self, index: usize) -> Vec<MidiOutputMessage> {
        self.state.lock().sent.get(index).cloned().unwrap_or_default()
    }

    pub fn clear_sent(&self) {
        for sent in &mut self.state.lock().sent {
            sent.clear();
        }
    }

    pub fn is_input_open(&self, index: usize) -> bool {
        matches!(self.state.lock().listeners.get(index), Some(Some(_)))
    }

    pub fn is_output_open(&self, index: usize) -> bool {
        matches!(self.state.lock().open_outputs.get(index), Some(Some(_)))
    }

    /// Make every send fail, as an unplugged device would.
    pub fn set_send_failure(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    fn devices(names: &[String]) -> Vec<MidiDevice> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| MidiDevice {
                index,
                name: name.clone(),
            })
            .collect()
    }
}

struct VirtualInput {
    name: String,
    index: usize,
    id: u64,
    state: Arc<Mutex<VirtualState>>,
}

impl InputConnection for VirtualInput {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for VirtualInput {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let Some(slot) = state.listeners.get_mut(self.index) {
            if matches!(slot, Some((id, _)) if *id == self.id) {
                *slot = None;
            }
        }
    }
}

struct VirtualOutput {
    name: String,
    index: usize,
    id: u64,
    state: Arc<Mutex<VirtualState>>,
}

impl OutputConnection for VirtualOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, message: &MidiOutputMessage) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(Error::MidiPort(format!("{} is unavailable", self.name)));
        }
        if let Some(sent) = state.sent.get_mut(self.index) {
            sent.push(message.clone());
        }
        Ok(())
    }
}

impl Drop for VirtualOutput {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if let Some(slot) = state.open_outputs.get_mut(self.index) {
            if *slot == Some(self.id) {
                *slot = None;
            }
        }
    }
}

impl MidiBackend for VirtualMidi {
    fn list_inputs(&self) -> Vec<MidiDevice> {
        Self::devices(&self.state.lock().inputs)
    }

    fn list_outputs(&self) -> Vec<MidiDevice> {
        Self::devices(&self.state.lock().outputs)
    }

    fn open_input(
        &mut self,
        index: usize,
        callback: InputCallback,
    ) -> Result<Box<dyn InputConnection>> {
        let mut state = self.state.lock();
        let name = state
            .inputs
            .get(index)
            .cloned()
            .ok_or_else(|| Error::MidiDevice(format!("MIDI input device {} not found", index)))?;
        state.next_id += 1;
        let id = state.next_id;
        state.listeners[index] = Some((id, Arc::new(Mutex::new(callback))));
        debug!(device = %name, "virtual input opened");

        Ok(Box::new(VirtualInput {
            name,
            index,
            id,
            state: Arc::clone(&self.state),
        }))
    }

    fn open_output(&mut self, index: usize) -> Result<Box<dyn OutputConnection>> {
        let mut state = self.state.lock();
        let name = state
            .outputs
            .get(index)
            .cloned()
            .ok_or_else(|| Error::MidiDevice(format!("MIDI output device {} not found", index)))?;
        state.next_id += 1;
        let id = state.next_id;
        state.open_outputs[index] = Some(id);
        debug!(device = %name, "virtual output opened");

        Ok(Box::new(VirtualOutput {
            name,
            index,
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_inject_reaches_open_input_only() {
        let mut midi = VirtualMidi::new(&["Keys"], &[]);
        assert!(!midi.inject(0, &[0x90, 60, 1]));

        let (tx, rx) = unbounded();
        let conn = midi
            .open_input(0, Box::new(move |bytes| tx.send(bytes.to_vec()).unwrap()))
            .unwrap();
        assert_eq!(conn.name(), "Keys");
        assert!(midi.inject(0, &[0x90, 60, 1]));
        assert_eq!(rx.try_recv().unwrap(), vec![0x90, 60, 1]);

        drop(conn);
        assert!(!midi.is_input_open(0));
        assert!(!midi.inject(0, &[0x80, 60, 0]));
    }

    #[test]
    fn test_output_capture_and_failure() {
        let mut midi = VirtualMidi::new(&[], &["Synth"]);
        let mut out = midi.open_output(0).unwrap();
        out.send(&MidiOutputMessage::program_change(0, 5)).unwrap();
        assert_eq!(midi.sent(0), vec![MidiOutputMessage::program_change(0, 5)]);

        midi.set_send_failure(true);
        assert!(out.send(&MidiOutputMessage::all_notes_off(0)).is_err());
        assert_eq!(midi.sent(0).len(), 1);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut midi = VirtualMidi::new(&["Keys"], &["Synth"]);
        assert!(matches!(midi.open_output(3), Err(Error::MidiDevice(_))));
        assert!(midi.open_input(1, Box::new(|_| {})).is_err());
        assert_eq!(midi.list_outputs()[0].name, "Synth");
    }

    #[test]
    fn test_stale_connection_drop_keeps_newer_one() {
        let mut midi = VirtualMidi::new(&[], &["Synth"]);
        let old = midi.open_output(0).unwrap();
        let _new = midi.open_output(0).unwrap();
        drop(old);
        assert!(midi.is_output_open(0));
    }
}
