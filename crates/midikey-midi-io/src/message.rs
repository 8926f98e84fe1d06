//! Outgoing MIDI messages.

use crate::event::LiveNote;
use smallvec::SmallVec;

/// Controller numbers used on the output device.
pub mod cc {
    pub const BANK_SELECT_MSB: u8 = 0;
    pub const BANK_SELECT_LSB: u8 = 32;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Largest 14-bit bank number.
pub const MAX_BANK: u16 = 0x3FFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiOutputMessage {
    pub bytes: SmallVec<[u8; 3]>,
}

impl MidiOutputMessage {
    fn channel_message(status: u8, channel: u8, data: &[u8]) -> Self {
        let mut bytes = SmallVec::new();
        bytes.push(status | channel.min(15));
        bytes.extend(data.iter().map(|b| b & 0x7F));
        Self { bytes }
    }

    pub fn control_change(channel: u8, cc_number: u8, value: u8) -> Self {
        Self::channel_message(0xB0, channel, &[cc_number, value])
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_message(0x90, channel, &[note, velocity])
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_message(0x80, channel, &[note, velocity])
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::channel_message(0xC0, channel, &[program])
    }

    /// CC0 (MSB) and CC32 (LSB) for a 14-bit bank. Values above 16383 clamp.
    pub fn bank_select(channel: u8, bank: u16) -> [Self; 2] {
        let bank = bank.min(MAX_BANK);
        [
            Self::control_change(channel, cc::BANK_SELECT_MSB, (bank >> 7) as u8),
            Self::control_change(channel, cc::BANK_SELECT_LSB, (bank & 0x7F) as u8),
        ]
    }

    pub fn all_notes_off(channel: u8) -> Self {
        Self::control_change(channel, cc::ALL_NOTES_OFF, 0)
    }

    /// Note on or off, matching how it was received.
    pub fn from_note(note: &LiveNote) -> Self {
        if note.on {
            Self::note_on(note.channel, note.note, note.velocity)
        } else {
            Self::note_off(note.channel, note.note, note.velocity)
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<&LiveNote> for MidiOutputMessage {
    fn from(note: &LiveNote) -> Self {
        Self::from_note(note)
    }
}
