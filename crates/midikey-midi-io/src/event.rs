//! Decoding of live MIDI input.

use midikey_core::NoteEvent;
use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::trace;

/// A note message as received from a device, before translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveNote {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub on: bool,
}

impl LiveNote {
    /// Decode raw bytes. Anything that is not a note message is `None`; a note-on with
    /// velocity 0 is a release.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let event = match LiveEvent::parse(bytes) {
            Ok(event) => event,
            Err(e) => {
                trace!("undecodable MIDI input {bytes:02X?}: {e}");
                return None;
            }
        };
        let LiveEvent::Midi { channel, message } = event else {
            return None;
        };
        let (key, vel, on) = match message {
            MidiMessage::NoteOn { key, vel } => (key, vel, vel.as_int() > 0),
            MidiMessage::NoteOff { key, vel } => (key, vel, false),
            _ => return None,
        };
        Some(Self {
            channel: channel.as_int(),
            note: key.as_int(),
            velocity: vel.as_int(),
            on,
        })
    }

    pub fn event(&self) -> NoteEvent {
        NoteEvent {
            note: self.note,
            on: self.on,
        }
    }

    /// Same message shifted by `semitones`, or `None` if it would leave 0-127.
    pub fn transposed(&self, semitones: i8) -> Option<Self> {
        let note = i16::from(self.note) + i16::from(semitones);
        let note = u8::try_from(note).ok().filter(|n| *n < 128)?;
        Some(Self { note, ..*self })
    }
}

/// Shorthand for [`LiveNote::decode`] when only the note event matters.
pub fn decode_note(bytes: &[u8]) -> Option<NoteEvent> {
    LiveNote::decode(bytes).map(|n| n.event())
}
