//! Note-to-key binding table.
//!
//! Loaded once at startup from JSON and read-only afterwards:
//!
//! ```json
//! {
//!     "60": { "key": "A" },
//!     "61": { "key": 65, "shift": true },
//!     "62": { "key": "1", "ctrl": true, "alt": true }
//! }
//! ```
//!
//! `key` is either a virtual-key code (0-255) or a single ASCII letter/digit, which
//! maps to the virtual-key code of the same character.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Number of addressable controls (MIDI note numbers).
pub const NOTE_COUNT: usize = 128;

/// Virtual-key code of a synthetic key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub const SHIFT: KeyCode = KeyCode(0x10);
    pub const CTRL: KeyCode = KeyCode(0x11);
    pub const ALT: KeyCode = KeyCode(0x12);

    pub fn is_modifier(self) -> bool {
        matches!(self, KeyCode::SHIFT | KeyCode::CTRL | KeyCode::ALT)
    }

    fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        (c.is_ascii_uppercase() || c.is_ascii_digit()).then(|| KeyCode(c as u8))
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            KeyCode::CTRL => f.write_str("Ctrl"),
            KeyCode::ALT => f.write_str("Alt"),
            KeyCode::SHIFT => f.write_str("Shift"),
            KeyCode(code) if code.is_ascii_graphic() => write!(f, "{:?}", code as char),
            KeyCode(code) => write!(f, "0x{code:02X}"),
        }
    }
}

/// The three tracked modifiers, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    /// Fixed emission order. Every modifier sequence is produced by walking this table.
    pub const ORDER: [Modifier; 3] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift];

    pub fn key(self) -> KeyCode {
        match self {
            Modifier::Ctrl => KeyCode::CTRL,
            Modifier::Alt => KeyCode::ALT,
            Modifier::Shift => KeyCode::SHIFT,
        }
    }
}

/// Modifier state required while a key is held, or last asserted to the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
    };

    pub fn get(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Ctrl => self.ctrl,
            Modifier::Alt => self.alt,
            Modifier::Shift => self.shift,
        }
    }

    pub fn set(&mut self, modifier: Modifier, down: bool) {
        match modifier {
            Modifier::Ctrl => self.ctrl = down,
            Modifier::Alt => self.alt = down,
            Modifier::Shift => self.shift = down,
        }
    }

    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift
    }
}

/// Target key plus the modifiers it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Keybinding {
    pub key: KeyCode,
    #[serde(flatten)]
    pub modifiers: Modifiers,
}

impl Keybinding {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKey {
    Code(u16),
    Char(String),
}

#[derive(Deserialize)]
struct RawBinding {
    key: RawKey,
    #[serde(flatten)]
    modifiers: Modifiers,
}

impl RawBinding {
    fn resolve(self, note: &str) -> Result<Keybinding> {
        let key = match self.key {
            RawKey::Code(code) => u8::try_from(code).map(KeyCode).map_err(|_| {
                Error::InvalidConfig(format!("note {note}: key code {code} out of range (0-255)"))
            })?,
            RawKey::Char(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::from_char(c).ok_or_else(|| {
                        Error::InvalidConfig(format!("note {note}: unsupported key '{s}'"))
                    })?,
                    _ => {
                        return Err(Error::InvalidConfig(format!(
                            "note {note}: key must be a code or a single character, got '{s}'"
                        )))
                    }
                }
            }
        };
        Ok(Keybinding {
            key: bindable(key, note)?,
            modifiers: self.modifiers,
        })
    }
}

/// Modifier keys are driven only by the binding flags, never bound directly.
fn bindable(key: KeyCode, note: impl fmt::Display) -> Result<KeyCode> {
    if key.is_modifier() {
        return Err(Error::InvalidConfig(format!(
            "note {note}: {key} cannot be bound as a key, use the ctrl/alt/shift flags"
        )));
    }
    Ok(key)
}

/// Immutable mapping from note number to [`Keybinding`].
#[derive(Debug, Clone)]
pub struct BindingTable {
    entries: [Option<Keybinding>; NOTE_COUNT],
}

impl Default for BindingTable {
    fn default() -> Self {
        Self {
            entries: [None; NOTE_COUNT],
        }
    }
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used while assembling a table.
    pub fn with(mut self, note: u8, binding: Keybinding) -> Result<Self> {
        let slot = self.entries.get_mut(note as usize).ok_or_else(|| {
            Error::InvalidConfig(format!("note {note} out of range (0-127)"))
        })?;
        bindable(binding.key, note)?;
        *slot = Some(binding);
        Ok(self)
    }

    pub fn get(&self, note: u8) -> Option<&Keybinding> {
        self.entries.get(note as usize)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Keybinding)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(note, b)| b.as_ref().map(|b| (note as u8, b)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawBinding> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (note_str, raw) in raw {
            let note: u8 = note_str
                .trim()
                .parse()
                .ok()
                .filter(|n| (*n as usize) < NOTE_COUNT)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!("note '{note_str}' is not a number in 0-127"))
                })?;
            table.entries[note as usize] = Some(raw.resolve(&note_str)?);
        }
        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}
