//! Pressed-key and modifier bookkeeping.
//!
//! Pure state machine: given a press/release and its binding, compute the ordered key
//! actions to emit and update the recorded state. No I/O.

use super::binding::{KeyCode, Keybinding, Modifier, Modifiers};
use super::idle::IdleTimer;
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;
use std::time::{Duration, Instant};

/// Number of distinct key codes.
pub const KEY_COUNT: usize = 256;

/// One synthetic key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAction {
    pub key: KeyCode,
    pub pressed: bool,
}

impl KeyAction {
    pub fn press(key: KeyCode) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: KeyCode) -> Self {
        Self {
            key,
            pressed: false,
        }
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.pressed { "down" } else { "up" };
        write!(f, "{} {arrow}", self.key)
    }
}

/// Ordered batch of actions. A press produces at most five (re-trigger release,
/// three modifiers, the key).
pub type KeyActions = SmallVec<[KeyAction; 5]>;

/// Recorded key state. `modifiers` always equals what was last asserted to the output.
pub struct KeyTracker {
    pressed: [bool; KEY_COUNT],
    pressed_count: usize,
    modifiers: Modifiers,
    idle: IdleTimer,
}

impl KeyTracker {
    pub fn new(idle_duration: Duration) -> Self {
        Self {
            pressed: [false; KEY_COUNT],
            pressed_count: 0,
            modifiers: Modifiers::NONE,
            idle: IdleTimer::new(idle_duration),
        }
    }

    pub fn apply(&mut self, on: bool, binding: &Keybinding, now: Instant) -> KeyActions {
        if on {
            self.press(binding)
        } else {
            self.release(binding, now)
        }
    }

    pub fn press(&mut self, binding: &Keybinding) -> KeyActions {
        let mut actions = KeyActions::new();
        let key = binding.key;

        if self.pressed[key.0 as usize] {
            actions.push(KeyAction::release(key));
            self.pressed_count -= 1;
        }

        for modifier in Modifier::ORDER {
            let wanted = binding.modifiers.get(modifier);
            if self.modifiers.get(modifier) != wanted {
                actions.push(KeyAction {
                    key: modifier.key(),
                    pressed: wanted,
                });
                self.modifiers.set(modifier, wanted);
            }
        }

        actions.push(KeyAction::press(key));
        self.pressed[key.0 as usize] = true;
        self.pressed_count += 1;
        self.idle.cancel();

        actions
    }

    /// Modifiers stay down when the last key is released; only the idle timer or a
    /// later press with different modifiers lets them go.
    pub fn release(&mut self, binding: &Keybinding, now: Instant) -> KeyActions {
        let mut actions = KeyActions::new();
        let key = binding.key;

        if self.pressed[key.0 as usize] {
            actions.push(KeyAction::release(key));
            self.pressed[key.0 as usize] = false;
            self.pressed_count -= 1;
        }

        if self.pressed_count == 0 {
            self.idle.arm(now);
        }

        actions
    }

    /// Release every held modifier in ctrl, alt, shift order. Non-modifier keys are
    /// left alone.
    pub fn release_modifiers(&mut self) -> KeyActions {
        let mut actions = KeyActions::new();
        for modifier in Modifier::ORDER {
            if self.modifiers.get(modifier) {
                actions.push(KeyAction::release(modifier.key()));
                self.modifiers.set(modifier, false);
            }
        }
        actions
    }

    /// Idle expiry hook. Returns the modifier releases if the idle deadline has passed,
    /// an empty batch otherwise.
    pub fn expire_idle(&mut self, now: Instant) -> KeyActions {
        if self.idle.take_expired(now) {
            self.release_modifiers()
        } else {
            KeyActions::new()
        }
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle.deadline()
    }

    pub fn pressed_count(&self) -> usize {
        self.pressed_count
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed[key.0 as usize]
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.pressed
            .iter()
            .enumerate()
            .filter(|(_, down)| **down)
            .map(|(code, _)| KeyCode(code as u8))
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    #[cfg(test)]
    pub(crate) fn skew_pressed_count(&mut self) {
        self.pressed_count += 1;
    }

    /// `pressed_count` must equal the number of pressed keys.
    pub fn verify(&self) -> Result<()> {
        let actual = self.pressed.iter().filter(|down| **down).count();
        if actual != self.pressed_count {
            return Err(Error::InternalConsistency(format!(
                "pressed_count ({}) != pressed keys ({actual})",
                self.pressed_count
            )));
        }
        Ok(())
    }
}

impl fmt::Display for KeyTracker {
    /// `[ Ctrl Shift 'A' 'K' ]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for modifier in Modifier::ORDER {
            if self.modifiers.get(modifier) {
                write!(f, " {}", modifier.key())?;
            }
        }
        for key in self.pressed_keys() {
            write!(f, " {key}")?;
        }
        f.write_str(" ]")
    }
}

impl fmt::Debug for KeyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTracker")
            .field("pressed", &self.pressed_keys().collect::<Vec<_>>())
            .field("pressed_count", &self.pressed_count)
            .field("modifiers", &self.modifiers)
            .field("idle_deadline", &self.idle.deadline())
            .finish()
    }
}
