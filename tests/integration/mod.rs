//! Integration test modules for midikey

pub mod control;
pub mod devices;
pub mod engine;
pub mod playback;
