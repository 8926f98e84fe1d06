//! Shared fixtures for midikey integration tests.

#![allow(dead_code)]

use midikey::{
    BindingTable, Controller, MidikeyEngine, RecordingEmitter, StaticCorrection, TimeCorrection,
    VirtualMidi,
};
use std::sync::Arc;
use std::time::Duration;

/// Note 60 → A, note 62 → Ctrl+B, note 64 → Alt+Shift+C.
pub const BINDINGS: &str = r#"{
    "60": {"key": "A"},
    "62": {"key": "B", "ctrl": true},
    "64": {"key": "C", "alt": true, "shift": true}
}"#;

/// Idle release long enough that no test sees it fire unless it waits for it.
pub const LONG_IDLE: Duration = Duration::from_secs(5);

pub struct TestEngine {
    pub engine: Arc<MidikeyEngine>,
    pub keys: RecordingEmitter,
    pub midi: VirtualMidi,
}

impl TestEngine {
    pub fn controller(&self) -> Controller {
        Controller::new(Arc::clone(&self.engine))
    }

    /// Wait until every task queued so far on the keyboard and MIDI actors has run.
    pub fn settle(&self) {
        self.engine.realtime().submit(|_| ()).unwrap();
        self.engine.keyboard().submit(|_| ()).unwrap();
    }
}

pub fn bindings() -> BindingTable {
    BindingTable::from_json(BINDINGS).unwrap()
}

/// One input ("Keys") and two outputs, unsynced clock, long idle.
pub fn test_engine() -> TestEngine {
    test_engine_with(LONG_IDLE, TimeCorrection::UNSYNCED)
}

pub fn test_engine_with(idle: Duration, correction: TimeCorrection) -> TestEngine {
    let keys = RecordingEmitter::new();
    let midi = VirtualMidi::new(&["Keys"], &["Synth A", "Synth B"]);
    let engine = MidikeyEngine::builder()
        .bindings(bindings())
        .idle_duration(idle)
        .emitter(keys.clone())
        .midi_backend(midi.clone())
        .time_service(StaticCorrection::new(correction))
        .build()
        .unwrap();
    TestEngine {
        engine: Arc::new(engine),
        keys,
        midi,
    }
}

/// Standard MIDI File, format 0, 96 ticks per beat at the default 120 BPM
/// (19 ticks ≈ 0.1s): note 60 on at 0, off at ~0.1s; note 62 on at ~0.2s, off at ~0.3s.
pub fn short_smf() -> Vec<u8> {
    let track: &[u8] = &[
        0x00, 0x90, 60, 100, //
        0x13, 0x80, 60, 0, //
        0x13, 0x90, 62, 100, //
        0x13, 0x90, 62, 0, //
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let mut data = b"MThd".to_vec();
    data.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0x00, 0x60]);
    data.extend_from_slice(b"MTrk");
    data.extend_from_slice(&(track.len() as u32).to_be_bytes());
    data.extend_from_slice(track);
    data
}
