//! Engine lifecycle and live note translation.

use crate::helpers::{bindings, test_engine, test_engine_with};
use midikey::{
    CancelToken, KeyAction, KeyCode, MidikeyEngine, NoteEvent, RecordingEmitter, TimeCorrection,
    VirtualMidi,
};
use std::thread;
use std::time::Duration;

fn key(c: u8) -> KeyCode {
    KeyCode(c)
}

#[test]
fn test_handle_note_emits_bound_keys() {
    let t = test_engine();
    t.engine.handle_note(NoteEvent::on(62)).unwrap();
    t.engine.handle_note(NoteEvent::off(62)).unwrap();
    t.engine.handle_note(NoteEvent::on(60)).unwrap();

    assert_eq!(
        t.keys.actions(),
        vec![
            KeyAction::press(KeyCode::CTRL),
            KeyAction::press(key(b'B')),
            KeyAction::release(key(b'B')),
            KeyAction::release(KeyCode::CTRL),
            KeyAction::press(key(b'A')),
        ]
    );
}

#[test]
fn test_unbound_note_is_ignored() {
    let t = test_engine();
    t.engine.handle_note(NoteEvent::on(20)).unwrap();
    t.engine.handle_note(NoteEvent::off(20)).unwrap();
    assert!(t.keys.actions().is_empty());
}

#[test]
fn test_modifiers_released_after_idle() {
    let t = test_engine_with(Duration::from_millis(50), TimeCorrection::UNSYNCED);
    t.engine.handle_note(NoteEvent::on(64)).unwrap();
    t.engine.handle_note(NoteEvent::off(64)).unwrap();

    thread::sleep(Duration::from_millis(300));

    assert_eq!(
        t.keys.actions(),
        vec![
            KeyAction::press(KeyCode::ALT),
            KeyAction::press(KeyCode::SHIFT),
            KeyAction::press(key(b'C')),
            KeyAction::release(key(b'C')),
            KeyAction::release(KeyCode::ALT),
            KeyAction::release(KeyCode::SHIFT),
        ]
    );
}

#[test]
fn test_idle_cancelled_by_new_press() {
    let t = test_engine_with(Duration::from_millis(150), TimeCorrection::UNSYNCED);
    t.engine.handle_note(NoteEvent::on(62)).unwrap();
    t.engine.handle_note(NoteEvent::off(62)).unwrap();
    thread::sleep(Duration::from_millis(50));
    t.engine.handle_note(NoteEvent::on(62)).unwrap();
    thread::sleep(Duration::from_millis(250));

    // Ctrl is still down: the key is held, so no idle release is pending.
    assert_eq!(
        t.keys.actions(),
        vec![
            KeyAction::press(KeyCode::CTRL),
            KeyAction::press(key(b'B')),
            KeyAction::release(key(b'B')),
            KeyAction::press(key(b'B')),
        ]
    );
}

#[test]
fn test_shutdown_cancels_requests() {
    let t = test_engine();
    t.engine.shutdown();
    t.engine.join();

    assert!(t.engine.wait().is_ok());
    let err = t.engine.handle_note(NoteEvent::on(60)).unwrap_err();
    assert!(err.is_canceled());
    assert_eq!(err.status_code(), 503);
}

#[test]
fn test_wait_reports_cause_of_fatal_stop() {
    let t = test_engine();
    t.engine
        .token()
        .cancel_with_cause("key 0x41 asserted twice");

    let err = t.engine.wait().unwrap_err();
    assert!(err.to_string().contains("asserted twice"));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_parent_token_stops_engine() {
    let parent = CancelToken::new();
    let keys = RecordingEmitter::new();
    let engine = MidikeyEngine::builder()
        .bindings(bindings())
        .emitter(keys.clone())
        .midi_backend(VirtualMidi::default())
        .parent(&parent)
        .build()
        .unwrap();

    engine.handle_note(NoteEvent::on(60)).unwrap();
    parent.cancel();
    assert!(engine.wait().is_ok());
    assert!(engine.handle_note(NoteEvent::off(60)).is_err());
    assert_eq!(keys.actions(), vec![KeyAction::press(key(b'A'))]);
}

#[test]
fn test_invalid_config_rejected_at_build() {
    let result = MidikeyEngine::builder()
        .bindings(bindings())
        .idle_duration(Duration::ZERO)
        .build();
    assert!(result.is_err());
}

#[test]
fn test_initial_time_server_is_synced_at_build() {
    let engine = MidikeyEngine::builder()
        .bindings(bindings())
        .midi_backend(VirtualMidi::default())
        .time_server("pool.ntp.org")
        .build()
        .unwrap();
    assert_eq!(engine.time_server().unwrap().as_deref(), Some("pool.ntp.org"));
}
