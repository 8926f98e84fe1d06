//! MIDI device selection, live input routing and thru.

use crate::helpers::test_engine;
use midikey::midi::MidiOutputMessage;
use midikey::{KeyAction, KeyCode};

#[test]
fn test_device_lists_start_unselected() {
    let t = test_engine();
    let inputs = t.engine.input_devices().unwrap();
    assert_eq!(inputs.selected, -1);
    assert_eq!(inputs.devices.len(), 1);
    assert_eq!(inputs.devices[0].name, "Keys");

    let outputs = t.engine.output_devices().unwrap();
    assert_eq!(outputs.selected, -1);
    assert_eq!(outputs.devices.len(), 2);
}

#[test]
fn test_live_input_reaches_keyboard() {
    let t = test_engine();
    t.engine.select_input(0).unwrap();
    assert!(t.midi.is_input_open(0));

    assert!(t.midi.inject(0, &[0x90, 60, 100]));
    assert!(t.midi.inject(0, &[0x90, 60, 0]));
    // Not a note: ignored.
    assert!(t.midi.inject(0, &[0xB0, 7, 100]));
    t.settle();

    assert_eq!(
        t.keys.actions(),
        vec![
            KeyAction::press(KeyCode(b'A')),
            KeyAction::release(KeyCode(b'A')),
        ]
    );
}

#[test]
fn test_closed_input_delivers_nothing() {
    let t = test_engine();
    t.engine.select_input(0).unwrap();
    t.engine.select_input(-1).unwrap();

    assert!(!t.midi.inject(0, &[0x90, 60, 100]));
    t.settle();
    assert!(t.keys.actions().is_empty());
    assert_eq!(t.engine.input_devices().unwrap().selected, -1);
}

#[test]
fn test_thru_forwards_transposed_notes() {
    let t = test_engine();
    t.engine.select_input(0).unwrap();
    t.engine.select_output(1).unwrap();
    t.engine.set_transpose(-12).unwrap();
    t.midi.clear_sent();

    t.midi.inject(0, &[0x90, 60, 100]);
    t.midi.inject(0, &[0x80, 60, 64]);
    t.settle();

    assert_eq!(
        t.midi.sent(1),
        vec![
            MidiOutputMessage::note_on(0, 48, 100),
            MidiOutputMessage::note_off(0, 48, 64),
        ]
    );
    // Keystrokes use the untransposed note.
    assert_eq!(t.keys.actions()[0], KeyAction::press(KeyCode(b'A')));
}

#[test]
fn test_failed_selection_keeps_previous_device() {
    let t = test_engine();
    t.engine.select_output(0).unwrap();

    let err = t.engine.select_output(5).unwrap_err();
    assert_eq!(err.status_code(), 503);
    assert_eq!(t.engine.output_devices().unwrap().selected, 0);
    assert!(t.midi.is_output_open(0));

    let err = t.engine.select_input(-3).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(t.engine.input_devices().unwrap().selected, -1);
}

#[test]
fn test_switching_output_moves_program() {
    let t = test_engine();
    t.engine.set_bank(2);
    t.engine.set_patch(10);
    t.engine.select_output(0).unwrap();
    t.engine.select_output(1).unwrap();

    assert!(!t.midi.is_output_open(0));
    assert!(t.midi.is_output_open(1));
    assert_eq!(
        t.midi.sent(1),
        vec![
            MidiOutputMessage::control_change(0, 0, 0),
            MidiOutputMessage::control_change(0, 32, 2),
            MidiOutputMessage::program_change(0, 10),
        ]
    );
}

#[test]
fn test_bank_and_patch_are_queued_in_order() {
    let t = test_engine();
    t.engine.select_output(0).unwrap();
    t.midi.clear_sent();

    t.engine.set_patch(3);
    t.engine.set_bank(129);
    assert_eq!(t.engine.patch().unwrap(), 3);
    assert_eq!(t.engine.bank().unwrap(), 129);

    assert_eq!(
        t.midi.sent(0),
        vec![
            MidiOutputMessage::program_change(0, 3),
            MidiOutputMessage::control_change(0, 0, 1),
            MidiOutputMessage::control_change(0, 32, 1),
            MidiOutputMessage::program_change(0, 3),
        ]
    );
}
