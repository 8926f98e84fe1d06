//! Scheduled playback of a loaded MIDI file through the keyboard.

use crate::helpers::{short_smf, test_engine, test_engine_with, LONG_IDLE};
use midikey::core::time::system_time_from_unix;
use midikey::{KeyAction, KeyCode, SchedulerSettings, TimeCorrection};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn one_take() -> Vec<KeyAction> {
    vec![
        KeyAction::press(KeyCode(b'A')),
        KeyAction::release(KeyCode(b'A')),
        KeyAction::press(KeyCode::CTRL),
        KeyAction::press(KeyCode(b'B')),
        KeyAction::release(KeyCode(b'B')),
    ]
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

#[test]
fn test_enabled_scheduler_plays_file_now() {
    let t = test_engine();
    t.engine.load_recording(short_smf().as_slice()).unwrap();
    assert!(t.engine.phase().unwrap().is_idle());

    t.engine
        .set_scheduler(SchedulerSettings {
            enabled: true,
            ..Default::default()
        })
        .unwrap();
    thread::sleep(Duration::from_millis(600));

    assert_eq!(t.keys.actions(), one_take());
    assert!(t.engine.phase().unwrap().is_idle());
}

#[test]
fn test_start_time_is_in_corrected_clock() {
    // The reference clock runs 10s ahead of the local one.
    let t = test_engine_with(LONG_IDLE, TimeCorrection::synced(10.0, Duration::ZERO));
    t.engine.load_recording(short_smf().as_slice()).unwrap();

    t.engine
        .set_scheduler(SchedulerSettings {
            enabled: true,
            start_time: Some(system_time_from_unix(unix_now() + 10.3)),
            ..Default::default()
        })
        .unwrap();

    thread::sleep(Duration::from_millis(100));
    assert!(t.engine.phase().unwrap().is_armed());
    assert!(t.keys.actions().is_empty());

    thread::sleep(Duration::from_millis(800));
    assert_eq!(t.keys.actions(), one_take());
}

#[test]
fn test_disabling_scheduler_cancels_pending_start() {
    let t = test_engine();
    t.engine.load_recording(short_smf().as_slice()).unwrap();
    let scheduled = SchedulerSettings {
        enabled: true,
        start_time: Some(system_time_from_unix(unix_now() + 0.2)),
        ..Default::default()
    };
    t.engine.set_scheduler(scheduled).unwrap();
    t.engine
        .set_scheduler(SchedulerSettings {
            enabled: false,
            ..scheduled
        })
        .unwrap();

    thread::sleep(Duration::from_millis(500));
    assert!(t.keys.actions().is_empty());
    assert!(t.engine.phase().unwrap().is_idle());
}

#[test]
fn test_loop_replays_each_interval() {
    let t = test_engine();
    t.engine.load_recording(short_smf().as_slice()).unwrap();
    t.engine
        .set_scheduler(SchedulerSettings {
            enabled: true,
            loop_enabled: true,
            loop_interval: Duration::from_millis(600),
            ..Default::default()
        })
        .unwrap();

    thread::sleep(Duration::from_millis(1050));
    t.engine
        .set_scheduler(SchedulerSettings::default())
        .unwrap();

    let presses_of_a = t
        .keys
        .actions()
        .into_iter()
        .filter(|a| *a == KeyAction::press(KeyCode(b'A')))
        .count();
    assert_eq!(presses_of_a, 2);
}

#[test]
fn test_reconfiguring_mid_run_releases_held_note() {
    let t = test_engine();
    t.engine.load_recording(short_smf().as_slice()).unwrap();
    t.engine
        .set_scheduler(SchedulerSettings {
            enabled: true,
            ..Default::default()
        })
        .unwrap();

    // Note 60 is down between 0s and ~0.1s.
    thread::sleep(Duration::from_millis(40));
    t.engine.set_offset(5.0).unwrap();
    t.settle();

    assert_eq!(
        t.keys.actions(),
        vec![
            KeyAction::press(KeyCode(b'A')),
            KeyAction::release(KeyCode(b'A')),
        ]
    );
    assert!(!t.engine.phase().unwrap().is_idle());
}
