//! Control operations: payload validation and response documents.

use crate::helpers::{short_smf, test_engine, test_engine_with, LONG_IDLE};
use midikey::control::VERSION_INFO;
use midikey::TimeCorrection;
use serde_json::json;
use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[test]
fn test_version() {
    let t = test_engine();
    let value = t.controller().dispatch("version", None).unwrap();
    assert_eq!(value, json!({ "version_info": VERSION_INFO }));
    assert!(VERSION_INFO.starts_with("midikey "));
}

#[test]
fn test_unknown_operation_is_bad_request() {
    let t = test_engine();
    let err = t.controller().dispatch("reboot", None).unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_device_selection_documents() {
    let t = test_engine();
    let c = t.controller();

    let value = c.dispatch("midi-output-device", Some("0x1")).unwrap();
    assert_eq!(
        value,
        json!({ "devices": ["Synth A", "Synth B"], "selected": 1 })
    );

    let value = c.dispatch("midi-input-device", None).unwrap();
    assert_eq!(value, json!({ "devices": ["Keys"], "selected": -1 }));

    let value = c.dispatch("midi-output-device", Some("-1")).unwrap();
    assert_eq!(value["selected"], -1);
}

#[test]
fn test_malformed_payloads_leave_state_untouched() {
    let t = test_engine();
    let c = t.controller();
    c.dispatch("midi-output-device", Some("0")).unwrap();
    c.dispatch("midi-output-transpose", Some("5")).unwrap();

    for (operation, payload) in [
        ("midi-output-device", "one"),
        ("midi-input-device", "4294967296"),
        ("midi-output-bank", "16384"),
        ("midi-output-bank", "-1"),
        ("midi-output-patch", "128"),
        ("midi-output-transpose", "-129"),
        ("midi-output-transpose", "1.5"),
        ("midi-playback-track", "65536"),
        ("midi-playback-offset", "NaN"),
        ("scheduler", "{not json"),
        ("scheduler", r#"{"enabled": true, "loop_enabled": true}"#),
        ("scheduler", r#"{"enabled": true, "loop_enabled": true, "loop_interval": 1e30}"#),
        ("scheduler", r#"{"enabled": true, "start_time": 1e19}"#),
        ("time-server", "   "),
    ] {
        let err = c.dispatch(operation, Some(payload)).unwrap_err();
        assert_eq!(err.status_code(), 400, "{operation} {payload:?}");
    }

    assert_eq!(t.engine.output_devices().unwrap().selected, 0);
    assert_eq!(t.engine.transpose().unwrap(), 5);
    assert_eq!(t.engine.bank().unwrap(), 0);
    assert_eq!(t.engine.patch().unwrap(), 0);
    assert_eq!(t.engine.playback_config().unwrap().track, 0);
    assert!(!t.engine.playback_config().unwrap().scheduler.enabled);
}

#[test]
fn test_missing_device_is_unavailable() {
    let t = test_engine();
    let err = t
        .controller()
        .dispatch("midi-input-device", Some("3"))
        .unwrap_err();
    assert_eq!(err.status_code(), 503);
}

#[test]
fn test_output_parameters() {
    let t = test_engine();
    let c = t.controller();

    assert_eq!(
        c.dispatch("midi-output-bank", Some("0x100")).unwrap(),
        json!({ "bank": 256 })
    );
    assert_eq!(
        c.dispatch("midi-output-patch", Some("0o17")).unwrap(),
        json!({ "patch": 15 })
    );
    assert_eq!(
        c.dispatch("midi-output-transpose", Some("-12")).unwrap(),
        json!({ "transpose": -12 })
    );
    assert_eq!(
        c.dispatch("midi-output-transpose", None).unwrap(),
        json!({ "transpose": -12 })
    );
}

#[test]
fn test_current_time_applies_correction() {
    let t = test_engine_with(
        LONG_IDLE,
        TimeCorrection::synced(10.0, Duration::from_millis(20)),
    );
    let value = t.controller().dispatch("current-time", None).unwrap();
    let local = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();

    assert_eq!(value["synced"], true);
    approx::assert_abs_diff_eq!(value["time"].as_f64().unwrap(), local + 10.0, epsilon = 1.0);
    approx::assert_abs_diff_eq!(value["max_deviation"].as_f64().unwrap(), 0.02, epsilon = 1e-9);
}

#[test]
fn test_time_server() {
    let t = test_engine();
    let c = t.controller();
    assert_eq!(c.dispatch("time-server", None).unwrap(), json!({ "server": "" }));
    assert_eq!(
        c.dispatch("time-server", Some("time.example.org")).unwrap(),
        json!({ "server": "time.example.org" })
    );
}

#[test]
fn test_playback_file_track_and_offset() {
    let t = test_engine();
    let c = t.controller();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&short_smf()).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    assert_eq!(c.dispatch("midi-playback-file", Some(&path)).unwrap(), json!({}));
    assert_eq!(
        c.dispatch("midi-playback-track", Some("0")).unwrap(),
        json!({ "track": 0 })
    );
    assert_eq!(
        c.dispatch("midi-playback-track", Some("1")).unwrap_err().status_code(),
        400
    );
    assert_eq!(
        c.dispatch("midi-playback-offset", Some("-0.25")).unwrap(),
        json!({ "offset": -0.25 })
    );

    assert_eq!(
        c.dispatch("midi-playback-file", None).unwrap_err().status_code(),
        400
    );
    assert!(c
        .dispatch("midi-playback-file", Some("/nonexistent/take.mid"))
        .is_err());
}

#[test]
fn test_garbage_file_keeps_previous_recording() {
    let t = test_engine();
    let c = t.controller();
    c.playback_file(short_smf().as_slice()).unwrap();

    let err = c.playback_file(&b"not a midi file"[..]).unwrap_err();
    assert_ne!(err.status_code(), 400);
    let track_count = t
        .engine
        .playback()
        .submit(|p| p.recording().map(|r| r.track_count()))
        .unwrap();
    assert_eq!(track_count, Some(1));
}

#[test]
fn test_scheduler_document() {
    let t = test_engine();
    let c = t.controller();

    assert_eq!(
        c.dispatch("scheduler", None).unwrap(),
        json!({
            "enabled": false,
            "start_time": null,
            "loop_enabled": false,
            "loop_interval": 0.0
        })
    );

    let start = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
        + 3600.0;
    let payload = json!({
        "enabled": true,
        "start_time": start,
        "loop_enabled": true,
        "loop_interval": 90.0
    })
    .to_string();
    let value = c.dispatch("scheduler", Some(&payload)).unwrap();
    assert_eq!(value["enabled"], true);
    assert_eq!(value["loop_interval"], 90.0);
    approx::assert_abs_diff_eq!(value["start_time"].as_f64().unwrap(), start, epsilon = 1e-3);
}
