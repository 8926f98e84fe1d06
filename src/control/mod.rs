//! Control operations.
//!
//! [`Controller`] validates raw request payloads and turns them into actor requests on
//! the engine. Every operation returns a serializable document describing the state
//! after the request. `None` as payload only reads.
//!
//! Payloads are parsed before any actor is touched, so malformed input never reaches
//! engine state.

pub mod parse;

use crate::realtime::DeviceSelection;
use crate::{MidikeyEngine, Result};
use midikey_core::time::{checked_system_time_from_unix, unix_from_system_time};
use midikey_core::{CorrectedTime, Error as CoreError, SchedulerSettings};
use midikey_midi_io::io::device_names;
use parse::{parse_float, parse_int, parse_uint};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

pub const VERSION_INFO: &str = concat!("midikey ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Devices {
    pub devices: Vec<String>,
    pub selected: i32,
}

impl From<DeviceSelection> for Devices {
    fn from(selection: DeviceSelection) -> Self {
        Self {
            devices: device_names(&selection.devices),
            selected: selection.selected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bank {
    pub bank: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub patch: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transpose {
    pub transpose: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeServer {
    pub server: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Track {
    pub track: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Offset {
    pub offset: f64,
}

/// Scheduler settings as exchanged with clients. Times are unix seconds, intervals
/// seconds. Missing fields read as zero/false/null.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerDocument {
    pub enabled: bool,
    pub start_time: Option<f64>,
    pub loop_enabled: bool,
    pub loop_interval: f64,
}

impl TryFrom<SchedulerDocument> for SchedulerSettings {
    type Error = CoreError;

    fn try_from(doc: SchedulerDocument) -> std::result::Result<Self, CoreError> {
        let loop_interval = Duration::try_from_secs_f64(doc.loop_interval).map_err(|_| {
            CoreError::Validation(format!(
                "loop_interval {} is not a valid number of seconds",
                doc.loop_interval
            ))
        })?;
        let start_time = doc
            .start_time
            .map(|start| {
                start
                    .is_finite()
                    .then(|| checked_system_time_from_unix(start))
                    .flatten()
                    .ok_or_else(|| {
                        CoreError::Validation(format!("start_time {start} is not a valid time"))
                    })
            })
            .transpose()?;
        let settings = SchedulerSettings {
            enabled: doc.enabled,
            start_time,
            loop_enabled: doc.loop_enabled,
            loop_interval,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl From<SchedulerSettings> for SchedulerDocument {
    fn from(settings: SchedulerSettings) -> Self {
        Self {
            enabled: settings.enabled,
            start_time: settings.start_time.map(unix_from_system_time),
            loop_enabled: settings.loop_enabled,
            loop_interval: settings.loop_interval.as_secs_f64(),
        }
    }
}

/// Transport-free request handling on top of a [`MidikeyEngine`].
#[derive(Clone)]
pub struct Controller {
    engine: Arc<MidikeyEngine>,
}

impl Controller {
    pub fn new(engine: Arc<MidikeyEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &MidikeyEngine {
        &self.engine
    }

    pub fn version(&self) -> VersionInfo {
        VersionInfo {
            version_info: VERSION_INFO.to_string(),
        }
    }

    pub fn input_device(&self, payload: Option<&str>) -> Result<Devices> {
        if let Some(payload) = payload {
            let index = parse_int(payload, 32)? as i32;
            self.engine.select_input(index)?;
        }
        Ok(self.engine.input_devices()?.into())
    }

    pub fn output_device(&self, payload: Option<&str>) -> Result<Devices> {
        if let Some(payload) = payload {
            let index = parse_int(payload, 32)? as i32;
            self.engine.select_output(index)?;
        }
        Ok(self.engine.output_devices()?.into())
    }

    /// Best-effort: the write is queued and its failure only logged.
    pub fn output_bank(&self, payload: Option<&str>) -> Result<Bank> {
        if let Some(payload) = payload {
            self.engine.set_bank(parse_uint(payload, 14)? as u16);
        }
        Ok(Bank {
            bank: self.engine.bank()?,
        })
    }

    /// Best-effort: the write is queued and its failure only logged.
    pub fn output_patch(&self, payload: Option<&str>) -> Result<Patch> {
        if let Some(payload) = payload {
            self.engine.set_patch(parse_uint(payload, 7)? as u8);
        }
        Ok(Patch {
            patch: self.engine.patch()?,
        })
    }

    pub fn output_transpose(&self, payload: Option<&str>) -> Result<Transpose> {
        if let Some(payload) = payload {
            self.engine.set_transpose(parse_int(payload, 8)? as i8)?;
        }
        Ok(Transpose {
            transpose: self.engine.transpose()?,
        })
    }

    pub fn current_time(&self) -> Result<CorrectedTime> {
        self.engine.current_time()
    }

    pub fn time_server(&self, payload: Option<&str>) -> Result<TimeServer> {
        if let Some(server) = payload {
            if server.trim().is_empty() {
                return Err(CoreError::Validation("empty time server".into()).into());
            }
            self.engine.set_time_server(server)?;
        }
        Ok(TimeServer {
            server: self.engine.time_server()?.unwrap_or_default(),
        })
    }

    pub fn playback_file(&self, file: impl Read) -> Result<Empty> {
        self.engine.load_recording(file)?;
        Ok(Empty {})
    }

    pub fn playback_track(&self, payload: Option<&str>) -> Result<Track> {
        if let Some(payload) = payload {
            self.engine.set_track(parse_uint(payload, 16)? as u16)?;
        }
        Ok(Track {
            track: self.engine.playback_config()?.track,
        })
    }

    pub fn playback_offset(&self, payload: Option<&str>) -> Result<Offset> {
        if let Some(payload) = payload {
            self.engine.set_offset(parse_float(payload)?)?;
        }
        Ok(Offset {
            offset: self.engine.playback_config()?.offset_secs(),
        })
    }

    pub fn scheduler(&self, payload: Option<&str>) -> Result<SchedulerDocument> {
        if let Some(payload) = payload {
            let doc: SchedulerDocument = serde_json::from_str(payload)
                .map_err(|e| CoreError::Validation(format!("invalid scheduler document: {e}")))?;
            self.engine.set_scheduler(doc.try_into()?)?;
        }
        Ok(self.engine.playback_config()?.scheduler.into())
    }

    /// Run one operation by name and serialize its response. For `midi-playback-file`
    /// the payload is a path to read.
    pub fn dispatch(&self, operation: &str, payload: Option<&str>) -> Result<serde_json::Value> {
        let value = match operation {
            "version" => to_value(self.version()),
            "midi-input-device" => to_value(self.input_device(payload)?),
            "midi-output-device" => to_value(self.output_device(payload)?),
            "midi-output-bank" => to_value(self.output_bank(payload)?),
            "midi-output-patch" => to_value(self.output_patch(payload)?),
            "midi-output-transpose" => to_value(self.output_transpose(payload)?),
            "current-time" => to_value(self.current_time()?),
            "time-server" => to_value(self.time_server(payload)?),
            "midi-playback-file" => {
                let path = payload.map(str::trim).unwrap_or_default();
                if path.is_empty() {
                    return Err(CoreError::Validation("file path required".into()).into());
                }
                to_value(self.playback_file(std::fs::File::open(path)?)?)
            }
            "midi-playback-track" => to_value(self.playback_track(payload)?),
            "midi-playback-offset" => to_value(self.playback_offset(payload)?),
            "scheduler" => to_value(self.scheduler(payload)?),
            other => {
                return Err(CoreError::Validation(format!("unknown operation {other:?}")).into())
            }
        };
        Ok(value?)
    }
}

fn to_value(value: impl Serialize) -> std::result::Result<serde_json::Value, CoreError> {
    serde_json::to_value(value).map_err(|e| CoreError::InternalConsistency(e.to_string()))
}
