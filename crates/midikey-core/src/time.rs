//! Wall-clock correction against a reference time source.
//!
//! The measurement protocol lives behind [`TimeCorrectionService`]; this module only
//! defines the snapshot it produces and the arithmetic that turns a corrected
//! wall-clock instant into a local deadline.

use crate::actor::Resource;
use crate::error::{Error, Result};
use serde::Serialize;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::info;

/// Offset between the local clock and the reference clock.
///
/// `corrected = local + offset`. The offset is signed, so it is kept as nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeCorrection {
    pub synced: bool,
    pub offset_nanos: i64,
    pub max_deviation: Duration,
}

impl TimeCorrection {
    pub const UNSYNCED: TimeCorrection = TimeCorrection {
        synced: false,
        offset_nanos: 0,
        max_deviation: Duration::ZERO,
    };

    pub fn synced(offset_secs: f64, max_deviation: Duration) -> Self {
        Self {
            synced: true,
            offset_nanos: (offset_secs * 1e9) as i64,
            max_deviation,
        }
    }

    pub fn offset_secs(&self) -> f64 {
        self.offset_nanos as f64 * 1e-9
    }

    /// Local wall-clock time → reference time.
    pub fn to_corrected(&self, local: SystemTime) -> SystemTime {
        shift_system_time(local, self.offset_nanos)
    }

    /// Reference time → local wall-clock time. An explicit start at corrected time `T`
    /// happens at local time `T - offset`.
    pub fn to_local(&self, corrected: SystemTime) -> SystemTime {
        shift_system_time(corrected, self.offset_nanos.saturating_neg())
    }
}

/// Supplies the current correction. Implementations own the measurement protocol.
pub trait TimeCorrectionService: Send {
    fn current_offset(&self) -> TimeCorrection;

    /// Re-measure against `server`. Runs on the time-sync actor and may block.
    fn resync(&mut self, server: &str) -> Result<()>;
}

/// Fixed correction, for setups where the offset is known or irrelevant.
#[derive(Debug, Clone, Default)]
pub struct StaticCorrection {
    correction: TimeCorrection,
}

impl StaticCorrection {
    /// Reports unsynced with zero offset.
    pub fn unsynced() -> Self {
        Self::default()
    }

    pub fn new(correction: TimeCorrection) -> Self {
        Self { correction }
    }
}

impl TimeCorrectionService for StaticCorrection {
    fn current_offset(&self) -> TimeCorrection {
        self.correction
    }

    fn resync(&mut self, server: &str) -> Result<()> {
        if server.trim().is_empty() {
            return Err(Error::TimeSync("empty time server address".into()));
        }
        Ok(())
    }
}

/// Time-sync actor state: the correction service and the server it last synced with.
pub struct TimeSync {
    service: Box<dyn TimeCorrectionService>,
    server: Option<String>,
}

impl TimeSync {
    pub fn new(service: Box<dyn TimeCorrectionService>) -> Self {
        Self {
            service,
            server: None,
        }
    }

    pub fn current(&self) -> TimeCorrection {
        self.service.current_offset()
    }

    /// Corrected clock as of now.
    pub fn now(&self) -> CorrectedTime {
        CorrectedTime::at(SystemTime::now(), &self.current())
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Re-measure against `server`. The name is kept only when the resync succeeds.
    pub fn set_server(&mut self, server: &str) -> Result<()> {
        let server = server.trim();
        self.service.resync(server)?;
        info!(server, offset_secs = self.current().offset_secs(), "time synced");
        self.server = Some(server.to_string());
        Ok(())
    }
}

impl Resource for TimeSync {}

/// Paired monotonic and wall-clock reading taken at the same moment.
///
/// Schedulers take one of these instead of calling the clocks themselves, which keeps
/// their arithmetic deterministic under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub mono: Instant,
    pub wall: SystemTime,
}

impl Timestamp {
    pub fn now() -> Self {
        Self {
            mono: Instant::now(),
            wall: SystemTime::now(),
        }
    }

    pub fn new(mono: Instant, wall: SystemTime) -> Self {
        Self { mono, wall }
    }

    /// Monotonic instant at which the local wall clock reads `wall`. Instants already in
    /// the past, or too far ahead for the monotonic clock, come back as `self.mono`.
    pub fn instant_at(&self, wall: SystemTime) -> Instant {
        wall.duration_since(self.wall)
            .ok()
            .and_then(|ahead| self.mono.checked_add(ahead))
            .unwrap_or(self.mono)
    }

    /// Whether the local wall clock has already passed `wall`.
    pub fn is_past(&self, wall: SystemTime) -> bool {
        wall <= self.wall
    }
}

/// Unix seconds → `SystemTime`. Negative values clamp to the epoch; `None` for NaN or
/// values the platform clock cannot represent.
pub fn checked_system_time_from_unix(secs: f64) -> Option<SystemTime> {
    if secs.is_nan() {
        return None;
    }
    if secs <= 0.0 {
        return Some(UNIX_EPOCH);
    }
    UNIX_EPOCH.checked_add(Duration::try_from_secs_f64(secs).ok()?)
}

/// Like [`checked_system_time_from_unix`], with unrepresentable values clamped to the epoch.
pub fn system_time_from_unix(secs: f64) -> SystemTime {
    checked_system_time_from_unix(secs).unwrap_or(UNIX_EPOCH)
}

/// `SystemTime` → unix seconds (negative before the epoch).
pub fn unix_from_system_time(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// `instant + nanos`, where `nanos` may be negative.
pub fn shift_instant(instant: Instant, nanos: i64) -> Instant {
    let magnitude = Duration::from_nanos(nanos.unsigned_abs());
    if nanos >= 0 {
        instant.checked_add(magnitude).unwrap_or(instant)
    } else {
        instant.checked_sub(magnitude).unwrap_or(instant)
    }
}

fn shift_system_time(time: SystemTime, nanos: i64) -> SystemTime {
    let magnitude = Duration::from_nanos(nanos.unsigned_abs());
    if nanos >= 0 {
        time.checked_add(magnitude).unwrap_or(time)
    } else {
        time.checked_sub(magnitude).unwrap_or(UNIX_EPOCH)
    }
}

/// Serializable view of the corrected clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectedTime {
    pub synced: bool,
    /// Corrected unix seconds.
    pub time: f64,
    /// Seconds.
    pub max_deviation: f64,
}

impl CorrectedTime {
    pub fn at(local: SystemTime, correction: &TimeCorrection) -> Self {
        Self {
            synced: correction.synced,
            time: unix_from_system_time(correction.to_corrected(local)),
            max_deviation: correction.max_deviation.as_secs_f64(),
        }
    }
}
