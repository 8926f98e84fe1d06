//! Scheduler phases and start-time arithmetic.

use crate::error::{Error, Result};
use crate::time::{TimeCorrection, Timestamp};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Longest accepted loop interval (one year).
pub const MAX_LOOP_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Latest accepted start time, in unix seconds (the year 2286).
pub const MAX_START_UNIX_SECS: u64 = 10_000_000_000;

/// `Idle → Armed → Running → (Idle | Armed)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Disabled, or nothing to play.
    #[default]
    Idle,
    /// Waiting for `start`.
    Armed { start: Instant },
    /// Replaying; `cursor` is the next event to deliver.
    Running { started: Instant, cursor: usize },
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, Phase::Armed { .. })
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Phase::Running { .. })
    }
}

/// When and how often to start the selected track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub enabled: bool,
    /// Absolute start on the corrected clock. `None` starts as soon as enabled.
    pub start_time: Option<SystemTime>,
    pub loop_enabled: bool,
    pub loop_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: None,
            loop_enabled: false,
            loop_interval: Duration::from_secs(60),
        }
    }
}

impl SchedulerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.loop_enabled && self.loop_interval.is_zero() {
            return Err(Error::Validation(
                "loop_interval must be greater than zero when looping".into(),
            ));
        }
        if self.loop_interval > MAX_LOOP_INTERVAL {
            return Err(Error::Validation(format!(
                "loop_interval {:?} exceeds {:?}",
                self.loop_interval, MAX_LOOP_INTERVAL
            )));
        }
        if let Some(start) = self.start_time {
            let limit = UNIX_EPOCH + Duration::from_secs(MAX_START_UNIX_SECS);
            if start > limit {
                return Err(Error::Validation(format!(
                    "start_time beyond unix second {MAX_START_UNIX_SECS}"
                )));
            }
        }
        Ok(())
    }

    /// Local start instant for a freshly armed scheduler.
    ///
    /// The correction is read once here; later drift does not move the result.
    pub fn first_start(&self, correction: &TimeCorrection, now: Timestamp) -> Instant {
        let Some(start_time) = self.start_time else {
            return now.mono;
        };

        let local = correction.to_local(start_time);
        if !now.is_past(local) {
            return now.instant_at(local);
        }

        if self.loop_enabled {
            // Join the loop at its next boundary instead of replaying late.
            let behind = now.wall.duration_since(local).unwrap_or(Duration::ZERO);
            let skip = periods_to_cover(behind, self.loop_interval);
            let boundary = local
                .checked_add(mul_duration(self.loop_interval, skip))
                .unwrap_or(now.wall);
            return now.instant_at(boundary);
        }

        warn!("start time already passed, starting immediately");
        now.mono
    }

    /// Start of the run following one that began at `last_start`. Boundaries that have
    /// already gone by (a sequence longer than the interval) are skipped.
    pub fn next_loop_start(&self, last_start: Instant, now: Instant) -> Instant {
        let Some(next) = last_start.checked_add(self.loop_interval) else {
            return now;
        };
        if next >= now {
            return next;
        }
        let behind = now - next;
        let skip = periods_to_cover(behind, self.loop_interval);
        warn!(skipped = skip, "sequence overran the loop interval");
        next.checked_add(mul_duration(self.loop_interval, skip))
            .unwrap_or(now)
    }
}

/// Smallest `k` with `k * period >= span`.
fn periods_to_cover(span: Duration, period: Duration) -> u64 {
    let period = period.as_nanos().max(1);
    let k = span.as_nanos().div_ceil(period);
    u64::try_from(k).unwrap_or(u64::MAX)
}

fn mul_duration(d: Duration, k: u64) -> Duration {
    let nanos = d.as_nanos().saturating_mul(k as u128);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
