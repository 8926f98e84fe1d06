//! Single-shot, resettable idle deadline.

use std::time::{Duration, Instant};

/// Deadline armed when the last held key is released and cancelled by the next press.
///
/// Only one deadline exists at a time: arming again replaces it, so any number of
/// cancel/re-arm cycles before expiry still yields a single expiry at the final deadline.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    duration: Duration,
    deadline: Option<Instant>,
}

impl IdleTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.duration);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_once() {
        let start = Instant::now();
        let mut timer = IdleTimer::new(Duration::from_millis(100));
        timer.arm(start);

        assert!(!timer.take_expired(start + Duration::from_millis(99)));
        assert!(timer.take_expired(start + Duration::from_millis(100)));
        assert!(!timer.take_expired(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_rearm_moves_deadline() {
        let start = Instant::now();
        let mut timer = IdleTimer::new(Duration::from_millis(100));
        timer.arm(start);
        timer.cancel();
        timer.arm(start + Duration::from_millis(50));

        assert!(!timer.take_expired(start + Duration::from_millis(120)));
        assert!(timer.take_expired(start + Duration::from_millis(150)));
    }

    #[test]
    fn test_cancelled_timer_never_expires() {
        let start = Instant::now();
        let mut timer = IdleTimer::new(Duration::from_millis(10));
        timer.arm(start);
        timer.cancel();
        assert!(!timer.is_armed());
        assert!(!timer.take_expired(start + Duration::from_secs(10)));
    }
}
