//! Injectable time source
//!
//! Duration gates and wait deadlines compare against timestamps, never sleep,
//! so tests drive time with [`ManualClock`] instead of waiting.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// A source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A controllable clock for deterministic tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a manual clock starting at the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a manual clock starting at a specific time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(RwLock::new(time)),
        }
    }

    /// Set the current time
    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = time;
    }

    /// Advance time by a duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current += duration;
    }

    /// Advance time by seconds
    pub fn advance_seconds(&self, seconds: i64) {
        self.advance(Duration::seconds(seconds));
    }

    /// Advance time by minutes
    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }

    /// Advance time by hours
    pub fn advance_hours(&self, hours: i64) {
        self.advance(Duration::hours(hours));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let initial = clock.now();

        clock.advance_seconds(60);
        assert_eq!((clock.now() - initial).num_seconds(), 60);
    }

    #[test]
    fn test_manual_clock_at_and_set() {
        let fixed = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::at(fixed);
        assert_eq!(clock.now(), fixed);

        clock.advance_hours(1);
        assert_eq!(clock.now().hour(), 1);

        let later = Utc.with_ymd_and_hms(2025, 6, 15, 12, 30, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_clones_share_time() {
        let clock = ManualClock::new();
        let shared: SharedClock = Arc::new(clock.clone());

        clock.advance_minutes(5);
        assert_eq!(shared.now(), clock.now());
    }
}
