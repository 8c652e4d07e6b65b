//! Clock abstraction so record timestamps can be injected.
//!
//! Production code uses `RealClock`; tests pin time with `TestClock`.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

use chrono::{DateTime, TimeZone, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current system time.
    fn now_system(&self) -> SystemTime;

    /// Returns the current time as a UTC datetime.
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.now_system())
    }
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock instance.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Clones share the same underlying time, so a handle kept by the test can
/// advance the clock seen by the service under test.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// Milliseconds since the Unix epoch.
    millis: Arc<AtomicI64>,
}

impl TestClock {
    /// Creates a test clock frozen at the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Creates a test clock frozen at `start`.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self { millis: Arc::new(AtomicI64::new(start.timestamp_millis())) }
    }

    /// Creates a test clock frozen at the given epoch milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self { millis: Arc::new(AtomicI64::new(millis)) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, duration: Duration) {
        let delta = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::AcqRel);
    }

    /// Jumps to an arbitrary instant, forwards or backwards.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::Release);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_system(&self) -> SystemTime {
        self.now_utc().into()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_frozen_until_advanced() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = TestClock::at(start);

        assert_eq!(clock.now_utc(), start);
        assert_eq!(clock.now_utc(), start);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now_utc().timestamp_millis(), start.timestamp_millis() + 1500);
    }

    #[test]
    fn clones_share_time() {
        let clock = TestClock::from_millis(0);
        let handle = clock.clone();

        handle.advance(Duration::from_secs(60));
        assert_eq!(clock.now_utc().timestamp_millis(), 60_000);
    }

    #[test]
    fn system_time_matches_utc_reading() {
        let clock = TestClock::from_millis(1_704_067_200_000);
        let system = clock.now_system();
        assert_eq!(DateTime::<Utc>::from(system), clock.now_utc());
    }

    #[test]
    fn set_can_move_backwards() {
        let clock = TestClock::from_millis(10_000);
        clock.set(Utc.timestamp_millis_opt(5_000).unwrap());
        assert_eq!(clock.now_utc().timestamp_millis(), 5_000);
    }
}
