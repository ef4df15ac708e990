use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of wall-clock time for every time-sensitive component in the stack: WebSocket
/// heartbeats, reconnect backoff, idempotency-key bucketing and the midnight-UTC daily
/// drawdown reset all read `now()` through this trait rather than calling `Utc::now()`
/// directly, so tests can drive them with a deterministic, seekable clock.
pub trait EngineClock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time, backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveClock;

impl EngineClock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is fixed until explicitly advanced, for deterministic tests of
/// reconnect backoff, rate-limit windows and the daily drawdown reset.
#[derive(Debug, Clone)]
pub struct TestClock {
    micros: Arc<AtomicI64>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            micros: Arc::new(AtomicI64::new(start.timestamp_micros())),
        }
    }

    pub fn advance(&self, delta: ChronoDuration) {
        self.micros.fetch_add(
            delta.num_microseconds().expect("duration overflowed i64 micros"),
            Ordering::SeqCst,
        );
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.micros.store(at.timestamp_micros(), Ordering::SeqCst);
    }
}

impl EngineClock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst))
            .expect("TestClock micros always round-trip")
    }
}

/// The start of the UTC day containing `at`, used to detect whether the daily drawdown
/// tracker needs to roll over to a fresh trading day.
pub fn utc_day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clock_advances_monotonically() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let clock = TestClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(ChronoDuration::seconds(30));
        assert_eq!(clock.now(), start + ChronoDuration::seconds(30));
    }

    #[test]
    fn utc_day_start_truncates_to_midnight() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
        let start = utc_day_start(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_boundary_crossing_is_detected_via_inequality() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 23, 0, 0).unwrap();
        let clock = TestClock::new(start);
        let day0 = utc_day_start(clock.now());

        clock.advance(ChronoDuration::hours(2));
        let day1 = utc_day_start(clock.now());

        assert_ne!(day0, day1);
    }
}
