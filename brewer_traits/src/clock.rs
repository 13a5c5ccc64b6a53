use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Clock abstraction for pacing and timestamps across the stack.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - unix_time(): wall-clock seconds since the Unix epoch, used for status
///   timestamps and order log names
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Wall-clock seconds since the Unix epoch (fractional).
    fn unix_time(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Default, real-time clock backed by std::time.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic clock whose time can be advanced manually.
    ///
    /// now() = origin + offset
    /// unix_time() = unix_origin + offset
    /// sleep(d) advances internal time by d without actually sleeping, and
    /// records the requested duration so tests can assert on pacing.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        unix_origin: f64,
        offset: Arc<Mutex<Duration>>,
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        /// Unix origin used by `new()`: 2023-11-14T22:13:20Z.
        pub const DEFAULT_UNIX_ORIGIN: f64 = 1_700_000_000.0;

        pub fn new() -> Self {
            Self::with_unix_origin(Self::DEFAULT_UNIX_ORIGIN)
        }

        pub fn with_unix_origin(unix_origin: f64) -> Self {
            Self {
                origin: Instant::now(),
                unix_origin,
                offset: Arc::new(Mutex::new(Duration::ZERO)),
                slept: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Durations passed to `sleep`, in call order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().map(|g| g.clone()).unwrap_or_default()
        }

        fn offset(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.offset()
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut s) = self.slept.lock() {
                s.push(d);
            }
            self.advance(d);
        }

        fn unix_time(&self) -> f64 {
            self.unix_origin + self.offset().as_secs_f64()
        }
    }

}
