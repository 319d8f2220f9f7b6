//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock adapter that never goes backwards.
///
/// Wall clocks can step back (NTP slew, VM migration). Event streams require
/// `occurred_at` to be non-decreasing, so a reading earlier than the last
/// one handed out is replaced by that last reading.
#[derive(Debug)]
pub struct MonotonicClock<C> {
    inner: C,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl<C: Clock> MonotonicClock<C> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }
}

impl Default for MonotonicClock<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> DateTime<Utc> {
        let reading = self.inner.now();
        let mut last = self.last.lock();
        let next = match *last {
            Some(previous) if previous > reading => previous,
            _ => reading,
        };
        *last = Some(next);
        next
    }
}
