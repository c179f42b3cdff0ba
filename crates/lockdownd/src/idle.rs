use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time of the last user activity, shared between gamepad callbacks and the
/// countdown timer.
#[derive(Debug)]
pub(crate) struct IdleClock {
    origin: Instant,
    /// Milliseconds since `origin`. Only moves forward.
    last_activity: AtomicU64,
    timeout: Duration,
}

impl IdleClock {
    pub fn new(timeout: Duration) -> Self {
        Self::starting_at(Instant::now(), timeout)
    }

    pub fn starting_at(origin: Instant, timeout: Duration) -> Self {
        Self {
            origin,
            last_activity: AtomicU64::new(0),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records activity now.
    pub fn touch(&self) {
        self.touch_at(Instant::now());
    }

    pub fn touch_at(&self, at: Instant) {
        let offset = self.offset(at);
        self.last_activity.fetch_max(offset, Ordering::AcqRel);
    }

    /// Time left before the session should be locked.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        let idle = self
            .offset(now)
            .saturating_sub(self.last_activity.load(Ordering::Acquire));
        self.timeout.saturating_sub(Duration::from_millis(idle))
    }

    /// Whether the idle timeout has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.remaining_at(now).is_zero()
    }

    fn offset(&self, at: Instant) -> u64 {
        let elapsed = at.saturating_duration_since(self.origin).as_millis();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn counts_down_from_last_activity() {
        let start = Instant::now();
        let clock = IdleClock::starting_at(start, 5 * MINUTE);
        assert_eq!(clock.remaining_at(start), 5 * MINUTE);
        assert_eq!(clock.remaining_at(start + 2 * MINUTE), 3 * MINUTE);

        clock.touch_at(start + 4 * MINUTE);
        assert_eq!(clock.remaining_at(start + 6 * MINUTE), 3 * MINUTE);
        assert!(!clock.is_expired_at(start + 8 * MINUTE));
        assert!(clock.is_expired_at(start + 9 * MINUTE));
    }

    #[test]
    fn fresh_clock_is_not_expired() {
        let clock = IdleClock::new(MINUTE);
        assert!(!clock.is_expired());
        assert!(clock.remaining() > Duration::ZERO);

        let instant = IdleClock::new(Duration::ZERO);
        assert!(instant.is_expired());
    }

    #[test]
    fn stale_touch_does_not_rewind() {
        let start = Instant::now();
        let clock = IdleClock::starting_at(start, MINUTE);
        clock.touch_at(start + 30 * MINUTE);
        clock.touch_at(start + 10 * MINUTE);
        assert_eq!(clock.remaining_at(start + 30 * MINUTE), MINUTE);
    }

    #[test]
    fn touches_from_many_threads() {
        let start = Instant::now();
        let clock = Arc::new(IdleClock::starting_at(start, MINUTE));
        let workers: Vec<_> = (1..=8_u32)
            .map(|i| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || clock.touch_at(start + MINUTE * i))
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }
        assert_eq!(clock.remaining_at(start + 8 * MINUTE), MINUTE);
        assert!(clock.is_expired_at(start + 9 * MINUTE));
    }
}
