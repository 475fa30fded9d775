//! Time source used by the services.
//!
//! Expiry checks, token timestamps and device polling all read the current
//! time through [`Clock`] so tests can pin or advance it.

use std::fmt;
use std::sync::RwLock;

use time::OffsetDateTime;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current UTC time.
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<OffsetDateTime>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: OffsetDateTime) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: time::Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Returns `now + lifetime`, or `None` when the instant is not representable.
#[must_use]
pub fn expires_after(now: OffsetDateTime, lifetime: std::time::Duration) -> Option<OffsetDateTime> {
    time::Duration::try_from(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add(lifetime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(datetime!(2024-01-01 00:00 UTC));
        clock.advance(time::Duration::seconds(90));
        assert_eq!(clock.now(), datetime!(2024-01-01 00:01:30 UTC));

        clock.set(datetime!(2030-06-01 12:00 UTC));
        assert_eq!(clock.now(), datetime!(2030-06-01 12:00 UTC));
    }

    #[test]
    fn test_expires_after() {
        let now = datetime!(2024-01-01 00:00 UTC);
        assert_eq!(
            expires_after(now, std::time::Duration::from_secs(3600)),
            Some(datetime!(2024-01-01 01:00 UTC))
        );
        assert_eq!(
            expires_after(now, std::time::Duration::from_secs(100_000_000 * 365 * 24 * 3600)),
            None
        );
        assert_eq!(expires_after(now, std::time::Duration::MAX), None);
    }

    #[test]
    fn test_system_clock_is_utc() {
        assert!(SystemClock.now().offset().is_utc());
    }
}
