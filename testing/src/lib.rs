//! # Venue Booking Testing
//!
//! Testing utilities and helpers for the venue booking engine.
//!
//! This crate provides:
//! - Deterministic clock implementations of the `Clock` environment trait
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use venue_booking_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(LifecycleReducer::new())
//!     .with_env(LifecycleEnvironment::new(Arc::new(test_clock()), repository))
//!     .given_state(LifecycleState::new(pending_reservation))
//!     .when_action(LifecycleAction::Confirm)
//!     .then_state(|state| assert_eq!(state.reservation.status, ReservationStatus::Confirmed))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use venue_booking_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use venue_booking_testing::mocks::FixedClock;
    /// use venue_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test tells it to.
    ///
    /// Useful for booking-window checks where the same engine must observe
    /// "before opening", "open" and "after closing" in one test.
    #[derive(Debug)]
    pub struct SteppingClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl SteppingClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward by `delta`
        pub fn advance(&self, delta: chrono::Duration) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += delta;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time = to;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// The instant every default test clock starts at (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, test_epoch, FixedClock, SteppingClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_stepping_clock_advances() {
        let clock = SteppingClock::new(test_epoch());
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), test_epoch() + chrono::Duration::hours(2));

        clock.set(test_epoch());
        assert_eq!(clock.now(), test_epoch());
    }
}
