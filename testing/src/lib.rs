//! # Seatlock Testing
//!
//! Testing utilities for seatlock reducers.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - An in-memory push channel ([`InMemoryPushChannel`])
//!
//! ## Example
//!
//! ```ignore
//! use seatlock_testing::{ManualClock, InMemoryPushChannel};
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_hold_expires() {
//!     let clock = ManualClock::starting_at_test_epoch();
//!     let channel = InMemoryPushChannel::new(16);
//!     // mount a session, select a seat, then:
//!     clock.advance(chrono::Duration::minutes(10));
//!     tokio::time::advance(std::time::Duration::from_secs(600)).await;
//! }
//! ```

use chrono::{DateTime, Utc};
use seatlock_core::environment::Clock;

/// In-memory push channel
pub mod push_channel;

/// Reducer testing harness
pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seatlock_testing::mocks::FixedClock;
    /// use seatlock_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
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

    /// Clock that only moves when told to
    ///
    /// Clones share the same instant, so a test can keep one handle and
    /// inject another into the environment.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock at the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Create a manual clock at the shared test epoch
        #[must_use]
        pub fn starting_at_test_epoch() -> Self {
            Self::new(test_epoch())
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute instant
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// The instant every test clock starts at (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};
pub use push_channel::InMemoryPushChannel;
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_manual_clock_shares_time_between_clones() {
        let clock = ManualClock::starting_at_test_epoch();
        let injected = clock.clone();
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(injected.now(), test_epoch() + chrono::Duration::seconds(90));

        injected.set(test_epoch());
        assert_eq!(clock.now(), test_epoch());
    }
}
