//! Lock-expiry countdown.
//!
//! Purely advisory: the selection is cleared by the delayed `ExpireHold`
//! action, not by the countdown reaching zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Time left on a hold, in whole seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Countdown {
    remaining_secs: u64,
}

impl Countdown {
    /// Countdown from `now` to `expires_at`, clamped at zero
    ///
    /// Partial seconds round up, so `00:00` is only shown once the hold has
    /// actually lapsed.
    #[must_use]
    pub fn between(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let millis = (expires_at - now).num_milliseconds();
        let remaining_secs = u64::try_from(millis).map_or(0, |ms| ms.div_ceil(1_000));
        Self { remaining_secs }
    }

    /// Remaining whole seconds
    #[must_use]
    pub const fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// Remaining time
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        Duration::from_secs(self.remaining_secs)
    }

    /// Whether no time is left
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Whether the remaining time is at or below `threshold`
    #[must_use]
    pub const fn is_urgent(&self, threshold: Duration) -> bool {
        self.remaining_secs <= threshold.as_secs()
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}
