//! User-facing notices.
//!
//! Every recoverable failure and every change the user did not cause ends
//! up as a [`Notice`]. The reducer records the latest one in state and hands
//! it to the injected [`Notifier`], which a UI would turn into a toast.

use crate::types::{BookingId, SeatId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something the user should be told about
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A click at the selection limit was ignored
    MaxSelectionReached {
        /// The limit
        max: usize,
    },
    /// The server refused to hold a seat; the selection was rolled back
    LockFailed {
        /// Seat that could not be held
        seat_id: SeatId,
        /// Why
        reason: String,
    },
    /// The server refused to release a seat; the selection was rolled back
    UnlockFailed {
        /// Seat that could not be released
        seat_id: SeatId,
        /// Why
        reason: String,
    },
    /// Another user now holds a seat
    SeatTakenByOther {
        /// The seat
        seat_id: SeatId,
    },
    /// Another user bought a seat
    SeatBookedByOther {
        /// The seat
        seat_id: SeatId,
    },
    /// The hold lapsed and the selection was cleared
    HoldExpired,
    /// The current user's booking went through
    BookingConfirmed {
        /// The booking
        booking_id: BookingId,
    },
    /// The current user's booking was cancelled
    BookingCancelled {
        /// The booking
        booking_id: BookingId,
    },
}

impl Notice {
    /// Whether this notice reports a failed request
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::LockFailed { .. } | Self::UnlockFailed { .. })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxSelectionReached { max } => {
                write!(f, "You can select at most {max} seats")
            },
            Self::LockFailed { seat_id, reason } => {
                write!(f, "Could not hold seat {seat_id}: {reason}")
            },
            Self::UnlockFailed { seat_id, reason } => {
                write!(f, "Could not release seat {seat_id}: {reason}")
            },
            Self::SeatTakenByOther { seat_id } => {
                write!(f, "Seat {seat_id} was just taken by someone else")
            },
            Self::SeatBookedByOther { seat_id } => {
                write!(f, "Seat {seat_id} has been sold")
            },
            Self::HoldExpired => write!(f, "Your hold expired, please select your seats again"),
            Self::BookingConfirmed { booking_id } => {
                write!(f, "Booking {booking_id} confirmed")
            },
            Self::BookingCancelled { booking_id } => {
                write!(f, "Booking {booking_id} was cancelled")
            },
        }
    }
}

/// Receives notices for display
pub trait Notifier: Send + Sync {
    /// Show a notice to the user
    fn notify(&self, notice: &Notice);
}

/// Notifier that writes notices to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        if notice.is_error() {
            tracing::warn!(%notice, "seat notice");
        } else {
            tracing::info!(%notice, "seat notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages() {
        assert_eq!(
            Notice::MaxSelectionReached { max: 2 }.to_string(),
            "You can select at most 2 seats"
        );
        let notice = Notice::LockFailed {
            seat_id: SeatId::new(0, 1),
            reason: "taken".to_string(),
        };
        assert_eq!(notice.to_string(), "Could not hold seat A1: taken");
        assert!(notice.is_error());
        assert!(!Notice::HoldExpired.is_error());
    }
}
