//! Session-level errors.

use crate::config::ConfigError;
use crate::types::SeatId;
use seatlock_core::push::PushError;
use seatlock_runtime::StoreError;
use thiserror::Error;

/// Errors returned by [`crate::SeatSession`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The seat is not on this seat map
    #[error("Seat {0} is not on this seat map")]
    UnknownSeat(SeatId),

    /// The seat is booked, held by someone else or disabled
    #[error("Seat {0} cannot be selected")]
    NotClickable(SeatId),

    /// The session configuration is unusable
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The push channel refused the subscription
    #[error("Push subscription failed: {0}")]
    Subscribe(#[from] PushError),

    /// The store rejected the action (usually after unmount)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
