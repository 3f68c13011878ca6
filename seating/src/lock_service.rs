//! Seat lock service boundary.
//!
//! The server owns the authoritative hold on a seat. The client asks for a
//! lock when a seat is selected and releases it when the seat is deselected.

use crate::types::{SeatId, ShowingId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A granted hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockGrant {
    /// When the server will release the hold
    pub expires_at: DateTime<Utc>,
}

/// Why a lock or unlock request failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The server refused (seat taken, hold not owned, limit exceeded)
    #[error("Request rejected: {reason}")]
    Rejected {
        /// Server-supplied reason
        reason: String,
    },

    /// The service could not be reached
    #[error("Lock service unavailable: {0}")]
    Unavailable(String),

    /// No answer within the request timeout
    #[error("Lock request timed out")]
    Timeout,
}

impl LockError {
    /// Metric label for this failure
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout => "timeout",
        }
    }
}

/// Remote seat lock service
///
/// Note: Returns boxed futures instead of async fn to be dyn-compatible
/// (object-safe), so environments can hold an `Arc<dyn SeatLockService>`.
pub trait SeatLockService: Send + Sync {
    /// Ask the server to hold a seat for the current user.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the seat cannot be held.
    fn lock_seat(
        &self,
        showing_id: ShowingId,
        seat_id: SeatId,
    ) -> Pin<Box<dyn Future<Output = Result<LockGrant, LockError>> + Send + '_>>;

    /// Release a seat held by the current user.
    ///
    /// # Errors
    ///
    /// Returns [`LockError`] if the hold cannot be released.
    fn unlock_seat(
        &self,
        showing_id: ShowingId,
        seat_id: SeatId,
    ) -> Pin<Box<dyn Future<Output = Result<(), LockError>> + Send + '_>>;
}
