//! Push event decoding.
//!
//! Frames on a showing's topic are JSON objects tagged by `"type"`:
//!
//! ```json
//! {"type":"seat_status_changed","showing_id":"…","seat_id":"B4","status":"locked","user_id":"…"}
//! {"type":"booking_status_changed","showing_id":"…","booking_id":"…","user_id":"…","status":"confirmed","seats":["B4","B5"]}
//! ```

use crate::types::{BookingId, SeatId, ShowingId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seat status reported by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteSeatStatus {
    /// Released
    Available,
    /// Held, by `user_id` if present
    Locked,
    /// Sold
    Booked,
}

/// Booking lifecycle reported by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Paid and final
    Confirmed,
    /// Cancelled; its seats are sellable again
    Cancelled,
}

/// A single seat changed status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatStatusChanged {
    /// Showing the seat belongs to
    pub showing_id: ShowingId,
    /// The seat
    pub seat_id: SeatId,
    /// New status
    pub status: RemoteSeatStatus,
    /// User who caused the change, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// A booking changed status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStatusChanged {
    /// Showing the booking belongs to
    pub showing_id: ShowingId,
    /// The booking
    pub booking_id: BookingId,
    /// Owner of the booking
    pub user_id: UserId,
    /// New status
    pub status: BookingStatus,
    /// Seats covered by the booking
    pub seats: Vec<SeatId>,
}

/// Event delivered on a showing's push topic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// See [`SeatStatusChanged`]
    SeatStatusChanged(SeatStatusChanged),
    /// See [`BookingStatusChanged`]
    BookingStatusChanged(BookingStatusChanged),
}

/// Errors from decoding or encoding push frames
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The frame is not a known event
    #[error("Malformed push frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl PushEvent {
    /// Decode a text frame
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] for anything that is not a known
    /// event, including unknown `type` tags and invalid seat labels.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Encode as a text frame
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] if serialization fails.
    pub fn encode(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Showing the event is about
    #[must_use]
    pub const fn showing_id(&self) -> ShowingId {
        match self {
            Self::SeatStatusChanged(event) => event.showing_id,
            Self::BookingStatusChanged(event) => event.showing_id,
        }
    }
}
