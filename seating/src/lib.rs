//! # Seating
//!
//! Real-time seat selection for one user looking at one showing.
//!
//! Several users contend for the same seats. Each click is applied to the
//! local selection at once and confirmed by a lock request to the server;
//! a rejected request rolls the selection back. The server's push channel
//! reports what everybody else is doing, and a granted hold lapses on its
//! own unless the user books in time.
//!
//! ## Architecture
//!
//! - [`selection`]: the reducer (pure state transitions, effects as values)
//! - [`session`]: a mounted component instance wiring the reducer to a
//!   [`seatlock_runtime::Store`] and a push subscription
//! - [`view`]: seats, summary and legend derived from state on demand
//! - [`push`]: push frame decoding
//! - [`countdown`]: the advisory hold countdown
//!
//! ## Example
//!
//! ```ignore
//! let session = SeatSession::mount(&config, map, environment, &channel).await?;
//! match session.click("B4".parse()?).await? {
//!     ClickOutcome::Busy => tracing::debug!("request still in flight"),
//!     outcome => tracing::debug!(?outcome, "clicked"),
//! }
//! session.unmount().await?;
//! ```

pub mod config;
pub mod countdown;
pub mod error;
pub mod lock_service;
pub mod mocks;
pub mod notice;
pub mod push;
pub mod seat_map;
pub mod selection;
pub mod session;
pub mod types;
pub mod view;

pub use config::{Config, ConfigError};
pub use countdown::Countdown;
pub use error::SessionError;
pub use lock_service::{LockError, LockGrant, SeatLockService};
pub use notice::{Notice, Notifier, TracingNotifier};
pub use push::{BookingStatus, BookingStatusChanged, PushEvent, RemoteSeatStatus, SeatStatusChanged};
pub use seat_map::{SeatMapBuilder, SeatMapData, SeatMapError};
pub use selection::{
    LockExpiry, RequestKind, SelectionAction, SelectionEnvironment, SelectionReducer,
    SelectionState,
};
pub use session::{ClickOutcome, SeatSession, SelectionStore};
pub use types::{
    BookingId, Money, Pricing, Seat, SeatCategory, SeatId, SeatIdParseError, SeatStatus,
    ShowingId, UserId,
};
pub use view::{SeatMapStats, SelectionSummary, SummaryLine};
