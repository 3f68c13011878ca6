//! Selection reducer for one seat map.
//!
//! Clicks are applied optimistically: the seat joins (or leaves) the
//! selection at once and a lock (or unlock) request goes out as an effect.
//! A rejected request restores the selection captured before the click.
//!
//! **Concurrency Strategy**: one request in flight at a time. While a lock or
//! unlock is pending, further clicks are ignored. Push events are merged as
//! they arrive, so a later event wins over an earlier optimistic change.
//!
//! **Hold expiry**: each granted lock arms a delayed `ExpireHold` carrying a
//! generation number. Re-arming bumps the generation, so a timer armed for
//! an older hold finds a mismatch and does nothing.

use crate::lock_service::{LockError, SeatLockService};
use crate::notice::{Notice, Notifier};
use crate::push::{BookingStatus, BookingStatusChanged, RemoteSeatStatus, SeatStatusChanged};
use crate::seat_map::SeatMapData;
use crate::types::{Seat, SeatId, ShowingId, UserId};
use crate::view::{self, SeatMapStats, SelectionSummary};
use chrono::{DateTime, Utc};
use seatlock_core::{
    SmallVec, async_effect, delay, effect::Effect, environment::Clock, notify_effect,
    reducer::Reducer, smallvec,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// State
// ============================================================================

/// The current hold on the selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockExpiry {
    /// When the server releases the hold
    pub expires_at: DateTime<Utc>,
    /// Matches the armed `ExpireHold` timer
    pub generation: u64,
}

/// Which request is in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Holding a newly selected seat
    Lock,
    /// Releasing a deselected seat
    Unlock,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    selection: Vec<SeatId>,
    expiry: Option<LockExpiry>,
}

/// The request currently in flight
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    /// Seat the request is about
    pub seat_id: SeatId,
    /// Lock or unlock
    pub kind: RequestKind,
    /// State before the click; dropped when the selection is cleared
    /// in the meantime so that a late rejection cannot resurrect it
    rollback: Option<Snapshot>,
}

impl PendingRequest {
    /// Selection a rejection would restore, if any
    #[must_use]
    pub fn rollback_selection(&self) -> Option<&[SeatId]> {
        self.rollback.as_ref().map(|s| s.selection.as_slice())
    }
}

/// Selection state for one component instance
#[derive(Clone, Debug)]
pub struct SelectionState {
    map: SeatMapData,
    max_selection: usize,
    selection: Vec<SeatId>,
    expiry: Option<LockExpiry>,
    next_generation: u64,
    pending: Option<PendingRequest>,
    last_notice: Option<Notice>,
}

impl SelectionState {
    /// Creates an empty selection over `map`
    #[must_use]
    pub const fn new(map: SeatMapData, max_selection: usize) -> Self {
        Self {
            map,
            max_selection,
            selection: Vec::new(),
            expiry: None,
            next_generation: 0,
            pending: None,
            last_notice: None,
        }
    }

    /// Seat map, including the latest booked and locked sets
    #[must_use]
    pub const fn map(&self) -> &SeatMapData {
        &self.map
    }

    /// Showing this selection belongs to
    #[must_use]
    pub const fn showing_id(&self) -> ShowingId {
        self.map.showing_id()
    }

    /// Selected seats in click order
    #[must_use]
    pub fn selection(&self) -> &[SeatId] {
        &self.selection
    }

    /// Whether `seat` is selected
    #[must_use]
    pub fn is_selected(&self, seat: SeatId) -> bool {
        self.selection.contains(&seat)
    }

    /// Selection limit
    #[must_use]
    pub const fn max_selection(&self) -> usize {
        self.max_selection
    }

    /// Current hold, if armed
    #[must_use]
    pub const fn lock_expiry(&self) -> Option<LockExpiry> {
        self.expiry
    }

    /// Whether a lock or unlock request is in flight
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// The request in flight
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Most recent notice
    #[must_use]
    pub const fn last_notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    /// Every seat with its derived status, row-major
    #[must_use]
    pub fn seats(&self) -> Vec<Seat> {
        view::derive_seats(&self.map, &self.selection)
    }

    /// One seat with its derived status
    #[must_use]
    pub fn seat(&self, id: SeatId) -> Option<Seat> {
        view::derive_seat(&self.map, &self.selection, id)
    }

    /// Whether a click on `id` may be dispatched
    #[must_use]
    pub fn is_clickable(&self, id: SeatId) -> bool {
        self.seat(id).is_some_and(|seat| seat.is_clickable())
    }

    /// Order summary
    #[must_use]
    pub fn summary(&self) -> SelectionSummary {
        SelectionSummary::from_selection(&self.map, &self.selection)
    }

    /// Legend counts
    #[must_use]
    pub fn stats(&self) -> SeatMapStats {
        SeatMapStats::from_seats(&self.seats())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            selection: self.selection.clone(),
            expiry: self.expiry,
        }
    }

    fn arm(&mut self, expires_at: DateTime<Utc>) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.expiry = Some(LockExpiry {
            expires_at,
            generation,
        });
        generation
    }

    /// Remove a seat from the selection; the hold goes with the last seat
    fn drop_from_selection(&mut self, seat: SeatId) -> bool {
        let before = self.selection.len();
        self.selection.retain(|s| *s != seat);
        if self.selection.is_empty() {
            self.expiry = None;
        }
        self.selection.len() != before
    }

    fn clear(&mut self) -> Vec<SeatId> {
        self.expiry = None;
        if let Some(pending) = self.pending.as_mut() {
            pending.rollback = None;
        }
        std::mem::take(&mut self.selection)
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the selection reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionAction {
    // Commands
    /// The user clicked a seat
    ToggleSeat {
        /// Clicked seat
        seat_id: SeatId,
    },
    /// Drop the whole selection and release its holds
    ClearSelection,
    /// The hold timer fired
    ExpireHold {
        /// Generation the timer was armed for
        generation: u64,
    },

    // Lock service feedback
    /// The server holds the seat
    LockGranted {
        /// Locked seat
        seat_id: SeatId,
        /// When the hold lapses
        expires_at: DateTime<Utc>,
    },
    /// The server would not hold the seat
    LockRejected {
        /// Seat
        seat_id: SeatId,
        /// Why
        reason: LockError,
    },
    /// The server released the seat
    UnlockConfirmed {
        /// Released seat
        seat_id: SeatId,
    },
    /// The server would not release the seat
    UnlockRejected {
        /// Seat
        seat_id: SeatId,
        /// Why
        reason: LockError,
    },

    // Push events
    /// A seat changed status on the server
    SeatStatusChanged(SeatStatusChanged),
    /// A booking changed status on the server
    BookingStatusChanged(BookingStatusChanged),
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the selection reducer
#[derive(Clone)]
pub struct SelectionEnvironment {
    /// Clock for hold expiry
    pub clock: Arc<dyn Clock>,
    /// Remote lock service
    pub lock_service: Arc<dyn SeatLockService>,
    /// Where notices go
    pub notifier: Arc<dyn Notifier>,
    /// The current user
    pub user_id: UserId,
    /// Upper bound on a lock or unlock call
    pub request_timeout: Duration,
}

impl SelectionEnvironment {
    /// Default upper bound on a lock or unlock call
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a new `SelectionEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        lock_service: Arc<dyn SeatLockService>,
        notifier: Arc<dyn Notifier>,
        user_id: UserId,
    ) -> Self {
        Self {
            clock,
            lock_service,
            notifier,
            user_id,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// ============================================================================
// Reducer
// ============================================================================

type Effects = SmallVec<[Effect<SelectionAction>; 4]>;

/// Reducer for seat selection
#[derive(Clone, Debug, Default)]
pub struct SelectionReducer;

impl SelectionReducer {
    /// Creates a new `SelectionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn toggle(state: &mut SelectionState, seat_id: SeatId, env: &SelectionEnvironment) -> Effects {
        if let Some(pending) = &state.pending {
            tracing::debug!(%seat_id, busy_with = %pending.seat_id, "Ignoring click while a request is in flight");
            return SmallVec::new();
        }

        if !state.is_clickable(seat_id) {
            tracing::debug!(%seat_id, "Ignoring click on a seat that cannot be selected");
            return SmallVec::new();
        }

        let showing_id = state.showing_id();

        if state.is_selected(seat_id) {
            let rollback = state.snapshot();
            state.drop_from_selection(seat_id);
            state.pending = Some(PendingRequest {
                seat_id,
                kind: RequestKind::Unlock,
                rollback: Some(rollback),
            });
            tracing::debug!(%seat_id, "Deselected, releasing hold");
            return smallvec![Self::unlock(env, showing_id, seat_id)];
        }

        if state.selection.len() >= state.max_selection {
            tracing::debug!(%seat_id, max = state.max_selection, "Selection limit reached");
            let max = state.max_selection;
            return smallvec![Self::announce(state, env, Notice::MaxSelectionReached { max })];
        }

        let rollback = state.snapshot();
        state.selection.push(seat_id);
        state.pending = Some(PendingRequest {
            seat_id,
            kind: RequestKind::Lock,
            rollback: Some(rollback),
        });
        tracing::debug!(%seat_id, "Selected, requesting hold");
        smallvec![Self::lock(env, showing_id, seat_id)]
    }

    /// Restore the pre-click selection after a failed request
    ///
    /// Seats booked or locked by others since the click stay out. If the
    /// request had destroyed the hold, it is re-armed with a fresh generation.
    fn roll_back(state: &mut SelectionState, env: &SelectionEnvironment) -> Option<Effect<SelectionAction>> {
        let rollback = state.pending.take()?.rollback?;

        state.selection = rollback.selection;
        let map = &state.map;
        state.selection.retain(|seat| !map.is_booked(*seat) && !map.is_locked(*seat));

        if state.selection.is_empty() {
            state.expiry = None;
            return None;
        }

        match rollback.expiry {
            Some(previous) if state.expiry.map(|e| e.generation) != Some(previous.generation) => {
                let generation = state.arm(previous.expires_at);
                Some(Self::expiry_timer(env, previous.expires_at, generation))
            },
            _ => None,
        }
    }

    fn merge_seat_status(
        state: &mut SelectionState,
        event: SeatStatusChanged,
        env: &SelectionEnvironment,
    ) -> Effects {
        let seat_id = event.seat_id;
        if !state.map.contains(seat_id) {
            tracing::debug!(%seat_id, "Ignoring push event for a seat outside the map");
            return SmallVec::new();
        }

        let by_self = event.user_id == Some(env.user_id);
        let by_other = event.user_id.is_some() && !by_self;

        match event.status {
            RemoteSeatStatus::Locked if by_self => {
                tracing::trace!(%seat_id, "Own lock echoed back");
                SmallVec::new()
            },
            RemoteSeatStatus::Locked => {
                state.map.mark_locked(seat_id);
                let lost = state.drop_from_selection(seat_id);
                tracing::debug!(%seat_id, lost, "Seat locked by another user");
                if by_other || lost {
                    smallvec![Self::announce(state, env, Notice::SeatTakenByOther { seat_id })]
                } else {
                    SmallVec::new()
                }
            },
            RemoteSeatStatus::Available => {
                state.map.mark_available(seat_id);
                tracing::debug!(%seat_id, "Seat released");
                SmallVec::new()
            },
            RemoteSeatStatus::Booked => {
                state.map.mark_booked(seat_id);
                let lost = state.drop_from_selection(seat_id);
                tracing::debug!(%seat_id, lost, "Seat booked");
                if !by_self && (by_other || lost) {
                    smallvec![Self::announce(state, env, Notice::SeatBookedByOther { seat_id })]
                } else {
                    SmallVec::new()
                }
            },
        }
    }

    fn merge_booking_status(
        state: &mut SelectionState,
        event: BookingStatusChanged,
        env: &SelectionEnvironment,
    ) -> Effects {
        let own = event.user_id == env.user_id;
        let seats: Vec<SeatId> = event
            .seats
            .iter()
            .copied()
            .filter(|seat| state.map.contains(*seat))
            .collect();

        match event.status {
            BookingStatus::Confirmed => {
                for seat in &seats {
                    state.map.mark_booked(*seat);
                }
                if own {
                    state.clear();
                    tracing::info!(booking_id = %event.booking_id, "Booking confirmed");
                    return smallvec![Self::announce(
                        state,
                        env,
                        Notice::BookingConfirmed {
                            booking_id: event.booking_id,
                        }
                    )];
                }

                let lost: Vec<SeatId> = seats
                    .into_iter()
                    .filter(|seat| state.drop_from_selection(*seat))
                    .collect();
                match lost.first() {
                    Some(&seat_id) => {
                        smallvec![Self::announce(state, env, Notice::SeatBookedByOther { seat_id })]
                    },
                    None => SmallVec::new(),
                }
            },
            BookingStatus::Cancelled => {
                for seat in &seats {
                    state.map.release_booked(*seat);
                }
                if own {
                    tracing::info!(booking_id = %event.booking_id, "Booking cancelled");
                    smallvec![Self::announce(
                        state,
                        env,
                        Notice::BookingCancelled {
                            booking_id: event.booking_id,
                        }
                    )]
                } else {
                    SmallVec::new()
                }
            },
        }
    }

    /// Record a notice and hand it to the notifier
    fn announce(
        state: &mut SelectionState,
        env: &SelectionEnvironment,
        notice: Notice,
    ) -> Effect<SelectionAction> {
        state.last_notice = Some(notice.clone());
        let notifier = Arc::clone(&env.notifier);
        notify_effect!(move || notifier.notify(&notice))
    }

    fn expiry_timer(
        env: &SelectionEnvironment,
        expires_at: DateTime<Utc>,
        generation: u64,
    ) -> Effect<SelectionAction> {
        let remaining = (expires_at - env.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        delay! {
            duration: remaining,
            action: SelectionAction::ExpireHold { generation }
        }
    }

    fn lock(env: &SelectionEnvironment, showing_id: ShowingId, seat_id: SeatId) -> Effect<SelectionAction> {
        let service = Arc::clone(&env.lock_service);
        let timeout = env.request_timeout;
        async_effect! {
            let result = tokio::time::timeout(timeout, service.lock_seat(showing_id, seat_id))
                .await
                .unwrap_or(Err(LockError::Timeout));
            match result {
                Ok(grant) => {
                    metrics::counter!("seating.lock.requests", "op" => "lock", "outcome" => "granted")
                        .increment(1);
                    Some(SelectionAction::LockGranted {
                        seat_id,
                        expires_at: grant.expires_at,
                    })
                },
                Err(reason) => {
                    metrics::counter!("seating.lock.requests", "op" => "lock", "outcome" => reason.outcome())
                        .increment(1);
                    tracing::warn!(%seat_id, error = %reason, "Lock request failed");
                    Some(SelectionAction::LockRejected { seat_id, reason })
                },
            }
        }
    }

    fn unlock(env: &SelectionEnvironment, showing_id: ShowingId, seat_id: SeatId) -> Effect<SelectionAction> {
        let service = Arc::clone(&env.lock_service);
        let timeout = env.request_timeout;
        async_effect! {
            let result = tokio::time::timeout(timeout, service.unlock_seat(showing_id, seat_id))
                .await
                .unwrap_or(Err(LockError::Timeout));
            match result {
                Ok(()) => {
                    metrics::counter!("seating.lock.requests", "op" => "unlock", "outcome" => "released")
                        .increment(1);
                    Some(SelectionAction::UnlockConfirmed { seat_id })
                },
                Err(reason) => {
                    metrics::counter!("seating.lock.requests", "op" => "unlock", "outcome" => reason.outcome())
                        .increment(1);
                    tracing::warn!(%seat_id, error = %reason, "Unlock request failed");
                    Some(SelectionAction::UnlockRejected { seat_id, reason })
                },
            }
        }
    }

    /// Best-effort release; the outcome changes nothing locally
    fn release(env: &SelectionEnvironment, showing_id: ShowingId, seat_id: SeatId) -> Effect<SelectionAction> {
        let service = Arc::clone(&env.lock_service);
        let timeout = env.request_timeout;
        async_effect! {
            match tokio::time::timeout(timeout, service.unlock_seat(showing_id, seat_id)).await {
                Ok(Ok(())) => {
                    metrics::counter!("seating.lock.requests", "op" => "release", "outcome" => "released")
                        .increment(1);
                },
                Ok(Err(reason)) => {
                    metrics::counter!("seating.lock.requests", "op" => "release", "outcome" => reason.outcome())
                        .increment(1);
                    tracing::debug!(%seat_id, error = %reason, "Release failed, hold will lapse on its own");
                },
                Err(_) => {
                    metrics::counter!("seating.lock.requests", "op" => "release", "outcome" => "timeout")
                        .increment(1);
                    tracing::debug!(%seat_id, "Release timed out, hold will lapse on its own");
                },
            }
            None
        }
    }
}

impl Reducer for SelectionReducer {
    type State = SelectionState;
    type Action = SelectionAction;
    type Environment = SelectionEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            SelectionAction::ToggleSeat { seat_id } => Self::toggle(state, seat_id, env),

            SelectionAction::ClearSelection => {
                let showing_id = state.showing_id();
                let released = state.clear();
                if released.is_empty() {
                    return SmallVec::new();
                }
                tracing::debug!(seats = released.len(), "Selection cleared");
                smallvec![Effect::merge(
                    released
                        .into_iter()
                        .map(|seat_id| Self::release(env, showing_id, seat_id))
                        .collect()
                )]
            },

            SelectionAction::ExpireHold { generation } => {
                if state.expiry.map(|e| e.generation) != Some(generation) {
                    tracing::trace!(generation, "Stale hold timer ignored");
                    return SmallVec::new();
                }
                let dropped = state.clear();
                tracing::info!(seats = dropped.len(), "Hold expired");
                smallvec![Self::announce(state, env, Notice::HoldExpired)]
            },

            // ========== Lock service feedback ==========
            SelectionAction::LockGranted {
                seat_id,
                expires_at,
            } => {
                state.pending = None;
                if !state.is_selected(seat_id) {
                    tracing::debug!(%seat_id, "Lock granted for a seat no longer selected");
                    return SmallVec::new();
                }
                let generation = state.arm(expires_at);
                tracing::debug!(%seat_id, %expires_at, generation, "Hold armed");
                smallvec![Self::expiry_timer(env, expires_at, generation)]
            },

            SelectionAction::LockRejected { seat_id, reason } => {
                let mut effects: Effects = Self::roll_back(state, env).into_iter().collect();
                effects.push(Self::announce(
                    state,
                    env,
                    Notice::LockFailed {
                        seat_id,
                        reason: reason.to_string(),
                    },
                ));
                effects
            },

            SelectionAction::UnlockConfirmed { seat_id } => {
                state.pending = None;
                tracing::trace!(%seat_id, "Hold released");
                SmallVec::new()
            },

            SelectionAction::UnlockRejected { seat_id, reason } => {
                let mut effects: Effects = Self::roll_back(state, env).into_iter().collect();
                effects.push(Self::announce(
                    state,
                    env,
                    Notice::UnlockFailed {
                        seat_id,
                        reason: reason.to_string(),
                    },
                ));
                effects
            },

            // ========== Push events ==========
            SelectionAction::SeatStatusChanged(event) => {
                if event.showing_id != state.showing_id() {
                    tracing::debug!(showing_id = %event.showing_id, "Ignoring event for another showing");
                    return SmallVec::new();
                }
                Self::merge_seat_status(state, event, env)
            },

            SelectionAction::BookingStatusChanged(event) => {
                if event.showing_id != state.showing_id() {
                    tracing::debug!(showing_id = %event.showing_id, "Ignoring event for another showing");
                    return SmallVec::new();
                }
                Self::merge_booking_status(state, event, env)
            },
        }
    }
}
