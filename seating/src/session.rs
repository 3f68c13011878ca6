//! One mounted seat-selection component.
//!
//! A [`SeatSession`] owns a store for one showing and the push subscription
//! feeding it. Mounting subscribes; unmounting drops the subscription before
//! shutting the store down, so no event can reach state afterwards.

use crate::config::Config;
use crate::countdown::Countdown;
use crate::error::SessionError;
use crate::notice::Notice;
use crate::push::PushEvent;
use crate::seat_map::SeatMapData;
use crate::selection::{LockExpiry, SelectionAction, SelectionEnvironment, SelectionReducer, SelectionState};
use crate::types::{Seat, SeatId, SeatStatus, ShowingId};
use crate::view::{SeatMapStats, SelectionSummary};
use futures::{Stream, StreamExt};
use seatlock_core::push::{PushChannel, PushError, PushSubscription};
use seatlock_runtime::{Store, StoreConfig};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Store type behind a session
pub type SelectionStore = Store<SelectionState, SelectionAction, SelectionEnvironment, SelectionReducer>;

/// What a dispatched click is doing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The seat was added and a hold requested
    Selecting,
    /// The seat was removed and its hold released
    Deselecting,
    /// The selection is full; a notice was shown
    LimitReached,
    /// A request is still in flight; the click was ignored
    Busy,
}

/// A mounted seat map for one user and one showing
pub struct SeatSession {
    store: SelectionStore,
    showing_id: ShowingId,
    countdown_tick: Duration,
    expiry_warning: Duration,
    pump: Option<JoinHandle<()>>,
}

impl SeatSession {
    /// Mount a session: build the store and subscribe to the showing's topic
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an invalid configuration and
    /// [`SessionError::Subscribe`] if the push channel refuses the topic.
    #[tracing::instrument(skip_all, fields(showing_id = %map.showing_id()))]
    pub async fn mount(
        config: &Config,
        map: SeatMapData,
        environment: SelectionEnvironment,
        channel: &dyn PushChannel,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let showing_id = map.showing_id();
        let subscription = channel.subscribe(&showing_id.topic()).await?;

        let store = Store::with_config(
            SelectionState::new(map, config.max_selection),
            SelectionReducer::new(),
            environment.with_request_timeout(config.request_timeout()),
            StoreConfig::default().with_broadcast_capacity(config.broadcast_capacity),
        );

        let pump = tokio::spawn(pump(store.clone(), showing_id, subscription));
        tracing::info!("Seat session mounted");

        Ok(Self {
            store,
            showing_id,
            countdown_tick: config.countdown_tick(),
            expiry_warning: config.expiry_warning(),
            pump: Some(pump),
        })
    }

    /// Showing this session is for
    #[must_use]
    pub const fn showing_id(&self) -> ShowingId {
        self.showing_id
    }

    /// Click a seat
    ///
    /// The seat must exist and be clickable. A click while a request is in
    /// flight is reported as [`ClickOutcome::Busy`] and changes nothing.
    /// The outcome is decided against the state the toggle is reduced
    /// against, so a push event arriving mid-click cannot make it lie.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownSeat`] or [`SessionError::NotClickable`]
    /// (the toggle is then a no-op), and [`SessionError::Store`] after unmount.
    #[tracing::instrument(skip(self), fields(showing_id = %self.showing_id))]
    pub async fn click(&self, seat_id: SeatId) -> Result<ClickOutcome, SessionError> {
        // Fast path: refuse without dispatching when the answer is already known
        let outcome = self.store.state(|s| click_outcome(s, seat_id)).await?;
        if outcome == ClickOutcome::Busy {
            return Ok(outcome);
        }

        let (_handle, outcome) = self
            .store
            .send_observed(SelectionAction::ToggleSeat { seat_id }, |s| {
                click_outcome(s, seat_id)
            })
            .await?;
        outcome
    }

    /// Drop the whole selection and release its holds
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] after unmount.
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.store.send(SelectionAction::ClearSelection).await?;
        Ok(())
    }

    /// Every seat with its current status, row-major
    pub async fn seats(&self) -> Vec<Seat> {
        self.store.state(SelectionState::seats).await
    }

    /// One seat with its current status
    pub async fn seat(&self, seat_id: SeatId) -> Option<Seat> {
        self.store.state(|s| s.seat(seat_id)).await
    }

    /// Selected seats in click order
    pub async fn selection(&self) -> Vec<SeatId> {
        self.store.state(|s| s.selection().to_vec()).await
    }

    /// Order summary
    pub async fn summary(&self) -> SelectionSummary {
        self.store.state(SelectionState::summary).await
    }

    /// Legend counts
    pub async fn stats(&self) -> SeatMapStats {
        self.store.state(SelectionState::stats).await
    }

    /// Current hold, if armed
    pub async fn lock_expiry(&self) -> Option<LockExpiry> {
        self.store.state(SelectionState::lock_expiry).await
    }

    /// Time left on the hold, if one is armed
    pub async fn countdown(&self) -> Option<Countdown> {
        let expiry = self.lock_expiry().await?;
        Some(Countdown::between(
            expiry.expires_at,
            self.store.environment().clock.now(),
        ))
    }

    /// Whether the hold is close enough to lapsing to warn the user
    pub async fn is_hold_urgent(&self) -> bool {
        self.countdown()
            .await
            .is_some_and(|countdown| countdown.is_urgent(self.expiry_warning))
    }

    /// Countdown refresh interval from the configuration
    #[must_use]
    pub const fn countdown_tick(&self) -> Duration {
        self.countdown_tick
    }

    /// Emit the countdown every `tick` while a hold is armed
    ///
    /// The stream ends once the hold is disarmed or reaches zero.
    #[must_use]
    pub fn watch_countdown(&self, tick: Duration) -> impl Stream<Item = Countdown> + Send + 'static {
        let store = self.store.clone();
        async_stream::stream! {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(expiry) = store.state(SelectionState::lock_expiry).await else {
                    break;
                };
                let countdown = Countdown::between(expiry.expires_at, store.environment().clock.now());
                yield countdown;
                if countdown.is_expired() {
                    break;
                }
            }
        }
    }

    /// Most recent notice
    pub async fn last_notice(&self) -> Option<Notice> {
        self.store.state(|s| s.last_notice().cloned()).await
    }

    /// Whether a lock or unlock request is in flight
    pub async fn is_busy(&self) -> bool {
        self.store.state(SelectionState::is_busy).await
    }

    /// Observe actions fed back by effects: lock results and fired hold
    /// timers. Push events go straight to the store and are not included.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<SelectionAction> {
        self.store.subscribe_actions()
    }

    /// Wait for in-flight requests and their follow-ups
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if work is still running at `timeout`.
    pub async fn settle(&self, timeout: Duration) -> Result<(), SessionError> {
        self.store.settle(timeout).await?;
        Ok(())
    }

    /// Unmount: drop the push subscription, then shut the store down
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if in-flight requests do not finish
    /// within the store's shutdown timeout.
    pub async fn unmount(mut self) -> Result<(), SessionError> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
        }
        self.store.shutdown_default().await?;
        tracing::info!(showing_id = %self.showing_id, "Seat session unmounted");
        Ok(())
    }
}

impl Drop for SeatSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// What a toggle on `seat_id` does to `state`
fn click_outcome(state: &SelectionState, seat_id: SeatId) -> Result<ClickOutcome, SessionError> {
    let seat = state.seat(seat_id).ok_or(SessionError::UnknownSeat(seat_id))?;
    if !seat.is_clickable() {
        return Err(SessionError::NotClickable(seat_id));
    }
    if state.is_busy() {
        return Ok(ClickOutcome::Busy);
    }
    Ok(if seat.status == SeatStatus::Selected {
        ClickOutcome::Deselecting
    } else if state.selection().len() >= state.max_selection() {
        ClickOutcome::LimitReached
    } else {
        ClickOutcome::Selecting
    })
}

/// Decode push frames and feed them to the store until the stream ends
async fn pump(store: SelectionStore, showing_id: ShowingId, mut subscription: PushSubscription) {
    while let Some(frame) = subscription.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(PushError::Lagged(skipped)) => {
                metrics::counter!("seating.push.frames", "outcome" => "lagged").increment(skipped);
                tracing::warn!(skipped, "Push subscriber lagged, seat states may be stale");
                continue;
            },
            Err(error) => {
                metrics::counter!("seating.push.frames", "outcome" => "error").increment(1);
                tracing::warn!(%error, "Push stream error");
                continue;
            },
        };

        let event = match PushEvent::decode(&frame) {
            Ok(event) => event,
            Err(error) => {
                metrics::counter!("seating.push.frames", "outcome" => "malformed").increment(1);
                tracing::debug!(%error, "Dropping malformed push frame");
                continue;
            },
        };

        if event.showing_id() != showing_id {
            metrics::counter!("seating.push.frames", "outcome" => "foreign").increment(1);
            tracing::debug!(other = %event.showing_id(), "Dropping push event for another showing");
            continue;
        }

        metrics::counter!("seating.push.frames", "outcome" => "applied").increment(1);
        let action = match event {
            PushEvent::SeatStatusChanged(change) => SelectionAction::SeatStatusChanged(change),
            PushEvent::BookingStatusChanged(change) => SelectionAction::BookingStatusChanged(change),
        };
        if let Err(error) = store.send(action).await {
            tracing::debug!(%error, "Store closed, stopping push pump");
            break;
        }
    }
    tracing::debug!(topic = subscription.topic(), "Push pump stopped");
}
