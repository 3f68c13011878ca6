//! In-memory collaborators for tests and the demo.
//!
//! - [`MockLockService`]: scriptable lock service that records every call
//! - [`InMemoryLockServer`]: shared hold table that publishes push frames,
//!   so several sessions can contend for the same seats
//! - [`RecordingNotifier`]: keeps every notice it is given

use crate::lock_service::{LockError, LockGrant, SeatLockService};
use crate::notice::{Notice, Notifier};
use crate::push::{PushEvent, RemoteSeatStatus, SeatStatusChanged};
use crate::types::{SeatId, ShowingId, UserId};
use seatlock_core::environment::Clock;
use seatlock_testing::InMemoryPushChannel;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

type LockFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LockError>> + Send + 'a>>;

/// A call made to [`MockLockService`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockCall {
    /// `lock_seat`
    Lock(SeatId),
    /// `unlock_seat`
    Unlock(SeatId),
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<LockCall>,
    lock_failures: VecDeque<LockError>,
    unlock_failures: VecDeque<LockError>,
    rejected_seats: HashMap<SeatId, String>,
}

/// Scriptable lock service
///
/// Grants every lock for `hold` from the injected clock's `now()` unless a
/// failure has been queued or the seat is on the reject list.
#[derive(Clone)]
pub struct MockLockService {
    clock: Arc<dyn Clock>,
    hold: chrono::Duration,
    latency: Duration,
    script: Arc<Mutex<Script>>,
}

impl MockLockService {
    /// Creates a mock granting ten-minute holds
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            hold: chrono::Duration::minutes(10),
            latency: Duration::ZERO,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Set how long granted holds last
    #[must_use]
    pub const fn with_hold(mut self, hold: chrono::Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Delay every response
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next `lock_seat` call
    pub fn fail_next_lock(&self, error: LockError) {
        self.script().lock_failures.push_back(error);
    }

    /// Fail the next `unlock_seat` call
    pub fn fail_next_unlock(&self, error: LockError) {
        self.script().unlock_failures.push_back(error);
    }

    /// Reject every lock on `seat`
    pub fn reject_seat(&self, seat: SeatId, reason: impl Into<String>) {
        self.script().rejected_seats.insert(seat, reason.into());
    }

    /// Every call so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<LockCall> {
        self.script().calls.clone()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SeatLockService for MockLockService {
    fn lock_seat(&self, _showing_id: ShowingId, seat_id: SeatId) -> LockFuture<'_, LockGrant> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            let mut script = self.script();
            script.calls.push(LockCall::Lock(seat_id));
            if let Some(error) = script.lock_failures.pop_front() {
                return Err(error);
            }
            if let Some(reason) = script.rejected_seats.get(&seat_id) {
                return Err(LockError::Rejected {
                    reason: reason.clone(),
                });
            }

            Ok(LockGrant {
                expires_at: self.clock.now() + self.hold,
            })
        })
    }

    fn unlock_seat(&self, _showing_id: ShowingId, seat_id: SeatId) -> LockFuture<'_, ()> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            let mut script = self.script();
            script.calls.push(LockCall::Unlock(seat_id));
            script.unlock_failures.pop_front().map_or(Ok(()), Err)
        })
    }
}

/// Shared hold table behind several users' lock clients
///
/// Every granted lock and every release is published to the showing's topic
/// on the push channel, the way a real server would fan out changes.
#[derive(Clone)]
pub struct InMemoryLockServer {
    clock: Arc<dyn Clock>,
    hold: chrono::Duration,
    channel: InMemoryPushChannel,
    holders: Arc<Mutex<HashMap<(ShowingId, SeatId), UserId>>>,
}

impl InMemoryLockServer {
    /// Creates a server granting `hold`-long locks
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, channel: InMemoryPushChannel, hold: chrono::Duration) -> Self {
        Self {
            clock,
            hold,
            channel,
            holders: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A lock client acting as `user_id`
    #[must_use]
    pub fn client(&self, user_id: UserId) -> LockClient {
        LockClient {
            server: self.clone(),
            user_id,
        }
    }

    /// Current holder of a seat
    #[must_use]
    pub fn holder(&self, showing_id: ShowingId, seat_id: SeatId) -> Option<UserId> {
        self.holders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(showing_id, seat_id))
            .copied()
    }

    fn publish(&self, showing_id: ShowingId, seat_id: SeatId, status: RemoteSeatStatus, user_id: UserId) {
        let event = PushEvent::SeatStatusChanged(SeatStatusChanged {
            showing_id,
            seat_id,
            status,
            user_id: Some(user_id),
        });
        match event.encode() {
            Ok(frame) => {
                self.channel.publish(&showing_id.topic(), frame);
            },
            Err(error) => tracing::warn!(%error, "Failed to encode seat event"),
        }
    }
}

/// One user's view of an [`InMemoryLockServer`]
#[derive(Clone)]
pub struct LockClient {
    server: InMemoryLockServer,
    user_id: UserId,
}

impl SeatLockService for LockClient {
    fn lock_seat(&self, showing_id: ShowingId, seat_id: SeatId) -> LockFuture<'_, LockGrant> {
        Box::pin(async move {
            {
                let mut holders = self
                    .server
                    .holders
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                match holders.get(&(showing_id, seat_id)) {
                    Some(holder) if *holder != self.user_id => {
                        return Err(LockError::Rejected {
                            reason: format!("seat {seat_id} is held by another user"),
                        });
                    },
                    _ => {
                        holders.insert((showing_id, seat_id), self.user_id);
                    },
                }
            }

            self.server
                .publish(showing_id, seat_id, RemoteSeatStatus::Locked, self.user_id);
            Ok(LockGrant {
                expires_at: self.server.clock.now() + self.server.hold,
            })
        })
    }

    fn unlock_seat(&self, showing_id: ShowingId, seat_id: SeatId) -> LockFuture<'_, ()> {
        Box::pin(async move {
            {
                let mut holders = self
                    .server
                    .holders
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if holders.get(&(showing_id, seat_id)) != Some(&self.user_id) {
                    return Err(LockError::Rejected {
                        reason: format!("seat {seat_id} is not held by you"),
                    });
                }
                holders.remove(&(showing_id, seat_id));
            }

            self.server
                .publish(showing_id, seat_id, RemoteSeatStatus::Available, self.user_id);
            Ok(())
        })
    }
}

/// Notifier that keeps every notice
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notice so far, in order
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `notice` was shown
    #[must_use]
    pub fn count(&self, notice: &Notice) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| *n == notice)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
