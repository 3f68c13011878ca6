//! # Seatlock Runtime
//!
//! Runtime implementation for seatlock reducers.
//!
//! This crate provides the [`Store`], which owns one component instance's
//! state, serializes every reducer call under a single write lock and
//! executes the effects those calls return.
//!
//! ## Core Components
//!
//! - **Store**: Manages state and executes effects
//! - **Effect Executor**: Runs effect descriptions and feeds resulting actions back
//! - **Effect Handles**: Let callers wait for the effects of one action to finish
//!
//! ## Example
//!
//! ```ignore
//! use seatlock_runtime::Store;
//!
//! let store = Store::new(initial_state, SelectionReducer::new(), environment);
//!
//! // Send an action
//! let mut handle = store.send(SelectionAction::ToggleSeat { seat_id }).await?;
//! handle.wait().await;
//!
//! // Read state
//! let selected = store.state(|s| s.selection().len()).await;
//! ```

use seatlock_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timed out waiting for in-flight effects or a terminal action
        #[error("Timeout waiting for effects")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the feedback-action broadcast channel
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] so callers can wait until the effects of
/// that one action have finished. Actions fed back by those effects are not
/// tracked; use [`Store::settle`] to wait for the store as a whole.
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };
        (handle, tracking)
    }

    /// Create a handle that is already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects from this action still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait until every effect spawned by the action has completed
    pub async fn wait(&mut self) {
        loop {
            if self.effects.load(Ordering::SeqCst) == 0 {
                return;
            }
            if self.completion.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait for completion with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Internal: per-action effect counter shared with running effects
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Keeps counts right even if an effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (store-wide pending count)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, Ordering, Reducer, RwLock, StoreConfig, StoreError,
    };
    use tokio::sync::broadcast;

    /// Poll interval used while waiting for in-flight effects to drain
    const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; every reducer call takes the write lock)
    /// 2. Reducer (decision logic)
    /// 3. Environment (injected collaborators)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Cloning a Store is cheap and yields a handle to the same instance.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        armed_timers: Arc<AtomicUsize>,
        default_shutdown_timeout: Duration,
        /// Every action produced by an effect is broadcast here before it
        /// is fed back into the reducer.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                armed_timers: Arc::new(AtomicUsize::new(0)),
                default_shutdown_timeout: config.default_shutdown_timeout,
                action_broadcast,
            }
        }

        /// Access the injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.environment
        }

        /// Number of effects currently running across the whole store
        ///
        /// A delayed action only counts once its timer has fired.
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Number of delayed actions still waiting for their timer
        #[must_use]
        pub fn armed_timers(&self) -> usize {
            self.armed_timers.load(Ordering::Acquire)
        }

        /// Whether shutdown has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Starts the returned effects
        ///
        /// `send()` returns once effects are started, not finished. Concurrent
        /// `send()` calls serialize at the reducer.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let (handle, ()) = self.dispatch(action, |_| ()).await?;
            Ok(handle)
        }

        /// Send an action after inspecting the state it will be reduced against
        ///
        /// `observe` runs under the same write lock as the reducer, so no other
        /// action can land between what it sees and the reduction.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip_all, name = "store_send_observed")]
        pub async fn send_observed<T, F>(&self, action: A, observe: F) -> Result<(EffectHandle, T), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            self.dispatch(action, observe).await
        }

        async fn dispatch<T, F>(&self, action: A, observe: F) -> Result<(EffectHandle, T), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let (observed, effects) = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let observed = observe(&*state);

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                (observed, effects)
            };

            for effect in effects {
                self.execute_effect(effect, tracking.clone());
            }

            Ok((handle, observed))
        }

        /// Subscribe to every action produced by effects
        ///
        /// Actions sent directly through [`Store::send`] are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let busy = store.state(|s| s.is_busy()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Wait until no effect is running anywhere in the store
        ///
        /// Feedback actions start new effects, so this waits for whole
        /// cascades rather than single actions. Armed timers are not waited
        /// for.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Timeout`] if effects are still running when
        /// the timeout elapses.
        pub async fn settle(&self, timeout: Duration) -> Result<(), StoreError> {
            let pending = Arc::clone(&self.pending_effects);
            tokio::time::timeout(timeout, async move {
                while pending.load(Ordering::Acquire) > 0 {
                    tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)
        }

        /// Initiate graceful shutdown
        ///
        /// New actions are rejected immediately; running effects get until
        /// `timeout` to finish. Armed timers are abandoned: when they fire,
        /// their action is rejected and dropped. Calling it twice is harmless.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
        /// still running if they did not drain in time.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!(timeout_ms = timeout.as_millis(), "Initiating store shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = tokio::time::Instant::now();
            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);
                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        }

        /// Shut down with the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.default_shutdown_timeout).await
        }

        fn spawn_tracked<F>(&self, tracking: &EffectTracking, fut: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
            let guard = DecrementGuard(tracking.clone());

            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                fut.await;
            });
        }

        /// Execute an effect with tracking
        ///
        /// Reducer panics propagate. Effect failures are the effect's own
        /// business: a failed service call is expected to come back as a
        /// feedback action, and a panicking effect task only loses itself.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into each spawned task
        fn execute_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let store = self.clone();
                    self.spawn_tracked(&tracking, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();
                    tracking.increment();
                    let guard = DecrementGuard(tracking);
                    self.armed_timers.fetch_add(1, Ordering::SeqCst);
                    let armed_guard = AtomicCounterGuard(Arc::clone(&self.armed_timers));

                    tokio::spawn(async move {
                        let _guard = guard;
                        tokio::time::sleep(duration).await;
                        drop(armed_guard);

                        store.pending_effects.fetch_add(1, Ordering::SeqCst);
                        let _pending_guard =
                            AtomicCounterGuard(Arc::clone(&store.pending_effects));
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    let store = self.clone();
                    self.spawn_tracked(&tracking, async move {
                        for effect in effects {
                            let (mut step, step_tracking) = EffectHandle::new();
                            store.execute_effect(effect, step_tracking);
                            step.wait().await;
                        }
                    });
                },
            }
        }

        async fn feed_back(&self, action: A) {
            let _ = self.action_broadcast.send(action.clone());
            if let Err(error) = self.send(action).await {
                tracing::debug!(%error, "Dropped feedback action");
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                armed_timers: Arc::clone(&self.armed_timers),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;
