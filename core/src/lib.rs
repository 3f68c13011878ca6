//! # Seatlock Core
//!
//! Core traits and types for reducer-driven seat selection.
//!
//! The seat-selection client is modelled as a functional core with an
//! imperative shell. Every state transition (a click, a lock response, a
//! push event, an expiring hold) goes through one pure function, and all
//! I/O is described as [`effect::Effect`] values that a runtime executes.
//!
//! ## Core Concepts
//!
//! - **State**: The selection and seat map owned by one component instance
//! - **Action**: All inputs to a reducer (user commands, service feedback, push events)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected collaborators (clock, lock service, notifier)
//!
//! ## Example
//!
//! ```ignore
//! use seatlock_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for SelectionReducer {
//!     type State = SelectionState;
//!     type Action = SelectionAction;
//!     type Environment = SelectionEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut SelectionState,
//!         action: SelectionAction,
//!         env: &SelectionEnvironment,
//!     ) -> SmallVec<[Effect<SelectionAction>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Push channel abstraction for server-to-client notifications
pub mod push;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all decision logic and are deterministic and testable
/// without a runtime.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce at most a handful of effects, hence the
        /// inline capacity of four.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution), and they compose.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (hold expiry timers)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Whether this effect is a no-op
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Hold expiry is computed against `now()`, so tests swap in a clock
    /// they can move by hand.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};
    use std::time::Duration;

    #[derive(Clone, Debug)]
    enum TestAction {
        Fired,
    }

    #[test]
    fn test_effect_debug_hides_futures() {
        let effect: Effect<TestAction> = Effect::Future(Box::pin(async { None }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }

    #[test]
    fn test_effect_merge_and_chain() {
        let merged = Effect::merge(vec![Effect::<TestAction>::None, Effect::None]);
        assert!(matches!(merged, Effect::Parallel(ref effects) if effects.len() == 2));

        let chained = Effect::chain(vec![Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(TestAction::Fired),
        }]);
        assert!(matches!(chained, Effect::Sequential(ref effects) if effects.len() == 1));
        assert!(!chained.is_none());
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
