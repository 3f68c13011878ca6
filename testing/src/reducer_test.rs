//! Ergonomic testing utilities for reducers
//!
//! Given-When-Then syntax over a single reducer, with no runtime involved.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use seatlock_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// When several actions are queued with [`ReducerTest::when_actions`], only
/// the effects of the last one are handed to the effect assertions.
///
/// # Example
///
/// ```ignore
/// use seatlock_testing::ReducerTest;
///
/// ReducerTest::new(SelectionReducer::new())
///     .with_env(test_environment())
///     .given_state(SelectionState::new(map, 2))
///     .when_action(SelectionAction::ToggleSeat { seat_id: a1 })
///     .then_state(|state| assert_eq!(state.selection(), &[a1]))
///     .then_effects(|effects| assert_eq!(effects.len(), 1))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Queue several actions, reduced in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use seatlock_core::effect::Effect;
    use std::time::Duration;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Find the first delayed action, searching nested compositions
    #[must_use]
    pub fn find_delay<A>(effects: &[Effect<A>]) -> Option<(Duration, &A)> {
        effects.iter().find_map(|effect| match effect {
            Effect::Delay { duration, action } => Some((*duration, action.as_ref())),
            Effect::Parallel(inner) | Effect::Sequential(inner) => find_delay(inner),
            Effect::None | Effect::Future(_) => None,
        })
    }

    /// Assert that a delayed action is scheduled and return it
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    #[must_use]
    pub fn expect_delay<A>(effects: &[Effect<A>]) -> (Duration, &A) {
        match find_delay(effects) {
            Some(found) => found,
            None => panic!("Expected a Delay effect, but none found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatlock_core::{SmallVec, delay, smallvec};
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct HoldState {
        held: u32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum HoldAction {
        Hold,
        Release,
        Expire,
    }

    struct HoldReducer;

    impl Reducer for HoldReducer {
        type State = HoldState;
        type Action = HoldAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                HoldAction::Hold => {
                    state.held += 1;
                    smallvec![delay! {
                        duration: Duration::from_secs(30),
                        action: HoldAction::Expire
                    }]
                },
                HoldAction::Release | HoldAction::Expire => {
                    state.held = state.held.saturating_sub(1);
                    smallvec![Effect::None]
                },
            }
        }
    }

    #[test]
    fn test_hold_schedules_expiry() {
        ReducerTest::new(HoldReducer)
            .with_env(())
            .given_state(HoldState { held: 0 })
            .when_action(HoldAction::Hold)
            .then_state(|state| assert_eq!(state.held, 1))
            .then_effects(|effects| {
                let (duration, action) = assertions::expect_delay(effects);
                assert_eq!(duration, Duration::from_secs(30));
                assert_eq!(action, &HoldAction::Expire);
            })
            .run();
    }

    #[test]
    fn test_when_actions_keeps_last_effects() {
        ReducerTest::new(HoldReducer)
            .with_env(())
            .given_state(HoldState { held: 0 })
            .when_actions([HoldAction::Hold, HoldAction::Hold, HoldAction::Release])
            .then_state(|state| assert_eq!(state.held, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_find_delay_searches_nested() {
        let effects = vec![Effect::merge(vec![
            Effect::None,
            Effect::chain(vec![delay! {
                duration: Duration::from_secs(5),
                action: HoldAction::Expire
            }]),
        ])];
        assert!(assertions::find_delay(&effects).is_some());
        assert!(assertions::find_delay::<HoldAction>(&[Effect::None]).is_none());
    }

    #[test]
    fn test_assertions_effects_count() {
        assertions::assert_effects_count(&[Effect::<HoldAction>::None], 1);
        assertions::assert_effects_count::<HoldAction>(&[], 0);
    }
}
