//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants for
//! service calls and expiry timers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use seatlock_core::async_effect;
///
/// async_effect! {
///     let grant = lock_service.lock_seat(showing_id, seat_id).await;
///     Some(SelectionAction::LockGranted { seat_id, expires_at: grant.expires_at })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use seatlock_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(600),
///     action: SelectionAction::ExpireHold { generation: 3 }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create a fire-and-forget `Effect::Future` that runs a synchronous
/// closure and feeds nothing back
///
/// # Example
///
/// ```rust,ignore
/// use seatlock_core::notify_effect;
///
/// let notifier = Arc::clone(&env.notifier);
/// notify_effect!(move || notifier.notify(&notice))
/// ```
#[macro_export]
macro_rules! notify_effect {
    ($f:expr) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move {
            ($f)();
            None
        }))
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Debug)]
    enum TestAction {
        Granted { value: i32 },
        HoldExpired,
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::Granted { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_delay_macro() {
        let effect = delay! {
            duration: Duration::from_secs(30),
            action: TestAction::HoldExpired
        };

        assert!(matches!(effect, Effect::Delay { .. }));
    }

    #[tokio::test]
    async fn test_notify_effect_runs_closure_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let effect: Effect<TestAction> = notify_effect!(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let Effect::Future(fut) = effect else {
            unreachable!("notify_effect! always builds a future");
        };
        assert!(fut.await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
