//! Push channel abstraction for server-to-client notifications.
//!
//! A [`PushChannel`] delivers text frames for a topic (one topic per
//! showing). Subscribing returns a [`PushSubscription`], which owns the frame
//! stream and the deregistration hook. Dropping the subscription, or calling
//! [`PushSubscription::unsubscribe`], deregisters it. This ties the
//! subscription lifetime to whoever owns it rather than to a process-wide
//! singleton.
//!
//! The frame encoding is left to the consumer; this module only moves text.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//!
//! let mut subscription = channel.subscribe("showing-42").await?;
//! while let Some(frame) = subscription.next().await {
//!     match frame {
//!         Ok(text) => handle(&text),
//!         Err(e) => tracing::warn!("push stream error: {e}"),
//!     }
//! }
//! subscription.unsubscribe();
//! ```

use futures::Stream;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;

/// Errors that can occur on a push channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// Failed to connect to the push transport
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to subscribe to a topic
    #[error("Subscription failed for topic '{topic}': {reason}")]
    SubscriptionFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// The subscriber fell behind and frames were dropped
    #[error("Subscriber lagged, {0} frames skipped")]
    Lagged(u64),

    /// Network or transport error
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Stream of text frames from a subscription.
pub type PushStream = Pin<Box<dyn Stream<Item = Result<String, PushError>> + Send>>;

/// Hook run exactly once when a subscription is released.
type UnsubscribeHook = Box<dyn FnOnce() + Send>;

/// A live subscription to one push topic.
///
/// Implements [`Stream`] over the topic's frames. Releasing it (explicitly or
/// by drop) runs the channel's deregistration hook once.
pub struct PushSubscription {
    topic: String,
    stream: PushStream,
    on_unsubscribe: Option<UnsubscribeHook>,
}

impl PushSubscription {
    /// Create a subscription from a frame stream.
    #[must_use]
    pub fn new(topic: impl Into<String>, stream: PushStream) -> Self {
        Self {
            topic: topic.into(),
            stream,
            on_unsubscribe: None,
        }
    }

    /// Attach a deregistration hook, run once on release.
    #[must_use]
    pub fn with_unsubscribe_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_unsubscribe = Some(Box::new(hook));
        self
    }

    /// The topic this subscription listens on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Release the subscription.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl fmt::Debug for PushSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushSubscription")
            .field("topic", &self.topic)
            .field("active", &self.on_unsubscribe.is_some())
            .finish_non_exhaustive()
    }
}

impl Stream for PushSubscription {
    type Item = Result<String, PushError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Trait for push channel implementations.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so that sessions can hold an `Arc<dyn PushChannel>`.
pub trait PushChannel: Send + Sync {
    /// Subscribe to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::SubscriptionFailed`] or
    /// [`PushError::ConnectionFailed`] if the transport refuses the
    /// subscription.
    fn subscribe(
        &self,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<PushSubscription, PushError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frames(items: Vec<&'static str>) -> PushStream {
        Box::pin(futures::stream::iter(
            items.into_iter().map(|s| Ok(s.to_string())),
        ))
    }

    #[tokio::test]
    async fn test_subscription_yields_frames() {
        let mut sub = PushSubscription::new("showing", frames(vec!["a", "b"]));
        assert_eq!(sub.next().await, Some(Ok("a".to_string())));
        assert_eq!(sub.next().await, Some(Ok("b".to_string())));
        assert_eq!(sub.next().await, None);
        assert_eq!(sub.topic(), "showing");
    }

    #[test]
    fn test_unsubscribe_runs_hook_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let sub = PushSubscription::new("showing", frames(vec![]))
            .with_unsubscribe_hook(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        sub.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        {
            let _sub = PushSubscription::new("showing", frames(vec![]))
                .with_unsubscribe_hook(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
