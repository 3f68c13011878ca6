//! In-memory push channel for tests
//!
//! Each topic is a `tokio::sync::broadcast` channel. Tests publish raw text
//! frames and observe how many subscribers are registered, which is how
//! unsubscribe-on-unmount is verified.

use seatlock_core::push::{PushChannel, PushError, PushSubscription};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct Topics {
    senders: HashMap<String, broadcast::Sender<String>>,
    active: HashMap<String, usize>,
    fail_next_subscribe: Option<String>,
}

/// In-memory push channel
///
/// Clones share the same topics.
///
/// # Example
///
/// ```
/// use seatlock_testing::InMemoryPushChannel;
///
/// let channel = InMemoryPushChannel::new(16);
/// assert_eq!(channel.subscriber_count("showing"), 0);
/// assert_eq!(channel.publish("showing", "{}"), 0);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryPushChannel {
    capacity: usize,
    topics: Arc<Mutex<Topics>>,
}

impl InMemoryPushChannel {
    /// Create a channel whose topics buffer `capacity` frames per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(Mutex::new(Topics::default())),
        }
    }

    /// Publish a frame to every live subscriber of `topic`
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, topic: &str, frame: impl Into<String>) -> usize {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .senders
            .get(topic)
            .and_then(|sender| sender.send(frame.into()).ok())
            .unwrap_or(0)
    }

    /// Number of subscriptions on `topic` that have not been released
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.active.get(topic).copied().unwrap_or(0)
    }

    /// Make the next `subscribe` call fail with the given reason
    pub fn fail_next_subscribe(&self, reason: impl Into<String>) {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.fail_next_subscribe = Some(reason.into());
    }

    fn register(&self, topic: &str) -> Result<broadcast::Receiver<String>, PushError> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(reason) = topics.fail_next_subscribe.take() {
            return Err(PushError::SubscriptionFailed {
                topic: topic.to_string(),
                reason,
            });
        }

        let capacity = self.capacity;
        let receiver = topics
            .senders
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();
        *topics.active.entry(topic.to_string()).or_insert(0) += 1;
        Ok(receiver)
    }
}

impl PushChannel for InMemoryPushChannel {
    fn subscribe(
        &self,
        topic: &str,
    ) -> Pin<Box<dyn Future<Output = Result<PushSubscription, PushError>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let mut receiver = self.register(&topic)?;

            let stream = async_stream::stream! {
                loop {
                    match receiver.recv().await {
                        Ok(frame) => yield Ok(frame),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            yield Err(PushError::Lagged(skipped));
                        },
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };

            let topics = Arc::clone(&self.topics);
            let released = topic.clone();
            Ok(
                PushSubscription::new(topic, Box::pin(stream)).with_unsubscribe_hook(move || {
                    let mut topics = topics.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Some(count) = topics.active.get_mut(&released) {
                        *count = count.saturating_sub(1);
                    }
                }),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let channel = InMemoryPushChannel::new(8);
        let mut sub = channel.subscribe("showing-1").await.unwrap();
        assert_eq!(channel.subscriber_count("showing-1"), 1);

        assert_eq!(channel.publish("showing-1", "hello"), 1);
        assert_eq!(sub.next().await, Some(Ok("hello".to_string())));
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let channel = InMemoryPushChannel::new(8);
        let _sub = channel.subscribe("showing-1").await.unwrap();
        assert_eq!(channel.publish("showing-2", "hello"), 0);
        assert_eq!(channel.subscriber_count("showing-2"), 0);
    }

    #[tokio::test]
    async fn test_drop_decrements_subscriber_count() {
        let channel = InMemoryPushChannel::new(8);
        let first = channel.subscribe("showing-1").await.unwrap();
        let second = channel.subscribe("showing-1").await.unwrap();
        assert_eq!(channel.subscriber_count("showing-1"), 2);

        first.unsubscribe();
        assert_eq!(channel.subscriber_count("showing-1"), 1);
        drop(second);
        assert_eq!(channel.subscriber_count("showing-1"), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_sees_error() {
        let channel = InMemoryPushChannel::new(1);
        let mut sub = channel.subscribe("showing-1").await.unwrap();
        channel.publish("showing-1", "one");
        channel.publish("showing-1", "two");

        assert_eq!(sub.next().await, Some(Err(PushError::Lagged(1))));
        assert_eq!(sub.next().await, Some(Ok("two".to_string())));
    }

    #[tokio::test]
    async fn test_fail_next_subscribe() {
        let channel = InMemoryPushChannel::new(8);
        channel.fail_next_subscribe("offline");

        let err = channel.subscribe("showing-1").await.unwrap_err();
        assert!(matches!(err, PushError::SubscriptionFailed { ref reason, .. } if reason == "offline"));
        assert_eq!(channel.subscriber_count("showing-1"), 0);
        assert!(channel.subscribe("showing-1").await.is_ok());
    }
}
