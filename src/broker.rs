use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use log::debug;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    MessageAdded,
}

type Channels<T> = HashMap<Topic, HashMap<Uuid, mpsc::UnboundedSender<T>>>;

/// Fan-out registry: every published item is pushed to each open channel of its topic.
pub struct Broker<T> {
    channels: Arc<RwLock<Channels<T>>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Broker {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl<T> Default for Broker<T> {
    fn default() -> Self {
        Broker {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone + Send + 'static> Broker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh channel on `topic`. Only items published afterwards are delivered.
    pub async fn subscribe(&self, topic: Topic) -> Subscription<T> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut channels = self.channels.write().await;
            channels.entry(topic).or_default().insert(id, tx);
        }
        debug!("Subscriber {} registered on {:?}", id, topic);

        Subscription {
            id,
            topic,
            receiver: rx,
            channels: Arc::downgrade(&self.channels),
        }
    }

    /// Pushes `item` to every subscriber of `topic` and returns how many received it.
    /// Channels whose receiving side is gone are pruned on the way.
    pub async fn publish(&self, topic: Topic, item: &T) -> usize {
        let mut channels = self.channels.write().await;
        let Some(subscribers) = channels.get_mut(&topic) else {
            return 0;
        };

        subscribers.retain(|id, sender| {
            if sender.send(item.clone()).is_ok() {
                true
            } else {
                debug!("Pruning closed subscriber {} on {:?}", id, topic);
                false
            }
        });
        subscribers.len()
    }

    pub async fn unsubscribe(&self, topic: Topic, id: Uuid) -> bool {
        let mut channels = self.channels.write().await;
        channels
            .get_mut(&topic)
            .is_some_and(|subscribers| subscribers.remove(&id).is_some())
    }

    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        let channels = self.channels.read().await;
        channels.get(&topic).map_or(0, |subscribers| {
            subscribers.values().filter(|sender| !sender.is_closed()).count()
        })
    }
}

/// Receiving end of one registration. Dropping it unregisters the channel.
pub struct Subscription<T> {
    id: Uuid,
    topic: Topic,
    receiver: mpsc::UnboundedReceiver<T>,
    channels: Weak<RwLock<Channels<T>>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.receiver.close();
        // Under contention the closed sender is pruned by the next publish instead.
        if let Some(registry) = self.channels.upgrade() {
            if let Ok(mut channels) = registry.try_write() {
                if let Some(subscribers) = channels.get_mut(&self.topic) {
                    subscribers.remove(&self.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn publish_reaches_every_subscriber_once() {
        let broker = Broker::new();
        let mut first = broker.subscribe(Topic::MessageAdded).await;
        let mut second = broker.subscribe(Topic::MessageAdded).await;

        assert_eq!(broker.publish(Topic::MessageAdded, &"hello".to_string()).await, 2);

        assert_eq!(first.recv().await.as_deref(), Some("hello"));
        assert_eq!(second.recv().await.as_deref(), Some("hello"));
        assert!(first.receiver.try_recv().is_err());
        assert!(second.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_follows_publish_order() {
        let broker = Broker::new();
        let mut subscription = broker.subscribe(Topic::MessageAdded).await;

        for n in 0..5 {
            broker.publish(Topic::MessageAdded, &n).await;
        }

        let received: Vec<i32> = (&mut subscription).take(5).collect().await;
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_replay() {
        let broker = Broker::new();
        assert_eq!(broker.publish(Topic::MessageAdded, &1).await, 0);

        let mut subscription = broker.subscribe(Topic::MessageAdded).await;
        broker.publish(Topic::MessageAdded, &2).await;

        assert_eq!(subscription.recv().await, Some(2));
    }

    #[tokio::test]
    async fn dropped_subscription_is_removed() {
        let broker = Broker::new();
        let kept = broker.subscribe(Topic::MessageAdded).await;
        let dropped = broker.subscribe(Topic::MessageAdded).await;
        assert_eq!(broker.subscriber_count(Topic::MessageAdded).await, 2);

        drop(dropped);

        assert_eq!(broker.subscriber_count(Topic::MessageAdded).await, 1);
        assert_eq!(broker.publish(Topic::MessageAdded, &7).await, 1);
        drop(kept);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let broker = Broker::new();
        let mut subscription = broker.subscribe(Topic::MessageAdded).await;

        assert!(broker.unsubscribe(Topic::MessageAdded, subscription.id()).await);
        assert!(!broker.unsubscribe(Topic::MessageAdded, subscription.id()).await);

        assert_eq!(broker.publish(Topic::MessageAdded, &1).await, 0);
        assert_eq!(subscription.recv().await, None);
    }
}
