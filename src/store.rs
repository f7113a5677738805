use async_trait::async_trait;
use log::info;
use tokio::sync::RwLock;

use crate::broker::{Broker, Subscription, Topic};
use crate::message::{Message, NewMessage};

pub const DEFAULT_PAGE_LIMIT: usize = 30;

/// A newest-first window: skip `offset` of the most recent messages, then take `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Page { limit, offset }
    }

    /// Negative values are clamped to zero.
    pub fn clamped(limit: i32, offset: i32) -> Self {
        Page {
            limit: usize::try_from(limit).unwrap_or(0),
            offset: usize::try_from(offset).unwrap_or(0),
        }
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list(&self, page: Page) -> Vec<Message>;

    /// Stores the draft under a fresh id and notifies every active subscriber.
    async fn append(&self, draft: NewMessage) -> Message;

    async fn subscribe(&self) -> Subscription<Message>;
}

/// Process-lifetime store. Appends are serialized, so every subscriber
/// observes messages in acceptance order.
#[derive(Default)]
pub struct InMemoryStore {
    messages: RwLock<Vec<Message>>,
    broker: Broker<Message>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the welcome message in place.
    pub fn seeded() -> Self {
        Self::with_messages(vec![Message::welcome()])
    }

    /// `messages` are taken oldest first.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        InMemoryStore {
            messages: RwLock::new(messages),
            broker: Broker::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.broker.subscriber_count(Topic::MessageAdded).await
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn list(&self, page: Page) -> Vec<Message> {
        let messages = self.messages.read().await;
        messages
            .iter()
            .rev()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect()
    }

    async fn append(&self, draft: NewMessage) -> Message {
        let mut messages = self.messages.write().await;
        // Stamped under the lock so `createdAt` order matches list order.
        let message = Message::new(draft);
        messages.push(message.clone());
        // Publishing under the write lock keeps delivery order equal to acceptance order.
        let delivered = self.broker.publish(Topic::MessageAdded, &message).await;
        drop(messages);

        info!(
            "Message {} from {} stored, delivered to {} subscriber(s)",
            message.id, message.name, delivered
        );
        message
    }

    async fn subscribe(&self) -> Subscription<Message> {
        self.broker.subscribe(Topic::MessageAdded).await
    }
}
