//! Realtime guestbook: an in-memory message store served over GraphQL, and
//! a client that keeps an optimistic, de-duplicated view of the feed.

pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod message;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod store;

pub use error::{GuestbookError, Result};
pub use feed::{merge, FeedEvent, FeedView};
pub use message::{Message, NewMessage};
pub use store::{InMemoryStore, MessageStore, Page};
