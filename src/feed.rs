//! Client-side view of the guestbook.
//!
//! The view merges three sources into one newest-first list: the initial
//! page query, optimistic placeholders inserted on submit, and confirmed
//! messages arriving from the mutation response or the subscription. A
//! placeholder and its confirmed counterpart always collapse into one entry.

use crate::message::Message;

/// Number of entries kept in the view.
pub const FEED_CAPACITY: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Result of the initial page query.
    Loaded(Vec<Message>),
    LoadFailed(String),
    /// Placeholder inserted before the server has seen the message.
    Optimistic(Message),
    /// Server-confirmed message, from a mutation response or a broadcast.
    Confirmed(Message),
    /// The mutation behind this placeholder failed.
    Rejected { placeholder_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<'a> {
    All,
    /// Only entries authored under this name.
    Mine(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedView {
    entries: Vec<Message>,
    state: LoadState,
}

impl FeedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first.
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn visible(&self, filter: Filter<'_>) -> Vec<&Message> {
        match filter {
            Filter::All => self.entries.iter().collect(),
            Filter::Mine(name) => {
                let name = name.trim();
                self.entries.iter().filter(|m| m.name == name).collect()
            }
        }
    }

    #[must_use]
    pub fn apply(self, event: FeedEvent) -> Self {
        merge(self, event)
    }
}

/// Folds one event into the view.
///
/// A confirmed message is matched first by id, then against the oldest
/// placeholder with the same `(name, text)`. A known id leaves the view
/// untouched, so the mutation response and the broadcast for the same
/// message can arrive in either order. Once the initial load has failed,
/// only a fresh `Loaded` changes the view.
#[must_use]
pub fn merge(mut view: FeedView, event: FeedEvent) -> FeedView {
    if matches!(view.state, LoadState::Failed(_)) && !matches!(event, FeedEvent::Loaded(_)) {
        return view;
    }

    match event {
        FeedEvent::Loaded(mut messages) => {
            messages.truncate(FEED_CAPACITY);
            view.entries = messages;
            view.state = LoadState::Ready;
        }
        FeedEvent::LoadFailed(reason) => {
            view.entries.clear();
            view.state = LoadState::Failed(reason);
        }
        FeedEvent::Optimistic(placeholder) => {
            view.entries.insert(0, placeholder);
        }
        FeedEvent::Confirmed(message) => {
            if view.entries.iter().any(|m| m.id == message.id) {
                return view;
            }
            if let Some(pos) = view
                .entries
                .iter()
                .rposition(|m| m.is_placeholder() && m.same_content(&message))
            {
                view.entries.remove(pos);
            }
            view.entries.insert(0, message);
        }
        FeedEvent::Rejected { placeholder_id } => {
            view.entries.retain(|m| m.id != placeholder_id);
        }
    }

    view.entries.truncate(FEED_CAPACITY);
    view
}
