use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GuestbookError, Result};

/// Id prefix reserved for client-side placeholders. Server ids never carry it.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

pub const WELCOME_AUTHOR: &str = "Admin";
pub const WELCOME_TEXT: &str = "Welcome to GraphQL Guestbook 👋";

/// A guestbook entry. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub name: String,
    pub text: String,
    pub created_at: String,
}

impl Message {
    /// Stamps a validated draft with a fresh server id and the current time.
    pub fn new(draft: NewMessage) -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            text: draft.text,
            created_at: now_iso8601(),
        }
    }

    /// Builds the optimistic stand-in shown until the server confirms `draft`.
    pub fn placeholder(draft: &NewMessage) -> Self {
        Message {
            id: format!("{}{}", PLACEHOLDER_PREFIX, Uuid::new_v4()),
            name: draft.name.clone(),
            text: draft.text.clone(),
            created_at: now_iso8601(),
        }
    }

    pub fn welcome() -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            name: WELCOME_AUTHOR.to_string(),
            text: WELCOME_TEXT.to_string(),
            created_at: now_iso8601(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_PREFIX)
    }

    /// True when both entries carry the same author and body.
    pub fn same_content(&self, other: &Message) -> bool {
        self.name == other.name && self.text == other.text
    }
}

/// A `(name, text)` pair that passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    name: String,
    text: String,
}

impl NewMessage {
    /// Trims both fields and rejects blanks.
    pub fn new(name: &str, text: &str) -> Result<Self> {
        let name = name.trim();
        let text = text.trim();

        if name.is_empty() {
            return Err(GuestbookError::Validation("name"));
        }
        if text.is_empty() {
            return Err(GuestbookError::Validation("text"));
        }

        Ok(NewMessage {
            name: name.to_string(),
            text: text.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
