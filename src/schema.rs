use std::sync::Arc;

use async_graphql::{Context, Object, Schema, Subscription, ID};
use futures_util::Stream;

use crate::message::{Message, NewMessage};
use crate::store::{MessageStore, Page};

pub type SharedStore = Arc<dyn MessageStore>;
pub type GuestbookSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(store: SharedStore) -> GuestbookSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(store)
        .finish()
}

#[Object]
impl Message {
    async fn id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn text(&self) -> &str {
        &self.text
    }

    async fn created_at(&self) -> &str {
        &self.created_at
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Newest first.
    async fn messages(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 30)] limit: Option<i32>,
        #[graphql(default = 0)] offset: Option<i32>,
    ) -> Vec<Message> {
        // An explicit null falls back to the same defaults.
        let page = Page::clamped(limit.unwrap_or(30), offset.unwrap_or(0));
        let store = ctx.data_unchecked::<SharedStore>();
        store.list(page).await
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn add_message(
        &self,
        ctx: &Context<'_>,
        name: String,
        text: String,
    ) -> async_graphql::Result<Message> {
        let draft = NewMessage::new(&name, &text)?;
        let store = ctx.data_unchecked::<SharedStore>();
        Ok(store.append(draft).await)
    }
}

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    async fn message_added(&self, ctx: &Context<'_>) -> impl Stream<Item = Message> {
        let store = ctx.data_unchecked::<SharedStore>();
        store.subscribe().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn sdl_exposes_the_guestbook_operations() {
        let schema = build_schema(Arc::new(InMemoryStore::new()));
        let sdl = schema.sdl();

        assert!(sdl.contains("limit: Int = 30"));
        assert!(sdl.contains("offset: Int = 0"));
        assert!(sdl.contains("[Message!]!"));
        assert!(sdl.contains("addMessage(name: String!, text: String!): Message!"));
        assert!(sdl.contains("messageAdded: Message!"));
        assert!(sdl.contains("createdAt: String!"));
        assert!(sdl.contains("id: ID!"));
    }
}
