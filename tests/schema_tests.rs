use std::sync::Arc;
use std::time::Duration;

use async_graphql::{Request, Variables};
use futures_util::StreamExt;
use serde_json::{json, Value};

use guestbook::schema::{build_schema, GuestbookSchema};
use guestbook::InMemoryStore;

async fn run(schema: &GuestbookSchema, query: &str, variables: Value) -> Value {
    let request = Request::new(query).variables(Variables::from_json(variables));
    let response = schema.execute(request).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data.into_json().unwrap()
}

async fn add(schema: &GuestbookSchema, name: &str, text: &str) -> Value {
    let data = run(
        schema,
        "mutation ($name: String!, $text: String!) { addMessage(name: $name, text: $text) { id name text createdAt } }",
        json!({ "name": name, "text": text }),
    )
    .await;
    data["addMessage"].clone()
}

#[tokio::test]
async fn added_message_is_listed_first() {
    let schema = build_schema(Arc::new(InMemoryStore::seeded()));

    let added = add(&schema, "Alice", "hi").await;
    let data = run(
        &schema,
        "{ messages(limit: 1, offset: 0) { id name text } }",
        json!({}),
    )
    .await;

    let messages = data["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], added["id"]);
    assert_eq!(messages[0]["name"], "Alice");
    assert_eq!(messages[0]["text"], "hi");
}

#[tokio::test]
async fn messages_come_back_in_reverse_acceptance_order() {
    let schema = build_schema(Arc::new(InMemoryStore::new()));
    for n in 0..5 {
        add(&schema, "Bob", &format!("message {n}")).await;
    }

    let data = run(&schema, "{ messages(limit: 5) { text } }", json!({})).await;

    let texts: Vec<&str> = data["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(
        texts,
        vec!["message 4", "message 3", "message 2", "message 1", "message 0"]
    );
}

#[tokio::test]
async fn default_arguments_return_the_latest_thirty() {
    let schema = build_schema(Arc::new(InMemoryStore::new()));
    for n in 0..35 {
        add(&schema, "Bob", &n.to_string()).await;
    }

    let data = run(&schema, "{ messages { text } }", json!({})).await;
    let messages = data["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 30);
    assert_eq!(messages[0]["text"], "34");
    assert_eq!(messages[29]["text"], "5");

    let data = run(
        &schema,
        "query ($limit: Int, $offset: Int) { messages(limit: $limit, offset: $offset) { text } }",
        json!({ "limit": null, "offset": null }),
    )
    .await;
    assert_eq!(data["messages"].as_array().unwrap().len(), 30);
}

#[tokio::test]
async fn out_of_range_and_negative_bounds_yield_empty_or_clamped_pages() {
    let schema = build_schema(Arc::new(InMemoryStore::seeded()));

    let data = run(&schema, "{ messages(offset: 10) { id } }", json!({})).await;
    assert_eq!(data["messages"], json!([]));

    let data = run(&schema, "{ messages(limit: -3) { id } }", json!({})).await;
    assert_eq!(data["messages"], json!([]));

    let data = run(&schema, "{ messages(offset: -3) { id } }", json!({})).await;
    assert_eq!(data["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_fields_are_rejected_and_not_stored() {
    let store = Arc::new(InMemoryStore::new());
    let schema = build_schema(store.clone());

    let response = schema
        .execute(r#"mutation { addMessage(name: "   ", text: "hi") { id } }"#)
        .await;

    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "name must not be empty");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn stored_fields_are_trimmed() {
    let schema = build_schema(Arc::new(InMemoryStore::new()));

    let added = add(&schema, "  Alice ", " hi  ").await;

    assert_eq!(added["name"], "Alice");
    assert_eq!(added["text"], "hi");
    assert!(added["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn every_subscription_receives_each_new_message_once() {
    let store = Arc::new(InMemoryStore::new());
    let schema = build_schema(store.clone());

    let mut first = Box::pin(schema.execute_stream("subscription { messageAdded { id name text } }"));
    let mut second = Box::pin(schema.execute_stream("subscription { messageAdded { id name text } }"));

    // Subscriptions register lazily, on the first poll.
    let first_next = tokio::spawn(async move {
        let item = first.next().await;
        (item, first)
    });
    let second_next = tokio::spawn(async move {
        let item = second.next().await;
        (item, second)
    });
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.subscriber_count().await < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("both subscriptions registered");

    let added = add(&schema, "Alice", "hi").await;

    for handle in [first_next, second_next] {
        let (item, mut rest) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("notification in time")
            .unwrap();
        let data = item.unwrap().data.into_json().unwrap();
        assert_eq!(data["messageAdded"]["id"], added["id"]);
        assert_eq!(data["messageAdded"]["name"], "Alice");
        assert_eq!(data["messageAdded"]["text"], "hi");

        let extra = tokio::time::timeout(Duration::from_millis(50), rest.next()).await;
        assert!(extra.is_err(), "received a duplicate notification");
    }
}
