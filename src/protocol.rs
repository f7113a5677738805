use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Subprotocol negotiated on the websocket handshake.
pub const GRAPHQL_TRANSPORT_WS: &str = "graphql-transport-ws";

const MESSAGE_FIELDS: &str = "id name text createdAt";

pub fn messages_query() -> String {
    format!(
        "query Messages($limit: Int, $offset: Int) {{ messages(limit: $limit, offset: $offset) {{ {MESSAGE_FIELDS} }} }}"
    )
}

pub fn add_message_mutation() -> String {
    format!(
        "mutation AddMessage($name: String!, $text: String!) {{ addMessage(name: $name, text: $text) {{ {MESSAGE_FIELDS} }} }}"
    )
}

pub fn message_added_subscription() -> String {
    format!("subscription MessageAdded {{ messageAdded {{ {MESSAGE_FIELDS} }} }}")
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Value,
}

#[derive(Deserialize, Debug)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorBody>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphQlErrorBody {
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct MessagesData {
    pub messages: Vec<Message>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageData {
    pub add_message: Message,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageAddedData {
    pub message_added: Message,
}

/// Frames a client sends over `graphql-transport-ws`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "connection_init")]
    ConnectionInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    #[serde(rename = "subscribe")]
    Subscribe {
        id: String,
        payload: GraphQlRequest,
    },
    #[serde(rename = "complete")]
    Complete {
        id: String,
    },
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
}

/// Frames a server sends over `graphql-transport-ws`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "connection_ack")]
    ConnectionAck {
        #[serde(default)]
        payload: Option<Value>,
    },
    #[serde(rename = "next")]
    Next {
        id: String,
        payload: Value,
    },
    #[serde(rename = "error")]
    Error {
        id: String,
        payload: Vec<GraphQlErrorBody>,
    },
    #[serde(rename = "complete")]
    Complete {
        id: String,
    },
    #[serde(rename = "ping")]
    Ping {
        #[serde(default)]
        payload: Option<Value>,
    },
    #[serde(rename = "pong")]
    Pong {
        #[serde(default)]
        payload: Option<Value>,
    },
}
