use futures_util::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

use crate::config::ClientConfig;
use crate::error::{GuestbookError, Result};
use crate::feed::{merge, FeedEvent, FeedView};
use crate::message::{Message, NewMessage};
use crate::protocol::{
    add_message_mutation, message_added_subscription, messages_query, AddMessageData, ClientFrame,
    GraphQlRequest, GraphQlResponse, MessageAddedData, MessagesData, ServerFrame,
    GRAPHQL_TRANSPORT_WS,
};
use crate::store::Page;

const SUBSCRIPTION_ID: &str = "message-added";

/// Talks to the guestbook API: HTTP for queries and mutations, a websocket for the feed.
#[derive(Clone)]
pub struct GuestbookClient {
    http: reqwest::Client,
    http_url: String,
    ws_url: String,
}

impl GuestbookClient {
    pub fn new(config: &ClientConfig) -> Self {
        GuestbookClient {
            http: reqwest::Client::new(),
            http_url: config.http_url.clone(),
            ws_url: config.ws_url.clone(),
        }
    }

    pub async fn messages(&self, page: Page) -> Result<Vec<Message>> {
        let data: MessagesData = self
            .execute(
                messages_query(),
                json!({ "limit": page.limit, "offset": page.offset }),
            )
            .await?;
        Ok(data.messages)
    }

    pub async fn add_message(&self, draft: &NewMessage) -> Result<Message> {
        let data: AddMessageData = self
            .execute(
                add_message_mutation(),
                json!({ "name": draft.name(), "text": draft.text() }),
            )
            .await?;
        Ok(data.add_message)
    }

    /// Subscribes, then loads the first page. Anything posted in between is
    /// already in the page, and its broadcast later merges as a known id.
    /// A failed load is reported through the returned view.
    pub async fn open_feed(&self) -> Result<(FeedView, mpsc::UnboundedReceiver<Result<Message>>)> {
        let feed = self.subscribe().await?;
        let view = match self.messages(Page::default()).await {
            Ok(messages) => merge(FeedView::new(), FeedEvent::Loaded(messages)),
            Err(e) => {
                error!("Failed to load messages: {}", e);
                merge(FeedView::new(), FeedEvent::LoadFailed(e.to_string()))
            }
        };
        Ok((view, feed))
    }

    /// Opens the `messageAdded` feed. The returned channel closes when the
    /// server completes the subscription or the connection drops; a transport
    /// failure is delivered as the final item.
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<Result<Message>>> {
        let mut request = self.ws_url.as_str().into_client_request()?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(GRAPHQL_TRANSPORT_WS),
        );

        let (ws, _) = connect_async(request).await?;
        let (mut ws_tx, mut ws_rx) = ws.split();

        send_frame(&mut ws_tx, &ClientFrame::ConnectionInit { payload: None }).await?;
        loop {
            match next_frame(&mut ws_rx).await? {
                ServerFrame::ConnectionAck { .. } => break,
                ServerFrame::Ping { .. } => send_frame(&mut ws_tx, &ClientFrame::Pong).await?,
                other => return Err(GuestbookError::Protocol(format!("{other:?}"))),
            }
        }

        send_frame(
            &mut ws_tx,
            &ClientFrame::Subscribe {
                id: SUBSCRIPTION_ID.to_string(),
                payload: GraphQlRequest {
                    query: message_added_subscription(),
                    variables: json!({}),
                },
            },
        )
        .await?;
        info!("Subscribed to new messages at {}", self.ws_url);

        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match next_frame(&mut ws_rx).await {
                    Ok(ServerFrame::Next { payload, .. }) => {
                        let item = decode::<MessageAddedData>(payload).map(|d| d.message_added);
                        if tx.send(item).is_err() {
                            debug!("Feed receiver dropped, completing subscription");
                            let complete = ClientFrame::Complete {
                                id: SUBSCRIPTION_ID.to_string(),
                            };
                            if let Err(e) = send_frame(&mut ws_tx, &complete).await {
                                debug!("Failed to send complete frame: {}", e);
                            }
                            break;
                        }
                    }
                    Ok(ServerFrame::Error { payload, .. }) => {
                        let errors = payload.into_iter().map(|e| e.message).collect();
                        let _ = tx.send(Err(GuestbookError::GraphQl(errors)));
                        break;
                    }
                    Ok(ServerFrame::Complete { .. }) => {
                        info!("Server completed the subscription");
                        break;
                    }
                    Ok(ServerFrame::Ping { .. }) => {
                        if let Err(e) = send_frame(&mut ws_tx, &ClientFrame::Pong).await {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                    Ok(frame) => debug!("Ignoring frame {:?}", frame),
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn execute<T: DeserializeOwned>(&self, query: String, variables: Value) -> Result<T> {
        let request = GraphQlRequest { query, variables };
        let response: Value = self
            .http
            .post(&self.http_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        decode(response)
    }
}

/// Unwraps a GraphQL response body, turning reported errors into `GraphQl`.
fn decode<T: DeserializeOwned>(body: Value) -> Result<T> {
    let response: GraphQlResponse<T> = serde_json::from_value(body)?;
    if !response.errors.is_empty() {
        let errors: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        warn!("GraphQL errors: {}", errors.join("; "));
        return Err(GuestbookError::GraphQl(errors));
    }
    response
        .data
        .ok_or_else(|| GuestbookError::Protocol("response without data".to_string()))
}

async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> Result<()>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame)?;
    sink.send(WsMessage::text(text)).await?;
    Ok(())
}

async fn next_frame<S>(stream: &mut S) -> Result<ServerFrame>
where
    S: Stream<Item = std::result::Result<WsMessage, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message? {
            WsMessage::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            WsMessage::Close(frame) => {
                return Err(GuestbookError::Protocol(format!(
                    "connection closed: {frame:?}"
                )))
            }
            _ => {}
        }
    }
    Err(GuestbookError::Protocol("connection closed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn decode_returns_data() {
        let data: MessagesData = decode(json!({
            "data": { "messages": [
                { "id": "1", "name": "Admin", "text": "welcome", "createdAt": "2024-01-01T00:00:00.000Z" }
            ] }
        }))
        .unwrap();
        assert_eq!(data.messages.len(), 1);
        assert_eq!(data.messages[0].name, "Admin");
    }

    #[test]
    fn decode_surfaces_graphql_errors() {
        let result: Result<AddMessageData> = decode(json!({
            "data": null,
            "errors": [{ "message": "name must not be empty" }]
        }));
        assert!(matches!(
            result,
            Err(GuestbookError::GraphQl(errors)) if errors == vec!["name must not be empty".to_string()]
        ));
    }

    #[tokio::test]
    async fn next_frame_skips_control_messages() {
        let mut frames = stream::iter(vec![
            Ok(WsMessage::Ping(Default::default())),
            Ok(WsMessage::text(r#"{"type":"connection_ack"}"#)),
        ]);

        let frame = next_frame(&mut frames).await.unwrap();
        assert_eq!(frame, ServerFrame::ConnectionAck { payload: None });
    }

    #[tokio::test]
    async fn next_frame_reports_closed_connection() {
        let mut frames = stream::iter(Vec::<std::result::Result<WsMessage, tungstenite::Error>>::new());
        assert!(matches!(
            next_frame(&mut frames).await,
            Err(GuestbookError::Protocol(_))
        ));
    }
}
