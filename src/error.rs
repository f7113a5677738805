use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum GuestbookError {
    #[error("{0} must not be empty")]
    Validation(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("Unexpected protocol frame: {0}")]
    Protocol(String),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {reason}")]
    Config { key: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, GuestbookError>;
