use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Event pipeline closed")]
    SinkClosed,
}

pub type Result<T> = std::result::Result<T, AdapterError>;
