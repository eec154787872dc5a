use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Unrecognized frame: {0}")]
    UnknownShape(String),
}

pub type Result<T> = std::result::Result<T, DisplayError>;
