use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures that end the server or a single connection task.
///
/// Per-message problems (malformed frames, intents from inactive
/// connections) never surface here; they are dropped where they occur.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("event loop has shut down")]
    HubClosed,
}
