use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("invalid relay url: {0}")]
    BadUrl(#[from] url::ParseError),

    #[error("relay connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("relay closed before assigning a peer id")]
    NoWelcome,

    #[error("mesh event loop has shut down")]
    LoopClosed,
}
