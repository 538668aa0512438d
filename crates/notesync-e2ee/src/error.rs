use thiserror::Error;

#[derive(Debug, Error)]
pub enum E2eeError {
    #[error("Invalid encrypted chunk: {0}")]
    InvalidChunk(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] notesync_crypto::CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
