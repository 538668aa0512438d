//! Encryption service layer: per-key sessions that own nonce state, chunked
//! item encryption, and the encrypted chunk format.

pub mod chunk;
pub mod config;
pub mod error;
pub mod session;

pub use chunk::EncryptedChunk;
pub use config::{E2eeConfig, DEFAULT_CHUNK_SIZE};
pub use error::E2eeError;
pub use session::EncryptionSession;
