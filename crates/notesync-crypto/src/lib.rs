pub mod cipher;
pub mod clock;
pub mod entropy;
pub mod error;
pub mod nonce;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cipher::{open, seal, ItemCipher, CIPHER_NONCE_LENGTH};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entropy::{random_bytes, EntropySource, SystemEntropySource};
pub use error::CryptoError;
pub use nonce::{generate_nonce, increase_nonce, NonceLayout, NonceManager, MAX_RANDOM_LENGTH};
pub use types::{
    ChunkPosition, EncryptionContext, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH, NONCE_COUNTER_LENGTH,
    NONCE_LENGTH, NONCE_RANDOM_LENGTH, NONCE_TIMESTAMP_LENGTH,
};
