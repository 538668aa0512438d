//! Encryption service configuration.

use notesync_crypto::{CryptoError, NonceLayout, CIPHER_NONCE_LENGTH};
use serde::{Deserialize, Serialize};

use crate::error::E2eeError;

/// Plaintext bytes per encrypted chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eeConfig {
    /// Region widths of the item nonce. Must add up to the cipher's nonce length.
    pub nonce_layout: NonceLayout,
    /// Items larger than this are split and each chunk gets its own nonce.
    pub max_chunk_size: usize,
}

impl Default for E2eeConfig {
    fn default() -> Self {
        Self {
            nonce_layout: NonceLayout::default(),
            max_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl E2eeConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, E2eeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), E2eeError> {
        self.nonce_layout
            .validate()
            .map_err(|e| E2eeError::Config(e.to_string()))?;

        let total = self.nonce_layout.total_len();
        if total != CIPHER_NONCE_LENGTH {
            return Err(CryptoError::InvalidLength {
                expected: CIPHER_NONCE_LENGTH,
                got: total,
            }
            .into());
        }

        if self.max_chunk_size == 0 {
            return Err(E2eeError::Config(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
