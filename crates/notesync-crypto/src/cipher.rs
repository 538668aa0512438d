//! AES-256-GCM with the 36-byte item nonce.
//!
//! GCM accepts nonces other than 96 bits by hashing them into the initial
//! counter block, so the full counter-based nonce is fed to the cipher as is.
//! Output: [ciphertext][tag:16]. The nonce travels separately.

use aes_gcm::aead::consts::U36;
use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};

use crate::error::CryptoError;
use crate::types::{EncryptionContext, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH};

type CipherNonceSize = U36;
type Aes256Gcm36 = AesGcm<Aes256, CipherNonceSize>;

/// Nonce length required by the cipher. Nonce layouts must add up to this.
pub const CIPHER_NONCE_LENGTH: usize = <CipherNonceSize as Unsigned>::USIZE;

/// Build AAD from encryption context.
/// Format: [4 bytes: itemId length (u32 BE)][itemId UTF-8]
/// Chunked items append [4 bytes: index (u32 BE)][4 bytes: count (u32 BE)].
fn build_aad(context: &EncryptionContext) -> Vec<u8> {
    let item_bytes = context.item_id.as_bytes();
    let mut aad = Vec::with_capacity(4 + item_bytes.len() + 8);
    aad.extend_from_slice(&(item_bytes.len() as u32).to_be_bytes());
    aad.extend_from_slice(item_bytes);
    if let Some(chunk) = context.chunk {
        aad.extend_from_slice(&chunk.index.to_be_bytes());
        aad.extend_from_slice(&chunk.count.to_be_bytes());
    }
    aad
}

fn check_nonce(nonce: &[u8]) -> Result<&Nonce<CipherNonceSize>, CryptoError> {
    if nonce.len() != CIPHER_NONCE_LENGTH {
        return Err(CryptoError::InvalidLength {
            expected: CIPHER_NONCE_LENGTH,
            got: nonce.len(),
        });
    }
    Ok(Nonce::from_slice(nonce))
}

/// AES-256-GCM keyed once and reused for every chunk of a session.
pub struct ItemCipher {
    cipher: Aes256Gcm36,
}

impl ItemCipher {
    /// Create a cipher from 32 bytes of raw key material.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != AES_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                got: key.len(),
            });
        }
        let cipher = Aes256Gcm36::new_from_slice(key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` under `nonce`. Returns ciphertext followed by the tag.
    ///
    /// The caller is responsible for never passing the same nonce twice.
    pub fn seal(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<u8>, CryptoError> {
        let nonce = check_nonce(nonce)?;
        match context {
            Some(ctx) => {
                let aad = build_aad(ctx);
                self.cipher.encrypt(
                    nonce,
                    Payload {
                        msg: plaintext,
                        aad: &aad,
                    },
                )
            }
            None => self.cipher.encrypt(nonce, plaintext),
        }
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Decrypt and authenticate `ciphertext` (ciphertext followed by tag).
    pub fn open(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<u8>, CryptoError> {
        let nonce = check_nonce(nonce)?;
        if ciphertext.len() < AES_GCM_TAG_LENGTH {
            return Err(CryptoError::DataTooShort);
        }
        match context {
            Some(ctx) => {
                let aad = build_aad(ctx);
                self.cipher.decrypt(
                    nonce,
                    Payload {
                        msg: ciphertext,
                        aad: &aad,
                    },
                )
            }
            None => self.cipher.decrypt(nonce, ciphertext),
        }
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

/// One-shot [`ItemCipher::seal`].
pub fn seal(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    context: Option<&EncryptionContext>,
) -> Result<Vec<u8>, CryptoError> {
    ItemCipher::new(key)?.seal(nonce, plaintext, context)
}

/// One-shot [`ItemCipher::open`].
pub fn open(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    context: Option<&EncryptionContext>,
) -> Result<Vec<u8>, CryptoError> {
    ItemCipher::new(key)?.open(nonce, ciphertext, context)
}
