//! Per-key encryption session.
//!
//! Encrypt: lock nonce → (generate | increase) → unlock → seal(chunk)
//! Decrypt: open(chunk.iv, chunk.ct); session nonce state is not touched.
//!
//! The session is the single owner of the nonce buffer for its key. The lock
//! serialises every nonce advance, so chunks encrypted concurrently through
//! the same session never share a nonce.

use notesync_crypto::{
    Clock, EncryptionContext, EntropySource, ItemCipher, NonceManager, SystemClock,
    SystemEntropySource, AES_GCM_TAG_LENGTH,
};
use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::chunk::EncryptedChunk;
use crate::config::E2eeConfig;
use crate::error::E2eeError;

pub struct EncryptionSession<E = SystemEntropySource, C = SystemClock> {
    cipher: ItemCipher,
    nonces: NonceManager<E, C>,
    /// Last nonce handed out. `None` until the first encryption.
    nonce: Mutex<Option<Vec<u8>>>,
    max_chunk_size: usize,
}

impl EncryptionSession {
    /// Session backed by the OS random source and the system clock.
    ///
    /// # Arguments
    /// * `key` - 32-byte (256-bit) raw key material
    /// * `config` - Nonce layout and chunking settings
    pub fn new(key: &[u8], config: &E2eeConfig) -> Result<Self, E2eeError> {
        Self::with_sources(key, config, SystemEntropySource, SystemClock)
    }
}

impl<E: EntropySource, C: Clock> EncryptionSession<E, C> {
    /// Session with injected random and time sources.
    pub fn with_sources(
        key: &[u8],
        config: &E2eeConfig,
        entropy: E,
        clock: C,
    ) -> Result<Self, E2eeError> {
        config.validate()?;
        let cipher = ItemCipher::new(key)?;
        let nonces = NonceManager::new(config.nonce_layout, entropy, clock)?;
        Ok(Self {
            cipher,
            nonces,
            nonce: Mutex::new(None),
            max_chunk_size: config.max_chunk_size,
        })
    }

    /// Snapshot of the last nonce used for encryption.
    pub fn current_nonce(&self) -> Option<Vec<u8>> {
        self.nonce.lock().clone()
    }

    pub fn nonce_manager(&self) -> &NonceManager<E, C> {
        &self.nonces
    }

    /// Reserve the next nonce. On error the stored nonce is unchanged.
    fn next_nonce(&self) -> Result<Vec<u8>, E2eeError> {
        let mut current = self.nonce.lock();
        match current.as_mut() {
            Some(nonce) => {
                self.nonces.increase_nonce(nonce)?;
                Ok(nonce.clone())
            }
            None => {
                let fresh = self.nonces.new_nonce()?;
                tracing::debug!("encryption session started first nonce epoch");
                *current = Some(fresh.clone());
                Ok(fresh)
            }
        }
    }

    /// Encrypt one chunk under the next nonce.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        context: Option<&EncryptionContext>,
    ) -> Result<EncryptedChunk, E2eeError> {
        let iv = self.next_nonce()?;
        let ct = self.cipher.seal(&iv, plaintext, context)?;
        Ok(EncryptedChunk { iv, ct })
    }

    pub fn decrypt(
        &self,
        chunk: &EncryptedChunk,
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<u8>, E2eeError> {
        self.nonces.layout().check_len(&chunk.iv)?;
        Ok(self.cipher.open(&chunk.iv, &chunk.ct, context)?)
    }

    /// Split `data` into chunks of at most `max_chunk_size` bytes and encrypt
    /// each under its own nonce. Empty data yields a single empty chunk.
    ///
    /// Every chunk is bound to its index and the chunk count, so an item with
    /// dropped or reordered chunks fails to decrypt.
    pub fn encrypt_item(
        &self,
        data: &[u8],
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<EncryptedChunk>, E2eeError> {
        let parts: Vec<&[u8]> = if data.is_empty() {
            vec![data]
        } else {
            data.chunks(self.max_chunk_size).collect()
        };
        let count = chunk_count(parts.len())?;

        let chunks = parts
            .into_iter()
            .zip(0..count)
            .map(|(part, index)| self.encrypt(part, Some(&chunk_context(context, index, count))))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            bytes = data.len(),
            chunks = chunks.len(),
            "encrypted item"
        );
        Ok(chunks)
    }

    /// Decrypt chunks produced by [`encrypt_item`](Self::encrypt_item) and
    /// concatenate their plaintexts in order.
    pub fn decrypt_item(
        &self,
        chunks: &[EncryptedChunk],
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<u8>, E2eeError> {
        if chunks.is_empty() {
            return Err(E2eeError::InvalidChunk("item has no chunks".to_string()));
        }
        let count = chunk_count(chunks.len())?;

        // Exact capacity: a reallocation would leave plaintext in the freed buffer.
        let capacity = chunks
            .iter()
            .map(|chunk| chunk.ct.len().saturating_sub(AES_GCM_TAG_LENGTH))
            .sum();
        let mut data = Vec::with_capacity(capacity);
        for (chunk, index) in chunks.iter().zip(0..count) {
            let part = Zeroizing::new(
                self.decrypt(chunk, Some(&chunk_context(context, index, count)))?,
            );
            data.extend_from_slice(&part);
        }
        Ok(data)
    }
}

fn chunk_count(len: usize) -> Result<u32, E2eeError> {
    u32::try_from(len)
        .map_err(|_| E2eeError::InvalidChunk(format!("item has too many chunks: {len}")))
}

/// Context for chunk `index` of `count`. Items without an id bind the
/// position under an empty id.
fn chunk_context(
    context: Option<&EncryptionContext>,
    index: u32,
    count: u32,
) -> EncryptionContext {
    context
        .cloned()
        .unwrap_or_else(|| EncryptionContext::new(""))
        .with_chunk(index, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_crypto::test_utils::MockEntropySource;
    use notesync_crypto::{random_bytes, CryptoError, ManualClock, NonceLayout};

    fn random_key() -> Vec<u8> {
        random_bytes(32).unwrap()
    }

    #[test]
    fn first_encrypt_generates_then_increments() {
        let clock = ManualClock::new(1_000);
        let session = EncryptionSession::with_sources(
            &random_key(),
            &E2eeConfig::default(),
            SystemEntropySource,
            &clock,
        )
        .unwrap();
        assert!(session.current_nonce().is_none());

        let layout = *session.nonce_manager().layout();
        let first = session.encrypt(b"a", None).unwrap();
        clock.advance(10);
        let second = session.encrypt(b"b", None).unwrap();
        let third = session.encrypt(b"c", None).unwrap();

        assert_eq!(layout.counter(&first.iv).unwrap(), 0);
        assert_eq!(layout.counter(&second.iv).unwrap(), 1);
        assert_eq!(layout.counter(&third.iv).unwrap(), 2);
        assert_eq!(layout.prefix(&first.iv).unwrap(), layout.prefix(&third.iv).unwrap());
        assert_eq!(layout.timestamp(&third.iv).unwrap(), 1_000);
        assert_eq!(session.current_nonce().unwrap(), third.iv);
    }

    #[test]
    fn round_trip() {
        let session = EncryptionSession::new(&random_key(), &E2eeConfig::default()).unwrap();
        let chunk = session.encrypt(b"Hello, World!", None).unwrap();
        assert_eq!(session.decrypt(&chunk, None).unwrap(), b"Hello, World!");
    }

    #[test]
    fn decrypt_with_other_session_same_key() {
        let key = random_key();
        let alice = EncryptionSession::new(&key, &E2eeConfig::default()).unwrap();
        let bob = EncryptionSession::new(&key, &E2eeConfig::default()).unwrap();
        let ctx = EncryptionContext::new("note-1");

        let chunk = alice.encrypt(b"shared", Some(&ctx)).unwrap();
        assert_eq!(bob.decrypt(&chunk, Some(&ctx)).unwrap(), b"shared");
        assert!(bob.current_nonce().is_none());
    }

    #[test]
    fn rejects_short_key() {
        let err = EncryptionSession::new(&[0u8; 16], &E2eeConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            E2eeError::Crypto(CryptoError::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn rejects_chunk_with_wrong_nonce_length() {
        let session = EncryptionSession::new(&random_key(), &E2eeConfig::default()).unwrap();
        let mut chunk = session.encrypt(b"data", None).unwrap();
        chunk.iv.truncate(12);
        assert!(matches!(
            session.decrypt(&chunk, None),
            Err(E2eeError::Crypto(CryptoError::InvalidLength {
                expected: 36,
                got: 12
            }))
        ));
    }

    #[test]
    fn entropy_failure_aborts_encryption() {
        let entropy = MockEntropySource::failing();
        let session = EncryptionSession::with_sources(
            &random_key(),
            &E2eeConfig::default(),
            &entropy,
            SystemClock,
        )
        .unwrap();

        assert!(matches!(
            session.encrypt(b"data", None),
            Err(E2eeError::Crypto(CryptoError::RandomSourceUnavailable(_)))
        ));
        assert!(session.current_nonce().is_none());

        entropy.set_failing(false);
        let chunk = session.encrypt(b"data", None).unwrap();
        assert_eq!(session.decrypt(&chunk, None).unwrap(), b"data");
    }

    #[test]
    fn entropy_failure_on_rollover_keeps_last_nonce() {
        let entropy = MockEntropySource::new();
        let config = E2eeConfig {
            nonce_layout: NonceLayout::new(27, 8, 1).unwrap(),
            ..E2eeConfig::default()
        };
        let session =
            EncryptionSession::with_sources(&random_key(), &config, &entropy, SystemClock)
                .unwrap();

        for _ in 0..256 {
            session.encrypt(b"x", None).unwrap();
        }
        let last = session.current_nonce().unwrap();
        assert_eq!(config.nonce_layout.counter(&last).unwrap(), 0xFF);

        entropy.set_failing(true);
        assert!(session.encrypt(b"x", None).is_err());
        assert_eq!(session.current_nonce().unwrap(), last);
    }

    #[test]
    fn encrypt_item_splits_into_chunks() {
        let config = E2eeConfig {
            max_chunk_size: 4,
            ..E2eeConfig::default()
        };
        let session = EncryptionSession::new(&random_key(), &config).unwrap();
        let ctx = EncryptionContext::new("resource-1");

        let chunks = session.encrypt_item(b"0123456789", Some(&ctx)).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].ct.len(), 2 + 16);

        let data = session.decrypt_item(&chunks, Some(&ctx)).unwrap();
        assert_eq!(data, b"0123456789");
    }

    #[test]
    fn encrypt_item_empty_data() {
        let session = EncryptionSession::new(&random_key(), &E2eeConfig::default()).unwrap();
        let chunks = session.encrypt_item(b"", None).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(session.decrypt_item(&chunks, None).unwrap().is_empty());
    }

    #[test]
    fn decrypt_item_rejects_no_chunks() {
        let session = EncryptionSession::new(&random_key(), &E2eeConfig::default()).unwrap();
        assert!(matches!(
            session.decrypt_item(&[], None),
            Err(E2eeError::InvalidChunk(_))
        ));
    }

    fn two_byte_chunks() -> EncryptionSession {
        let config = E2eeConfig {
            max_chunk_size: 2,
            ..E2eeConfig::default()
        };
        EncryptionSession::new(&random_key(), &config).unwrap()
    }

    #[test]
    fn reordered_chunks_fail() {
        let session = two_byte_chunks();
        let mut chunks = session.encrypt_item(b"aabb", None).unwrap();
        chunks.swap(0, 1);
        assert!(matches!(
            session.decrypt_item(&chunks, None),
            Err(E2eeError::Crypto(CryptoError::DecryptionFailed(_)))
        ));
    }

    #[test]
    fn truncated_item_fails() {
        let session = two_byte_chunks();
        let ctx = EncryptionContext::new("note-1");
        let chunks = session.encrypt_item(b"aabbcc", Some(&ctx)).unwrap();
        assert_eq!(chunks.len(), 3);

        assert!(session.decrypt_item(&chunks[..2], Some(&ctx)).is_err());
        assert!(session.decrypt_item(&chunks[1..], Some(&ctx)).is_err());
    }

    #[test]
    fn item_chunk_does_not_open_as_single_message() {
        let session = two_byte_chunks();
        let ctx = EncryptionContext::new("note-1");
        let chunks = session.encrypt_item(b"aabb", Some(&ctx)).unwrap();
        assert!(session.decrypt(&chunks[0], Some(&ctx)).is_err());
        assert!(session.decrypt(&chunks[0], None).is_err());
    }

    #[test]
    fn decrypt_item_allocates_exact_output() {
        let session = two_byte_chunks();
        let chunks = session.encrypt_item(b"aabbc", None).unwrap();
        let data = session.decrypt_item(&chunks, None).unwrap();
        assert_eq!(data, b"aabbc");
        assert_eq!(data.capacity(), data.len());
    }
}
