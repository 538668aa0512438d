/// Total nonce length in bytes for the AES-256-GCM instance used for sync items.
///
/// Layout: [random:21][timestamp:7 LE][counter:8 BE]
pub const NONCE_LENGTH: usize = 36;

/// Random prefix length in bytes.
pub const NONCE_RANDOM_LENGTH: usize = 21;

/// Timestamp segment length in bytes (milliseconds, little-endian, truncated).
pub const NONCE_TIMESTAMP_LENGTH: usize = 7;

/// Counter suffix length in bytes (big-endian).
pub const NONCE_COUNTER_LENGTH: usize = 8;

/// AES-GCM tag length in bytes (128 bits).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// AES key length in bytes (256 bits).
pub const AES_KEY_LENGTH: usize = 32;

/// Context for binding ciphertext to a specific item via AAD.
/// Prevents moving a ciphertext from one item to another.
#[derive(Debug, Clone)]
pub struct EncryptionContext {
    /// Item ID (note, folder, resource...) the ciphertext belongs to.
    pub item_id: String,
    /// Position of the chunk within a chunked item.
    pub chunk: Option<ChunkPosition>,
}

/// Index of a chunk and the number of chunks in its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPosition {
    pub index: u32,
    pub count: u32,
}

impl EncryptionContext {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            chunk: None,
        }
    }

    /// Same item, bound to chunk `index` of `count`.
    pub fn with_chunk(mut self, index: u32, count: u32) -> Self {
        self.chunk = Some(ChunkPosition { index, count });
        self
    }
}
