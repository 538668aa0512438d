//! Counter-based nonces for item encryption.
//!
//! Nonce layout (defaults shown):
//! [random:21][timestamp:7 LE][counter:8 BE] = 36 bytes
//!
//! A nonce is minted once per epoch (one random + timestamp draw) and then
//! advanced in place by incrementing its counter. When the counter is at its
//! maximum, the next increment mints a fresh prefix and resets the counter
//! instead of wrapping, so a (prefix, counter) pair is never produced twice.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::entropy::{EntropySource, SystemEntropySource};
use crate::error::CryptoError;
use crate::types::{NONCE_COUNTER_LENGTH, NONCE_RANDOM_LENGTH, NONCE_TIMESTAMP_LENGTH};

/// Upper bound on the random region of a configurable layout.
pub const MAX_RANDOM_LENGTH: usize = 1024;

/// Widths of the three nonce regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonceLayout {
    /// Leading bytes drawn from the secure random source. Between 1 and
    /// [`MAX_RANDOM_LENGTH`].
    pub random_len: usize,
    /// Millisecond timestamp bytes, little-endian. At most 8.
    pub timestamp_len: usize,
    /// Trailing big-endian counter bytes. Between 1 and 8.
    pub counter_len: usize,
}

impl Default for NonceLayout {
    fn default() -> Self {
        Self {
            random_len: NONCE_RANDOM_LENGTH,
            timestamp_len: NONCE_TIMESTAMP_LENGTH,
            counter_len: NONCE_COUNTER_LENGTH,
        }
    }
}

impl NonceLayout {
    /// Build a validated layout.
    pub fn new(
        random_len: usize,
        timestamp_len: usize,
        counter_len: usize,
    ) -> Result<Self, CryptoError> {
        let layout = Self {
            random_len,
            timestamp_len,
            counter_len,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        if !(1..=MAX_RANDOM_LENGTH).contains(&self.random_len) {
            return Err(CryptoError::InvalidLayout(format!(
                "random region must be between 1 and {MAX_RANDOM_LENGTH} bytes, got {}",
                self.random_len
            )));
        }
        if self.timestamp_len > 8 {
            return Err(CryptoError::InvalidLayout(format!(
                "timestamp region must be at most 8 bytes, got {}",
                self.timestamp_len
            )));
        }
        if !(1..=8).contains(&self.counter_len) {
            return Err(CryptoError::InvalidLayout(format!(
                "counter region must be between 1 and 8 bytes, got {}",
                self.counter_len
            )));
        }
        Ok(())
    }

    /// Total nonce length in bytes. Saturates for layouts that fail [`validate`](Self::validate).
    pub fn total_len(&self) -> usize {
        self.random_len
            .saturating_add(self.timestamp_len)
            .saturating_add(self.counter_len)
    }

    pub fn random_range(&self) -> Range<usize> {
        0..self.random_len
    }

    pub fn timestamp_range(&self) -> Range<usize> {
        self.random_len..self.random_len + self.timestamp_len
    }

    pub fn counter_range(&self) -> Range<usize> {
        self.random_len + self.timestamp_len..self.total_len()
    }

    /// Largest value the counter region can hold.
    pub fn counter_max(&self) -> u64 {
        match self.counter_len {
            0 => 0,
            len @ 1..=7 => u64::MAX >> (64 - 8 * len as u32),
            _ => u64::MAX,
        }
    }

    /// Fail with `InvalidLength` unless `nonce` matches this layout.
    pub fn check_len(&self, nonce: &[u8]) -> Result<(), CryptoError> {
        if nonce.len() != self.total_len() {
            return Err(CryptoError::InvalidLength {
                expected: self.total_len(),
                got: nonce.len(),
            });
        }
        Ok(())
    }

    /// Decode the big-endian counter region.
    pub fn counter(&self, nonce: &[u8]) -> Result<u64, CryptoError> {
        self.check_len(nonce)?;
        Ok(nonce[self.counter_range()]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Decode the little-endian timestamp region.
    ///
    /// The value is the clock reading truncated to `timestamp_len` bytes.
    pub fn timestamp(&self, nonce: &[u8]) -> Result<u64, CryptoError> {
        self.check_len(nonce)?;
        Ok(nonce[self.timestamp_range()]
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Random + timestamp prefix, fixed for the lifetime of an epoch.
    pub fn prefix<'a>(&self, nonce: &'a [u8]) -> Result<&'a [u8], CryptoError> {
        self.check_len(nonce)?;
        Ok(&nonce[..self.counter_range().start])
    }

    fn write_counter(&self, nonce: &mut [u8], value: u64) {
        let range = self.counter_range();
        nonce[range].copy_from_slice(&value.to_be_bytes()[8 - self.counter_len..]);
    }

    fn write_timestamp(&self, nonce: &mut [u8], millis: u64) {
        let range = self.timestamp_range();
        nonce[range].copy_from_slice(&millis.to_le_bytes()[..self.timestamp_len]);
    }
}

/// Mints and advances nonces for one layout.
///
/// The manager holds no nonce state; buffers are owned by the caller and
/// mutated in place. Calls for the same buffer must be serialized by the
/// caller.
#[derive(Debug, Clone)]
pub struct NonceManager<E = SystemEntropySource, C = SystemClock> {
    layout: NonceLayout,
    entropy: E,
    clock: C,
}

impl NonceManager {
    /// Default layout backed by the OS random source and system clock.
    pub fn system() -> Self {
        Self {
            layout: NonceLayout::default(),
            entropy: SystemEntropySource,
            clock: SystemClock,
        }
    }
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::system()
    }
}

impl<E: EntropySource, C: Clock> NonceManager<E, C> {
    pub fn new(layout: NonceLayout, entropy: E, clock: C) -> Result<Self, CryptoError> {
        layout.validate()?;
        Ok(Self {
            layout,
            entropy,
            clock,
        })
    }

    pub fn layout(&self) -> &NonceLayout {
        &self.layout
    }

    /// Fill `buf` with a fresh nonce: random prefix, current timestamp, zero counter.
    ///
    /// On error `buf` is left unchanged.
    pub fn generate_nonce<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], CryptoError> {
        self.layout.check_len(buf)?;
        self.start_epoch(buf)?;
        tracing::trace!(len = buf.len(), "generated nonce");
        Ok(buf)
    }

    /// Allocate and return a fresh nonce.
    pub fn new_nonce(&self) -> Result<Vec<u8>, CryptoError> {
        let mut buf = vec![0u8; self.layout.total_len()];
        self.generate_nonce(&mut buf)?;
        Ok(buf)
    }

    /// Advance `nonce` in place and return it.
    ///
    /// Increments the counter region. If the counter is already at its
    /// maximum, a new epoch is started in the same buffer instead: fresh
    /// random bytes, current timestamp, counter zero. Neither the clock nor
    /// the random source is touched on the increment path.
    ///
    /// On error `nonce` is left unchanged.
    pub fn increase_nonce<'a>(&self, nonce: &'a mut [u8]) -> Result<&'a mut [u8], CryptoError> {
        let counter = self.layout.counter(nonce)?;

        if counter < self.layout.counter_max() {
            self.layout.write_counter(nonce, counter + 1);
            return Ok(nonce);
        }

        tracing::debug!(
            random_len = self.layout.random_len,
            timestamp_len = self.layout.timestamp_len,
            counter_len = self.layout.counter_len,
            "nonce counter exhausted, starting new epoch"
        );
        self.start_epoch(nonce)?;
        Ok(nonce)
    }

    // Nothing is written to `nonce` until the random draw has succeeded.
    fn start_epoch(&self, nonce: &mut [u8]) -> Result<(), CryptoError> {
        let mut random = vec![0u8; self.layout.random_len];
        self.entropy.fill_bytes(&mut random)?;
        let now = self.clock.now_millis();

        nonce[self.layout.random_range()].copy_from_slice(&random);
        self.layout.write_timestamp(nonce, now);
        self.layout.write_counter(nonce, 0);
        Ok(())
    }
}

/// Fill `buf` with a fresh default-layout nonce using the OS random source and system clock.
pub fn generate_nonce(buf: &mut [u8]) -> Result<&mut [u8], CryptoError> {
    NonceManager::system().generate_nonce(buf)
}

/// Advance a default-layout nonce in place. See [`NonceManager::increase_nonce`].
pub fn increase_nonce(nonce: &mut [u8]) -> Result<&mut [u8], CryptoError> {
    NonceManager::system().increase_nonce(nonce)
}
