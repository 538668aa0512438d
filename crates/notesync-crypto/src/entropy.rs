//! Secure random byte sources.

use crate::error::CryptoError;

/// Source of cryptographically secure random bytes.
///
/// Failures must surface as [`CryptoError::RandomSourceUnavailable`]. An
/// implementation must never fall back to a weaker generator.
pub trait EntropySource {
    /// Fill `dest` entirely with secure random bytes.
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// OS CSPRNG via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropySource;

impl EntropySource for SystemEntropySource {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        getrandom::getrandom(dest).map_err(|e| {
            tracing::warn!(error = %e, len = dest.len(), "secure random source failed");
            CryptoError::RandomSourceUnavailable(e.to_string())
        })
    }
}

impl<T: EntropySource + ?Sized> EntropySource for &T {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        (**self).fill_bytes(dest)
    }
}

/// Fill a fresh buffer of `len` bytes from the OS CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let mut buf = vec![0u8; len];
    SystemEntropySource.fill_bytes(&mut buf)?;
    Ok(buf)
}
