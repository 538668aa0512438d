//! Test doubles for the random source.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::entropy::{EntropySource, SystemEntropySource};
use crate::error::CryptoError;

/// Random source that counts draws and can be switched to fail.
///
/// Successful draws are served by [`SystemEntropySource`].
#[derive(Debug, Default)]
pub struct MockEntropySource {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockEntropySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every draw fails until [`set_failing(false)`](Self::set_failing).
    pub fn failing() -> Self {
        let source = Self::default();
        source.set_failing(true);
        source
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `fill_bytes` calls so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EntropySource for MockEntropySource {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CryptoError::RandomSourceUnavailable(
                "mock entropy source failure".to_string(),
            ));
        }
        SystemEntropySource.fill_bytes(dest)
    }
}
