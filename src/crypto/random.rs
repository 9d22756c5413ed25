//! Secure Random Number Generation
//!
//! Provides cryptographically secure random bytes from the OS RNG. A
//! failing entropy source is reported as [`CryptoError::RandomFailed`]
//! instead of aborting.

use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};
use super::{CryptoError, CryptoResult};

/// Secure Random Number Generator
///
/// Wraps the operating system's cryptographically secure RNG.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureRandom {
    #[zeroize(skip)]
    inner: OsRng,
}

impl SecureRandom {
    /// Create a new secure random generator
    pub fn new() -> Self {
        Self { inner: OsRng }
    }

    /// Fill a byte slice with random bytes
    ///
    /// # Errors
    /// Returns `CryptoError::RandomFailed` if the OS RNG is unavailable
    pub fn try_fill_bytes(&mut self, dest: &mut [u8]) -> CryptoResult<()> {
        self.inner
            .try_fill_bytes(dest)
            .map_err(|_| CryptoError::RandomFailed)
    }

    /// Generate a random byte array
    pub fn gen_bytes<const N: usize>(&mut self) -> CryptoResult<[u8; N]> {
        let mut arr = [0u8; N];
        self.try_fill_bytes(&mut arr)?;
        Ok(arr)
    }
}

impl Default for SecureRandom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let mut rng = SecureRandom::new();
        let bytes1 = rng.gen_bytes::<32>().unwrap();
        let bytes2 = rng.gen_bytes::<32>().unwrap();

        // Extremely unlikely to be equal
        assert_ne!(bytes1, bytes2);
    }

    #[test]
    fn test_fill_bytes() {
        let mut rng = SecureRandom::new();
        let mut buf = [0u8; 64];
        rng.try_fill_bytes(&mut buf).unwrap();

        assert!(buf.iter().any(|&b| b != 0));
    }
}
