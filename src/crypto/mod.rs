//! Cryptographic Primitives
//!
//! Thin, fallible wrappers over audited primitives:
//! - X25519 key pairs and zeroizable symmetric keys
//! - HKDF / HMAC key derivation (SHA-256)
//! - AES-256-CBC message encryption with PKCS#7 padding
//! - HMAC-SHA256 authentication tags
//! - OS randomness that reports failure instead of panicking

pub mod encryptor;
pub mod kdf;
pub mod keys;
pub mod padding;
pub mod random;

pub use encryptor::*;
pub use kdf::*;
pub use keys::*;
pub use padding::*;
pub use random::*;

pub(crate) use keys::fingerprint;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Crypto Errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Peer public key yields a non-contributory shared secret
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Ciphertext is empty or not block aligned
    #[error("Invalid ciphertext")]
    InvalidCiphertext,

    /// Malformed PKCS#7 trailer
    #[error("Invalid padding")]
    InvalidPadding,

    /// Authentication failed
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Random generation failed
    #[error("Random generation failed")]
    RandomFailed,

    /// Key derivation failed
    #[error("Key derivation failed")]
    KeyDerivationFailed,
}

/// Result type for crypto operations
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

/// Key length in bytes (256 bits)
pub const KEY_LENGTH: usize = 32;

/// AES block size, also the CBC IV length
pub const AES_BLOCK_SIZE: usize = 16;

/// Shortest accepted truncated HMAC tag
pub const MIN_TAG_LENGTH: usize = 16;

/// Full HMAC-SHA256 output length
pub const MAX_TAG_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

fn tag_mac(auth_key: &SymmetricKey, associated_data: &[u8], message: &[u8]) -> CryptoResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(auth_key.as_bytes())
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    mac.update(associated_data);
    mac.update(message);
    Ok(mac)
}

/// Compute a truncated HMAC-SHA256 tag over `associated_data || message`.
///
/// # Arguments
/// * `auth_key` - Authentication key returned alongside a ciphertext
/// * `associated_data` - Session associated data
/// * `message` - Header and ciphertext
/// * `tag_len` - Output length, between 16 and 32 bytes
pub fn compute_tag(
    auth_key: &SymmetricKey,
    associated_data: &[u8],
    message: &[u8],
    tag_len: usize,
) -> CryptoResult<Vec<u8>> {
    if !(MIN_TAG_LENGTH..=MAX_TAG_LENGTH).contains(&tag_len) {
        return Err(CryptoError::InvalidKeyLength {
            expected: MAX_TAG_LENGTH,
            actual: tag_len,
        });
    }

    let full = tag_mac(auth_key, associated_data, message)?.finalize().into_bytes();
    Ok(full[..tag_len].to_vec())
}

/// Verify a truncated tag produced by [`compute_tag`] in constant time.
pub fn verify_tag(
    auth_key: &SymmetricKey,
    associated_data: &[u8],
    message: &[u8],
    tag: &[u8],
) -> CryptoResult<()> {
    if !(MIN_TAG_LENGTH..=MAX_TAG_LENGTH).contains(&tag.len()) {
        return Err(CryptoError::AuthenticationFailed);
    }

    tag_mac(auth_key, associated_data, message)?
        .verify_truncated_left(tag)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
