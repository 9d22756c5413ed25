//! Curve Conversion
//!
//! Maps Ed25519 keys to their X25519 counterparts (RFC 7748 §4.1) so a
//! single identity key can both sign and take part in key agreement.

use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::ProtocolResult;
use crate::keystore::parse_identity_key;

/// Convert an Ed25519 private key into an X25519 private key.
///
/// The scalar is the lower half of SHA-512 over the 32-byte seed, the same
/// value Ed25519 itself clamps and uses for signing. X25519 applies the
/// clamping again on use.
pub fn ed25519_secret_to_x25519(key: &SigningKey) -> StaticSecret {
    let seed = Zeroizing::new(key.to_bytes());
    let mut digest = Zeroizing::new([0u8; 64]);
    digest.copy_from_slice(&Sha512::digest(seed.as_slice()));

    let mut scalar = Zeroizing::new([0u8; 32]);
    scalar.copy_from_slice(&digest[..32]);
    StaticSecret::from(*scalar)
}

/// Convert an Ed25519 public key into an X25519 public key.
///
/// Applies the birational map `u = (1 + y) / (1 - y)` from the Edwards
/// y-coordinate to the Montgomery u-coordinate.
pub fn ed25519_public_to_x25519(key: &VerifyingKey) -> PublicKey {
    PublicKey::from(key.to_montgomery().to_bytes())
}

/// Parse raw Ed25519 public key bytes and convert them to X25519.
pub fn ed25519_public_bytes_to_x25519(bytes: &[u8]) -> ProtocolResult<PublicKey> {
    let key = parse_identity_key(bytes)?;
    Ok(ed25519_public_to_x25519(&key))
}
