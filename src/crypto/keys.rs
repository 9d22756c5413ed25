//! Key Material
//!
//! Secret values are owned, zeroized on drop and never `Copy`, which
//! bounds how many copies of a chain or message key live in memory.

use std::fmt;

use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{CryptoError, CryptoResult, SecureRandom, KEY_LENGTH};

/// 32-byte symmetric secret: root, chain, message or authentication key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LENGTH]);

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Borrow the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Compute an X25519 shared secret, rejecting low-order peer points.
pub fn diffie_hellman(secret: &StaticSecret, peer: &PublicKey) -> CryptoResult<SymmetricKey> {
    let shared = secret.diffie_hellman(peer);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey);
    }
    Ok(SymmetricKey::from_bytes(*shared.as_bytes()))
}

/// X25519 key pair used for signed prekeys, ephemeral keys and the DH
/// ratchet.
#[derive(Clone)]
pub struct DhKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl DhKeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate(rng: &mut SecureRandom) -> CryptoResult<Self> {
        let mut bytes = Zeroizing::new([0u8; KEY_LENGTH]);
        rng.try_fill_bytes(&mut bytes[..])?;
        Ok(Self::from_secret_bytes(*bytes))
    }

    /// Rebuild a key pair from its private scalar.
    pub fn from_secret_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public half
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Public half as raw bytes
    pub fn public_bytes(&self) -> [u8; KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Private scalar bytes, zeroized when the returned buffer drops.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; KEY_LENGTH]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// X25519 with this key pair's private half.
    pub fn diffie_hellman(&self, peer: &PublicKey) -> CryptoResult<SymmetricKey> {
        diffie_hellman(&self.secret, peer)
    }
}

impl fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhKeyPair")
            .field("public", &self.public.as_bytes())
            .finish_non_exhaustive()
    }
}

/// Parse a 32-byte X25519 public key.
pub fn public_key_from_slice(bytes: &[u8]) -> CryptoResult<PublicKey> {
    let arr: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LENGTH,
        actual: bytes.len(),
    })?;
    Ok(PublicKey::from(arr))
}

/// Short printable fingerprint of a public key, for logs.
pub(crate) fn fingerprint(public: &PublicKey) -> String {
    public.as_bytes()[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
