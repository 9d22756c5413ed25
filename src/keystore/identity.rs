//! Identity Key Pair
//!
//! A single Ed25519 key pair serves both for signing prekeys and, through
//! curve conversion, for X25519 key agreement.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use zeroize::Zeroizing;

use crate::crypto::SecureRandom;
use crate::error::{ProtocolError, ProtocolResult};

/// Identity Key Pair (Ed25519)
#[derive(Clone)]
pub struct IdentityKeyPair {
    signing: SigningKey,
}

impl IdentityKeyPair {
    /// Generate a new identity key pair
    pub fn generate(rng: &mut SecureRandom) -> ProtocolResult<Self> {
        let seed = Zeroizing::new(rng.gen_bytes::<32>()?);
        Ok(Self::from_seed(&seed))
    }

    /// Restore an identity from its 32-byte private seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Private seed, zeroized when dropped
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing.to_bytes())
    }

    /// Public identity key
    pub fn public_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Public identity key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing.verifying_key().to_bytes()
    }

    /// Sign a message with Ed25519
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public_bytes())
            .finish_non_exhaustive()
    }
}

/// Parse a peer's Ed25519 identity key.
///
/// # Errors
/// `InvalidKeySize` for a wrong length, `InvalidPublicKey` if the bytes do
/// not decompress to a curve point.
pub fn parse_identity_key(bytes: &[u8]) -> ProtocolResult<VerifyingKey> {
    let arr: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| ProtocolError::InvalidKeySize {
        expected: PUBLIC_KEY_LENGTH,
        actual: bytes.len(),
    })?;
    VerifyingKey::from_bytes(&arr).map_err(|_| ProtocolError::InvalidPublicKey)
}

/// Verify an Ed25519 signature made by `identity` over `message`.
pub fn verify_signature(identity: &VerifyingKey, message: &[u8], signature: &[u8]) -> ProtocolResult<()> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ProtocolError::InvalidSignature);
    }

    let sig = Signature::from_slice(signature).map_err(|_| ProtocolError::InvalidSignature)?;
    identity
        .verify(message, &sig)
        .map_err(|_| ProtocolError::InvalidSignature)
}
