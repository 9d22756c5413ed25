//! PreKey Pairs
//!
//! Signed prekeys are raw X25519 key pairs signed by the identity key.
//! One-time prekeys are Ed25519 key pairs, like identity keys, and are
//! converted to X25519 during key agreement.

use std::fmt;

use ed25519_dalek::{Signature, SigningKey, SIGNATURE_LENGTH};
use zeroize::Zeroizing;

use crate::crypto::{DhKeyPair, SecureRandom, KEY_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};
use super::{verify_signature, IdentityKeyPair};

/// Signed PreKey Pair
#[derive(Clone)]
pub struct SignedPreKeyPair {
    key_pair: DhKeyPair,
    signature: Signature,
}

impl SignedPreKeyPair {
    /// Generate a fresh X25519 key pair and sign its public half
    ///
    /// # Arguments
    /// * `identity` - Identity key pair for signing
    pub fn generate_signed(identity: &IdentityKeyPair, rng: &mut SecureRandom) -> ProtocolResult<Self> {
        let key_pair = DhKeyPair::generate(rng)?;
        let signature = identity.sign(key_pair.public().as_bytes());

        Ok(Self { key_pair, signature })
    }

    /// Rebuild a signed prekey from stored parts
    pub fn from_parts(secret: [u8; KEY_LENGTH], signature: &[u8]) -> ProtocolResult<Self> {
        let sig = Signature::from_slice(signature).map_err(|_| ProtocolError::InvalidSignature)?;
        Ok(Self {
            key_pair: DhKeyPair::from_secret_bytes(secret),
            signature: sig,
        })
    }

    /// Underlying X25519 key pair
    pub fn key_pair(&self) -> &DhKeyPair {
        &self.key_pair
    }

    /// Public key bytes
    pub fn public_bytes(&self) -> [u8; KEY_LENGTH] {
        self.key_pair.public_bytes()
    }

    /// Ed25519 signature of the public key
    pub fn signature_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.signature.to_bytes()
    }

    /// Check the signature against an identity
    pub fn verify_signature(&self, identity: &IdentityKeyPair) -> bool {
        verify_signature(&identity.public_key(), &self.public_bytes(), &self.signature_bytes()).is_ok()
    }
}

impl fmt::Debug for SignedPreKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedPreKeyPair")
            .field("public", &self.public_bytes())
            .finish_non_exhaustive()
    }
}

/// One-Time PreKey Pair
#[derive(Clone)]
pub struct OneTimePreKeyPair {
    signing: SigningKey,
}

impl OneTimePreKeyPair {
    /// Generate a new one-time prekey
    pub fn generate(rng: &mut SecureRandom) -> ProtocolResult<Self> {
        let seed = Zeroizing::new(rng.gen_bytes::<32>()?);
        Ok(Self::from_seed(&seed))
    }

    /// Restore from the 32-byte private seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Private seed, zeroized when dropped
    pub fn seed(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing.to_bytes())
    }

    /// Public key bytes (Ed25519 encoding)
    pub fn public_bytes(&self) -> [u8; KEY_LENGTH] {
        self.signing.verifying_key().to_bytes()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}

impl fmt::Debug for OneTimePreKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneTimePreKeyPair")
            .field("public", &self.public_bytes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_prekey() {
        let mut rng = SecureRandom::new();
        let identity = IdentityKeyPair::generate(&mut rng).unwrap();
        let other = IdentityKeyPair::generate(&mut rng).unwrap();
        let spk = SignedPreKeyPair::generate_signed(&identity, &mut rng).unwrap();

        assert_eq!(spk.signature_bytes().len(), 64);
        assert!(spk.verify_signature(&identity));
        assert!(!spk.verify_signature(&other));
    }

    #[test]
    fn test_signed_prekey_from_parts() {
        let mut rng = SecureRandom::new();
        let identity = IdentityKeyPair::generate(&mut rng).unwrap();
        let spk = SignedPreKeyPair::generate_signed(&identity, &mut rng).unwrap();

        let restored = SignedPreKeyPair::from_parts(
            *spk.key_pair().secret_bytes(),
            &spk.signature_bytes(),
        )
        .unwrap();

        assert_eq!(restored.public_bytes(), spk.public_bytes());
        assert!(restored.verify_signature(&identity));
        assert!(SignedPreKeyPair::from_parts([0u8; 32], &[0u8; 10]).is_err());
    }

    #[test]
    fn test_one_time_prekey_generation() {
        let mut rng = SecureRandom::new();
        let a = OneTimePreKeyPair::generate(&mut rng).unwrap();
        let b = OneTimePreKeyPair::generate(&mut rng).unwrap();

        assert_ne!(a.public_bytes(), b.public_bytes());
        assert_eq!(
            OneTimePreKeyPair::from_seed(&a.seed()).public_bytes(),
            a.public_bytes()
        );
    }
}
