//! Prekey Bundle
//!
//! The public half of a responder's key material, as fetched by an
//! initiator: identity key, signed prekey with signature, an optional
//! one-time prekey and the responder's initial ratchet key.

use ed25519_dalek::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

use crate::crypto::{DhKeyPair, KEY_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};
use crate::keystore::{IdentityKeyPair, OneTimePreKeyPair, SignedPreKeyPair};
use crate::ratchet::Session;
use crate::Config;
use super::{create_initial_message, InitialMessage, OneTimeKey};

/// Published prekey bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrekeyBundle {
    identity_key: [u8; PUBLIC_KEY_LENGTH],
    signed_prekey: [u8; KEY_LENGTH],
    signed_prekey_signature: [u8; SIGNATURE_LENGTH],
    one_time_prekey: OneTimeKey<[u8; PUBLIC_KEY_LENGTH]>,
    ratchet_key: [u8; KEY_LENGTH],
}

impl PrekeyBundle {
    /// Assemble a bundle from local key material for publication.
    pub fn publish(
        identity: &IdentityKeyPair,
        signed_prekey: &SignedPreKeyPair,
        one_time_prekey: OneTimeKey<&OneTimePreKeyPair>,
        ratchet_key: &DhKeyPair,
    ) -> Self {
        Self {
            identity_key: identity.public_bytes(),
            signed_prekey: signed_prekey.public_bytes(),
            signed_prekey_signature: signed_prekey.signature_bytes(),
            one_time_prekey: one_time_prekey.map(OneTimePreKeyPair::public_bytes),
            ratchet_key: ratchet_key.public_bytes(),
        }
    }

    /// Peer identity key
    pub fn identity_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.identity_key
    }

    /// Signed prekey
    pub fn signed_prekey(&self) -> &[u8; KEY_LENGTH] {
        &self.signed_prekey
    }

    /// Signature over the signed prekey
    pub fn signed_prekey_signature(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.signed_prekey_signature
    }

    /// One-time prekey, if the responder had one to spare
    pub fn one_time_prekey(&self) -> OneTimeKey<&[u8; PUBLIC_KEY_LENGTH]> {
        self.one_time_prekey.as_ref()
    }

    /// Responder's initial ratchet public key
    pub fn ratchet_key(&self) -> &[u8; KEY_LENGTH] {
        &self.ratchet_key
    }

    /// Run the key agreement against this bundle and open an active session.
    pub fn initiate(
        &self,
        identity: &IdentityKeyPair,
        config: &Config,
    ) -> ProtocolResult<(Session, InitialMessage)> {
        let initial = create_initial_message(
            identity,
            &self.identity_key,
            self.one_time_prekey.as_ref().map(|k| &k[..]),
            &self.signed_prekey,
            &self.signed_prekey_signature,
        )?;

        let session = Session::create_active(initial.seed.clone(), &self.ratchet_key, config)?;
        Ok((session, initial))
    }
}

/// Prekey Bundle Builder
///
/// Assembles a bundle from untrusted bytes, checking sizes as it goes.
#[derive(Default)]
pub struct PrekeyBundleBuilder {
    identity_key: Option<[u8; PUBLIC_KEY_LENGTH]>,
    signed_prekey: Option<[u8; KEY_LENGTH]>,
    signed_prekey_signature: Option<[u8; SIGNATURE_LENGTH]>,
    one_time_prekey: Option<[u8; PUBLIC_KEY_LENGTH]>,
    ratchet_key: Option<[u8; KEY_LENGTH]>,
}

impl PrekeyBundleBuilder {
    /// Create a new bundle builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set peer's Ed25519 identity key
    pub fn with_identity_key(mut self, key: &[u8]) -> ProtocolResult<Self> {
        self.identity_key = Some(fixed(key)?);
        Ok(self)
    }

    /// Set peer's signed prekey and its signature
    pub fn with_signed_prekey(mut self, key: &[u8], signature: &[u8]) -> ProtocolResult<Self> {
        self.signed_prekey = Some(fixed(key)?);
        self.signed_prekey_signature =
            Some(signature.try_into().map_err(|_| ProtocolError::InvalidSignature)?);
        Ok(self)
    }

    /// Set peer's one-time prekey
    pub fn with_one_time_prekey(mut self, key: &[u8]) -> ProtocolResult<Self> {
        self.one_time_prekey = Some(fixed(key)?);
        Ok(self)
    }

    /// Set peer's initial ratchet key
    pub fn with_ratchet_key(mut self, key: &[u8]) -> ProtocolResult<Self> {
        self.ratchet_key = Some(fixed(key)?);
        Ok(self)
    }

    /// Build the bundle
    ///
    /// # Errors
    /// Returns `InvalidState` if a required field is missing
    pub fn build(self) -> ProtocolResult<PrekeyBundle> {
        Ok(PrekeyBundle {
            identity_key: self
                .identity_key
                .ok_or_else(|| ProtocolError::InvalidState("Identity key is required".to_string()))?,
            signed_prekey: self
                .signed_prekey
                .ok_or_else(|| ProtocolError::InvalidState("Signed prekey is required".to_string()))?,
            signed_prekey_signature: self.signed_prekey_signature.ok_or_else(|| {
                ProtocolError::InvalidState("Signed prekey signature is required".to_string())
            })?,
            one_time_prekey: self.one_time_prekey.into(),
            ratchet_key: self
                .ratchet_key
                .ok_or_else(|| ProtocolError::InvalidState("Ratchet key is required".to_string()))?,
        })
    }
}

fn fixed<const N: usize>(key: &[u8]) -> ProtocolResult<[u8; N]> {
    key.try_into().map_err(|_| ProtocolError::InvalidKeySize {
        expected: N,
        actual: key.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecureRandom;
    use crate::handshake::{create_signed_prekey, receive_initial_message};

    #[test]
    fn test_builder_roundtrip() {
        let mut rng = SecureRandom::new();
        let bob = IdentityKeyPair::generate(&mut rng).unwrap();
        let spk = create_signed_prekey(&bob).unwrap();
        let ratchet = DhKeyPair::generate(&mut rng).unwrap();
        let published = PrekeyBundle::publish(&bob, &spk, OneTimeKey::Absent, &ratchet);

        let built = PrekeyBundleBuilder::new()
            .with_identity_key(published.identity_key())
            .unwrap()
            .with_signed_prekey(published.signed_prekey(), published.signed_prekey_signature())
            .unwrap()
            .with_ratchet_key(published.ratchet_key())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(built, published);
        assert!(!built.one_time_prekey().is_present());
    }

    #[test]
    fn test_builder_rejects_bad_sizes() {
        assert_eq!(
            PrekeyBundleBuilder::new().with_identity_key(&[0u8; 33]).err(),
            Some(ProtocolError::InvalidKeySize { expected: 32, actual: 33 })
        );
        assert_eq!(
            PrekeyBundleBuilder::new().with_signed_prekey(&[0u8; 32], &[0u8; 10]).err(),
            Some(ProtocolError::InvalidSignature)
        );
    }

    #[test]
    fn test_builder_requires_fields() {
        let result = PrekeyBundleBuilder::new().with_identity_key(&[1u8; 32]).unwrap().build();
        assert!(matches!(result, Err(ProtocolError::InvalidState(_))));
    }

    #[test]
    fn test_initiate_agrees_with_responder() {
        let mut rng = SecureRandom::new();
        let alice = IdentityKeyPair::generate(&mut rng).unwrap();
        let bob = IdentityKeyPair::generate(&mut rng).unwrap();
        let spk = create_signed_prekey(&bob).unwrap();
        let opk = OneTimePreKeyPair::generate(&mut rng).unwrap();
        let ratchet = DhKeyPair::generate(&mut rng).unwrap();
        let config = Config::default();

        let bundle = PrekeyBundle::publish(&bob, &spk, OneTimeKey::Present(&opk), &ratchet);
        let (mut alice_session, initial) = bundle.initiate(&alice, &config).unwrap();
        assert!(initial.one_time_prekey_used);

        let seed = receive_initial_message(
            &bob,
            OneTimeKey::Present(&opk),
            &alice.public_bytes(),
            &spk,
            &initial.ephemeral_public,
        )
        .unwrap();
        let mut bob_session = Session::create_passive(seed, ratchet, &config).unwrap();

        let sealed = alice_session.encrypt_authenticated(b"hello bob").unwrap();
        assert_eq!(bob_session.decrypt_authenticated(&sealed).unwrap(), b"hello bob");
    }
}
