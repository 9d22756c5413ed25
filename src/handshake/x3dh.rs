//! X3DH Key Agreement
//!
//! The normal procedure is:
//!
//! 1. Bob creates a signed prekey and publishes it together with his
//!    identity key and, optionally, one-time prekeys;
//!    [`create_signed_prekey`].
//! 2. Alice verifies Bob's signed prekey and derives the session seed plus
//!    an ephemeral public key to send along; [`create_initial_message`].
//! 3. Bob derives the same seed from Alice's identity and ephemeral key;
//!    [`receive_initial_message`].

use std::fmt;

use ed25519_dalek::PUBLIC_KEY_LENGTH;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{
    diffie_hellman, public_key_from_slice, x3dh_kdf, DhKeyPair, SecureRandom, SymmetricKey,
    KEY_LENGTH,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::keystore::{
    parse_identity_key, verify_signature, IdentityKeyPair, OneTimePreKeyPair, SignedPreKeyPair,
};
use super::{ed25519_public_bytes_to_x25519, ed25519_public_to_x25519, ed25519_secret_to_x25519};

/// Whether a one-time prekey takes part in the key agreement.
///
/// Both parties must agree: a present key adds a fourth DH output, so a
/// mismatch silently yields different seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OneTimeKey<T> {
    /// A one-time prekey was used
    Present(T),
    /// No one-time prekey was available
    Absent,
}

impl<T> OneTimeKey<T> {
    /// Whether a key is present
    pub fn is_present(&self) -> bool {
        matches!(self, OneTimeKey::Present(_))
    }

    /// Borrow the contained key
    pub fn as_ref(&self) -> OneTimeKey<&T> {
        match self {
            OneTimeKey::Present(key) => OneTimeKey::Present(key),
            OneTimeKey::Absent => OneTimeKey::Absent,
        }
    }

    /// Map the contained key
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OneTimeKey<U> {
        match self {
            OneTimeKey::Present(key) => OneTimeKey::Present(f(key)),
            OneTimeKey::Absent => OneTimeKey::Absent,
        }
    }
}

impl<T> From<Option<T>> for OneTimeKey<T> {
    fn from(key: Option<T>) -> Self {
        match key {
            Some(key) => OneTimeKey::Present(key),
            None => OneTimeKey::Absent,
        }
    }
}

/// Session seed: the shared secret and associated data both parties
/// derive from the key agreement.
#[derive(Clone)]
pub struct SessionSeed {
    secret: SymmetricKey,
    associated_data: Vec<u8>,
}

impl SessionSeed {
    /// Build a seed from raw parts
    pub fn new(secret: SymmetricKey, associated_data: Vec<u8>) -> Self {
        Self { secret, associated_data }
    }

    /// Shared secret, the initial root key
    pub fn secret(&self) -> &SymmetricKey {
        &self.secret
    }

    /// Initiator identity key followed by responder identity key
    pub fn associated_data(&self) -> &[u8] {
        &self.associated_data
    }
}

impl fmt::Debug for SessionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSeed")
            .field("associated_data", &self.associated_data)
            .finish_non_exhaustive()
    }
}

/// Output of [`create_initial_message`].
#[derive(Debug, Clone)]
pub struct InitialMessage {
    /// Session seed for [`crate::Session::create_active`]
    pub seed: SessionSeed,
    /// Ephemeral public key to send to the responder
    pub ephemeral_public: [u8; KEY_LENGTH],
    /// Whether the peer's one-time prekey was used
    pub one_time_prekey_used: bool,
}

/// Create a new signed prekey for publication.
pub fn create_signed_prekey(identity: &IdentityKeyPair) -> ProtocolResult<SignedPreKeyPair> {
    let mut rng = SecureRandom::new();
    SignedPreKeyPair::generate_signed(identity, &mut rng)
}

/// Create the initial key agreement message.
///
/// Must be called by the active, opening party. The peer's signed prekey
/// signature is checked against the peer identity key before any
/// ephemeral key is generated.
///
/// # Errors
/// * `InvalidSignature` - bad signature or malformed peer identity key
/// * `InvalidKeySize` - signed or one-time prekey of the wrong length
pub fn create_initial_message(
    identity: &IdentityKeyPair,
    peer_identity: &[u8],
    peer_one_time_prekey: OneTimeKey<&[u8]>,
    peer_signed_prekey: &[u8],
    peer_signed_prekey_signature: &[u8],
) -> ProtocolResult<InitialMessage> {
    create_initial_message_with_ephemeral(
        identity,
        peer_identity,
        peer_one_time_prekey,
        peer_signed_prekey,
        peer_signed_prekey_signature,
        || DhKeyPair::generate(&mut SecureRandom::new()).map_err(ProtocolError::from),
    )
}

/// `ephemeral` is only invoked once the peer's bundle has been validated.
pub(crate) fn create_initial_message_with_ephemeral<F>(
    identity: &IdentityKeyPair,
    peer_identity: &[u8],
    peer_one_time_prekey: OneTimeKey<&[u8]>,
    peer_signed_prekey: &[u8],
    peer_signed_prekey_signature: &[u8],
    ephemeral: F,
) -> ProtocolResult<InitialMessage>
where
    F: FnOnce() -> ProtocolResult<DhKeyPair>,
{
    if peer_identity.len() != PUBLIC_KEY_LENGTH {
        return Err(ProtocolError::InvalidSignature);
    }
    let peer_identity_key =
        parse_identity_key(peer_identity).map_err(|_| ProtocolError::InvalidSignature)?;

    let spk = public_key_from_slice(peer_signed_prekey)?;
    verify_signature(&peer_identity_key, peer_signed_prekey, peer_signed_prekey_signature)?;

    let opk = match peer_one_time_prekey {
        OneTimeKey::Present(bytes) => OneTimeKey::Present(ed25519_public_bytes_to_x25519(bytes)?),
        OneTimeKey::Absent => OneTimeKey::Absent,
    };

    let ephemeral = ephemeral()?;
    let identity_x = ed25519_secret_to_x25519(identity.signing_key());
    let peer_identity_x = ed25519_public_to_x25519(&peer_identity_key);

    let mut material = Zeroizing::new(Vec::with_capacity(4 * KEY_LENGTH));
    material.extend_from_slice(diffie_hellman(&identity_x, &spk)?.as_bytes());
    material.extend_from_slice(ephemeral.diffie_hellman(&peer_identity_x)?.as_bytes());
    material.extend_from_slice(ephemeral.diffie_hellman(&spk)?.as_bytes());
    if let OneTimeKey::Present(opk) = &opk {
        material.extend_from_slice(ephemeral.diffie_hellman(opk)?.as_bytes());
    }

    let secret = x3dh_kdf(&material)?;

    let mut associated_data = Vec::with_capacity(2 * PUBLIC_KEY_LENGTH);
    associated_data.extend_from_slice(&identity.public_bytes());
    associated_data.extend_from_slice(peer_identity);

    debug!(one_time_prekey = opk.is_present(), "created initial key agreement message");

    Ok(InitialMessage {
        seed: SessionSeed::new(secret, associated_data),
        ephemeral_public: ephemeral.public_bytes(),
        one_time_prekey_used: opk.is_present(),
    })
}

/// Handle the initial message on the passive, responding side.
///
/// Performs the same computation as [`create_initial_message`] from the
/// other end. `one_time_prekey` must mirror the initiator's choice.
///
/// # Errors
/// * `InvalidKeySize` - peer identity or ephemeral key of the wrong length
/// * `InvalidPublicKey` - peer key not usable for X25519
pub fn receive_initial_message(
    identity: &IdentityKeyPair,
    one_time_prekey: OneTimeKey<&OneTimePreKeyPair>,
    peer_identity: &[u8],
    signed_prekey: &SignedPreKeyPair,
    peer_ephemeral: &[u8],
) -> ProtocolResult<SessionSeed> {
    let peer_identity_key = parse_identity_key(peer_identity)?;
    let ephemeral = public_key_from_slice(peer_ephemeral)?;

    let identity_x = ed25519_secret_to_x25519(identity.signing_key());
    let peer_identity_x = ed25519_public_to_x25519(&peer_identity_key);
    let spk = signed_prekey.key_pair();

    let mut material = Zeroizing::new(Vec::with_capacity(4 * KEY_LENGTH));
    material.extend_from_slice(spk.diffie_hellman(&peer_identity_x)?.as_bytes());
    material.extend_from_slice(diffie_hellman(&identity_x, &ephemeral)?.as_bytes());
    material.extend_from_slice(spk.diffie_hellman(&ephemeral)?.as_bytes());
    if let OneTimeKey::Present(opk) = one_time_prekey {
        let opk_x = ed25519_secret_to_x25519(opk.signing_key());
        material.extend_from_slice(diffie_hellman(&opk_x, &ephemeral)?.as_bytes());
    }

    let secret = x3dh_kdf(&material)?;

    let mut associated_data = Vec::with_capacity(2 * PUBLIC_KEY_LENGTH);
    associated_data.extend_from_slice(peer_identity);
    associated_data.extend_from_slice(&identity.public_bytes());

    debug!(
        one_time_prekey = one_time_prekey.is_present(),
        "received initial key agreement message"
    );

    Ok(SessionSeed::new(secret, associated_data))
}
