//! DH Ratchet
//!
//! The asymmetric half of the ratchet. Every step mixes a fresh X25519
//! output into the root key, yielding new chain keys.

use tracing::trace;
use x25519_dalek::PublicKey;

use crate::crypto::{fingerprint, root_kdf, DhKeyPair, SecureRandom, SymmetricKey};
use crate::error::{ProtocolError, ProtocolResult};

/// Chain keys produced by one ratchet step.
pub struct StepKeys {
    /// New receiving chain key, absent on the active side's first step
    pub receive: Option<SymmetricKey>,
    /// New sending chain key
    pub send: SymmetricKey,
}

/// DH ratchet state: local key pair, last known peer key and root key.
#[derive(Clone)]
pub struct DhRatchet {
    root_key: SymmetricKey,
    local: DhKeyPair,
    remote: Option<PublicKey>,
    is_active: bool,
    is_initialized: bool,
}

impl DhRatchet {
    /// Ratchet for the initiating party.
    ///
    /// The peer's published ratchet key is known up front, so the first
    /// step can derive a sending chain without waiting for a message.
    pub fn active(root_key: SymmetricKey, remote: PublicKey, rng: &mut SecureRandom) -> ProtocolResult<Self> {
        Ok(Self {
            root_key,
            local: DhKeyPair::generate(rng)?,
            remote: Some(remote),
            is_active: true,
            is_initialized: false,
        })
    }

    /// Ratchet for the responding party, seeded with the key pair whose
    /// public half was published in the prekey bundle.
    pub fn passive(root_key: SymmetricKey, local: DhKeyPair) -> Self {
        Self {
            root_key,
            local,
            remote: None,
            is_active: false,
            is_initialized: false,
        }
    }

    pub(crate) fn from_parts(
        root_key: SymmetricKey,
        local: DhKeyPair,
        remote: Option<PublicKey>,
        is_active: bool,
        is_initialized: bool,
    ) -> Self {
        Self { root_key, local, remote, is_active, is_initialized }
    }

    /// Advance the ratchet against the current peer key.
    ///
    /// The active side's first call only derives a sending chain from the
    /// existing local pair. Every other call derives a receiving chain
    /// from the current pair, generates a fresh pair and derives a sending
    /// chain from that.
    pub fn step(&mut self, rng: &mut SecureRandom) -> ProtocolResult<StepKeys> {
        let remote = self
            .remote
            .ok_or_else(|| ProtocolError::InvalidState("No remote ratchet key".to_string()))?;

        if self.is_active && !self.is_initialized {
            let dh_out = self.local.diffie_hellman(&remote)?;
            let (root_key, send) = root_kdf(&self.root_key, &dh_out)?;

            self.root_key = root_key;
            self.is_initialized = true;
            trace!(remote = %fingerprint(&remote), "initial active ratchet step");

            return Ok(StepKeys { receive: None, send });
        }

        let dh_out = self.local.diffie_hellman(&remote)?;
        let (root_key, receive) = root_kdf(&self.root_key, &dh_out)?;

        let fresh = DhKeyPair::generate(rng)?;
        let dh_out = fresh.diffie_hellman(&remote)?;
        let (root_key, send) = root_kdf(&root_key, &dh_out)?;

        self.root_key = root_key;
        self.local = fresh;
        trace!(
            remote = %fingerprint(&remote),
            local = %fingerprint(self.local.public()),
            "ratchet step"
        );

        Ok(StepKeys { receive: Some(receive), send })
    }

    /// Record a newly observed peer ratchet key
    pub fn set_remote(&mut self, remote: PublicKey) {
        self.remote = Some(remote);
    }

    /// Last known peer ratchet key
    pub fn remote(&self) -> Option<&PublicKey> {
        self.remote.as_ref()
    }

    /// Current local ratchet key pair
    pub fn local(&self) -> &DhKeyPair {
        &self.local
    }

    /// Whether this side initiated the session
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Whether the active side's first step has run
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub(crate) fn root_key(&self) -> &SymmetricKey {
        &self.root_key
    }
}
