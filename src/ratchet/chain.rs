//! Chain Key Implementation
//!
//! The symmetric half of the ratchet: each step yields one message key and
//! replaces the chain key, so earlier message keys cannot be recomputed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{SymmetricKey, KEY_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};

/// Message key seed constant
const MESSAGE_KEY_SEED: u8 = 0x01;

/// Chain key seed constant
const CHAIN_KEY_SEED: u8 = 0x02;

/// Chain Key for the symmetric ratchet
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChainKey {
    key: SymmetricKey,
    index: u32,
}

impl ChainKey {
    /// Start a chain from the key produced by a DH ratchet step
    pub fn new(key: SymmetricKey) -> Self {
        Self { key, index: 0 }
    }

    /// Resume a chain at a known position
    pub(crate) fn from_parts(key: SymmetricKey, index: u32) -> Self {
        Self { key, index }
    }

    /// Derive the next message key
    ///
    /// MK = HMAC(CK, 0x01), CK' = HMAC(CK, 0x02)
    pub fn next_message_key(&mut self) -> ProtocolResult<SymmetricKey> {
        let index = self.index.checked_add(1).ok_or(ProtocolError::CounterOverflow)?;

        let message_key = self.derive_key(MESSAGE_KEY_SEED)?;
        self.key = self.derive_key(CHAIN_KEY_SEED)?;
        self.index = index;

        Ok(message_key)
    }

    fn derive_key(&self, seed: u8) -> ProtocolResult<SymmetricKey> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(self.key.as_bytes())
            .map_err(|_| ProtocolError::KeyDerivationFailed)?;
        mac.update(&[seed]);
        let digest = mac.finalize().into_bytes();

        Ok(SymmetricKey::from_slice(&digest[..KEY_LENGTH])?)
    }

    /// Number of message keys taken from this chain
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn key(&self) -> &SymmetricKey {
        &self.key
    }
}
