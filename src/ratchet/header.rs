//! Message Header
//!
//! Fixed 36-byte wire header sent in the clear ahead of every ciphertext:
//!
//! ```text
//! +--------------------------+-------------+-------------+
//! | ratchet public key (32)  | prev_len BE | msg_no BE   |
//! +--------------------------+-------------+-------------+
//! ```

use x25519_dalek::PublicKey;

use crate::crypto::KEY_LENGTH;
use crate::error::{ProtocolError, ProtocolResult};

/// Encoded header length
pub const HEADER_LEN: usize = KEY_LENGTH + 2 + 2;

/// Decoded message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Sender's current ratchet public key
    pub dh_public: [u8; KEY_LENGTH],
    /// Length of the sender's previous sending chain
    pub previous_chain_length: u32,
    /// Position of this message in the sending chain
    pub message_number: u32,
}

impl MessageHeader {
    /// Create a header
    pub fn new(dh_public: &PublicKey, previous_chain_length: u32, message_number: u32) -> Self {
        Self {
            dh_public: dh_public.to_bytes(),
            previous_chain_length,
            message_number,
        }
    }

    /// Encode to wire format
    ///
    /// # Errors
    /// `CounterOverflow` if either counter does not fit in 16 bits
    pub fn encode(&self) -> ProtocolResult<[u8; HEADER_LEN]> {
        let prev = u16::try_from(self.previous_chain_length).map_err(|_| ProtocolError::CounterOverflow)?;
        let number = u16::try_from(self.message_number).map_err(|_| ProtocolError::CounterOverflow)?;

        let mut out = [0u8; HEADER_LEN];
        out[..KEY_LENGTH].copy_from_slice(&self.dh_public);
        out[KEY_LENGTH..KEY_LENGTH + 2].copy_from_slice(&prev.to_be_bytes());
        out[KEY_LENGTH + 2..].copy_from_slice(&number.to_be_bytes());
        Ok(out)
    }

    /// Decode the header at the start of `bytes`
    ///
    /// # Errors
    /// `ShortCiphertext` if fewer than [`HEADER_LEN`] bytes are given
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let header = bytes.get(..HEADER_LEN).ok_or(ProtocolError::ShortCiphertext)?;

        let mut dh_public = [0u8; KEY_LENGTH];
        dh_public.copy_from_slice(&header[..KEY_LENGTH]);
        let prev = u16::from_be_bytes([header[KEY_LENGTH], header[KEY_LENGTH + 1]]);
        let number = u16::from_be_bytes([header[KEY_LENGTH + 2], header[KEY_LENGTH + 3]]);

        Ok(Self {
            dh_public,
            previous_chain_length: u32::from(prev),
            message_number: u32::from(number),
        })
    }

    /// Sender ratchet key as an X25519 point
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.dh_public)
    }
}
