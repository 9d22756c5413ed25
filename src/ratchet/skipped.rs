//! Skipped Message Keys
//!
//! Bounded cache of message keys for messages that have not arrived yet.
//! Chains live in a fixed ring of slots: a previously unseen ratchet key
//! overwrites the oldest slot once the ring is full. Each chain keeps at
//! most `max_keys_per_chain` keys, dropping its lowest message number
//! first.

use std::collections::BTreeMap;

use subtle::ConstantTimeEq;
use tracing::debug;
use x25519_dalek::PublicKey;

use crate::crypto::{SymmetricKey, KEY_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};

#[derive(Clone)]
pub(crate) struct ChainSlot {
    pub(crate) dh_public: [u8; KEY_LENGTH],
    pub(crate) keys: BTreeMap<u32, SymmetricKey>,
}

/// Ring of skipped-key chains
#[derive(Clone)]
pub struct SkippedKeyBuffer {
    slots: Vec<Option<ChainSlot>>,
    cursor: usize,
    max_keys_per_chain: usize,
}

impl SkippedKeyBuffer {
    /// Create an empty buffer
    pub fn new(max_chains: usize, max_keys_per_chain: usize) -> Self {
        Self {
            slots: vec![None; max_chains.max(1)],
            cursor: 0,
            max_keys_per_chain,
        }
    }

    pub(crate) fn from_parts(
        slots: Vec<Option<ChainSlot>>,
        cursor: usize,
        max_keys_per_chain: usize,
    ) -> ProtocolResult<Self> {
        if slots.is_empty() || cursor >= slots.len() {
            return Err(ProtocolError::DeserializationError(
                "Invalid skipped key ring".to_string(),
            ));
        }
        if slots.iter().flatten().any(|slot| slot.keys.len() > max_keys_per_chain) {
            return Err(ProtocolError::DeserializationError(
                "Skipped key chain over capacity".to_string(),
            ));
        }
        Ok(Self { slots, cursor, max_keys_per_chain })
    }

    /// Scan every slot, comparing ratchet keys in constant time.
    fn position(&self, dh_public: &PublicKey) -> Option<usize> {
        let target = dh_public.as_bytes();
        let mut found = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(slot) = slot {
                if bool::from(slot.dh_public.ct_eq(target)) {
                    found = Some(index);
                }
            }
        }
        found
    }

    /// Cache the key for `(dh_public, message_number)`
    pub fn insert(&mut self, dh_public: &PublicKey, message_number: u32, key: SymmetricKey) {
        let index = match self.position(dh_public) {
            Some(index) => index,
            None => {
                let index = self.cursor;
                if self.slots[index].is_some() {
                    debug!(slot = index, "evicting oldest skipped key chain");
                }
                self.slots[index] = Some(ChainSlot {
                    dh_public: dh_public.to_bytes(),
                    keys: BTreeMap::new(),
                });
                self.cursor = (self.cursor + 1) % self.slots.len();
                index
            }
        };

        if let Some(slot) = self.slots[index].as_mut() {
            slot.keys.insert(message_number, key);
            while slot.keys.len() > self.max_keys_per_chain {
                slot.keys.pop_first();
            }
        }
    }

    /// Look up a cached key without consuming it
    pub fn find(&self, dh_public: &PublicKey, message_number: u32) -> ProtocolResult<&SymmetricKey> {
        self.position(dh_public)
            .and_then(|index| self.slots[index].as_ref())
            .and_then(|slot| slot.keys.get(&message_number))
            .ok_or(ProtocolError::KeyNotCached)
    }

    /// Remove and return a cached key
    pub fn take(&mut self, dh_public: &PublicKey, message_number: u32) -> ProtocolResult<SymmetricKey> {
        let index = self.position(dh_public).ok_or(ProtocolError::KeyNotCached)?;
        self.slots[index]
            .as_mut()
            .and_then(|slot| slot.keys.remove(&message_number))
            .ok_or(ProtocolError::KeyNotCached)
    }

    /// Whether a chain for this ratchet key is cached
    pub fn contains_chain(&self, dh_public: &PublicKey) -> bool {
        self.position(dh_public).is_some()
    }

    /// Total number of cached keys
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().map(|slot| slot.keys.len()).sum()
    }

    /// Whether no keys are cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of occupied chain slots
    pub fn chain_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub(crate) fn slots(&self) -> &[Option<ChainSlot>] {
        &self.slots
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> SymmetricKey {
        SymmetricKey::from_bytes([n; 32])
    }

    fn public(n: u8) -> PublicKey {
        PublicKey::from([n; 32])
    }

    #[test]
    fn test_insert_find_take() {
        let mut buffer = SkippedKeyBuffer::new(8, 32);
        buffer.insert(&public(1), 4, key(4));

        assert_eq!(buffer.find(&public(1), 4).unwrap(), &key(4));
        assert_eq!(buffer.find(&public(1), 5), Err(ProtocolError::KeyNotCached));
        assert_eq!(buffer.find(&public(2), 4), Err(ProtocolError::KeyNotCached));

        assert_eq!(buffer.take(&public(1), 4).unwrap(), key(4));
        assert_eq!(buffer.take(&public(1), 4), Err(ProtocolError::KeyNotCached));
        assert!(buffer.is_empty());
        assert!(buffer.contains_chain(&public(1)));
        assert!(!buffer.contains_chain(&public(2)));
    }

    #[test]
    fn test_oldest_chain_evicted() {
        let mut buffer = SkippedKeyBuffer::new(8, 32);
        for n in 0..9u8 {
            buffer.insert(&public(n + 1), 0, key(n));
        }

        assert_eq!(buffer.chain_count(), 8);
        assert_eq!(buffer.find(&public(1), 0), Err(ProtocolError::KeyNotCached));
        for n in 1..9u8 {
            assert!(buffer.find(&public(n + 1), 0).is_ok());
        }
    }

    #[test]
    fn test_existing_chain_reuses_slot() {
        let mut buffer = SkippedKeyBuffer::new(2, 32);
        buffer.insert(&public(1), 0, key(0));
        buffer.insert(&public(1), 1, key(1));
        buffer.insert(&public(2), 0, key(2));

        assert_eq!(buffer.chain_count(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn test_per_chain_cap_drops_lowest() {
        let mut buffer = SkippedKeyBuffer::new(8, 32);
        for n in 0..40u32 {
            buffer.insert(&public(1), n, key(n as u8));
        }

        assert_eq!(buffer.len(), 32);
        assert!(buffer.find(&public(1), 7).is_err());
        assert!(buffer.find(&public(1), 8).is_ok());
        assert!(buffer.find(&public(1), 39).is_ok());
    }

    #[test]
    fn test_from_parts_rejects_bad_cursor() {
        assert!(SkippedKeyBuffer::from_parts(vec![None; 8], 8, 32).is_err());
        assert!(SkippedKeyBuffer::from_parts(Vec::new(), 0, 32).is_err());
        assert!(SkippedKeyBuffer::from_parts(vec![None; 8], 7, 32).is_ok());
    }
}
