//! Session Snapshots
//!
//! Export and import of the complete ratchet state. Where a snapshot is
//! stored, and how it is protected at rest, is up to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use x25519_dalek::PublicKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::session::RatchetState;
use super::skipped::ChainSlot;
use super::{ChainKey, DhRatchet, Session, SkippedKeyBuffer};
use crate::crypto::{DhKeyPair, SymmetricKey, KEY_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};
use crate::Config;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u8 = 1;

/// Serialized symmetric chain
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ChainSnapshot {
    key: [u8; KEY_LENGTH],
    index: u32,
}

/// One cached skipped message key
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SkippedKeySnapshot {
    message_number: u32,
    key: [u8; KEY_LENGTH],
}

/// One slot of the skipped-key ring
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SkippedChainSnapshot {
    dh_public: [u8; KEY_LENGTH],
    keys: Vec<SkippedKeySnapshot>,
}

/// Full session state
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SessionSnapshot {
    version: u8,
    associated_data: Vec<u8>,
    root_key: [u8; KEY_LENGTH],
    local_secret: [u8; KEY_LENGTH],
    remote: Option<[u8; KEY_LENGTH]>,
    is_active: bool,
    is_initialized: bool,
    send_chain: Option<ChainSnapshot>,
    recv_chain: Option<ChainSnapshot>,
    send_no: u32,
    recv_no: u32,
    prev_send_no: u32,
    skipped_cursor: usize,
    skipped: Vec<Option<SkippedChainSnapshot>>,
}

impl SessionSnapshot {
    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::SerializationError(e.to_string()))
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        let snapshot: Self = serde_json::from_slice(data)
            .map_err(|e| ProtocolError::DeserializationError(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ProtocolError::DeserializationError(format!(
                "Unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

fn chain_snapshot(chain: &ChainKey) -> ChainSnapshot {
    ChainSnapshot {
        key: *chain.key().as_bytes(),
        index: chain.index(),
    }
}

fn chain_restore(chain: &ChainSnapshot) -> ChainKey {
    ChainKey::from_parts(SymmetricKey::from_bytes(chain.key), chain.index)
}

impl Session {
    /// Export the session state
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = &self.state;
        let skipped = state
            .skipped
            .slots()
            .iter()
            .map(|slot| {
                slot.as_ref().map(|slot| SkippedChainSnapshot {
                    dh_public: slot.dh_public,
                    keys: slot
                        .keys
                        .iter()
                        .map(|(number, key)| SkippedKeySnapshot {
                            message_number: *number,
                            key: *key.as_bytes(),
                        })
                        .collect(),
                })
            })
            .collect();

        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            associated_data: self.associated_data.clone(),
            root_key: *state.dh.root_key().as_bytes(),
            local_secret: *state.dh.local().secret_bytes(),
            remote: state.dh.remote().map(PublicKey::to_bytes),
            is_active: state.dh.is_active(),
            is_initialized: state.dh.is_initialized(),
            send_chain: state.send_chain.as_ref().map(chain_snapshot),
            recv_chain: state.recv_chain.as_ref().map(chain_snapshot),
            send_no: state.send_no,
            recv_no: state.recv_no,
            prev_send_no: state.prev_send_no,
            skipped_cursor: state.skipped.cursor(),
            skipped,
        }
    }

    /// Rebuild a session from a snapshot
    ///
    /// # Errors
    /// `DeserializationError` if the skipped-key ring does not fit `config`
    pub fn restore(snapshot: &SessionSnapshot, config: &Config) -> ProtocolResult<Self> {
        config.validate()?;

        if snapshot.skipped.len() != config.max_skipped_chains {
            return Err(ProtocolError::DeserializationError(format!(
                "Snapshot holds {} skipped chains, configuration expects {}",
                snapshot.skipped.len(),
                config.max_skipped_chains
            )));
        }

        let slots = snapshot
            .skipped
            .iter()
            .map(|slot| {
                slot.as_ref().map(|slot| ChainSlot {
                    dh_public: slot.dh_public,
                    keys: slot
                        .keys
                        .iter()
                        .map(|entry| (entry.message_number, SymmetricKey::from_bytes(entry.key)))
                        .collect::<BTreeMap<_, _>>(),
                })
            })
            .collect();
        let skipped = SkippedKeyBuffer::from_parts(
            slots,
            snapshot.skipped_cursor,
            config.max_skipped_keys_per_chain,
        )?;

        let dh = DhRatchet::from_parts(
            SymmetricKey::from_bytes(snapshot.root_key),
            DhKeyPair::from_secret_bytes(snapshot.local_secret),
            snapshot.remote.map(PublicKey::from),
            snapshot.is_active,
            snapshot.is_initialized,
        );

        debug!(
            send_no = snapshot.send_no,
            recv_no = snapshot.recv_no,
            "restored session from snapshot"
        );

        Ok(Self {
            associated_data: snapshot.associated_data.clone(),
            state: RatchetState {
                dh,
                send_chain: snapshot.send_chain.as_ref().map(chain_restore),
                recv_chain: snapshot.recv_chain.as_ref().map(chain_restore),
                send_no: snapshot.send_no,
                recv_no: snapshot.recv_no,
                prev_send_no: snapshot.prev_send_no,
                skipped,
            },
            config: config.clone(),
        })
    }
}
