//! Session Manager
//!
//! Maps peer ids to sessions. Each session sits behind its own mutex, so
//! encrypt and decrypt on one peer are serialized while different peers
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::ratchet::{Session, SessionSnapshot};
use crate::Config;

/// Session Manager
pub struct SessionManager {
    sessions: RwLock<HashMap<Vec<u8>, SessionHandle>>,
    config: Config,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(config: Config) -> ProtocolResult<Self> {
        config.validate()?;
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// Configuration handed to sessions created for this manager
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a session, replacing any previous one for `peer_id`
    pub fn insert_session(&self, peer_id: &[u8], session: Session) -> SessionHandle {
        let handle = SessionHandle {
            peer_id: peer_id.to_vec(),
            session: Arc::new(Mutex::new(session)),
        };

        let replaced = self
            .sessions
            .write()
            .insert(peer_id.to_vec(), handle.clone())
            .is_some();
        debug!(peer_id_len = peer_id.len(), replaced, "registered session");

        handle
    }

    /// Rebuild a session from a snapshot and register it
    pub fn restore_session(&self, peer_id: &[u8], snapshot: &SessionSnapshot) -> ProtocolResult<SessionHandle> {
        let session = Session::restore(snapshot, &self.config)?;
        Ok(self.insert_session(peer_id, session))
    }

    /// Get an existing session by peer id
    pub fn get_session(&self, peer_id: &[u8]) -> ProtocolResult<SessionHandle> {
        self.sessions
            .read()
            .get(peer_id)
            .cloned()
            .ok_or(ProtocolError::SessionNotFound)
    }

    /// Remove a session
    pub fn remove_session(&self, peer_id: &[u8]) -> bool {
        self.sessions.write().remove(peer_id).is_some()
    }

    /// List all peer ids
    pub fn list_sessions(&self) -> Vec<Vec<u8>> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are registered
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// Session Handle - Reference to a registered session
#[derive(Clone)]
pub struct SessionHandle {
    peer_id: Vec<u8>,
    session: Arc<Mutex<Session>>,
}

impl SessionHandle {
    /// Get the peer ID
    pub fn peer_id(&self) -> &[u8] {
        &self.peer_id
    }

    /// Get the session
    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    /// Encrypt under the session lock, see [`Session::encrypt_authenticated`]
    pub fn encrypt(&self, plaintext: &[u8]) -> ProtocolResult<Vec<u8>> {
        self.session.lock().encrypt_authenticated(plaintext)
    }

    /// Decrypt under the session lock, see [`Session::decrypt_authenticated`]
    pub fn decrypt(&self, message: &[u8]) -> ProtocolResult<Vec<u8>> {
        self.session.lock().decrypt_authenticated(message)
    }

    /// Snapshot under the session lock
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{DhKeyPair, SecureRandom, SymmetricKey};
    use crate::handshake::SessionSeed;
    use std::thread;

    fn pair(config: &Config) -> (Session, Session) {
        let mut rng = SecureRandom::new();
        let seed = SessionSeed::new(SymmetricKey::from_bytes([0x11u8; 32]), vec![9; 64]);
        let bob_ratchet = DhKeyPair::generate(&mut rng).unwrap();
        (
            Session::create_active(seed.clone(), &bob_ratchet.public_bytes(), config).unwrap(),
            Session::create_passive(seed, bob_ratchet, config).unwrap(),
        )
    }

    #[test]
    fn test_insert_get_remove() {
        let manager = SessionManager::new(Config::default()).unwrap();
        let (alice, _) = pair(manager.config());

        assert_eq!(manager.get_session(b"bob").err(), Some(ProtocolError::SessionNotFound));
        manager.insert_session(b"bob", alice);

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get_session(b"bob").unwrap().peer_id(), b"bob");
        assert_eq!(manager.list_sessions(), vec![b"bob".to_vec()]);

        assert!(manager.remove_session(b"bob"));
        assert!(!manager.remove_session(b"bob"));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = Config {
            max_skipped_chains: 0,
            ..Config::default()
        };
        assert!(matches!(SessionManager::new(config), Err(ProtocolError::InvalidConfig(_))));
    }

    #[test]
    fn test_handles_serialize_concurrent_senders() {
        let alice_manager = SessionManager::new(Config::default()).unwrap();
        let bob_manager = SessionManager::new(Config::default()).unwrap();
        let (alice, bob) = pair(alice_manager.config());

        let alice = alice_manager.insert_session(b"bob", alice);
        let bob = bob_manager.insert_session(b"alice", bob);

        let first = alice.encrypt(b"open").unwrap();
        assert_eq!(bob.decrypt(&first).unwrap(), b"open");

        let workers: Vec<_> = (0..4u8)
            .map(|n| {
                let handle = alice.clone();
                thread::spawn(move || handle.encrypt(&[n; 8]).unwrap())
            })
            .collect();
        let messages: Vec<Vec<u8>> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        let mut received: Vec<Vec<u8>> = messages.iter().map(|m| bob.decrypt(m).unwrap()).collect();
        received.sort();
        assert_eq!(received, (0..4u8).map(|n| vec![n; 8]).collect::<Vec<_>>());
    }

    #[test]
    fn test_restore_session() {
        let manager = SessionManager::new(Config::default()).unwrap();
        let (alice, _) = pair(manager.config());
        let snapshot = alice.snapshot();

        let handle = manager.restore_session(b"bob", &snapshot).unwrap();
        assert_eq!(
            handle.session().lock().local_ratchet_key(),
            alice.local_ratchet_key()
        );
    }
}
