//! OMEMO Core - End-to-End Encryption Session Kernel
//!
//! Key agreement and message ratchet for two-party end-to-end encrypted
//! messaging, in the OMEMO flavour of the Signal protocol family.
//!
//! # Features
//! - X3DH key agreement with Ed25519 identity keys
//! - Double Ratchet with AES-256-CBC and HMAC-SHA256
//! - Bounded out-of-order delivery
//! - Forward Secrecy & Post-Compromise Security
//!
//! # Example
//!
//! ```
//! use omemo_core::*;
//!
//! let mut rng = SecureRandom::new();
//! let config = Config::default();
//!
//! // Bob publishes a bundle
//! let bob = IdentityKeyPair::generate(&mut rng)?;
//! let spk = create_signed_prekey(&bob)?;
//! let ratchet = DhKeyPair::generate(&mut rng)?;
//! let bundle = PrekeyBundle::publish(&bob, &spk, OneTimeKey::Absent, &ratchet);
//!
//! // Alice opens a session against it
//! let alice = IdentityKeyPair::generate(&mut rng)?;
//! let (mut alice_session, initial) = bundle.initiate(&alice, &config)?;
//! let message = alice_session.encrypt_authenticated(b"hello")?;
//!
//! // Bob answers
//! let seed = receive_initial_message(
//!     &bob,
//!     OneTimeKey::Absent,
//!     &alice.public_bytes(),
//!     &spk,
//!     &initial.ephemeral_public,
//! )?;
//! let mut bob_session = Session::create_passive(seed, ratchet, &config)?;
//! assert_eq!(bob_session.decrypt_authenticated(&message)?, b"hello");
//! # Ok::<(), ProtocolError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// System Modules
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod keystore;
pub mod manager;
pub mod ratchet;

#[cfg(test)]
mod proptests;

// Re-exports
pub use crypto::*;
pub use error::{ProtocolError, ProtocolResult};
pub use handshake::*;
pub use keystore::*;
pub use manager::{SessionHandle, SessionManager};
pub use ratchet::*;

use serde::{Deserialize, Serialize};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session Configuration
///
/// Bounds the memory a peer can make a session spend on skipped keys and
/// sets the tag length of the authenticated envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Number of receiving chains that may hold skipped keys
    pub max_skipped_chains: usize,
    /// Skipped keys kept per chain, also the largest accepted gap
    pub max_skipped_keys_per_chain: usize,
    /// Truncated HMAC-SHA256 tag length for authenticated messages
    pub authenticated_tag_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_skipped_chains: 8,
            max_skipped_keys_per_chain: 32,
            authenticated_tag_len: 16,
        }
    }
}

impl Config {
    /// Check that all limits are usable
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.max_skipped_chains == 0 {
            return Err(ProtocolError::InvalidConfig(
                "max_skipped_chains must be positive".to_string(),
            ));
        }
        if self.max_skipped_keys_per_chain == 0 || self.max_skipped_keys_per_chain > usize::from(u16::MAX) {
            return Err(ProtocolError::InvalidConfig(
                "max_skipped_keys_per_chain must be in 1..=65535".to_string(),
            ));
        }
        if !(MIN_TAG_LENGTH..=MAX_TAG_LENGTH).contains(&self.authenticated_tag_len) {
            return Err(ProtocolError::InvalidConfig(format!(
                "authenticated_tag_len must be in {}..={}",
                MIN_TAG_LENGTH, MAX_TAG_LENGTH
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_skipped_chains, 8);
        assert_eq!(config.max_skipped_keys_per_chain, 32);
        assert_eq!(config.authenticated_tag_len, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            Config { max_skipped_chains: 0, ..Config::default() },
            Config { max_skipped_keys_per_chain: 0, ..Config::default() },
            Config { max_skipped_keys_per_chain: 70_000, ..Config::default() },
            Config { authenticated_tag_len: 8, ..Config::default() },
            Config { authenticated_tag_len: 33, ..Config::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ProtocolError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_config_serde() {
        let config = Config { authenticated_tag_len: 32, ..Config::default() };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
