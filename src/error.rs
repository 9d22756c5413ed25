//! Error types for the session core
//!
//! Every fallible operation returns a [`ProtocolResult`]. Nothing in this
//! crate panics on untrusted input.

use thiserror::Error;

/// Protocol Error Type
///
/// The three message rejection variants ([`ShortCiphertext`],
/// [`InvalidPadding`] and [`AuthenticationFailed`]) render identically so
/// that a caller forwarding the text to a peer or a UI cannot leak which
/// check failed.
///
/// [`ShortCiphertext`]: ProtocolError::ShortCiphertext
/// [`InvalidPadding`]: ProtocolError::InvalidPadding
/// [`AuthenticationFailed`]: ProtocolError::AuthenticationFailed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Peer signed prekey signature did not verify
    #[error("Invalid signature")]
    InvalidSignature,

    /// Public key input has the wrong length
    #[error("Invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Public key bytes do not encode a usable curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Ciphertext does not even hold a header and a body
    #[error("Message rejected")]
    ShortCiphertext,

    /// Decrypted body carries a malformed PKCS#7 trailer
    #[error("Message rejected")]
    InvalidPadding,

    /// Authentication tag mismatch
    #[error("Message rejected")]
    AuthenticationFailed,

    /// No cached message key for this (ratchet key, message number)
    #[error("Message key not cached")]
    KeyNotCached,

    /// The header asks to skip past the per-chain window
    #[error("Cannot skip until message {until}, maximum is {max}")]
    SkipLimitExceeded {
        /// Requested message number
        until: u32,
        /// Highest message number reachable from the current counter
        max: u32,
    },

    /// Message counters left the 16-bit header range
    #[error("Message counter overflow, session must be renegotiated")]
    CounterOverflow,

    /// The operating system failed to provide random bytes
    #[error("Random generation failed")]
    RandomFailed,

    /// Key derivation failed
    #[error("Key derivation failed")]
    KeyDerivationFailed,

    /// Operation not allowed in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration rejected by [`crate::Config::validate`]
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Session not found
    #[error("Session not found")]
    SessionNotFound,
}

impl ProtocolError {
    /// Whether this is one of the opaque "message rejected" outcomes.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ProtocolError::ShortCiphertext
                | ProtocolError::InvalidPadding
                | ProtocolError::AuthenticationFailed
        )
    }

    /// Whether the caller should drop the offending message and keep
    /// using the session.
    pub fn is_recoverable(&self) -> bool {
        self.is_rejection()
            || matches!(
                self,
                ProtocolError::KeyNotCached | ProtocolError::SkipLimitExceeded { .. }
            )
    }
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl From<crate::crypto::CryptoError> for ProtocolError {
    fn from(err: crate::crypto::CryptoError) -> Self {
        match err {
            crate::crypto::CryptoError::InvalidKeyLength { expected, actual } => {
                ProtocolError::InvalidKeySize { expected, actual }
            }
            crate::crypto::CryptoError::InvalidPublicKey => ProtocolError::InvalidPublicKey,
            crate::crypto::CryptoError::InvalidCiphertext => ProtocolError::ShortCiphertext,
            crate::crypto::CryptoError::InvalidPadding => ProtocolError::InvalidPadding,
            crate::crypto::CryptoError::AuthenticationFailed => ProtocolError::AuthenticationFailed,
            crate::crypto::CryptoError::RandomFailed => ProtocolError::RandomFailed,
            crate::crypto::CryptoError::KeyDerivationFailed => ProtocolError::KeyDerivationFailed,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::SerializationError(err.to_string())
    }
}
