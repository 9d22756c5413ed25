//! Ratchet Session
//!
//! Ties the DH ratchet, the two symmetric chains and the skipped-key cache
//! together and drives them on every encrypt and decrypt. All work happens
//! on a copy of the ratchet state that replaces the live state only once
//! the whole operation has succeeded, so a rejected message leaves the
//! session exactly as it was.

use std::fmt;

use subtle::ConstantTimeEq;
use tracing::{debug, trace, warn};
use x25519_dalek::PublicKey;

use super::{ChainKey, DhRatchet, MessageHeader, SkippedKeyBuffer, HEADER_LEN};
use crate::crypto::{
    compute_tag, fingerprint, public_key_from_slice, verify_tag, DhKeyPair, MessageCipher,
    SecureRandom, SymmetricKey,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::handshake::SessionSeed;
use crate::Config;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Initiator that has not sent its first message yet
    ActiveAwaitingFirstSend,
    /// Ready to encrypt and decrypt
    Established,
}

/// Mutable ratchet state
#[derive(Clone)]
pub(super) struct RatchetState {
    pub(super) dh: DhRatchet,
    pub(super) send_chain: Option<ChainKey>,
    pub(super) recv_chain: Option<ChainKey>,
    pub(super) send_no: u32,
    pub(super) recv_no: u32,
    pub(super) prev_send_no: u32,
    pub(super) skipped: SkippedKeyBuffer,
}

impl RatchetState {
    fn dh_step(&mut self, rng: &mut SecureRandom) -> ProtocolResult<()> {
        let keys = self.dh.step(rng)?;

        self.prev_send_no = self.send_no;
        self.send_no = 0;
        self.recv_no = 0;

        if let Some(receive) = keys.receive {
            self.recv_chain = Some(ChainKey::new(receive));
        }
        self.send_chain = Some(ChainKey::new(keys.send));

        Ok(())
    }

    /// Cache receiving-chain keys up to, not including, `until`.
    fn skip_message_keys(&mut self, until: u32, max_skip: u32) -> ProtocolResult<()> {
        let max = self.recv_no.saturating_add(max_skip);
        if max < until {
            return Err(ProtocolError::SkipLimitExceeded { until, max });
        }

        // Nothing to cache before the first receiving chain exists.
        let (chain, remote) = match (self.recv_chain.as_mut(), self.dh.remote()) {
            (Some(chain), Some(remote)) => (chain, *remote),
            _ => return Ok(()),
        };

        let skipped = until.saturating_sub(self.recv_no);
        while self.recv_no < until {
            let key = chain.next_message_key()?;
            self.skipped.insert(&remote, self.recv_no, key);
            self.recv_no += 1;
        }

        if skipped > 0 {
            trace!(remote = %fingerprint(&remote), skipped, "cached skipped message keys");
        }
        Ok(())
    }

    fn seal(&mut self, plaintext: &[u8]) -> ProtocolResult<(Vec<u8>, MessageCipher)> {
        if self.send_chain.is_none() {
            let mut rng = SecureRandom::new();
            self.dh_step(&mut rng)?;
        }

        let header =
            MessageHeader::new(self.dh.local().public(), self.prev_send_no, self.send_no).encode()?;
        let send_no = self.send_no.checked_add(1).ok_or(ProtocolError::CounterOverflow)?;

        let chain = self
            .send_chain
            .as_mut()
            .ok_or_else(|| ProtocolError::InvalidState("No sending chain".to_string()))?;
        let message_key = chain.next_message_key()?;
        self.send_no = send_no;

        let cipher = MessageCipher::new(&message_key)?;
        let body = cipher.encrypt(plaintext)?;

        let mut message = Vec::with_capacity(HEADER_LEN + body.len());
        message.extend_from_slice(&header);
        message.extend_from_slice(&body);

        Ok((message, cipher))
    }

    /// Advance the ratchet for an incoming message and return the cipher
    /// for its body.
    fn open(&mut self, message: &[u8], max_skip: u32) -> ProtocolResult<MessageCipher> {
        if message.len() <= HEADER_LEN {
            return Err(ProtocolError::ShortCiphertext);
        }

        let header = MessageHeader::decode(message)?;
        let sender = header.public_key();
        let number = header.message_number;

        let is_current = self
            .dh
            .remote()
            .map(|remote| bool::from(remote.as_bytes().ct_eq(&header.dh_public)))
            .unwrap_or(false);

        // Late message from a chain that has already been ratcheted past.
        if !is_current && self.skipped.contains_chain(&sender) {
            let key = self.skipped.take(&sender, number)?;
            return Ok(MessageCipher::new(&key)?);
        }

        if !is_current {
            self.skip_message_keys(header.previous_chain_length, max_skip)?;
            self.dh.set_remote(sender);

            let mut rng = SecureRandom::new();
            self.dh_step(&mut rng)?;
            debug!(
                remote = %fingerprint(&sender),
                previous_chain_length = header.previous_chain_length,
                "received new ratchet key"
            );
        }

        let key = if number < self.recv_no {
            self.skipped.take(&sender, number)?
        } else {
            self.skip_message_keys(number, max_skip)?;

            let chain = self
                .recv_chain
                .as_mut()
                .ok_or_else(|| ProtocolError::InvalidState("No receiving chain".to_string()))?;
            let key = chain.next_message_key()?;
            self.recv_no = self.recv_no.checked_add(1).ok_or(ProtocolError::CounterOverflow)?;
            key
        };

        Ok(MessageCipher::new(&key)?)
    }
}

/// Double Ratchet Session
///
/// Owned by exactly one peer relationship. Calls must be serialized by the
/// caller; [`crate::SessionManager`] does that with one lock per session.
pub struct Session {
    pub(super) associated_data: Vec<u8>,
    pub(super) state: RatchetState,
    pub(super) config: Config,
}

impl Session {
    /// Create the initiator's session.
    ///
    /// # Arguments
    /// * `seed` - Output of [`crate::create_initial_message`]
    /// * `peer_ratchet_key` - Responder's published X25519 ratchet key
    /// * `config` - Session limits
    pub fn create_active(seed: SessionSeed, peer_ratchet_key: &[u8], config: &Config) -> ProtocolResult<Self> {
        config.validate()?;
        let remote = public_key_from_slice(peer_ratchet_key)?;

        let mut rng = SecureRandom::new();
        let dh = DhRatchet::active(seed.secret().clone(), remote, &mut rng)?;

        debug!(remote = %fingerprint(&remote), "created active session");
        Ok(Self::with_ratchet(seed, dh, config))
    }

    /// Create the responder's session.
    ///
    /// `ratchet_key` is the key pair whose public half the initiator used
    /// as `peer_ratchet_key`. The session can decrypt immediately but must
    /// receive before it can send.
    pub fn create_passive(seed: SessionSeed, ratchet_key: DhKeyPair, config: &Config) -> ProtocolResult<Self> {
        config.validate()?;
        let local = *ratchet_key.public();
        let dh = DhRatchet::passive(seed.secret().clone(), ratchet_key);

        debug!(local = %fingerprint(&local), "created passive session");
        Ok(Self::with_ratchet(seed, dh, config))
    }

    fn with_ratchet(seed: SessionSeed, dh: DhRatchet, config: &Config) -> Self {
        Self {
            associated_data: seed.associated_data().to_vec(),
            state: RatchetState {
                dh,
                send_chain: None,
                recv_chain: None,
                send_no: 0,
                recv_no: 0,
                prev_send_no: 0,
                skipped: SkippedKeyBuffer::new(config.max_skipped_chains, config.max_skipped_keys_per_chain),
            },
            config: config.clone(),
        }
    }

    fn max_skip(&self) -> u32 {
        u32::try_from(self.config.max_skipped_keys_per_chain).unwrap_or(u32::MAX)
    }

    /// Encrypt a message
    ///
    /// # Returns
    /// `header || ciphertext` and the authentication key for the caller's MAC
    ///
    /// # Errors
    /// * `CounterOverflow` - message number space exhausted
    /// * `InvalidState` - passive session that has not received yet
    pub fn encrypt(&mut self, plaintext: &[u8]) -> ProtocolResult<(Vec<u8>, SymmetricKey)> {
        let mut working = self.state.clone();
        let (message, cipher) = working.seal(plaintext)?;
        self.state = working;

        trace!(message_number = self.state.send_no - 1, "encrypted message");
        Ok((message, cipher.auth_key().clone()))
    }

    /// Decrypt a message produced by the peer's [`Session::encrypt`]
    ///
    /// This path has no MAC of its own. `verify` receives the message's
    /// authentication key and `header || ciphertext`, and must check the
    /// tag the caller transmitted next to the message. It runs before the
    /// body is decrypted, and the session only advances when it returns
    /// `Ok`. Callers without their own MAC framing should use
    /// [`Session::decrypt_authenticated`] instead.
    ///
    /// # Errors
    /// * `ShortCiphertext` / `InvalidPadding` - rejected message
    /// * any error returned by `verify`, typically `AuthenticationFailed`
    /// * `KeyNotCached` - duplicate or too old
    /// * `SkipLimitExceeded` - gap larger than the skip window
    pub fn decrypt<F, E>(&mut self, message: &[u8], verify: F) -> ProtocolResult<Vec<u8>>
    where
        F: FnOnce(&SymmetricKey, &[u8]) -> Result<(), E>,
        E: Into<ProtocolError>,
    {
        let mut working = self.state.clone();
        let result = working.open(message, self.max_skip()).and_then(|cipher| {
            if let Err(err) = verify(cipher.auth_key(), message) {
                return Err(err.into());
            }
            cipher.decrypt(&message[HEADER_LEN..]).map_err(ProtocolError::from)
        });

        self.finish(working, result)
    }

    /// Encrypt and append an HMAC-SHA256 tag over
    /// `associated_data || header || ciphertext`.
    pub fn encrypt_authenticated(&mut self, plaintext: &[u8]) -> ProtocolResult<Vec<u8>> {
        let mut working = self.state.clone();
        let (mut message, cipher) = working.seal(plaintext)?;
        let tag = compute_tag(
            cipher.auth_key(),
            &self.associated_data,
            &message,
            self.config.authenticated_tag_len,
        )?;
        self.state = working;

        message.extend_from_slice(&tag);
        Ok(message)
    }

    /// Verify the tag appended by [`Session::encrypt_authenticated`], then
    /// decrypt.
    pub fn decrypt_authenticated(&mut self, data: &[u8]) -> ProtocolResult<Vec<u8>> {
        let tag_len = self.config.authenticated_tag_len;
        if data.len() <= HEADER_LEN + tag_len {
            warn!("dropping short authenticated message");
            return Err(ProtocolError::ShortCiphertext);
        }
        let (message, tag) = data.split_at(data.len() - tag_len);

        let associated_data = self.associated_data.clone();
        self.decrypt(message, |auth_key, body| verify_tag(auth_key, &associated_data, body, tag))
    }

    fn finish(&mut self, working: RatchetState, result: ProtocolResult<Vec<u8>>) -> ProtocolResult<Vec<u8>> {
        match result {
            Ok(plaintext) => {
                self.state = working;
                trace!(recv_no = self.state.recv_no, "decrypted message");
                Ok(plaintext)
            }
            Err(err) => {
                warn!(error = %err, "dropping message");
                Err(err)
            }
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        let dh = &self.state.dh;
        if dh.is_active() && !dh.is_initialized() {
            SessionStatus::ActiveAwaitingFirstSend
        } else {
            SessionStatus::Established
        }
    }

    /// Associated data agreed during key agreement
    pub fn associated_data(&self) -> &[u8] {
        &self.associated_data
    }

    /// Current local ratchet public key
    pub fn local_ratchet_key(&self) -> &PublicKey {
        self.state.dh.local().public()
    }

    /// Number of cached skipped message keys
    pub fn skipped_key_count(&self) -> usize {
        self.state.skipped.len()
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status())
            .field("send_no", &self.state.send_no)
            .field("recv_no", &self.state.recv_no)
            .field("prev_send_no", &self.state.prev_send_no)
            .field("skipped_keys", &self.state.skipped.len())
            .finish_non_exhaustive()
    }
}
