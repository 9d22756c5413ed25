//! Fuzz Testing for Session Decryption
//!
//! Run with: cargo fuzz run fuzz_decrypt

#![no_main]

use libfuzzer_sys::fuzz_target;
use omemo_core::{Config, DhKeyPair, ProtocolError, Session, SessionSeed, SymmetricKey};

fuzz_target!(|data: &[u8]| {
    let seed = SessionSeed::new(SymmetricKey::from_bytes([0x42u8; 32]), vec![0u8; 64]);
    let ratchet = DhKeyPair::from_secret_bytes([0x24u8; 32]);
    let config = Config::default();

    if let Ok(mut session) = Session::create_passive(seed, ratchet, &config) {
        // Untrusted input must never panic, only fail.
        let _ = session.decrypt(data, |_, _| Ok::<(), ProtocolError>(()));
        let _ = session.decrypt_authenticated(data);
    }
});
