//! Fuzz Testing for X3DH Key Agreement
//!
//! Run with: cargo fuzz run fuzz_handshake

#![no_main]

use libfuzzer_sys::fuzz_target;
use omemo_core::{
    create_initial_message, receive_initial_message, IdentityKeyPair, OneTimeKey,
    SignedPreKeyPair,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 160 {
        return;
    }

    let identity = IdentityKeyPair::from_seed(&[0x11u8; 32]);

    // Peer bundle taken from untrusted bytes
    let peer_identity = &data[..32];
    let peer_spk = &data[32..64];
    let peer_sig = &data[64..128];
    let peer_opk = &data[128..160];

    let _ = create_initial_message(
        &identity,
        peer_identity,
        OneTimeKey::Present(peer_opk),
        peer_spk,
        peer_sig,
    );
    let _ = create_initial_message(&identity, peer_identity, OneTimeKey::Absent, peer_spk, peer_sig);

    if let Ok(spk) = SignedPreKeyPair::from_parts([0x22u8; 32], &[0u8; 64]) {
        let _ = receive_initial_message(&identity, OneTimeKey::Absent, peer_identity, &spk, peer_opk);
    }
});
