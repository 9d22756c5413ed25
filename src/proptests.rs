//! Property-based tests for the session core.
//!
//! - Padding always yields whole blocks and strips back to the input
//! - Any plaintext survives a session round trip
//! - Any delivery order within the skip window decrypts
//! - Any single bit flip in an authenticated message is rejected without
//!   disturbing the session

use proptest::prelude::*;

use crate::crypto::{
    compute_tag, pkcs7_pad, pkcs7_unpad, verify_tag, DhKeyPair, SecureRandom, SymmetricKey,
    AES_BLOCK_SIZE,
};
use crate::handshake::SessionSeed;
use crate::ratchet::{MessageHeader, Session, HEADER_LEN};
use crate::Config;

fn session_pair() -> (Session, Session) {
    let mut rng = SecureRandom::new();
    let root: [u8; 32] = rng.gen_bytes().unwrap();
    let seed = SessionSeed::new(SymmetricKey::from_bytes(root), b"initiator|responder".to_vec());
    let ratchet = DhKeyPair::generate(&mut rng).unwrap();
    let config = Config::default();

    (
        Session::create_active(seed.clone(), &ratchet.public_bytes(), &config).unwrap(),
        Session::create_passive(seed, ratchet, &config).unwrap(),
    )
}

/// Plain encrypt with the tag computed on the caller's side.
fn send(session: &mut Session, plaintext: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let (message, auth_key) = session.encrypt(plaintext).unwrap();
    let tag = compute_tag(&auth_key, session.associated_data(), &message, 16).unwrap();
    (message, tag)
}

fn receive(session: &mut Session, message: &[u8], tag: &[u8]) -> crate::ProtocolResult<Vec<u8>> {
    let associated_data = session.associated_data().to_vec();
    session.decrypt(message, |auth_key, body| verify_tag(auth_key, &associated_data, body, tag))
}

// ==================== Padding Property Tests ====================

proptest! {
    /// Padded output is block aligned and unpads to the input.
    #[test]
    fn padding_roundtrip(data in prop::collection::vec(any::<u8>(), 0..200)) {
        let padded = pkcs7_pad(&data, AES_BLOCK_SIZE).unwrap();
        prop_assert_eq!(padded.len() % AES_BLOCK_SIZE, 0);
        prop_assert!(padded.len() > data.len());
        prop_assert_eq!(pkcs7_unpad(&padded, AES_BLOCK_SIZE).unwrap(), &data[..]);
    }

    /// Decoding any 36 bytes and re-encoding reproduces them.
    #[test]
    fn header_bytes_stable(bytes in prop::collection::vec(any::<u8>(), HEADER_LEN)) {
        let header = MessageHeader::decode(&bytes).unwrap();
        prop_assert_eq!(&header.encode().unwrap()[..], &bytes[..]);
    }
}

// ==================== Session Property Tests ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Decrypt(Encrypt(P)) == P in both directions.
    #[test]
    fn session_roundtrip(
        first in prop::collection::vec(any::<u8>(), 0..512),
        reply in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let (mut alice, mut bob) = session_pair();

        let (message, tag) = send(&mut alice, &first);
        prop_assert_eq!(receive(&mut bob, &message, &tag).unwrap(), first);

        let (message, tag) = send(&mut bob, &reply);
        prop_assert_eq!(receive(&mut alice, &message, &tag).unwrap(), reply);
    }

    /// Every permutation of a burst within the skip window decrypts.
    #[test]
    fn any_delivery_order(
        order in (1usize..16).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let (mut alice, mut bob) = session_pair();

        let messages: Vec<Vec<u8>> = (0..order.len())
            .map(|i| alice.encrypt_authenticated(format!("message {}", i).as_bytes()).unwrap())
            .collect();

        for &i in &order {
            let plaintext = bob.decrypt_authenticated(&messages[i]).unwrap();
            prop_assert_eq!(plaintext, format!("message {}", i).into_bytes());
        }
        prop_assert_eq!(bob.skipped_key_count(), 0);
    }

    /// A flipped bit anywhere is rejected and the untouched message still
    /// decrypts afterwards.
    #[test]
    fn tampering_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..100),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (mut alice, mut bob) = session_pair();
        let sealed = alice.encrypt_authenticated(&plaintext).unwrap();

        let mut tampered = sealed.clone();
        let at = position.index(tampered.len());
        tampered[at] ^= 1 << bit;

        prop_assert!(bob.decrypt_authenticated(&tampered).is_err());
        prop_assert_eq!(bob.decrypt_authenticated(&sealed).unwrap(), plaintext);
    }

    /// The same holds for a body bit flip on the plain path, where the
    /// caller carries the tag.
    #[test]
    fn plain_body_tampering_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..100),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (mut alice, mut bob) = session_pair();
        let (message, tag) = send(&mut alice, &plaintext);

        let mut tampered = message.clone();
        let at = HEADER_LEN + position.index(tampered.len() - HEADER_LEN);
        tampered[at] ^= 1 << bit;

        prop_assert!(receive(&mut bob, &tampered, &tag).is_err());
        prop_assert_eq!(receive(&mut bob, &message, &tag).unwrap(), plaintext);
    }
}
