//! Benchmarks for the OMEMO session core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use omemo_core::{
    create_initial_message, create_signed_prekey, message_kdf, receive_initial_message, Config,
    DhKeyPair, IdentityKeyPair, MessageCipher, OneTimeKey, OneTimePreKeyPair, SecureRandom,
    Session, SessionSeed, SymmetricKey,
};

fn session_pair() -> (Session, Session) {
    let mut rng = SecureRandom::new();
    let seed = SessionSeed::new(SymmetricKey::from_bytes([0x42u8; 32]), vec![0u8; 64]);
    let ratchet = DhKeyPair::generate(&mut rng).unwrap();
    let config = Config::default();
    (
        Session::create_active(seed.clone(), &ratchet.public_bytes(), &config).unwrap(),
        Session::create_passive(seed, ratchet, &config).unwrap(),
    )
}

fn bench_message_cipher(c: &mut Criterion) {
    let cipher = MessageCipher::new(&SymmetricKey::from_bytes([0x42u8; 32])).unwrap();

    let mut group = c.benchmark_group("message_cipher");
    for size in [16, 64, 256, 1024, 4096, 16384].iter() {
        let data = vec![0u8; *size];
        let ciphertext = cipher.encrypt(&data).unwrap();

        group.bench_with_input(BenchmarkId::new("encrypt", size), &data, |b, data| {
            b.iter(|| cipher.encrypt(black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("decrypt", size), &ciphertext, |b, ct| {
            b.iter(|| cipher.decrypt(black_box(ct)))
        });
    }
    group.finish();
}

fn bench_key_derivation(c: &mut Criterion) {
    let key = SymmetricKey::from_bytes([0x42u8; 32]);
    c.bench_function("message_kdf", |b| b.iter(|| message_kdf(black_box(&key))));
}

fn bench_key_agreement(c: &mut Criterion) {
    let mut rng = SecureRandom::new();
    let alice = IdentityKeyPair::generate(&mut rng).unwrap();
    let bob = IdentityKeyPair::generate(&mut rng).unwrap();
    let spk = create_signed_prekey(&bob).unwrap();
    let opk = OneTimePreKeyPair::generate(&mut rng).unwrap();
    let opk_pub = opk.public_bytes();

    c.bench_function("x3dh_initiator", |b| {
        b.iter(|| {
            create_initial_message(
                &alice,
                &bob.public_bytes(),
                OneTimeKey::Present(&opk_pub[..]),
                &spk.public_bytes(),
                &spk.signature_bytes(),
            )
        })
    });

    let initial = create_initial_message(
        &alice,
        &bob.public_bytes(),
        OneTimeKey::Present(&opk_pub[..]),
        &spk.public_bytes(),
        &spk.signature_bytes(),
    )
    .unwrap();
    c.bench_function("x3dh_responder", |b| {
        b.iter(|| {
            receive_initial_message(
                &bob,
                OneTimeKey::Present(&opk),
                &alice.public_bytes(),
                &spk,
                black_box(&initial.ephemeral_public),
            )
        })
    });
}

fn bench_session_operations(c: &mut Criterion) {
    c.bench_function("session_encrypt_same_chain", |b| {
        let (mut alice, _) = session_pair();
        b.iter(|| alice.encrypt(black_box(b"benchmark message")))
    });

    c.bench_function("session_ping_pong", |b| {
        let (mut alice, mut bob) = session_pair();
        b.iter(|| {
            let m = alice.encrypt_authenticated(b"ping").unwrap();
            bob.decrypt_authenticated(&m).unwrap();
            let m = bob.encrypt_authenticated(b"pong").unwrap();
            alice.decrypt_authenticated(&m).unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_message_cipher,
    bench_key_derivation,
    bench_key_agreement,
    bench_session_operations
);
criterion_main!(benches);
