//! OMEMO Core - Hello World Example
//!
//! Walks through key agreement and a short conversation between Alice and
//! Bob, including a message that arrives late.

use omemo_core::{
    receive_initial_message, create_signed_prekey, Config, DhKeyPair, IdentityKeyPair,
    OneTimeKey, OneTimePreKeyPair, PrekeyBundle, SecureRandom, Session, SessionManager,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("===========================================");
    println!("OMEMO Core - Hello World Example");
    println!("===========================================\n");

    let mut rng = SecureRandom::new();
    let config = Config::default();

    // Step 1: Identity keys
    println!("[1] Generating identity keys...");
    let alice_identity = IdentityKeyPair::generate(&mut rng)?;
    let bob_identity = IdentityKeyPair::generate(&mut rng)?;
    println!("    Alice: {}", hex::encode(&alice_identity.public_bytes()[..8]));
    println!("    Bob:   {}", hex::encode(&bob_identity.public_bytes()[..8]));
    println!("    Done!\n");

    // Step 2: Bob publishes a prekey bundle
    println!("[2] Bob publishes his prekey bundle...");
    let bob_spk = create_signed_prekey(&bob_identity)?;
    let bob_opk = OneTimePreKeyPair::generate(&mut rng)?;
    let bob_ratchet = DhKeyPair::generate(&mut rng)?;
    let bundle = PrekeyBundle::publish(&bob_identity, &bob_spk, OneTimeKey::Present(&bob_opk), &bob_ratchet);
    println!("    Signed prekey: {}", hex::encode(&bundle.signed_prekey()[..8]));
    println!("    Done!\n");

    // Step 3: Alice runs the key agreement
    println!("[3] Alice runs the key agreement...");
    let (alice_session, initial) = bundle.initiate(&alice_identity, &config)?;
    println!("    Ephemeral key: {}", hex::encode(&initial.ephemeral_public[..8]));
    println!("    One-time prekey used: {}", initial.one_time_prekey_used);
    println!("    Done!\n");

    // Step 4: Bob derives the same seed
    println!("[4] Bob answers the key agreement...");
    let seed = receive_initial_message(
        &bob_identity,
        OneTimeKey::Present(&bob_opk),
        &alice_identity.public_bytes(),
        &bob_spk,
        &initial.ephemeral_public,
    )?;
    let bob_session = Session::create_passive(seed, bob_ratchet, &config)?;
    println!("    Done!\n");

    // Step 5: Register the sessions
    let alice_sessions = SessionManager::new(config.clone())?;
    let bob_sessions = SessionManager::new(config)?;
    let to_bob = alice_sessions.insert_session(b"bob", alice_session);
    let to_alice = bob_sessions.insert_session(b"alice", bob_session);

    // Step 6: Exchange messages
    println!("[5] Exchanging messages...");
    let hello = to_bob.encrypt(b"Hello, Bob!")?;
    let delayed = to_bob.encrypt(b"This one takes the long way")?;
    let again = to_bob.encrypt(b"Are you there?")?;
    println!("    Alice -> Bob: {} bytes on the wire", hello.len());

    println!("    Bob reads:    {}", String::from_utf8_lossy(&to_alice.decrypt(&hello)?));
    println!("    Bob reads:    {}", String::from_utf8_lossy(&to_alice.decrypt(&again)?));

    let reply = to_alice.encrypt(b"Hi Alice, loud and clear.")?;
    println!("    Alice reads:  {}", String::from_utf8_lossy(&to_bob.decrypt(&reply)?));

    println!("    Bob reads:    {}", String::from_utf8_lossy(&to_alice.decrypt(&delayed)?));

    match to_alice.decrypt(&hello) {
        Ok(_) => println!("    Replay accepted?!"),
        Err(err) => println!("    Replay dropped: {}", err),
    }
    println!("    Done!\n");

    println!("===========================================");
    println!("Example completed successfully!");
    println!("===========================================");

    Ok(())
}
