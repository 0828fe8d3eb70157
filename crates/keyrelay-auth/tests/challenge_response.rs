//! End-to-end challenge/response through the public API: register an
//! identity, issue a challenge, sign it client-side, verify server-side.

use keyrelay_auth::registration::{RegisterRequest, register};
use keyrelay_auth::{
    Challenge, MemoryDirectory, PgpVerifier, SignatureVerifier, UserDirectory, Verification,
    sign_cleartext,
};
use pgp::{Deserializable, SignedSecretKey};

const ALICE_PUBLIC: &str = include_str!("../../../testdata/alice.pub.asc");
const ALICE_SECRET: &str = include_str!("../../../testdata/alice.sec.asc");
const MALLORY_SECRET: &str = include_str!("../../../testdata/mallory.sec.asc");

fn secret_key(armored: &str) -> SignedSecretKey {
    SignedSecretKey::from_string(armored).unwrap().0
}

#[tokio::test]
async fn test_signed_challenge_verifies_against_registered_key() {
    let dir = MemoryDirectory::new();
    register(
        &dir,
        RegisterRequest {
            username: "alice_w".into(),
            public_key: ALICE_PUBLIC.into(),
        },
    )
    .await
    .unwrap();

    let identity = dir.lookup("alice_w").await.unwrap().expect("registered");
    let challenge = Challenge::generate();
    let reply = sign_cleartext(&secret_key(ALICE_SECRET), challenge.as_str()).unwrap();

    match PgpVerifier.verify(&identity.public_key, &reply).unwrap() {
        Verification::Valid { cleartext } => {
            assert!(challenge.is_answered_by(&cleartext));
        }
        Verification::Invalid => panic!("signature should verify"),
    }
}

#[tokio::test]
async fn test_challenge_signed_by_another_key_is_invalid() {
    let challenge = Challenge::generate();
    let reply = sign_cleartext(&secret_key(MALLORY_SECRET), challenge.as_str()).unwrap();

    let verdict = PgpVerifier.verify(ALICE_PUBLIC, &reply).unwrap();

    assert_eq!(verdict, Verification::Invalid);
}

#[tokio::test]
async fn test_replayed_signature_answers_a_different_challenge() {
    let key = secret_key(ALICE_SECRET);

    // A reply captured from an earlier handshake is still a valid
    // signature, but it does not answer a freshly issued challenge.
    let old = Challenge::generate();
    let captured = sign_cleartext(&key, old.as_str()).unwrap();
    let fresh = Challenge::generate();

    let verdict = PgpVerifier.verify(ALICE_PUBLIC, &captured).unwrap();
    let Verification::Valid { cleartext } = verdict else {
        panic!("captured signature is still well formed");
    };
    assert!(!fresh.is_answered_by(&cleartext));
}
