//! Integration tests for the VaultFill crypto module.

use vaultfill::crypto::kdf::{KEY_LEN, MIN_ITERATIONS, SALT_LEN};
use vaultfill::crypto::{
    derive_key_with_iterations, generate_salt, hash_password, hash_password_with_iterations,
    open, open_with_iterations, seal, seal_with_iterations, verify_password,
    verify_password_with_iterations, Envelope, SessionKey,
};
use vaultfill::errors::VaultFillError;

const FAST: u32 = 1_000;

// ---------------------------------------------------------------------------
// Envelope seal/open
// ---------------------------------------------------------------------------

#[test]
fn seal_open_with_default_cost() {
    let plaintext = br#"[{"platform":"Twitter","username":"bob"}]"#;

    let envelope = seal(plaintext, b"correcthorse1").expect("seal should succeed");
    let recovered = open(&envelope, b"correcthorse1").expect("open should succeed");

    assert_eq!(recovered.as_slice(), plaintext);
}

#[test]
fn sealing_twice_gives_different_envelopes() {
    let a = seal_with_iterations(b"same", b"pw", FAST).unwrap();
    let b = seal_with_iterations(b"same", b"pw", FAST).unwrap();

    // Fresh salt and nonce every time.
    assert_ne!(a, b, "two seals of the same plaintext must differ");
}

#[test]
fn wrong_password_is_an_authentication_failure() {
    let envelope = seal_with_iterations(b"top secret", b"right-password", FAST).unwrap();
    let err = open_with_iterations(&envelope, b"wrong-password", FAST).unwrap_err();
    assert!(matches!(err, VaultFillError::AuthenticationFailure));
    assert_eq!(err.to_string(), "Wrong password or corrupted vault");
}

#[test]
fn empty_and_unicode_plaintexts_survive() {
    for plaintext in ["", "pässwörd 🔐 密码"] {
        let envelope = seal_with_iterations(plaintext.as_bytes(), b"pw", FAST).unwrap();
        let opened = open_with_iterations(&envelope, b"pw", FAST).unwrap();
        assert_eq!(opened.as_slice(), plaintext.as_bytes());
    }
}

#[test]
fn envelope_is_base64_of_salt_nonce_and_ciphertext() {
    let envelope = seal_with_iterations(b"abc", b"pw", FAST).unwrap();
    let raw = envelope.to_bytes().unwrap();
    // 16 salt + 12 nonce + 3 ciphertext + 16 tag.
    assert_eq!(raw.len(), 16 + 12 + 3 + 16);
    assert!(envelope
        .as_str()
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')));
}

#[test]
fn envelope_from_foreign_text_fails_cleanly() {
    for text in ["", "not base64 at all!", "AAAA"] {
        let err = open_with_iterations(&Envelope::from_encoded(text), b"pw", FAST).unwrap_err();
        assert!(matches!(err, VaultFillError::AuthenticationFailure), "{text:?}");
    }
}

#[test]
fn envelope_serializes_as_plain_string() {
    let envelope = seal_with_iterations(b"x", b"pw", FAST).unwrap();
    let json = serde_json::to_string(&envelope).unwrap();
    assert_eq!(json, format!("\"{}\"", envelope.as_str()));
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derivation_is_deterministic_and_salt_sensitive() {
    let salt_a = [1u8; SALT_LEN];
    let salt_b = [2u8; SALT_LEN];

    let k1 = derive_key_with_iterations(b"pw", &salt_a, FAST).unwrap();
    let k2 = derive_key_with_iterations(b"pw", &salt_a, FAST).unwrap();
    let k3 = derive_key_with_iterations(b"pw", &salt_b, FAST).unwrap();

    assert_eq!(k1.len(), KEY_LEN);
    assert_eq!(*k1, *k2);
    assert_ne!(*k1, *k3);
}

#[test]
fn weak_iteration_counts_are_refused() {
    let salt = [0u8; SALT_LEN];
    let err = derive_key_with_iterations(b"pw", &salt, MIN_ITERATIONS - 1).unwrap_err();
    assert!(matches!(err, VaultFillError::CryptoFault(_)));
    assert!(seal_with_iterations(b"x", b"pw", 1).is_err());
}

#[test]
fn generated_salts_are_random() {
    assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

#[test]
fn hash_then_verify_with_default_cost() {
    let stored = hash_password(b"correcthorse1", None).unwrap();
    assert!(verify_password(b"correcthorse1", &stored));
    assert!(!verify_password(b"correcthorse2", &stored));
}

#[test]
fn hash_is_never_the_password() {
    let stored = hash_password_with_iterations(b"correcthorse1", None, FAST).unwrap();
    assert!(!stored.as_str().contains("correcthorse1"));
    assert_eq!(stored.to_bytes().unwrap().len(), SALT_LEN + KEY_LEN);
}

#[test]
fn verification_uses_the_stored_cost() {
    let stored = hash_password_with_iterations(b"pw-pw-pw-pw", None, FAST).unwrap();
    assert!(verify_password_with_iterations(b"pw-pw-pw-pw", &stored, FAST));
    assert!(!verify_password_with_iterations(b"pw-pw-pw-pw", &stored, FAST + 1));
}

#[test]
fn verify_never_errors_on_garbage() {
    assert!(!verify_password(b"pw", &Envelope::from_encoded("%%%")));
    assert!(!verify_password(b"pw", &Envelope::from_bytes(&[0u8; 10])));
}

// ---------------------------------------------------------------------------
// Session key
// ---------------------------------------------------------------------------

#[test]
fn session_key_debug_is_redacted() {
    let key = SessionKey::new(b"correcthorse1");
    assert_eq!(key.as_bytes(), b"correcthorse1");
    let debug = format!("{key:?}");
    assert!(!debug.contains("correcthorse1"));
}
