//! Password-sealed envelopes: PBKDF2 + AES-256-GCM.
//!
//! Each call to `seal` generates a fresh random salt and nonce, derives
//! the key from the password and prepends both to the ciphertext. The
//! whole buffer is base64-encoded so it can sit in a string blob store.
//!
//! Layout of the decoded bytes:
//!   [ 16-byte salt | 12-byte nonce | ciphertext + 16-byte auth tag ]

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::kdf::{derive_key_with_iterations, generate_salt, DEFAULT_ITERATIONS, SALT_LEN};
use crate::errors::{Result, VaultFillError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// A self-contained, base64-encoded ciphertext or password digest.
///
/// Envelopes are immutable: every change to the protected data produces
/// a new one with a fresh salt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(String);

impl Envelope {
    /// Encode raw envelope bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Wrap an already-encoded envelope string (e.g. read from storage).
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Decode back to raw bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.0.as_bytes())
            .map_err(|e| VaultFillError::SerializationError(format!("envelope base64: {e}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({} chars)", self.0.len())
    }
}

/// Seal `plaintext` under `password` with the default iteration count.
pub fn seal(plaintext: &[u8], password: &[u8]) -> Result<Envelope> {
    seal_with_iterations(plaintext, password, DEFAULT_ITERATIONS)
}

/// Seal `plaintext` under `password`.
///
/// Returns base64(salt || nonce || ciphertext+tag). No associated data.
pub fn seal_with_iterations(plaintext: &[u8], password: &[u8], iterations: u32) -> Result<Envelope> {
    let salt = generate_salt()?;
    let key = derive_key_with_iterations(password, &salt, iterations)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| VaultFillError::CryptoFault(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| VaultFillError::CryptoFault(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(Envelope::from_bytes(&output))
}

/// Open an envelope with the default iteration count.
pub fn open(envelope: &Envelope, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    open_with_iterations(envelope, password, DEFAULT_ITERATIONS)
}

/// Open an envelope produced by `seal`.
///
/// A wrong password, a flipped bit and a truncated or undecodable
/// envelope all yield `AuthenticationFailure`, so the result cannot be
/// used as a password-guessing oracle. Only an unusable primitive
/// (e.g. a refused iteration count) is reported as `CryptoFault`.
pub fn open_with_iterations(
    envelope: &Envelope,
    password: &[u8],
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>> {
    let data = envelope
        .to_bytes()
        .map_err(|_| VaultFillError::AuthenticationFailure)?;

    if data.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(VaultFillError::AuthenticationFailure);
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let key = derive_key_with_iterations(password, salt, iterations)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| VaultFillError::CryptoFault(format!("invalid key length: {e}")))?;

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultFillError::AuthenticationFailure)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::MIN_ITERATIONS;

    const FAST: u32 = MIN_ITERATIONS;

    #[test]
    fn layout_has_salt_nonce_and_tag() {
        let env = seal_with_iterations(b"abc", b"pw", FAST).unwrap();
        let bytes = env.to_bytes().unwrap();
        assert_eq!(bytes.len(), SALT_LEN + NONCE_LEN + 3 + TAG_LEN);
    }

    #[test]
    fn every_bit_of_the_ciphertext_is_authenticated() {
        let env = seal_with_iterations(b"[]", b"pw", FAST).unwrap();
        let bytes = env.to_bytes().unwrap();

        for idx in SALT_LEN + NONCE_LEN..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[idx] ^= 0x01;
            let result = open_with_iterations(&Envelope::from_bytes(&tampered), b"pw", FAST);
            assert!(
                matches!(result, Err(VaultFillError::AuthenticationFailure)),
                "flip at byte {idx} was not detected"
            );
        }
    }

    #[test]
    fn tampered_salt_or_nonce_fails() {
        let env = seal_with_iterations(b"data", b"pw", FAST).unwrap();
        for idx in [0, SALT_LEN] {
            let mut bytes = env.to_bytes().unwrap();
            bytes[idx] ^= 0x80;
            assert!(open_with_iterations(&Envelope::from_bytes(&bytes), b"pw", FAST).is_err());
        }
    }

    #[test]
    fn garbage_is_an_authentication_failure() {
        let not_base64 = Envelope::from_encoded("%%%not-base64%%%");
        assert!(matches!(
            open_with_iterations(&not_base64, b"pw", FAST),
            Err(VaultFillError::AuthenticationFailure)
        ));

        let too_short = Envelope::from_bytes(&[0u8; SALT_LEN + NONCE_LEN]);
        assert!(matches!(
            open_with_iterations(&too_short, b"pw", FAST),
            Err(VaultFillError::AuthenticationFailure)
        ));
    }

    #[test]
    fn mismatched_iteration_count_fails() {
        let env = seal_with_iterations(b"data", b"pw", FAST).unwrap();
        assert!(matches!(
            open_with_iterations(&env, b"pw", FAST + 1),
            Err(VaultFillError::AuthenticationFailure)
        ));
    }

    #[test]
    fn debug_does_not_print_contents() {
        let env = Envelope::from_encoded("c2VjcmV0");
        assert_eq!(format!("{env:?}"), "Envelope(8 chars)");
    }
}
