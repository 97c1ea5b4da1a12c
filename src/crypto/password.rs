//! Login verification digests.
//!
//! A password hash is an `Envelope` holding `salt || digest`, where the
//! digest is 256 raw PBKDF2 bits. It shares the salt prefix with sealed
//! entry lists but carries no nonce. It only ever answers "is this the
//! password"; it is never used as an encryption key.

use subtle::ConstantTimeEq;
use tracing::debug;

use super::envelope::Envelope;
use super::kdf::{derive_key_with_iterations, generate_salt, DEFAULT_ITERATIONS, KEY_LEN, SALT_LEN};
use crate::errors::Result;

/// Hash `password` for storage, generating a salt if none is given.
pub fn hash_password(password: &[u8], salt: Option<&[u8; SALT_LEN]>) -> Result<Envelope> {
    hash_password_with_iterations(password, salt, DEFAULT_ITERATIONS)
}

/// Hash `password` with an explicit iteration count.
pub fn hash_password_with_iterations(
    password: &[u8],
    salt: Option<&[u8; SALT_LEN]>,
    iterations: u32,
) -> Result<Envelope> {
    let salt = match salt {
        Some(s) => *s,
        None => generate_salt()?,
    };
    let digest = derive_key_with_iterations(password, &salt, iterations)?;

    let mut output = Vec::with_capacity(SALT_LEN + KEY_LEN);
    output.extend_from_slice(&salt);
    output.extend_from_slice(digest.as_ref());
    Ok(Envelope::from_bytes(&output))
}

/// Check `password` against a stored hash with the default iteration count.
pub fn verify_password(password: &[u8], stored: &Envelope) -> bool {
    verify_password_with_iterations(password, stored, DEFAULT_ITERATIONS)
}

/// Check `password` against a stored hash.
///
/// Never fails: a malformed record, a refused iteration count and a
/// wrong password all return `false`. The digest comparison is constant
/// time.
pub fn verify_password_with_iterations(password: &[u8], stored: &Envelope, iterations: u32) -> bool {
    let Ok(bytes) = stored.to_bytes() else {
        debug!("password hash is not valid base64");
        return false;
    };
    if bytes.len() != SALT_LEN + KEY_LEN {
        debug!(len = bytes.len(), "password hash has unexpected length");
        return false;
    }

    let (salt, expected) = bytes.split_at(SALT_LEN);
    match derive_key_with_iterations(password, salt, iterations) {
        Ok(actual) => actual.as_ref().ct_eq(expected).into(),
        Err(e) => {
            debug!(error = %e, "password hash re-derivation failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::MIN_ITERATIONS;

    const FAST: u32 = MIN_ITERATIONS;

    #[test]
    fn explicit_salt_is_deterministic() {
        let salt = [3u8; SALT_LEN];
        let h1 = hash_password_with_iterations(b"pw", Some(&salt), FAST).unwrap();
        let h2 = hash_password_with_iterations(b"pw", Some(&salt), FAST).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn generated_salts_differ() {
        let h1 = hash_password_with_iterations(b"pw", None, FAST).unwrap();
        let h2 = hash_password_with_iterations(b"pw", None, FAST).unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password_with_iterations(b"pw", &h1, FAST));
        assert!(verify_password_with_iterations(b"pw", &h2, FAST));
    }

    #[test]
    fn hash_layout_is_salt_then_digest() {
        let salt = [9u8; SALT_LEN];
        let h = hash_password_with_iterations(b"pw", Some(&salt), FAST).unwrap();
        let bytes = h.to_bytes().unwrap();
        assert_eq!(bytes.len(), SALT_LEN + KEY_LEN);
        assert_eq!(&bytes[..SALT_LEN], &salt);
    }

    #[test]
    fn malformed_records_verify_false() {
        assert!(!verify_password_with_iterations(
            b"pw",
            &Envelope::from_encoded("not base64 !!"),
            FAST
        ));
        assert!(!verify_password_with_iterations(
            b"pw",
            &Envelope::from_bytes(&[1u8; 10]),
            FAST
        ));
        // A sealed entry list is not a password hash.
        let sealed = crate::crypto::seal_with_iterations(b"[]", b"pw", FAST).unwrap();
        assert!(!verify_password_with_iterations(b"pw", &sealed, FAST));
    }

    #[test]
    fn refused_iteration_count_verifies_false() {
        let h = hash_password_with_iterations(b"pw", None, FAST).unwrap();
        assert!(!verify_password_with_iterations(b"pw", &h, 1));
    }
}
