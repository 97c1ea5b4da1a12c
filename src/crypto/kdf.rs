//! Password-based key derivation using PBKDF2-HMAC-SHA-256.
//!
//! The iteration count is the brute-force cost of every guess, so it is
//! never capped and derivations are never cached: the same password with
//! a different salt always pays the full price again.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultFillError};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Lowest iteration count accepted. Anything below is refused, not raised.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Derive a 32-byte key from a password and salt with the default
/// iteration count.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    derive_key_with_iterations(password, salt, DEFAULT_ITERATIONS)
}

/// Derive a 32-byte key with an explicit iteration count.
///
/// The same password + salt + iterations always produce the same key.
pub fn derive_key_with_iterations(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if iterations < MIN_ITERATIONS {
        return Err(VaultFillError::CryptoFault(format!(
            "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {iterations})"
        )));
    }
    if salt.len() != SALT_LEN {
        return Err(VaultFillError::CryptoFault(format!(
            "salt must be {SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }

    debug!(iterations, "deriving key");
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, key.as_mut());
    Ok(key)
}

/// Generate a random 16-byte salt from the operating system CSPRNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| VaultFillError::CryptoFault(format!("random source unavailable: {e}")))?;
    Ok(salt)
}
