//! Cryptographic primitives for VaultFill.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA-256 key derivation (`kdf`)
//! - Password-sealed AES-256-GCM envelopes (`envelope`)
//! - Login verification digests (`password`)
//! - The in-memory `SessionKey` (`keys`)
//!
//! Everything here is stateless.

pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod password;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, hash_password, verify_password, ...};
pub use envelope::{open, open_with_iterations, seal, seal_with_iterations, Envelope};
pub use kdf::{derive_key, derive_key_with_iterations, generate_salt, DEFAULT_ITERATIONS};
pub use keys::SessionKey;
pub use password::{
    hash_password, hash_password_with_iterations, verify_password,
    verify_password_with_iterations,
};
