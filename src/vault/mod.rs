//! Vault module: accounts and encrypted entry storage.
//!
//! This module provides:
//! - `VaultRecord`, `UserAccount` and `AccountSession` types (`record`)
//! - The opaque key-value `BlobStore` and its implementations (`blob`)
//! - The high-level `VaultStore` for login, entries and persistence (`store`)

pub mod blob;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use record::{AccountSession, UserAccount, VaultRecord};
pub use store::{VaultStore, MAX_EMAIL_LEN, MIN_PASSWORD_LEN};
