//! Vault entries and user accounts.
//!
//! Records serialize with camelCase field names; the same JSON shape is
//! sealed at rest and broadcast to listening contexts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::DEFAULT_ITERATIONS;
use crate::crypto::Envelope;

/// A single stored credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    /// Opaque unique id (UUID v4).
    pub id: String,

    /// Display-normalized platform name, unique per account ignoring case.
    pub platform: String,

    pub username: String,

    pub secret: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VaultRecord {
    /// Case-insensitive platform comparison used for the uniqueness rule.
    pub fn same_platform(&self, platform: &str) -> bool {
        self.platform.to_lowercase() == platform.to_lowercase()
    }
}

impl fmt::Debug for VaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultRecord")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// A registered account. Stored in the `users` blob keyed by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Normalized email, the unique account id.
    pub email: String,

    /// `salt || digest` verification hash, never the password itself.
    pub password_hash: Envelope,

    pub created_at: DateTime<Utc>,

    /// PBKDF2 iterations used for this account's hash and entry envelope.
    /// Records written without the field fall back to the default.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSession {
    pub email: String,
    pub entry_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(platform: &str) -> VaultRecord {
        VaultRecord {
            id: "id-1".into(),
            platform: platform.into(),
            username: "bob".into(),
            secret: "p@ss".into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn serializes_camel_case_and_skips_missing_update() {
        let json = serde_json::to_value(record("Twitter")).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_none());
        assert_eq!(json["platform"], "Twitter");
    }

    #[test]
    fn same_platform_ignores_case() {
        assert!(record("Gmail").same_platform("gmail"));
        assert!(record("Gmail").same_platform("GMAIL"));
        assert!(!record("Gmail").same_platform("Gmx"));
    }

    #[test]
    fn debug_redacts_secret() {
        let shown = format!("{:?}", record("Twitter"));
        assert!(!shown.contains("p@ss"));
    }

    #[test]
    fn account_without_iterations_uses_default() {
        let json = r#"{"email":"a@x.com","passwordHash":"AAAA","createdAt":"2024-01-01T00:00:00Z"}"#;
        let account: UserAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.kdf_iterations, DEFAULT_ITERATIONS);
    }
}
