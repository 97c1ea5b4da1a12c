//! Cross-context message types.
//!
//! Every message kind is a variant of a closed, internally tagged enum
//! (`{"type": "...", ...}`). Anything that does not parse into one of
//! them is rejected at the boundary with `VaultFillError::Protocol`.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultFillError};
use crate::vault::VaultRecord;

/// State changes published by the owning context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Event {
    Login { email: String },
    Logout,
    EntriesChanged { entries: Vec<VaultRecord> },
}

/// The state pushed to every listening context after each event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub is_logged_in: bool,
    pub entries: Vec<VaultRecord>,
}

/// Point-in-time status for a requesting context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_logged_in: bool,
    pub account_email: Option<String>,
    pub entry_count: usize,
}

/// One matched credential, to be used for a single fill and not cached.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillResult {
    pub platform: String,
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for AutofillResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutofillResult")
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl From<&VaultRecord> for AutofillResult {
    fn from(record: &VaultRecord) -> Self {
        Self {
            platform: record.platform.clone(),
            username: record.username.clone(),
            secret: record.secret.clone(),
        }
    }
}

/// Read-only queries any context may send to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Status,
    Domain { hostname: String },
    Autofill { hostname: String },
}

/// Mutations only the owning context may issue.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Login {
        email: String,
        password: String,
    },
    Logout,
    AddEntry {
        platform: String,
        username: String,
        secret: String,
    },
    EditEntry {
        id: String,
        platform: String,
        username: String,
        secret: String,
    },
    DeleteEntry {
        id: String,
    },
}

impl Command {
    /// Short operation name, safe to log or audit.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::AddEntry { .. } => "add",
            Self::EditEntry { .. } => "edit",
            Self::DeleteEntry { .. } => "delete",
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the kind; passwords and secrets stay out of logs.
        write!(f, "Command({})", self.kind())
    }
}

/// Anything a context can send over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Query(Request),
    Command(Command),
}

impl Inbound {
    /// Parse and validate one JSON message.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|_| {
            let kind = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string));
            match kind {
                Some(kind) => VaultFillError::Protocol(format!("unknown or invalid '{kind}' message")),
                None => VaultFillError::Protocol("expected a JSON object with a 'type' field".into()),
            }
        })
    }
}

/// Replies and pushes written back to contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Response {
    Status(StatusReport),
    Domain { entry: Option<VaultRecord> },
    Autofill { fill: Option<AutofillResult> },
    Ok { entry_count: usize },
    Entry { entry: VaultRecord },
    Snapshot(Snapshot),
    Error { message: String },
}

impl Response {
    pub fn error(err: &VaultFillError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| VaultFillError::SerializationError(format!("response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_queries() {
        assert_eq!(
            Inbound::from_json(r#"{"type":"status"}"#).unwrap(),
            Inbound::Query(Request::Status)
        );
        assert_eq!(
            Inbound::from_json(r#"{"type":"domain","hostname":"github.com"}"#).unwrap(),
            Inbound::Query(Request::Domain {
                hostname: "github.com".into()
            })
        );
    }

    #[test]
    fn parses_commands() {
        let parsed =
            Inbound::from_json(r#"{"type":"login","email":"a@x.com","password":"pw"}"#).unwrap();
        assert!(matches!(parsed, Inbound::Command(Command::Login { .. })));

        let parsed = Inbound::from_json(r#"{"type":"delete_entry","id":"abc"}"#).unwrap();
        assert_eq!(
            parsed,
            Inbound::Command(Command::DeleteEntry { id: "abc".into() })
        );
    }

    #[test]
    fn rejects_unknown_kinds_and_missing_fields() {
        let err = Inbound::from_json(r#"{"type":"explode"}"#).unwrap_err();
        assert!(err.to_string().contains("explode"));

        let err = Inbound::from_json(r#"{"type":"domain"}"#).unwrap_err();
        assert!(matches!(err, VaultFillError::Protocol(_)));

        let err = Inbound::from_json("not json").unwrap_err();
        assert!(err.to_string().contains("'type'"));
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = Response::Status(StatusReport {
            is_logged_in: true,
            account_email: Some("a@x.com".into()),
            entry_count: 2,
        })
        .to_json()
        .unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""isLoggedIn":true"#));
        assert!(json.contains(r#""accountEmail":"a@x.com""#));
    }

    #[test]
    fn command_debug_hides_secrets() {
        let cmd = Command::Login {
            email: "a@x.com".into(),
            password: "correcthorse1".into(),
        };
        assert_eq!(format!("{cmd:?}"), "Command(login)");
    }
}
