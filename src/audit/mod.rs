//! Append-only history of account and entry operations.
//!
//! Rows live in `<data_dir>/audit.db` (SQLite). A row names the operation,
//! the account and at most the platform; passwords and secrets never
//! reach this table.
//!
//! Auditing never gets in the way: if the database cannot be opened or
//! written, the operation being audited still goes ahead.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use crate::errors::{Result, VaultFillError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT NOT NULL,
    operation   TEXT NOT NULL,
    account     TEXT,
    platform    TEXT,
    details     TEXT
);
CREATE INDEX IF NOT EXISTS audit_log_account ON audit_log (account);";

/// One recorded operation.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub account: Option<String>,
    pub platform: Option<String>,
    pub details: Option<String>,
}

/// Which rows `AuditLog::query` returns.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    /// Maximum number of rows, newest first.
    pub limit: usize,
    /// Only rows at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only rows for this (normalized) account.
    pub account: Option<String>,
}

impl AuditFilter {
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            since: None,
            account: None,
        }
    }
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) `<data_dir>/audit.db`. `None` means auditing is
    /// unavailable for this run.
    pub fn open(data_dir: &Path) -> Option<Self> {
        let path = Self::db_path(data_dir);
        let conn = match Connection::open(&path) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(error = %e, path = %path.display(), "audit log unavailable");
                return None;
            }
        };
        conn.execute_batch(SCHEMA).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        Some(Self { conn })
    }

    /// Append one row. Failures are logged at debug level and dropped.
    pub fn log(
        &self,
        operation: &str,
        account: Option<&str>,
        platform: Option<&str>,
        details: Option<&str>,
    ) {
        let inserted = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, account, platform, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![Utc::now().to_rfc3339(), operation, account, platform, details],
        );
        if let Err(e) = inserted {
            debug!(error = %e, operation, "audit row dropped");
        }
    }

    /// Rows matching `filter`, newest first.
    pub fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        // UTC RFC 3339 strings sort chronologically; the epoch means "no
        // lower bound".
        let since = filter
            .since
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
            .to_rfc3339();
        let sql_err = |e: rusqlite::Error| VaultFillError::AuditError(e.to_string());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, account, platform, details
                 FROM audit_log
                 WHERE timestamp >= ?1 AND (?2 IS NULL OR account = ?2)
                 ORDER BY id DESC
                 LIMIT ?3",
            )
            .map_err(sql_err)?;

        let rows = stmt
            .query_map(params![since, filter.account, limit], |row| {
                let raw: String = row.get(1)?;
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&raw)
                        .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.with_timezone(&Utc)),
                    operation: row.get(2)?,
                    account: row.get(3)?,
                    platform: row.get(4)?,
                    details: row.get(5)?,
                })
            })
            .map_err(sql_err)?;

        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(sql_err)
    }

    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join("audit.db")
    }
}
