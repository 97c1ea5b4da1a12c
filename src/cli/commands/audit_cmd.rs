//! `vaultfill audit`: display the audit log.
//!
//! Usage:
//!   vaultfill audit               # show last 50 entries
//!   vaultfill audit --last 20     # show last 20
//!   vaultfill audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Duration, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, AuditFilter, AuditLog};
use crate::cli::output;
use crate::cli::{load_context, Cli};
use crate::errors::{Result, VaultFillError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let ctx = load_context(cli)?;

    if !AuditLog::db_path(&ctx.data_dir).exists() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let audit = AuditLog::open(&ctx.data_dir)
        .ok_or_else(|| VaultFillError::AuditError("failed to open audit database".into()))?;

    // Without --email every account's history is shown.
    let filter = AuditFilter {
        limit: last,
        since: since.map(parse_since).transpose()?,
        account: cli.email.as_ref().map(|e| e.trim().to_lowercase()),
    };
    let entries = audit.query(&filter)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

/// Parse "7d", "24h" or "30m" into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        VaultFillError::CommandFailed(format!(
            "invalid duration '{input}': use a form like 7d, 24h, or 30m"
        ))
    };

    let unit = input.chars().last().ok_or_else(invalid)?;
    let amount: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;

    let span = match unit {
        'd' => Duration::days(amount),
        'h' => Duration::hours(amount),
        'm' => Duration::minutes(amount),
        _ => return Err(invalid()),
    };

    Ok(Utc::now() - span)
}

fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Account", "Platform", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.account.clone().unwrap_or_else(|| "-".into()),
            entry.platform.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

fn colorize_operation(op: &str) -> String {
    match op {
        "register" | "add" => style(op).green().to_string(),
        "edit" | "login" | "logout" => style(op).blue().to_string(),
        "delete" | "login-failed" => style(op).red().to_string(),
        "passwd" => style(op).yellow().to_string(),
        "fill" => style(op).cyan().to_string(),
        _ => op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_since_units() {
        let days = Utc::now() - parse_since("7d").unwrap();
        assert!((days.num_days() - 7).abs() <= 1);

        let hours = Utc::now() - parse_since("24h").unwrap();
        assert!((hours.num_hours() - 24).abs() <= 1);

        let minutes = Utc::now() - parse_since(" 30m ").unwrap();
        assert!((minutes.num_minutes() - 30).abs() <= 1);
    }

    #[test]
    fn parse_since_rejects_garbage() {
        assert!(parse_since("").is_err());
        assert!(parse_since("abc").is_err());
        assert!(parse_since("7x").is_err());
        assert!(parse_since("d").is_err());
        assert!(parse_since("7é").is_err());
    }

    #[test]
    fn colorize_keeps_operation_text() {
        for op in ["register", "delete", "passwd", "unknown"] {
            assert!(colorize_operation(op).contains(op));
        }
    }
}
