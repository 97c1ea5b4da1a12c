//! `vaultfill fill`: produce the credential for a hostname.
//!
//! Prints `username` and `password` on two lines, or with `--copy` puts
//! only the password on the clipboard.

use crate::cli::output;
use crate::cli::{coordinator_for, load_context, log_audit, unlock, Cli};
use crate::errors::{Result, VaultFillError};
use crate::matcher::normalize_hostname;

/// Execute the `fill` command.
pub fn execute(cli: &Cli, hostname: &str, copy: bool) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = unlock(cli, &ctx)?;
    let coordinator = coordinator_for(&store, &ctx);

    let fill = coordinator.autofill(hostname).ok_or_else(|| {
        VaultFillError::CommandFailed(format!(
            "no credential matches {}",
            normalize_hostname(hostname)
        ))
    })?;

    log_audit(
        &ctx,
        "fill",
        store.current_email(),
        Some(&fill.platform),
        Some(&normalize_hostname(hostname)),
    );

    if copy {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| VaultFillError::CommandFailed(format!("clipboard unavailable: {e}")))?;
        clipboard
            .set_text(fill.secret.clone())
            .map_err(|e| VaultFillError::CommandFailed(format!("clipboard write: {e}")))?;
        output::success(&format!(
            "Copied the password for {} ({}) to the clipboard",
            fill.platform, fill.username
        ));
    } else {
        println!("{}", fill.username);
        println!("{}", fill.secret);
    }

    Ok(())
}
