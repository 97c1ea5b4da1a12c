//! `vaultfill edit`: change a stored credential.
//!
//! Fields not given on the command line keep their current value.

use crate::cli::output;
use crate::cli::{entry_for_platform, load_context, log_audit, prompt_secret, unlock, Cli};
use crate::errors::Result;

/// Execute the `edit` command.
pub fn execute(
    cli: &Cli,
    platform: &str,
    rename: Option<&str>,
    username: Option<&str>,
    new_secret: bool,
) -> Result<()> {
    let ctx = load_context(cli)?;
    let mut store = unlock(cli, &ctx)?;

    let current = entry_for_platform(&store, platform)?.clone();
    let secret = if new_secret {
        prompt_secret(None, &current.platform)?
    } else {
        zeroize::Zeroizing::new(current.secret.clone())
    };

    let updated = store.edit_entry(
        &current.id,
        rename.unwrap_or(current.platform.as_str()),
        username.unwrap_or(current.username.as_str()),
        &secret,
    )?;

    let details = (updated.platform != current.platform)
        .then(|| format!("renamed from {}", current.platform));
    log_audit(
        &ctx,
        "edit",
        store.current_email(),
        Some(&updated.platform),
        details.as_deref(),
    );
    output::success(&format!("Updated {}", updated.platform));

    Ok(())
}
