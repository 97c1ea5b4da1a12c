//! `vaultfill add`: store a new credential.

use crate::cli::output;
use crate::cli::{load_context, log_audit, prompt_secret, unlock, Cli};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(cli: &Cli, platform: &str, username: &str, secret: Option<&str>) -> Result<()> {
    let ctx = load_context(cli)?;
    let mut store = unlock(cli, &ctx)?;

    let secret = prompt_secret(secret, platform)?;
    let record = store.add_entry(platform, username, &secret)?;

    log_audit(
        &ctx,
        "add",
        store.current_email(),
        Some(&record.platform),
        None,
    );
    output::success(&format!(
        "Added {} ({}), {} credential(s) stored",
        record.platform,
        record.username,
        store.entry_count()
    ));

    Ok(())
}
