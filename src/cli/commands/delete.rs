//! `vaultfill delete`: remove a credential.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{entry_for_platform, load_context, log_audit, unlock, Cli};
use crate::errors::{Result, VaultFillError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, platform: &str, force: bool) -> Result<()> {
    let ctx = load_context(cli)?;
    let mut store = unlock(cli, &ctx)?;

    let (id, name) = {
        let entry = entry_for_platform(&store, platform)?;
        (entry.id.clone(), entry.platform.clone())
    };

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete the credential for '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultFillError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    store.delete_entry(&id)?;

    log_audit(&ctx, "delete", store.current_email(), Some(&name), None);
    output::success(&format!("Deleted credential for '{name}'"));

    Ok(())
}
