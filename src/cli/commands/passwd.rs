//! `vaultfill passwd`: change the master password.
//!
//! The current password comes from `VAULTFILL_PASSWORD` or a prompt, the
//! new one from `VAULTFILL_NEW_PASSWORD` or a confirmed prompt.

use crate::cli::output;
use crate::cli::{load_context, log_audit, open_store, prompt_new_password, prompt_password, resolve_email, Cli};
use crate::errors::Result;

/// Execute the `passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = load_context(cli)?;
    let mut store = open_store(&ctx)?;
    let email = resolve_email(cli, &store)?;

    let current = prompt_password(&format!("Current master password for {email}"))?;
    store.login(&email, current.as_bytes())?;

    let new = prompt_new_password("VAULTFILL_NEW_PASSWORD")?;
    store.change_password(current.as_bytes(), new.as_bytes())?;

    log_audit(&ctx, "passwd", store.current_email(), None, None);
    output::success(&format!(
        "Master password changed, {} credential(s) re-encrypted",
        store.entry_count()
    ));

    Ok(())
}
