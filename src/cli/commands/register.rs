//! `vaultfill register`: create a new account.

use dialoguer::Input;

use crate::cli::output;
use crate::cli::{load_context, log_audit, open_store, prompt_new_password, Cli};
use crate::errors::{Result, VaultFillError};

/// Execute the `register` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = open_store(&ctx)?;

    let email = match &cli.email {
        Some(email) => email.clone(),
        None => Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(|e| VaultFillError::CommandFailed(format!("email prompt: {e}")))?,
    };

    let password = prompt_new_password("VAULTFILL_PASSWORD")?;
    let account = store.register(&email, password.as_bytes())?;

    log_audit(&ctx, "register", Some(&account.email), None, None);
    output::success(&format!("Registered {}", account.email));
    output::tip(&format!(
        "Run `vaultfill add <PLATFORM> <USERNAME> --email {}` to store a credential.",
        account.email
    ));

    Ok(())
}
