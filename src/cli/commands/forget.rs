//! `vaultfill forget`: clear the remembered login.

use crate::cli::output;
use crate::cli::{load_context, open_store, Cli};
use crate::errors::Result;

/// Execute the `forget` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = open_store(&ctx)?;

    match store.remembered_user()? {
        Some(email) => {
            store.forget_user()?;
            output::success(&format!("Forgot {email}"));
        }
        None => output::info("No remembered login."),
    }

    Ok(())
}
