//! `vaultfill status`: show accounts without unlocking anything.

use console::style;

use crate::cli::output;
use crate::cli::{load_context, open_store, Cli};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = open_store(&ctx)?;

    let emails = store.registered_emails()?;
    let remembered = store.remembered_user()?;

    println!("{} {}", style("Data directory:").bold(), ctx.data_dir.display());
    println!("{} {}", style("KDF iterations:").bold(), store.kdf_iterations());

    if emails.is_empty() {
        output::info("No accounts registered.");
        output::tip("Run `vaultfill register` to create one.");
        return Ok(());
    }

    println!("{} {}", style("Accounts:").bold(), emails.len());
    for email in &emails {
        let marker = if remembered.as_deref() == Some(email.as_str()) {
            style("(remembered)").green().to_string()
        } else {
            String::new()
        };
        println!("  {email} {marker}");
    }

    Ok(())
}
