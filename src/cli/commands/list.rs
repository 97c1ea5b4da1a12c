//! `vaultfill list`: display all credentials in a table.

use crate::cli::output;
use crate::cli::{load_context, unlock, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = unlock(cli, &ctx)?;

    output::info(&format!(
        "{}: {} credential(s)",
        store.current_email().unwrap_or_default(),
        store.entry_count()
    ));
    output::print_entries_table(store.entries());

    Ok(())
}
