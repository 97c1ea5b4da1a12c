//! `vaultfill match`: show which credential a hostname resolves to.

use crate::cli::output;
use crate::cli::{coordinator_for, load_context, unlock, Cli};
use crate::errors::Result;
use crate::matcher::normalize_hostname;

/// Execute the `match` command.
pub fn execute(cli: &Cli, hostname: &str) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = unlock(cli, &ctx)?;
    let coordinator = coordinator_for(&store, &ctx);

    match coordinator.query_for_domain(hostname) {
        Some(entry) => {
            output::success(&format!(
                "{} matches {} ({})",
                normalize_hostname(hostname),
                entry.platform,
                entry.username
            ));
        }
        None => {
            output::info(&format!(
                "No credential matches {}",
                normalize_hostname(hostname)
            ));
        }
    }

    Ok(())
}
