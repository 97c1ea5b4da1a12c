//! `vaultfill get`: print the password stored for a platform.

use crate::cli::{entry_for_platform, load_context, unlock, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, platform: &str) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = unlock(cli, &ctx)?;

    let entry = entry_for_platform(&store, platform)?;
    println!("{}", entry.secret);

    Ok(())
}
