//! `vaultfill version`: display version.

/// Execute the `version` command.
pub fn execute() -> crate::errors::Result<()> {
    println!("vaultfill {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
