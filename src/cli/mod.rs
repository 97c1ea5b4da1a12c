//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultFillError};
use crate::sync::{Event, SyncCoordinator};
use crate::vault::{FileBlobStore, VaultRecord, VaultStore, MIN_PASSWORD_LEN};

/// VaultFill CLI: local encrypted credential store with domain autofill.
#[derive(Parser)]
#[command(
    name = "vaultfill",
    about = "Local encrypted credential store with domain-matched autofill",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (default: .vaultfill, or `data_dir` in .vaultfill.toml)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Account email (default: the last account that logged in)
    #[arg(short, long, env = "VAULTFILL_EMAIL", global = true)]
    pub email: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Register a new account
    Register,

    /// Add a credential
    Add {
        /// Platform name (e.g. Twitter)
        platform: String,
        /// Username on that platform
        username: String,
        /// Password (omit for interactive prompt)
        secret: Option<String>,
    },

    /// Change a stored credential
    Edit {
        /// Platform of the entry to change
        platform: String,
        /// New platform name
        #[arg(long)]
        rename: Option<String>,
        /// New username
        #[arg(short, long)]
        username: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        secret: bool,
    },

    /// Delete a credential
    Delete {
        /// Platform of the entry to delete
        platform: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List stored credentials (passwords hidden)
    List,

    /// Print the password stored for a platform
    Get {
        /// Platform name
        platform: String,
    },

    /// Show which credential would be offered for a hostname
    Match {
        /// Hostname of the page (e.g. www.github.com)
        hostname: String,
    },

    /// Fill the credential for a hostname
    Fill {
        /// Hostname of the page (e.g. www.github.com)
        hostname: String,
        /// Copy the password to the clipboard instead of printing it
        #[arg(short, long)]
        copy: bool,
    },

    /// Change the master password
    Passwd,

    /// Show registered accounts and the remembered login
    Status,

    /// Forget the remembered login
    Forget,

    /// Run the coordinator over JSON lines on stdin/stdout
    Serve,

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show version
    Version,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings and resolved paths for one invocation.
pub struct Context {
    pub settings: Settings,
    pub data_dir: PathBuf,
}

/// Load `.vaultfill.toml` from the working directory and resolve the data
/// directory against `--data-dir`.
pub fn load_context(cli: &Cli) -> Result<Context> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let data_dir = settings.data_path(&cwd, cli.data_dir.as_deref());
    Ok(Context { settings, data_dir })
}

/// Open a locked `VaultStore` over the data directory.
pub fn open_store(ctx: &Context) -> Result<VaultStore> {
    let blobs = FileBlobStore::open(&ctx.data_dir)?;
    Ok(VaultStore::with_kdf_iterations(
        Arc::new(blobs),
        ctx.settings.kdf_iterations,
    ))
}

/// The account to act on: `--email`, else the remembered login.
pub fn resolve_email(cli: &Cli, store: &VaultStore) -> Result<String> {
    if let Some(email) = &cli.email {
        return Ok(email.clone());
    }
    store.remembered_user()?.ok_or_else(|| {
        VaultFillError::CommandFailed(
            "no account selected; pass --email or run `vaultfill register`".into(),
        )
    })
}

/// Open the store and log in, prompting for the master password.
pub fn unlock(cli: &Cli, ctx: &Context) -> Result<VaultStore> {
    let mut store = open_store(ctx)?;
    let email = resolve_email(cli, &store)?;
    let password = prompt_password(&format!("Master password for {email}"))?;

    match store.login(&email, password.as_bytes()) {
        Ok(session) => {
            log_audit(ctx, "login", Some(&session.email), None, None);
            Ok(store)
        }
        Err(e) => {
            log_audit(ctx, "login-failed", Some(&email), None, None);
            Err(e)
        }
    }
}

/// Look up an entry by platform name (case-insensitive).
pub fn entry_for_platform<'a>(store: &'a VaultStore, platform: &str) -> Result<&'a VaultRecord> {
    store
        .find_by_platform(platform)
        .ok_or_else(|| VaultFillError::NotFound(platform.trim().to_string()))
}

/// A coordinator mirroring an unlocked store, for one-shot queries.
pub fn coordinator_for(store: &VaultStore, ctx: &Context) -> SyncCoordinator {
    let coordinator = SyncCoordinator::new(ctx.settings.broadcast_capacity);
    if let Some(email) = store.current_email() {
        coordinator.publish(Event::Login {
            email: email.to_string(),
        });
        coordinator.publish(Event::EntriesChanged {
            entries: store.entries().to_vec(),
        });
    }
    coordinator
}

/// Get the master password, trying in order:
/// 1. `VAULTFILL_PASSWORD` env var (scripts, tests)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var("VAULTFILL_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| VaultFillError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new master password with confirmation.
///
/// Also respects `VAULTFILL_PASSWORD` (or `VAULTFILL_NEW_PASSWORD` when
/// both an old and a new password are needed). Enforces a minimum length.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSWORD_LEN {
                return Err(VaultFillError::CommandFailed(format!(
                    "password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose master password")
            .with_confirmation(
                "Confirm master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| VaultFillError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Prompt for an entry's secret, unless one was given on the command line.
pub fn prompt_secret(given: Option<&str>, platform: &str) -> Result<Zeroizing<String>> {
    if let Some(secret) = given {
        return Ok(Zeroizing::new(secret.to_string()));
    }
    let secret = dialoguer::Password::new()
        .with_prompt(format!("Password for {platform}"))
        .interact()
        .map_err(|e| VaultFillError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(secret))
}

/// Append to the audit log. Never fails the calling command.
#[cfg(feature = "audit-log")]
pub fn log_audit(
    ctx: &Context,
    operation: &str,
    account: Option<&str>,
    platform: Option<&str>,
    details: Option<&str>,
) {
    if let Some(audit) = crate::audit::AuditLog::open(&ctx.data_dir) {
        audit.log(operation, account, platform, details);
    }
}

#[cfg(not(feature = "audit-log"))]
pub fn log_audit(
    _ctx: &Context,
    _operation: &str,
    _account: Option<&str>,
    _platform: Option<&str>,
    _details: Option<&str>,
) {
}
