use clap::Parser;
use vaultfill::cli::{commands, output, Cli, Commands};

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Register => commands::register::execute(&cli),
        Commands::Add {
            ref platform,
            ref username,
            ref secret,
        } => commands::add::execute(&cli, platform, username, secret.as_deref()),
        Commands::Edit {
            ref platform,
            ref rename,
            ref username,
            secret,
        } => commands::edit::execute(
            &cli,
            platform,
            rename.as_deref(),
            username.as_deref(),
            secret,
        ),
        Commands::Delete { ref platform, force } => {
            commands::delete::execute(&cli, platform, force)
        }
        Commands::List => commands::list::execute(&cli),
        Commands::Get { ref platform } => commands::get::execute(&cli, platform),
        Commands::Match { ref hostname } => commands::match_cmd::execute(&cli, hostname),
        Commands::Fill { ref hostname, copy } => commands::fill::execute(&cli, hostname, copy),
        Commands::Passwd => commands::passwd::execute(&cli),
        Commands::Status => commands::status::execute(&cli),
        Commands::Forget => commands::forget::execute(&cli),
        Commands::Serve => commands::serve::execute(&cli),
        #[cfg(feature = "audit-log")]
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => {
            output::warning("Audit logging is disabled in this build.");
            Ok(())
        }
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `VAULTFILL_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("VAULTFILL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
