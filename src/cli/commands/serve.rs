//! `vaultfill serve`: run the coordinator as a JSON-lines loop.
//!
//! Each stdin line is a query (`status`, `domain`, `autofill`) or an owner
//! command (`login`, `logout`, `add_entry`, `edit_entry`, `delete_entry`).
//! Every reply, and every snapshot the coordinator broadcasts, is written
//! to stdout as one JSON line. A malformed line gets an `error` reply and
//! the loop keeps going. EOF locks the vault and exits.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::cli::{load_context, log_audit, open_store, Cli, Context};
use crate::errors::Result;
use crate::sync::{Command, Inbound, Response, Session, SyncCoordinator};

/// Execute the `serve` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = load_context(cli)?;
    let store = open_store(&ctx)?;
    let session = Session::new(
        store,
        SyncCoordinator::new(ctx.settings.broadcast_capacity),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(session, &ctx))
}

async fn run(session: Session, ctx: &Context) -> Result<()> {
    let mut listener = session.coordinator().subscribe();
    let pusher = tokio::spawn(async move {
        while let Some(snapshot) = listener.recv().await {
            emit(&Response::Snapshot(snapshot));
        }
    });

    info!(data_dir = %ctx.data_dir.display(), "serving on stdin/stdout");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match Inbound::from_json(line) {
            Ok(Inbound::Query(request)) => session.coordinator().handle(request),
            Ok(Inbound::Command(command)) => execute_command(&session, ctx, command).await,
            Err(e) => Response::error(&e),
        };
        emit(&response);
    }

    // Ending the session closes the broadcast channel once the listener
    // has drained what is already queued.
    let _ = session.logout().await;
    drop(session);
    let _ = pusher.await;

    info!("input closed, coordinator stopped");
    Ok(())
}

async fn execute_command(session: &Session, ctx: &Context, command: Command) -> Response {
    let kind = command.kind();
    let platform = match &command {
        Command::AddEntry { platform, .. } | Command::EditEntry { platform, .. } => {
            Some(platform.clone())
        }
        _ => None,
    };
    let account = match &command {
        Command::Login { email, .. } => Some(email.trim().to_lowercase()),
        _ => session.coordinator().query_status().account_email,
    };

    let response = session.execute(command).await;

    let operation = match (&response, kind) {
        (Response::Error { .. }, "login") => "login-failed",
        (Response::Error { .. }, _) => return response,
        (_, kind) => kind,
    };
    log_audit(
        ctx,
        operation,
        account.as_deref(),
        platform.as_deref(),
        Some("serve"),
    );
    response
}

fn emit(response: &Response) {
    match response.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "could not encode response"),
    }
}
