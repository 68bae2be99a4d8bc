//! Subcommand: `chainsocket run` -- conversation with the entry agent.

use std::io;

use anyhow::{Context, Result};
use chainsocket_host::conversation::NO_ENTRY_MESSAGE;
use chainsocket_host::{AppConfig, Secrets, drive};
use chainsocket_sandbox::SandboxRuntime;
use tracing::info;

use crate::cli::HostOptions;
use crate::helpers::{build_runtime, load_app, load_secrets};

/// Everything a conversation needs once an entry agent is known.
struct Session {
    app: AppConfig,
    secrets: Secrets,
    runtime: SandboxRuntime,
}

/// Load the document and, only when it names an entry agent, the secrets
/// and runtime.  `None` means there is nobody to talk to.
fn prepare(options: &HostOptions) -> Result<Option<Session>> {
    let app = load_app(options)?;
    if app.entry_agent().is_none() {
        info!("no entry agent configured");
        return Ok(None);
    }
    let secrets = load_secrets(options)?;
    let runtime = build_runtime(options)?;
    Ok(Some(Session {
        app,
        secrets,
        runtime,
    }))
}

/// Run the conversation loop on stdin/stdout.
///
/// Plugins execute synchronously, so the loop runs on a blocking thread;
/// their outbound requests reach back into this runtime through its handle.
pub async fn cmd_run(options: HostOptions) -> Result<()> {
    info!("starting chainsocket");

    let Some(Session {
        app,
        secrets,
        runtime,
    }) = prepare(&options)?
    else {
        println!("{NO_ENTRY_MESSAGE}");
        return Ok(());
    };

    let session = tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        let stdout = io::stdout();
        drive(&app, &secrets, &runtime, stdin.lock(), stdout.lock())
    });

    tokio::select! {
        joined = session => {
            joined
                .context("conversation task panicked")?
                .context("conversation failed")?;
            info!("conversation ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, exiting");
            // The blocking reader holds stdin and stdout and cannot be
            // cancelled; leave without waiting for it.
            std::process::exit(0);
        }
    }

    Ok(())
}
