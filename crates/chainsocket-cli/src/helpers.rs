//! Shared helper functions used across CLI subcommands.
//!
//! Includes tracing initialization and loading of the application document,
//! secrets and sandbox runtime.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chainsocket_host::{AppConfig, Secrets};
use chainsocket_sandbox::{SandboxConfig, SandboxRuntime};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::HostOptions;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Filter for the log file layer.
const FILE_FILTER: &str = "warn,chainsocket=debug,chainsocket_host=debug,chainsocket_sandbox=debug";

/// Initialize tracing: compact events on stderr at `default_level` (or
/// `RUST_LOG`), plus a debug-level trace appended to `log_file`.
pub fn init_tracing(default_level: &str, log_file: &Path) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file = File::options()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// `explicit` if given, otherwise `plugins` beside the running executable.
pub fn resolve_plugins_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let exe = std::env::current_exe().context("failed to locate the running executable")?;
    let base = exe
        .parent()
        .context("executable path has no parent directory")?;
    Ok(base.join("plugins"))
}

pub fn build_runtime(options: &HostOptions) -> Result<SandboxRuntime> {
    let plugins_dir = resolve_plugins_dir(options.plugins_dir.as_deref())?;
    info!(path = %plugins_dir.display(), max_fuel = ?options.max_fuel, "plugins directory");
    let config = SandboxConfig::new()
        .with_plugins_dir(plugins_dir)
        .with_max_fuel(options.max_fuel);
    SandboxRuntime::new(config).context("failed to create sandbox runtime")
}

pub fn load_app(options: &HostOptions) -> Result<AppConfig> {
    let app = AppConfig::from_file(&options.config)
        .with_context(|| format!("failed to load {}", options.config.display()))?;
    info!(
        tools = app.tools.len(),
        agents = app.agents.len(),
        llms = app.llms.len(),
        entry = app.entry_agent().unwrap_or("-"),
        "application document loaded"
    );
    Ok(app)
}

pub fn load_secrets(options: &HostOptions) -> Result<Secrets> {
    Secrets::load(&options.secrets)
        .with_context(|| format!("failed to load secrets from {}", options.secrets.display()))
}
