//! Subcommand: `chainsocket plugins` -- load the registry and report on it.

use anyhow::Result;
use chainsocket_host::{Registry, Secrets};
use tracing::warn;

use crate::cli::HostOptions;
use crate::helpers::{build_runtime, load_app, load_secrets};

pub fn cmd_plugins(options: HostOptions) -> Result<()> {
    let app = load_app(&options)?;
    // Listing works without keys; plugins just see empty values.
    let secrets = load_secrets(&options).unwrap_or_else(|err| {
        warn!(error = %err, "continuing without secrets");
        Secrets::default()
    });
    let runtime = build_runtime(&options)?;

    let registry = Registry::build(&app.descriptors(), &secrets, &runtime);

    println!();
    println!("  {:<6} {:<24} {:<16}  DESCRIPTION", "KIND", "NAME", "SHA-256");
    for plugin in registry.plugins() {
        let hash = plugin.content_hash().to_string();
        let entry = if Some(plugin.name()) == app.entry_agent() { " (entry)" } else { "" };
        println!(
            "  {:<6} {:<24} {:.16}  {}{}",
            plugin.kind(),
            plugin.name(),
            hash,
            plugin.description(),
            entry
        );
    }

    if !registry.failures().is_empty() {
        println!();
        println!("  Failed to load:");
        for failure in registry.failures() {
            println!(
                "  {:<6} {:<24} {}: {}",
                failure.kind, failure.name, failure.module_file, failure.reason
            );
        }
    }
    println!();
    println!(
        "  {} loaded, {} failed",
        registry.len(),
        registry.failures().len()
    );

    registry.shutdown();
    Ok(())
}
