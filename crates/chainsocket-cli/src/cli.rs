//! CLI argument definitions for chainsocket.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// chainsocket -- chain WebAssembly agents, tools and models together.
#[derive(Parser)]
#[command(
    name = "chainsocket",
    version,
    about = "chainsocket -- WebAssembly plugin host for agents, tools and LLMs",
    long_about = "Loads the plugins an application document declares into sandboxed \
                  WebAssembly instances and holds a conversation with its entry agent."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub options: HostOptions,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Talk to the entry agent (default).
    Run,

    /// Load every plugin and list what loaded and what failed.
    Plugins,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct HostOptions {
    /// Application document listing tools, agents, llms and the entry agent.
    #[arg(long, global = true, default_value = "app.json")]
    pub config: PathBuf,

    /// Secrets document; falls back to OPENAI_API_KEY / GOOGLE_API_KEY.
    #[arg(long, global = true, default_value = "secrets.json")]
    pub secrets: PathBuf,

    /// Directory holding plugin module files [default: `plugins` next to the executable].
    #[arg(long, global = true)]
    pub plugins_dir: Option<PathBuf>,

    /// File receiving the debug-level trace.
    #[arg(long, global = true, default_value = "chain.out")]
    pub log_file: PathBuf,

    /// Per-call fuel budget for every plugin instance.
    #[arg(long, global = true)]
    pub max_fuel: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default() {
        let cli = Cli::try_parse_from(["chainsocket"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.options.config, PathBuf::from("app.json"));
        assert_eq!(cli.options.secrets, PathBuf::from("secrets.json"));
        assert_eq!(cli.options.log_file, PathBuf::from("chain.out"));
        assert!(cli.options.plugins_dir.is_none());
        assert!(cli.options.max_fuel.is_none());
    }

    #[test]
    fn options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chainsocket",
            "plugins",
            "--plugins-dir",
            "/opt/plugins",
            "--max-fuel",
            "5000",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Plugins));
        assert_eq!(cli.options.plugins_dir, Some(PathBuf::from("/opt/plugins")));
        assert_eq!(cli.options.max_fuel, Some(5000));
    }

    #[test]
    fn rejects_non_numeric_fuel() {
        assert!(Cli::try_parse_from(["chainsocket", "--max-fuel", "lots"]).is_err());
    }
}
