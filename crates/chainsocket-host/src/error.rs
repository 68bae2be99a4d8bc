//! Host error types.
//!
//! Everything above the sandbox surfaces errors through [`HostError`].  Load
//! failures carry the underlying [`SandboxError`] unchanged; execution
//! failures additionally name the plugin that failed.

use std::path::PathBuf;

use chainsocket_sandbox::{PluginKind, SandboxError};

/// Unified error type for the registry, dispatch and conversation layers.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Missing entry agent, malformed descriptor document, missing secrets.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the conversation terminal failed.
    #[error("terminal i/o error: {0}")]
    Terminal(#[from] std::io::Error),

    /// Manifest resolution or instantiation failed while loading a plugin.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// A loaded plugin failed while executing a request.
    #[error("{kind} '{name}' failed: {source}")]
    Execution {
        kind: PluginKind,
        name: String,
        #[source]
        source: SandboxError,
    },
}

/// Convenience alias used throughout the host crate.
pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let err = HostError::Configuration("no entry agent".into());
        assert_eq!(err.to_string(), "configuration error: no entry agent");
    }

    #[test]
    fn execution_error_names_the_plugin() {
        let err = HostError::Execution {
            kind: PluginKind::Agent,
            name: "bot".into(),
            source: SandboxError::Call {
                plugin: "bot".into(),
                entry_point: "call".into(),
                reason: "trap".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.starts_with("agent 'bot' failed:"));
        assert!(msg.contains("trap"));
    }

    #[test]
    fn sandbox_error_is_transparent() {
        let err = HostError::from(SandboxError::Dispatch("boom".into()));
        assert_eq!(err.to_string(), "host dispatch failed: boom");
    }
}
