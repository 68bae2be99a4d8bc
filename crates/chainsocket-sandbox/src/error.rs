//! Sandbox error types.
//!
//! All sandbox subsystems surface errors through [`SandboxError`], which is the
//! single error type returned by every public API in this crate.

use std::path::PathBuf;

/// Unified error type for the WebAssembly plugin sandbox.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The plugin's module file is absent or unreadable.
    #[error("module not found: {}: {source}", path.display())]
    ModuleNotFound {
        /// Resolved path of the module file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The wasmtime engine or linker could not be set up.
    #[error("sandbox engine error: {0}")]
    Engine(String),

    /// The module was rejected: malformed bytecode, unsatisfied imports,
    /// missing exports, or an initial memory above the configured ceiling.
    #[error("wasm instantiation error for plugin '{plugin}': {reason}")]
    Instantiation {
        /// Plugin being instantiated.
        plugin: String,
        /// Human-readable description of what went wrong.
        reason: String,
    },

    /// A call into a live instance failed (trap, fuel exhaustion, bad output,
    /// re-entrant use, use after free).
    #[error("call to '{entry_point}' in plugin '{plugin}' failed: {reason}")]
    Call {
        /// Plugin that was called.
        plugin: String,
        /// Exported function that was invoked.
        entry_point: String,
        /// Human-readable description of what went wrong.
        reason: String,
    },

    /// A host dispatch request could not be served.
    #[error("host dispatch failed: {0}")]
    Dispatch(String),

    /// A guest tried to reach a host outside its allow-list.
    #[error("outbound request to '{host}' is not allowed")]
    OutboundDenied {
        /// Host name the guest asked for.
        host: String,
    },

    /// An allowed outbound request failed.
    #[error("outbound request failed: {0}")]
    Outbound(String),
}

/// Convenience alias used throughout the sandbox crate.
pub type Result<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_not_found_display() {
        let err = SandboxError::ModuleNotFound {
            path: PathBuf::from("plugins/missing.wasm"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file gone"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("module not found: plugins/missing.wasm"));
        assert!(msg.contains("file gone"));
    }

    #[test]
    fn module_not_found_keeps_source() {
        let err = SandboxError::ModuleNotFound {
            path: PathBuf::from("x.wasm"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn instantiation_error_display() {
        let err = SandboxError::Instantiation {
            plugin: "search".into(),
            reason: "missing import".into(),
        };
        assert_eq!(
            err.to_string(),
            "wasm instantiation error for plugin 'search': missing import"
        );
    }

    #[test]
    fn call_error_display() {
        let err = SandboxError::Call {
            plugin: "bot".into(),
            entry_point: "call".into(),
            reason: "unreachable".into(),
        };
        assert_eq!(
            err.to_string(),
            "call to 'call' in plugin 'bot' failed: unreachable"
        );
    }

    #[test]
    fn outbound_denied_display() {
        let err = SandboxError::OutboundDenied {
            host: "evil.example".into(),
        };
        assert_eq!(
            err.to_string(),
            "outbound request to 'evil.example' is not allowed"
        );
    }
}
