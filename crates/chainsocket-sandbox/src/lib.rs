//! chainsocket WebAssembly plugin sandbox.
//!
//! This crate turns plugin module files into isolated, resource-limited
//! wasmtime instances and defines the ABI those instances use to talk to the
//! host.
//!
//! - **[`config`]** -- [`SandboxConfig`] controls the plugins directory,
//!   memory ceiling, outbound allow-list, and optional fuel budget.
//! - **[`manifest`]** -- [`ManifestResolver`] reads and hashes module files
//!   into [`PluginManifest`]s.
//! - **[`runtime`]** -- [`SandboxRuntime`] owns the engine and linker and
//!   instantiates manifests.
//! - **[`instance`]** -- [`SandboxInstance`] is one live plugin with a single
//!   sequential call entry point.
//! - **[`host`]** -- the host imports, and the [`HostDispatch`] seam through
//!   which guests reach other plugins.
//! - **[`error`]** -- [`SandboxError`] enumerates every failure mode.

pub mod config;
pub mod error;
pub mod host;
pub mod instance;
pub mod kind;
pub mod manifest;
pub mod outbound;
pub mod runtime;

// Re-export the most commonly used types at the crate root.
pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use host::{HOST_MODULE, HostDispatch};
pub use instance::SandboxInstance;
pub use kind::PluginKind;
pub use manifest::{ContentHash, ManifestResolver, PluginManifest};
pub use runtime::SandboxRuntime;
