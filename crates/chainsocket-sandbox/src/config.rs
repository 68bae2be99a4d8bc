//! Sandbox configuration.
//!
//! [`SandboxConfig`] controls where plugin modules are found and the resource
//! limits and permissions applied to every instance.  Defaults mirror the
//! limits the plugins were written against, and a builder-style API allows
//! callers to customise individual fields fluently.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default memory ceiling per plugin instance, in MiB.
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 5;

/// Outbound hosts plugins may reach unless configured otherwise.
pub const DEFAULT_ALLOWED_HOSTS: [&str; 2] = ["api.openai.com", "serpapi.com"];

/// Default timeout for a guest's outbound HTTP request, in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 60_000;

/// Resource limits and permissions for the Wasm sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Directory that plugin module files are resolved against.
    ///
    /// Default: `plugins` relative to the working directory.
    pub plugins_dir: PathBuf,

    /// Maximum linear memory a plugin may allocate, in MiB.
    ///
    /// Default: **5 MiB**.
    pub memory_limit_mb: u32,

    /// Hosts a plugin may reach through the `http_request` import.
    pub allowed_hosts: BTreeSet<String>,

    /// Fuel (abstract instruction count) granted to every top-level call.
    ///
    /// `None` disables metering entirely, so a runaway guest blocks its
    /// caller.  Nested host dispatches draw from the callee's own budget.
    ///
    /// Default: **unmetered**.
    pub max_fuel: Option<u64>,

    /// Timeout applied to each outbound HTTP request, in milliseconds.
    ///
    /// Default: **60 000 ms**.
    pub http_timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            allowed_hosts: DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|h| (*h).to_owned())
                .collect(),
            max_fuel: None,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl SandboxConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the plugins directory.
    pub fn with_plugins_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugins_dir = dir.into();
        self
    }

    /// Set the memory ceiling (in MiB).
    pub fn with_memory_limit_mb(mut self, mb: u32) -> Self {
        self.memory_limit_mb = mb;
        self
    }

    /// Replace the outbound host allow-list.
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-call fuel budget.
    pub fn with_max_fuel(mut self, fuel: Option<u64>) -> Self {
        self.max_fuel = fuel;
        self
    }

    /// Set the outbound HTTP timeout (in milliseconds).
    pub fn with_http_timeout_ms(mut self, ms: u64) -> Self {
        self.http_timeout_ms = ms;
        self
    }
}
