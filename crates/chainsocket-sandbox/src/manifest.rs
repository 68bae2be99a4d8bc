//! Plugin manifests.
//!
//! [`ManifestResolver`] turns a module file name plus a role config map into a
//! [`PluginManifest`]: the module bytes, their SHA-256 digest, and the limits
//! and permissions the instance will run under.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use ring::digest::{SHA256, digest};

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};

/// SHA-256 digest of a module's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let d = digest(&SHA256, bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(d.as_ref());
        Self(out)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

/// Everything needed to instantiate one plugin.  Immutable once built.
pub struct PluginManifest {
    path: PathBuf,
    module_bytes: Vec<u8>,
    content_hash: ContentHash,
    memory_limit_mb: u32,
    allowed_hosts: BTreeSet<String>,
    config: BTreeMap<String, String>,
}

impl PluginManifest {
    /// Path the module was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn module_bytes(&self) -> &[u8] {
        &self.module_bytes
    }

    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    pub fn memory_limit_mb(&self) -> u32 {
        self.memory_limit_mb
    }

    /// Memory ceiling in bytes, as handed to the store limiter.
    pub fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb as usize * 1024 * 1024
    }

    pub fn allowed_hosts(&self) -> &BTreeSet<String> {
        &self.allowed_hosts
    }

    /// The plugin's opaque configuration map.  May contain secrets; never log.
    pub fn config(&self) -> &BTreeMap<String, String> {
        &self.config
    }
}

// Config values are deliberately left out: they carry API keys.
impl fmt::Debug for PluginManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManifest")
            .field("path", &self.path)
            .field("size_bytes", &self.module_bytes.len())
            .field("content_hash", &self.content_hash)
            .field("memory_limit_mb", &self.memory_limit_mb)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("config_keys", &self.config.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolves module files under a plugins directory into manifests.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    plugins_dir: PathBuf,
    memory_limit_mb: u32,
    allowed_hosts: BTreeSet<String>,
}

impl ManifestResolver {
    /// Build a resolver from the sandbox configuration.
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            plugins_dir: config.plugins_dir.clone(),
            memory_limit_mb: config.memory_limit_mb,
            allowed_hosts: config.allowed_hosts.clone(),
        }
    }

    /// Return the configured plugins directory.
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Read `module_file` from the plugins directory and build its manifest.
    ///
    /// `role_config` becomes the plugin's configuration map verbatim.
    pub fn resolve(
        &self,
        module_file: &str,
        role_config: BTreeMap<String, String>,
    ) -> Result<PluginManifest> {
        let path = self.plugins_dir.join(module_file);

        let module_bytes = std::fs::read(&path).map_err(|source| SandboxError::ModuleNotFound {
            path: path.clone(),
            source,
        })?;
        let content_hash = ContentHash::of(&module_bytes);

        tracing::debug!(
            path = %path.display(),
            size_bytes = module_bytes.len(),
            hash = %content_hash,
            "resolved plugin module"
        );

        Ok(PluginManifest {
            path,
            module_bytes,
            content_hash,
            memory_limit_mb: self.memory_limit_mb,
            allowed_hosts: self.allowed_hosts.clone(),
            config: role_config,
        })
    }
}
