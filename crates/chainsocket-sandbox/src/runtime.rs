//! Sandbox runtime.
//!
//! [`SandboxRuntime`] is the main entry point for turning plugin module files
//! into live instances.  It owns the wasmtime [`Engine`], a [`Linker`] with
//! every host import already defined, the [`SandboxConfig`] resource limits,
//! and the [`ManifestResolver`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wasmtime::{Engine, Linker, Module, Store, StoreLimitsBuilder};

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::host::{self, HostDispatch, HostState};
use crate::instance::SandboxInstance;
use crate::manifest::{ManifestResolver, PluginManifest};

/// Exports every guest must provide besides its entry points.
const REQUIRED_EXPORTS: [&str; 2] = ["memory", "alloc"];

/// The WebAssembly plugin sandbox runtime.
pub struct SandboxRuntime {
    engine: Engine,
    linker: Linker<HostState>,
    config: SandboxConfig,
    resolver: ManifestResolver,
    http: reqwest::Client,
    instantiated: AtomicUsize,
}

impl SandboxRuntime {
    /// Create a new sandbox runtime with the given configuration.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let mut wasm_config = wasmtime::Config::new();
        wasm_config.consume_fuel(config.max_fuel.is_some());
        wasm_config.wasm_memory64(false);

        let engine = Engine::new(&wasm_config)
            .map_err(|e| SandboxError::Engine(format!("failed to create wasm engine: {e}")))?;

        let mut linker = Linker::new(&engine);
        host::define_host_functions(&mut linker)?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| SandboxError::Engine(format!("failed to build http client: {e}")))?;

        tracing::info!(
            plugins_dir = %config.plugins_dir.display(),
            memory_limit_mb = config.memory_limit_mb,
            max_fuel = ?config.max_fuel,
            "sandbox runtime initialized"
        );

        Ok(Self {
            engine,
            linker,
            resolver: ManifestResolver::new(&config),
            config,
            http,
            instantiated: AtomicUsize::new(0),
        })
    }

    /// Create a runtime with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(SandboxConfig::default())
    }

    /// Return a reference to the wasmtime [`Engine`].
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Return a reference to the current [`SandboxConfig`].
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ManifestResolver {
        &self.resolver
    }

    /// Resolve `module_file` into a manifest carrying `role_config`.
    pub fn resolve(
        &self,
        module_file: &str,
        role_config: BTreeMap<String, String>,
    ) -> Result<PluginManifest> {
        self.resolver.resolve(module_file, role_config)
    }

    /// Compile and instantiate `manifest` as plugin `name`.
    ///
    /// The instance's `call_*` imports are routed through `dispatch`.
    pub fn instantiate(
        &self,
        name: &str,
        manifest: PluginManifest,
        dispatch: Arc<dyn HostDispatch>,
    ) -> Result<SandboxInstance> {
        let instantiation_error = |reason: String| SandboxError::Instantiation {
            plugin: name.to_owned(),
            reason,
        };

        let module = Module::new(&self.engine, manifest.module_bytes())
            .map_err(|e| instantiation_error(format!("invalid module: {e:#}")))?;

        let state = HostState {
            plugin: name.to_owned(),
            config: manifest.config().clone(),
            allowed_hosts: manifest.allowed_hosts().clone(),
            dispatch,
            http: self.http.clone(),
            http_timeout: Duration::from_millis(self.config.http_timeout_ms),
            output: None,
            vars: BTreeMap::new(),
            limits: StoreLimitsBuilder::new()
                .memory_size(manifest.memory_limit_bytes())
                .build(),
        };

        let mut store = Store::new(&self.engine, state);
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = self.config.max_fuel {
            store
                .set_fuel(fuel)
                .map_err(|e| instantiation_error(format!("failed to fuel store: {e}")))?;
        }

        let instance = self
            .linker
            .instantiate(&mut store, &module)
            .map_err(|e| instantiation_error(format!("{e:#}")))?;

        for export in REQUIRED_EXPORTS {
            if instance.get_export(&mut store, export).is_none() {
                return Err(instantiation_error(format!(
                    "missing required export `{export}`"
                )));
            }
        }

        self.instantiated.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            plugin = name,
            hash = %manifest.content_hash(),
            memory_limit_mb = manifest.memory_limit_mb(),
            "instantiated plugin"
        );

        Ok(SandboxInstance::new(
            name.to_owned(),
            manifest,
            self.config.max_fuel,
            store,
            instance,
        ))
    }

    /// Number of instances created by this runtime so far.
    pub fn instantiated_count(&self) -> usize {
        self.instantiated.load(Ordering::Relaxed)
    }
}
