//! A loaded plugin: its descriptor plus the sandbox instance running it.

use std::sync::Arc;

use chainsocket_sandbox::{
    ContentHash, HostDispatch, PluginKind, SandboxError, SandboxInstance, SandboxRuntime,
};
use serde::Serialize;

use crate::descriptor::PluginDescriptor;
use crate::error::{HostError, Result};
use crate::role::build_role_config;
use crate::secrets::Secrets;

/// Export every plugin implements.
pub const ENTRY_POINT: &str = "call";

pub struct PluginWrapper {
    descriptor: PluginDescriptor,
    instance: SandboxInstance,
}

impl PluginWrapper {
    /// Resolve and instantiate `descriptor` with its role configuration.
    pub fn load(
        descriptor: PluginDescriptor,
        runtime: &SandboxRuntime,
        secrets: &Secrets,
        dispatch: Arc<dyn HostDispatch>,
    ) -> Result<Self> {
        let role_config = build_role_config(&descriptor, secrets);
        let manifest = runtime.resolve(&descriptor.module_file, role_config)?;
        let instance = runtime.instantiate(&descriptor.name, manifest, dispatch)?;
        Ok(Self {
            descriptor,
            instance,
        })
    }

    pub fn kind(&self) -> PluginKind {
        self.descriptor.kind()
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn description(&self) -> &str {
        &self.descriptor.description
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn content_hash(&self) -> ContentHash {
        self.instance.manifest().content_hash()
    }

    /// Serialize `request` to JSON, call the plugin's entry point with it and
    /// return the output as text.
    ///
    /// Nested host dispatches issued by the plugin complete before this
    /// returns.
    pub fn execute<T: Serialize + ?Sized>(&self, request: &T) -> Result<String> {
        let input = serde_json::to_vec(request).map_err(|e| {
            self.execution_error(SandboxError::Dispatch(format!(
                "request could not be encoded: {e}"
            )))
        })?;

        let output = self
            .instance
            .call(ENTRY_POINT, &input)
            .map_err(|e| self.execution_error(e))?;

        String::from_utf8(output).map_err(|_| {
            self.execution_error(SandboxError::Call {
                plugin: self.descriptor.name.clone(),
                entry_point: ENTRY_POINT.to_owned(),
                reason: "output is not valid UTF-8".to_owned(),
            })
        })
    }

    /// Release the sandbox instance.  Idempotent.
    pub fn free(&self) -> bool {
        self.instance.free()
    }

    pub fn is_live(&self) -> bool {
        self.instance.is_live()
    }

    fn execution_error(&self, source: SandboxError) -> HostError {
        HostError::Execution {
            kind: self.kind(),
            name: self.descriptor.name.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for PluginWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginWrapper")
            .field("kind", &self.kind())
            .field("name", &self.descriptor.name)
            .field("module_file", &self.descriptor.module_file)
            .field("hash", &self.content_hash().to_string())
            .finish()
    }
}
