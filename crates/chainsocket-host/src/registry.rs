//! Plugin registry.
//!
//! The registry partitions loaded plugins by [`PluginKind`] and resolves them
//! by name within a partition.  It is built once, before the conversation
//! starts, and never mutated afterwards; plugins that fail to load are
//! recorded as [`LoadFailure`]s and left out.
//!
//! Every instance is created with a dispatcher that points back at the
//! registry through a weak reference, so plugins can reach each other
//! without the registry keeping itself alive.

use std::collections::HashMap;
use std::sync::Arc;

use chainsocket_sandbox::{HostDispatch, PluginKind, SandboxRuntime};
use tracing::{info, warn};

use crate::descriptor::PluginDescriptor;
use crate::dispatch::RegistryDispatch;
use crate::secrets::Secrets;
use crate::wrapper::PluginWrapper;

/// A descriptor the registry could not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub kind: PluginKind,
    pub name: String,
    pub module_file: String,
    pub reason: String,
}

pub struct Registry {
    partitions: HashMap<PluginKind, HashMap<String, PluginWrapper>>,
    /// Load order, for listing.
    order: Vec<(PluginKind, String)>,
    failures: Vec<LoadFailure>,
}

impl Registry {
    /// Load every descriptor: tools first, then agents, then llms.
    ///
    /// Never fails as a whole.  A descriptor whose module is missing or
    /// rejected is logged, recorded in [`failures`](Self::failures) and
    /// skipped.  A second descriptor with an already loaded (kind, name) is
    /// treated the same way.
    pub fn build(
        descriptors: &[PluginDescriptor],
        secrets: &Secrets,
        runtime: &SandboxRuntime,
    ) -> Arc<Self> {
        Arc::new_cyclic(|registry| {
            let dispatch: Arc<dyn HostDispatch> =
                Arc::new(RegistryDispatch::new(registry.clone()));

            let mut this = Self {
                partitions: HashMap::new(),
                order: Vec::new(),
                failures: Vec::new(),
            };
            for kind in PluginKind::LOAD_ORDER {
                for descriptor in descriptors.iter().filter(|d| d.kind() == kind) {
                    this.load_one(descriptor, secrets, runtime, &dispatch);
                }
            }

            info!(
                loaded = this.order.len(),
                failed = this.failures.len(),
                "plugin registry built"
            );
            this
        })
    }

    fn load_one(
        &mut self,
        descriptor: &PluginDescriptor,
        secrets: &Secrets,
        runtime: &SandboxRuntime,
        dispatch: &Arc<dyn HostDispatch>,
    ) {
        let kind = descriptor.kind();
        if self.get(kind, &descriptor.name).is_some() {
            self.record_failure(descriptor, format!("duplicate {kind} name"));
            return;
        }

        match PluginWrapper::load(descriptor.clone(), runtime, secrets, Arc::clone(dispatch)) {
            Ok(wrapper) => {
                info!(
                    kind = %kind,
                    plugin = %descriptor.name,
                    module = %descriptor.module_file,
                    "plugin loaded"
                );
                self.partitions
                    .entry(kind)
                    .or_default()
                    .insert(descriptor.name.clone(), wrapper);
                self.order.push((kind, descriptor.name.clone()));
            }
            Err(err) => self.record_failure(descriptor, err.to_string()),
        }
    }

    fn record_failure(&mut self, descriptor: &PluginDescriptor, reason: String) {
        warn!(
            kind = %descriptor.kind(),
            plugin = %descriptor.name,
            module = %descriptor.module_file,
            error = %reason,
            "unable to load plugin, skipping"
        );
        self.failures.push(LoadFailure {
            kind: descriptor.kind(),
            name: descriptor.name.clone(),
            module_file: descriptor.module_file.clone(),
            reason,
        });
    }

    /// Look up a plugin by kind and exact name.
    pub fn get(&self, kind: PluginKind, name: &str) -> Option<&PluginWrapper> {
        self.partitions.get(&kind)?.get(name)
    }

    /// Loaded plugins in load order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginWrapper> {
        self.order
            .iter()
            .filter_map(|(kind, name)| self.get(*kind, name))
    }

    /// Names loaded into one partition, in load order.
    pub fn names(&self, kind: PluginKind) -> Vec<&str> {
        self.order
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Free every instance.  Returns how many were still live.
    pub fn shutdown(&self) -> usize {
        let freed = self.plugins().filter(|plugin| plugin.free()).count();
        info!(freed, "plugin registry shut down");
        freed
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.order)
            .field("failures", &self.failures)
            .finish()
    }
}
