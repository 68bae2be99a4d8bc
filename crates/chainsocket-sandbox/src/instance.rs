//! Live sandbox instances.
//!
//! A [`SandboxInstance`] owns one wasmtime store and the module instance
//! inside it.  Calls are strictly sequential: the store sits behind a mutex
//! that is only ever *tried*, so a nested call that loops back into an
//! instance already on the call stack fails fast instead of deadlocking.

use std::sync::{Mutex, TryLockError};

use wasmtime::{Instance, Store};

use crate::error::{Result, SandboxError};
use crate::host::HostState;
use crate::manifest::PluginManifest;

/// One instantiated plugin module.
pub struct SandboxInstance {
    name: String,
    manifest: PluginManifest,
    max_fuel: Option<u64>,
    live: Mutex<Option<Live>>,
}

struct Live {
    store: Store<HostState>,
    instance: Instance,
}

impl SandboxInstance {
    pub(crate) fn new(
        name: String,
        manifest: PluginManifest,
        max_fuel: Option<u64>,
        store: Store<HostState>,
        instance: Instance,
    ) -> Self {
        Self {
            name,
            manifest,
            max_fuel,
            live: Mutex::new(Some(Live { store, instance })),
        }
    }

    /// Plugin name this instance was created for.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// `false` once [`free`](Self::free) has released the store.
    pub fn is_live(&self) -> bool {
        match self.live.try_lock() {
            Ok(guard) => guard.is_some(),
            // Busy means a call is in flight, which needs a live store.
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
        }
    }

    /// Invoke the exported `entry_point` with `input` and return the bytes the
    /// guest passed to `set_output`.
    ///
    /// The input is copied into a buffer obtained from the guest's `alloc`
    /// export and the entry point is called as `(ptr, len) -> status`.  Any
    /// host dispatches the guest issues complete before this returns.
    pub fn call(&self, entry_point: &str, input: &[u8]) -> Result<Vec<u8>> {
        let mut guard = match self.live.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                return Err(self.call_error(entry_point, "instance is already executing a call"));
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let live = guard
            .as_mut()
            .ok_or_else(|| self.call_error(entry_point, "instance has been freed"))?;

        tracing::debug!(
            plugin = %self.name,
            entry_point,
            input_bytes = input.len(),
            "calling into sandbox"
        );

        let output = live
            .invoke(entry_point, input, self.max_fuel)
            .map_err(|reason| self.call_error(entry_point, reason))?;

        tracing::debug!(
            plugin = %self.name,
            entry_point,
            output_bytes = output.len(),
            "sandbox call returned"
        );

        Ok(output)
    }

    /// Release the store and everything it owns.
    ///
    /// Safe to call any number of times; returns `true` only for the call that
    /// actually released something.  Must not be called from inside one of
    /// this instance's own host calls.
    pub fn free(&self) -> bool {
        let mut guard = match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let released = guard.take().is_some();
        if released {
            tracing::debug!(plugin = %self.name, "sandbox instance freed");
        }
        released
    }

    fn call_error(&self, entry_point: &str, reason: impl Into<String>) -> SandboxError {
        SandboxError::Call {
            plugin: self.name.clone(),
            entry_point: entry_point.to_owned(),
            reason: reason.into(),
        }
    }
}

impl Drop for SandboxInstance {
    fn drop(&mut self) {
        self.free();
    }
}

impl Live {
    fn invoke(
        &mut self,
        entry_point: &str,
        input: &[u8],
        max_fuel: Option<u64>,
    ) -> std::result::Result<Vec<u8>, String> {
        if let Some(fuel) = max_fuel {
            self.store
                .set_fuel(fuel)
                .map_err(|e| format!("failed to refuel store: {e}"))?;
        }
        self.store.data_mut().output = None;

        let len = i32::try_from(input.len())
            .map_err(|_| format!("input of {} bytes does not fit a guest buffer", input.len()))?;

        let alloc = self
            .instance
            .get_typed_func::<i32, i32>(&mut self.store, "alloc")
            .map_err(|e| format!("unusable `alloc` export: {e}"))?;
        let ptr = alloc
            .call(&mut self.store, len)
            .map_err(|e| format!("`alloc` trapped: {e:#}"))?;

        let memory = self
            .instance
            .get_memory(&mut self.store, "memory")
            .ok_or("module has no exported memory")?;
        memory
            .write(&mut self.store, ptr as u32 as usize, input)
            .map_err(|e| format!("input does not fit guest memory: {e}"))?;

        let entry = self
            .instance
            .get_typed_func::<(i32, i32), i32>(&mut self.store, entry_point)
            .map_err(|e| format!("unusable `{entry_point}` export: {e}"))?;
        let status = entry
            .call(&mut self.store, (ptr, len))
            .map_err(|e| format!("trap: {e:#}"))?;

        if status != 0 {
            return Err(format!("returned non-zero status {status}"));
        }

        self.store
            .data_mut()
            .output
            .take()
            .ok_or_else(|| "returned without setting an output".to_owned())
    }
}
