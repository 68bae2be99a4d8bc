//! Host functions exposed to guests.
//!
//! Every instance is linked against the same set of imports in the
//! [`HOST_MODULE`] namespace:
//!
//! | import | signature | purpose |
//! |---|---|---|
//! | `set_output` | `(ptr, len)` | record the output of the current call |
//! | `config_get` | `(key_ptr, key_len, buf_ptr, buf_cap) -> i32` | read a config value |
//! | `log` | `(level, ptr, len)` | emit a tracing event |
//! | `var_get` | `(key_ptr, key_len) -> i64` | read an instance variable, `0` when unset |
//! | `var_set` | `(key_ptr, key_len, val_ptr, val_len)` | store an instance variable |
//! | `call_tool` / `call_llm` / `call_agent` | `(ptr, len) -> i64` | dispatch to another plugin |
//! | `http_request` | `(ptr, len) -> i64` | allow-listed outbound HTTP |
//!
//! Imports returning `i64` hand back a buffer the host allocated inside the
//! guest through its `alloc` export, packed as `(ptr << 32) | len`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use wasmtime::{Caller, Extern, Linker, Memory, StoreLimits};

use crate::error::{Result, SandboxError};
use crate::kind::PluginKind;
use crate::outbound::{self, OutboundRequest};

/// Import module name guests link against.
pub const HOST_MODULE: &str = "chainsocket";

/// Routes a guest's `call_*` request to the plugin it names.
///
/// `request` is the raw bytes the guest passed; the returned bytes are copied
/// back into the caller's memory.  An `Err` traps the calling guest.
pub trait HostDispatch: Send + Sync {
    fn dispatch(&self, kind: PluginKind, request: &[u8]) -> Result<Vec<u8>>;
}

/// Per-instance state stored in the wasmtime store.
pub(crate) struct HostState {
    /// Plugin name, for log fields.
    pub plugin: String,
    pub config: BTreeMap<String, String>,
    pub allowed_hosts: BTreeSet<String>,
    pub dispatch: Arc<dyn HostDispatch>,
    pub http: reqwest::Client,
    pub http_timeout: Duration,
    /// Output recorded by `set_output` during the current call.
    pub output: Option<Vec<u8>>,
    /// Variables the guest keeps between calls; gone once the store is freed.
    pub vars: BTreeMap<String, Vec<u8>>,
    pub limits: StoreLimits,
}

/// Pack a guest buffer into the `i64` returned by reply-producing imports.
pub fn pack_buffer(ptr: i32, len: i32) -> i64 {
    (((ptr as u32 as u64) << 32) | len as u32 as u64) as i64
}

/// Inverse of [`pack_buffer`].
pub fn unpack_buffer(packed: i64) -> (i32, i32) {
    let bits = packed as u64;
    ((bits >> 32) as u32 as i32, bits as u32 as i32)
}

/// Define every host import on `linker`.
pub(crate) fn define_host_functions(linker: &mut Linker<HostState>) -> Result<()> {
    linker
        .func_wrap(
            HOST_MODULE,
            "set_output",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
                let bytes = read_guest(&mut caller, ptr, len)?;
                caller.data_mut().output = Some(bytes);
                Ok(())
            },
        )
        .map_err(engine_error)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "config_get",
            |mut caller: Caller<'_, HostState>,
             key_ptr: i32,
             key_len: i32,
             buf_ptr: i32,
             buf_cap: i32|
             -> anyhow::Result<i32> {
                let key = read_key(&mut caller, key_ptr, key_len)?;

                let Some(value) = caller.data().config.get(&key).cloned() else {
                    tracing::debug!(plugin = %caller.data().plugin, key = %key, "config key not set");
                    return Ok(-1);
                };

                let full_len = i32::try_from(value.len())?;
                let n = value.len().min(buf_cap.max(0) as usize);
                let memory = guest_memory(&mut caller)?;
                memory
                    .write(&mut caller, buf_ptr as u32 as usize, &value.as_bytes()[..n])
                    .map_err(|e| anyhow!("config buffer out of bounds: {e}"))?;
                Ok(full_len)
            },
        )
        .map_err(engine_error)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "log",
            |mut caller: Caller<'_, HostState>,
             level: i32,
             ptr: i32,
             len: i32|
             -> anyhow::Result<()> {
                let bytes = read_guest(&mut caller, ptr, len)?;
                let msg = String::from_utf8_lossy(&bytes);
                let plugin = caller.data().plugin.as_str();
                match level {
                    0 => tracing::error!(plugin = %plugin, plugin_msg = %msg),
                    1 => tracing::warn!(plugin = %plugin, plugin_msg = %msg),
                    2 => tracing::info!(plugin = %plugin, plugin_msg = %msg),
                    3 => tracing::debug!(plugin = %plugin, plugin_msg = %msg),
                    _ => tracing::trace!(plugin = %plugin, plugin_msg = %msg),
                }
                Ok(())
            },
        )
        .map_err(engine_error)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "var_get",
            |mut caller: Caller<'_, HostState>, key_ptr: i32, key_len: i32| -> anyhow::Result<i64> {
                let key = read_key(&mut caller, key_ptr, key_len)?;
                match caller.data().vars.get(&key).cloned() {
                    Some(value) => write_reply(&mut caller, &value),
                    None => Ok(0),
                }
            },
        )
        .map_err(engine_error)?;

    linker
        .func_wrap(
            HOST_MODULE,
            "var_set",
            |mut caller: Caller<'_, HostState>,
             key_ptr: i32,
             key_len: i32,
             val_ptr: i32,
             val_len: i32|
             -> anyhow::Result<()> {
                let key = read_key(&mut caller, key_ptr, key_len)?;
                let value = read_guest(&mut caller, val_ptr, val_len)?;
                tracing::trace!(plugin = %caller.data().plugin, key = %key, value_bytes = value.len(), "var set");
                caller.data_mut().vars.insert(key, value);
                Ok(())
            },
        )
        .map_err(engine_error)?;

    for kind in [PluginKind::Tool, PluginKind::Llm, PluginKind::Agent] {
        linker
            .func_wrap(
                HOST_MODULE,
                kind.dispatch_import(),
                move |caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                    dispatch_into_guest(caller, kind, ptr, len)
                },
            )
            .map_err(engine_error)?;
    }

    linker
        .func_wrap(
            HOST_MODULE,
            "http_request",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<i64> {
                let raw = read_guest(&mut caller, ptr, len)?;
                let request: OutboundRequest = serde_json::from_slice(&raw)
                    .map_err(|e| anyhow!("malformed http request: {e}"))?;

                let state = caller.data();
                tracing::debug!(plugin = %state.plugin, method = %request.method, "guest http request");
                let response =
                    outbound::send(&state.http, request, &state.allowed_hosts, state.http_timeout)?;

                let reply = serde_json::to_vec(&response)?;
                write_reply(&mut caller, &reply)
            },
        )
        .map_err(engine_error)?;

    Ok(())
}

fn engine_error(e: wasmtime::Error) -> SandboxError {
    SandboxError::Engine(format!("failed to define host function: {e}"))
}

fn dispatch_into_guest(
    mut caller: Caller<'_, HostState>,
    kind: PluginKind,
    ptr: i32,
    len: i32,
) -> anyhow::Result<i64> {
    let request = read_guest(&mut caller, ptr, len)?;
    let dispatch = Arc::clone(&caller.data().dispatch);

    tracing::debug!(
        plugin = %caller.data().plugin,
        target_kind = %kind,
        request_bytes = request.len(),
        "host dispatch"
    );

    // The callee runs in its own store; this store stays suspended until the
    // nested call returns.
    let reply = dispatch.dispatch(kind, &request)?;
    write_reply(&mut caller, &reply)
}

fn guest_memory(caller: &mut Caller<'_, HostState>) -> anyhow::Result<Memory> {
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Ok(memory),
        _ => bail!("guest does not export `memory`"),
    }
}

fn read_guest(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> anyhow::Result<Vec<u8>> {
    let memory = guest_memory(caller)?;
    let start = ptr as u32 as usize;
    let len = len as u32 as usize;
    let data = memory.data(&*caller);
    match start.checked_add(len) {
        Some(end) if end <= data.len() => Ok(data[start..end].to_vec()),
        _ => bail!("guest buffer {start}+{len} is out of bounds"),
    }
}

fn read_key(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> anyhow::Result<String> {
    String::from_utf8(read_guest(caller, ptr, len)?).map_err(|_| anyhow!("key is not valid UTF-8"))
}

/// Copy `bytes` into a fresh guest allocation and return the packed buffer.
fn write_reply(caller: &mut Caller<'_, HostState>, bytes: &[u8]) -> anyhow::Result<i64> {
    let len = i32::try_from(bytes.len())
        .map_err(|_| anyhow!("reply of {} bytes does not fit a guest buffer", bytes.len()))?;

    let alloc = caller
        .get_export("alloc")
        .and_then(Extern::into_func)
        .ok_or_else(|| anyhow!("guest does not export `alloc`"))?
        .typed::<i32, i32>(&*caller)?;
    let ptr = alloc.call(&mut *caller, len)?;

    let memory = guest_memory(caller)?;
    memory
        .write(&mut *caller, ptr as u32 as usize, bytes)
        .map_err(|e| anyhow!("guest allocation out of bounds: {e}"))?;

    Ok(pack_buffer(ptr, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_places_pointer_in_high_bits() {
        assert_eq!(pack_buffer(1, 2), (1i64 << 32) | 2);
    }

    #[test]
    fn unpack_reverses_pack() {
        assert_eq!(unpack_buffer(pack_buffer(4096, 17)), (4096, 17));
    }

    #[test]
    fn pack_handles_high_addresses() {
        let ptr = 0x8000_0000u32 as i32;
        let packed = pack_buffer(ptr, 3);
        assert_eq!(unpack_buffer(packed), (ptr, 3));
    }
}
