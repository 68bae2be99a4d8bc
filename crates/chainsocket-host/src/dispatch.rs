//! Host dispatch: routing `call_tool`, `call_llm` and `call_agent` to plugins.
//!
//! A request is a JSON object with at least a string `name` field; the whole
//! object is forwarded to the named plugin of the requested kind.  The
//! response is always `{"output": <text>}`.  A name that does not resolve is
//! not an error: the output is the [`NOT_FOUND`] sentinel.

use std::sync::Weak;

use chainsocket_sandbox::{HostDispatch, PluginKind, SandboxError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::registry::Registry;

/// Output returned when the requested plugin is not registered.
pub const NOT_FOUND: &str = "None";

/// Reply envelope written back into the calling guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    pub output: String,
}

impl Registry {
    /// Serve one dispatch request on behalf of a guest.
    ///
    /// Fails when the request is not a JSON object with a string `name`, or
    /// when the target plugin fails; the sandbox turns that failure into a
    /// trap in the caller.
    pub fn dispatch(&self, kind: PluginKind, request: &[u8]) -> chainsocket_sandbox::Result<Vec<u8>> {
        let request: Value = serde_json::from_slice(request)
            .map_err(|e| SandboxError::Dispatch(format!("request is not valid JSON: {e}")))?;
        let name = request
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SandboxError::Dispatch(format!("{kind} request has no string `name` field"))
            })?;

        let output = match self.get(kind, name) {
            Some(target) => {
                debug!(kind = %kind, target = name, "dispatching");
                target
                    .execute(&request)
                    .map_err(|e| SandboxError::Dispatch(e.to_string()))?
            }
            None => {
                debug!(kind = %kind, target = name, "dispatch target not registered");
                NOT_FOUND.to_owned()
            }
        };

        encode(output)
    }
}

fn encode(output: String) -> chainsocket_sandbox::Result<Vec<u8>> {
    serde_json::to_vec(&CallResponse { output })
        .map_err(|e| SandboxError::Dispatch(format!("response could not be encoded: {e}")))
}

/// The [`HostDispatch`] handed to every instance the registry creates.
pub(crate) struct RegistryDispatch {
    registry: Weak<Registry>,
}

impl RegistryDispatch {
    pub(crate) fn new(registry: Weak<Registry>) -> Self {
        Self { registry }
    }
}

impl HostDispatch for RegistryDispatch {
    fn dispatch(&self, kind: PluginKind, request: &[u8]) -> chainsocket_sandbox::Result<Vec<u8>> {
        match self.registry.upgrade() {
            Some(registry) => registry.dispatch(kind, request),
            // Only reachable while the registry is still being built or
            // after it was dropped; nothing is registered either way.
            None => encode(NOT_FOUND.to_owned()),
        }
    }
}
