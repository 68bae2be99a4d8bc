//! Plugin roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role a plugin plays.  Determines which registry partition it lives in,
/// which secrets it receives, and which dispatch import reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Tool,
    Llm,
    Agent,
}

impl PluginKind {
    /// Order in which the registry loads partitions.
    pub const LOAD_ORDER: [PluginKind; 3] = [PluginKind::Tool, PluginKind::Agent, PluginKind::Llm];

    /// Lowercase label used in logs and listings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Llm => "llm",
            Self::Agent => "agent",
        }
    }

    /// Name of the host import that dispatches to plugins of this kind.
    pub fn dispatch_import(self) -> &'static str {
        match self {
            Self::Tool => "call_tool",
            Self::Llm => "call_llm",
            Self::Agent => "call_agent",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
