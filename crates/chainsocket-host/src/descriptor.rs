//! Plugin descriptor document.
//!
//! The application document lists every Tool, Agent and LLM plugin with the
//! module file that implements it, plus the name of the entry agent:
//!
//! ```json
//! {
//!   "tools":  [{ "name": "google_search", "description": "...", "plugin_name": "google_search.wasm" }],
//!   "agents": [{ "name": "self-ask", "description": "...", "plugin_name": "self_ask.wasm",
//!                "prompt": "...", "tools": ["google_search"], "llms": ["openai"] }],
//!   "llms":   [{ "name": "openai", "description": "...", "plugin_name": "openai.wasm" }],
//!   "entry":  "self-ask"
//! }
//! ```

use std::path::Path;

use chainsocket_sandbox::PluginKind;
use serde::Deserialize;

use crate::error::{HostError, Result};

/// A Tool or LLM entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "moduleFile", alias = "plugin_name")]
    pub module_file: String,
}

/// An Agent entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "moduleFile", alias = "plugin_name")]
    pub module_file: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub llms: Vec<String>,
}

/// The whole application document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tools: Vec<PluginEntry>,
    #[serde(default)]
    pub agents: Vec<AgentEntry>,
    #[serde(default)]
    pub llms: Vec<PluginEntry>,
    #[serde(default)]
    pub entry: Option<String>,
}

/// Role-specific descriptor fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleFields {
    Tool,
    Llm,
    Agent(AgentRole),
}

/// Fields only agents carry.  Only the first of `llms` is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRole {
    pub prompt: String,
    pub tools: Vec<String>,
    pub llms: Vec<String>,
}

/// One declared plugin, independent of how it was written in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    pub description: String,
    pub module_file: String,
    pub role: RoleFields,
}

impl PluginDescriptor {
    pub fn tool(name: impl Into<String>, module_file: impl Into<String>) -> Self {
        Self::with_role(name, module_file, RoleFields::Tool)
    }

    pub fn llm(name: impl Into<String>, module_file: impl Into<String>) -> Self {
        Self::with_role(name, module_file, RoleFields::Llm)
    }

    pub fn agent(name: impl Into<String>, module_file: impl Into<String>, role: AgentRole) -> Self {
        Self::with_role(name, module_file, RoleFields::Agent(role))
    }

    fn with_role(name: impl Into<String>, module_file: impl Into<String>, role: RoleFields) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            module_file: module_file.into(),
            role,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> PluginKind {
        match self.role {
            RoleFields::Tool => PluginKind::Tool,
            RoleFields::Llm => PluginKind::Llm,
            RoleFields::Agent(_) => PluginKind::Agent,
        }
    }
}

impl AppConfig {
    /// Read and parse the document at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse a document.
    ///
    /// Only the document shape is checked here.  Problems with individual
    /// entries (missing module, duplicate name) surface as per-plugin load
    /// failures when the registry is built.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            HostError::Configuration(format!("malformed descriptor document: {e}"))
        })
    }

    /// Name of the entry agent.  An empty string counts as unset.
    pub fn entry_agent(&self) -> Option<&str> {
        self.entry.as_deref().filter(|name| !name.is_empty())
    }

    /// All declared plugins: tools, then agents, then llms.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.iter_descriptors().collect()
    }

    fn iter_descriptors(&self) -> impl Iterator<Item = PluginDescriptor> + '_ {
        let tools = self.tools.iter().map(|t| {
            PluginDescriptor::tool(&t.name, &t.module_file).with_description(&t.description)
        });
        let agents = self.agents.iter().map(|a| {
            PluginDescriptor::agent(
                &a.name,
                &a.module_file,
                AgentRole {
                    prompt: a.prompt.clone(),
                    tools: a.tools.clone(),
                    llms: a.llms.clone(),
                },
            )
            .with_description(&a.description)
        });
        let llms = self.llms.iter().map(|l| {
            PluginDescriptor::llm(&l.name, &l.module_file).with_description(&l.description)
        });
        tools.chain(agents).chain(llms)
    }
}
