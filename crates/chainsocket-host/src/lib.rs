//! chainsocket plugin host.
//!
//! Loads the Tool, Agent and LLM plugins an application declares into a
//! [`Registry`], routes the `call_*` host imports between them, and drives
//! the user conversation through the entry agent.
//!
//! - **[`descriptor`]** -- the application document ([`AppConfig`]).
//! - **[`secrets`]** -- provider API keys ([`Secrets`]).
//! - **[`role`]** -- which configuration keys each role receives.
//! - **[`wrapper`]** -- [`PluginWrapper`], one loaded plugin.
//! - **[`registry`]** -- [`Registry`], plugins partitioned by kind.
//! - **[`dispatch`]** -- request routing and the not-found sentinel.
//! - **[`conversation`]** -- the prompt loop.

pub mod conversation;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod role;
pub mod secrets;
pub mod wrapper;

pub use conversation::{Conversation, drive};
pub use descriptor::{AgentRole, AppConfig, PluginDescriptor, RoleFields};
pub use dispatch::{CallResponse, NOT_FOUND};
pub use error::{HostError, Result};
pub use registry::{LoadFailure, Registry};
pub use role::build_role_config;
pub use secrets::Secrets;
pub use wrapper::PluginWrapper;
