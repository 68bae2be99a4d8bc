//! Per-role configuration maps.
//!
//! Each plugin sees exactly the keys its role needs and nothing else:
//!
//! | role  | keys                                                  |
//! |-------|-------------------------------------------------------|
//! | tool  | `google_apikey`, `name`                               |
//! | llm   | `openai_apikey`, `name`                               |
//! | agent | `prompt`, `openai_apikey`, `name`, `llm_name` (if any) |

use std::collections::BTreeMap;

use crate::descriptor::{PluginDescriptor, RoleFields};
use crate::secrets::Secrets;

pub const GOOGLE_APIKEY: &str = "google_apikey";
pub const OPENAI_APIKEY: &str = "openai_apikey";
pub const PROMPT: &str = "prompt";
pub const NAME: &str = "name";
pub const LLM_NAME: &str = "llm_name";

/// Build the configuration map passed to `descriptor`'s plugin.
pub fn build_role_config(descriptor: &PluginDescriptor, secrets: &Secrets) -> BTreeMap<String, String> {
    let mut config = BTreeMap::new();
    config.insert(NAME.to_owned(), descriptor.name.clone());
    match &descriptor.role {
        RoleFields::Tool => {
            config.insert(GOOGLE_APIKEY.to_owned(), secrets.google_apikey.clone());
        }
        RoleFields::Llm => {
            config.insert(OPENAI_APIKEY.to_owned(), secrets.openai_apikey.clone());
        }
        RoleFields::Agent(agent) => {
            config.insert(PROMPT.to_owned(), agent.prompt.clone());
            config.insert(OPENAI_APIKEY.to_owned(), secrets.openai_apikey.clone());
            if let Some(llm) = agent.llms.first() {
                config.insert(LLM_NAME.to_owned(), llm.clone());
            }
        }
    }
    config
}
