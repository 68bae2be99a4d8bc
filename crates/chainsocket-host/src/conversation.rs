//! Interactive conversation with the entry agent.
//!
//! Each line the user types becomes one request `{"name": <entry>, "input":
//! <line>}` to the entry agent; its output is printed back.  The loop ends
//! on EOF or on a line consisting of exactly [`TERMINATION_TOKEN`].

use std::io::{BufRead, Write};

use chainsocket_sandbox::{PluginKind, SandboxRuntime};
use serde::Serialize;
use tracing::{error, info, info_span};

use crate::descriptor::AppConfig;
use crate::error::{HostError, Result};
use crate::registry::Registry;
use crate::secrets::Secrets;
use crate::wrapper::PluginWrapper;

pub const TERMINATION_TOKEN: &str = "end";
pub const PROMPT: &str = "You > ";
pub const REPLY_PREFIX: &str = "Agent: ";
pub const NO_ENTRY_MESSAGE: &str = "no entry agent found";

#[derive(Serialize)]
struct TurnRequest<'a> {
    name: &'a str,
    input: &'a str,
}

/// A conversation bound to one loaded entry agent.
pub struct Conversation<'r> {
    entry: &'r PluginWrapper,
}

impl<'r> Conversation<'r> {
    /// Fails with [`HostError::Configuration`] when `entry_name` is not a
    /// loaded agent.
    pub fn new(registry: &'r Registry, entry_name: &str) -> Result<Self> {
        let entry = registry.get(PluginKind::Agent, entry_name).ok_or_else(|| {
            HostError::Configuration(format!("entry agent '{entry_name}' is not loaded"))
        })?;
        Ok(Self { entry })
    }

    pub fn entry(&self) -> &PluginWrapper {
        self.entry
    }

    /// Send one line to the entry agent and return its reply.
    pub fn turn(&self, input: &str) -> Result<String> {
        self.entry.execute(&TurnRequest {
            name: self.entry.name(),
            input,
        })
    }

    /// Run the prompt loop until EOF or the termination token.  Returns the
    /// number of turns sent to the agent.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<usize> {
        let mut line = String::new();
        let mut turns = 0;

        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                info!("EOF received, ending conversation");
                break;
            }

            let text = line.trim_end_matches(['\r', '\n']);
            if text == TERMINATION_TOKEN {
                info!("termination token received, ending conversation");
                break;
            }

            turns += 1;
            let span = info_span!("turn", n = turns, agent = %self.entry.name());
            let _guard = span.enter();

            match self.turn(text) {
                Ok(reply) => writeln!(output, "{REPLY_PREFIX}{reply}")?,
                Err(err) => {
                    error!(error = %err, "turn failed");
                    writeln!(output, "Error: {err}")?;
                }
            }
        }

        Ok(turns)
    }
}

/// Build the registry from `app` and hold a conversation on `input`/`output`.
///
/// When `app` names no entry agent, prints [`NO_ENTRY_MESSAGE`] and returns
/// without loading any plugin.
pub fn drive<R: BufRead, W: Write>(
    app: &AppConfig,
    secrets: &Secrets,
    runtime: &SandboxRuntime,
    input: R,
    mut output: W,
) -> Result<()> {
    let Some(entry) = app.entry_agent() else {
        info!("no entry agent configured");
        writeln!(output, "{NO_ENTRY_MESSAGE}")?;
        return Ok(());
    };

    let registry = Registry::build(&app.descriptors(), secrets, runtime);
    let conversation = Conversation::new(&registry, entry)?;
    info!(entry, plugins = registry.len(), "conversation started");

    let turns = conversation.run(input, output)?;
    info!(turns, "conversation finished");
    registry.shutdown();
    Ok(())
}
