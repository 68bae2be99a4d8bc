//! WAT guests and fixtures shared by the integration tests.
//!
//! Every guest follows the plugin ABI: it exports `memory`, a bump `alloc`
//! and `call(ptr, len) -> status`, and hands its result to `set_output`.
//! Fixed strings live in a data segment at offset 16; the heap starts at 1024.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use chainsocket_host::{AgentRole, PluginDescriptor, Secrets};
use chainsocket_sandbox::{SandboxConfig, SandboxRuntime};
use tempfile::TempDir;

const ALLOC: &str = r#"
  (global $heap (mut i32) (i32.const 1024))
  (func (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))"#;

fn wat_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Outputs its input verbatim.
pub fn echo_guest() -> String {
    format!(
        r#"(module
          (import "chainsocket" "set_output" (func $set_output (param i32 i32)))
          (memory (export "memory") 1)
          {ALLOC}
          (func (export "call") (param $ptr i32) (param $len i32) (result i32)
            (call $set_output (local.get $ptr) (local.get $len))
            (i32.const 0)))"#
    )
}

/// Outputs `text` regardless of input.
pub fn constant_guest(text: &str) -> String {
    format!(
        r#"(module
          (import "chainsocket" "set_output" (func $set_output (param i32 i32)))
          (memory (export "memory") 1)
          (data (i32.const 16) "{data}")
          {ALLOC}
          (func (export "call") (param $ptr i32) (param $len i32) (result i32)
            (call $set_output (i32.const 16) (i32.const {len}))
            (i32.const 0)))"#,
        data = wat_string(text),
        len = text.len(),
    )
}

/// Sends `request` through the `import` host function (`call_tool`,
/// `call_llm` or `call_agent`) and outputs the reply verbatim.
pub fn forwarding_guest(import: &str, request: &str) -> String {
    format!(
        r#"(module
          (import "chainsocket" "set_output" (func $set_output (param i32 i32)))
          (import "chainsocket" "{import}" (func $dispatch (param i32 i32) (result i64)))
          (memory (export "memory") 1)
          (data (i32.const 16) "{data}")
          {ALLOC}
          (func (export "call") (param $ptr i32) (param $len i32) (result i32)
            (local $reply i64)
            (local.set $reply (call $dispatch (i32.const 16) (i32.const {len})))
            (call $set_output
              (i32.wrap_i64 (i64.shr_u (local.get $reply) (i64.const 32)))
              (i32.wrap_i64 (local.get $reply)))
            (i32.const 0)))"#,
        data = wat_string(request),
        len = request.len(),
    )
}

/// Outputs the configuration value stored under `key`, or `<missing>`.
pub fn config_guest(key: &str) -> String {
    format!(
        r#"(module
          (import "chainsocket" "set_output" (func $set_output (param i32 i32)))
          (import "chainsocket" "config_get" (func $config_get (param i32 i32 i32 i32) (result i32)))
          (memory (export "memory") 1)
          (data (i32.const 16) "{data}")
          (data (i32.const 256) "<missing>")
          {ALLOC}
          (func (export "call") (param $ptr i32) (param $len i32) (result i32)
            (local $n i32)
            (local.set $n (call $config_get (i32.const 16) (i32.const {len}) (i32.const 512) (i32.const 256)))
            (if (i32.lt_s (local.get $n) (i32.const 0))
              (then (call $set_output (i32.const 256) (i32.const 9)))
              (else (call $set_output (i32.const 512) (local.get $n))))
            (i32.const 0)))"#,
        data = wat_string(key),
        len = key.len(),
    )
}

/// Outputs what the previous call stored in its `memory` variable (or
/// `<unset>`), then stores its own input there.
pub fn remembering_guest() -> String {
    format!(
        r#"(module
          (import "chainsocket" "set_output" (func $set_output (param i32 i32)))
          (import "chainsocket" "var_get" (func $var_get (param i32 i32) (result i64)))
          (import "chainsocket" "var_set" (func $var_set (param i32 i32 i32 i32)))
          (memory (export "memory") 1)
          (data (i32.const 16) "memory")
          (data (i32.const 64) "<unset>")
          {ALLOC}
          (func (export "call") (param $ptr i32) (param $len i32) (result i32)
            (local $prev i64)
            (local.set $prev (call $var_get (i32.const 16) (i32.const 6)))
            (if (i64.eqz (local.get $prev))
              (then (call $set_output (i32.const 64) (i32.const 7)))
              (else (call $set_output
                (i32.wrap_i64 (i64.shr_u (local.get $prev) (i64.const 32)))
                (i32.wrap_i64 (local.get $prev)))))
            (call $var_set (i32.const 16) (i32.const 6) (local.get $ptr) (local.get $len))
            (i32.const 0)))"#
    )
}

/// Traps on every call.
pub fn trapping_guest() -> String {
    format!(
        r#"(module
          (import "chainsocket" "set_output" (func $set_output (param i32 i32)))
          (memory (export "memory") 1)
          {ALLOC}
          (func (export "call") (param $ptr i32) (param $len i32) (result i32)
            unreachable))"#
    )
}

/// A plugins directory plus a runtime reading from it.
pub struct Fixture {
    pub dir: TempDir,
    pub runtime: SandboxRuntime,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir creation must succeed in tests");
        let runtime = SandboxRuntime::new(SandboxConfig::new().with_plugins_dir(dir.path()))
            .expect("runtime creation must succeed in tests");
        Self { dir, runtime }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `wat` as module file `file` and return `self` for chaining.
    pub fn module(&self, file: &str, wat: &str) -> &Self {
        fs::write(self.dir.path().join(file), wat).expect("module write must succeed in tests");
        self
    }
}

pub fn secrets() -> Secrets {
    Secrets::new("openai-secret", "google-secret")
}

pub fn agent(name: &str, module_file: &str, llms: &[&str]) -> PluginDescriptor {
    PluginDescriptor::agent(
        name,
        module_file,
        AgentRole {
            prompt: format!("you are {name}"),
            tools: Vec::new(),
            llms: llms.iter().map(|s| s.to_string()).collect(),
        },
    )
}
