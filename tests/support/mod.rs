//! Stdio client for driving a spawned MCP server.
//!
//! `MCP_CMD` picks the server executable (default: the built `spellbook-mcp`)
//! and `MCP_ARGS` adds arguments as a JSON array. The server always gets a
//! throwaway prompts root through `SPELLBOOK_ROOT`.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A prompts root with a command index, one nested prompt and one meta prompt.
pub fn prompts_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::write(root.join("COMMANDS.md"), "# Commands\n\n/pdca\n/sdlc\n").unwrap();
    std::fs::create_dir_all(root.join("prompts/planning")).unwrap();
    std::fs::write(
        root.join("prompts/planning/pdca.md"),
        "---\nphase: planning\n---\n# PDCA prompt\n",
    )
    .unwrap();
    std::fs::create_dir_all(root.join("prompts/v0.3.0/meta")).unwrap();
    std::fs::write(
        root.join("prompts/v0.3.0/meta/sdlc_orchestrator.md"),
        "# SDLC orchestrator\n\nUse PDCA and due-diligence.\n",
    )
    .unwrap();
    dir
}

fn server_command(root: &Path) -> Command {
    let program = std::env::var("MCP_CMD")
        .unwrap_or_else(|_| env!("CARGO_BIN_EXE_spellbook-mcp").to_string());
    let args: Vec<String> = std::env::var("MCP_ARGS")
        .ok()
        .map(|raw| serde_json::from_str(&raw).expect("MCP_ARGS must be a JSON array of strings"))
        .unwrap_or_default();

    let mut command = Command::new(program);
    command
        .args(args)
        .env("SPELLBOOK_ROOT", root)
        .env("LOG_DIR", root.join("logs"))
        .env_remove("LOG_MCP")
        .env_remove("RUST_LOG")
        .env("GIT_AUTHOR_NAME", "Spellbook Harness")
        .env("GIT_AUTHOR_EMAIL", "harness@example.invalid")
        .env("GIT_COMMITTER_NAME", "Spellbook Harness")
        .env("GIT_COMMITTER_EMAIL", "harness@example.invalid")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    command
}

pub struct McpClient {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl McpClient {
    /// Spawn the server and complete the `initialize` handshake.
    pub fn start(root: &Path) -> Self {
        let mut child = server_command(root).spawn().expect("failed to spawn MCP server");
        let stdin = child.stdin.take().expect("missing child stdin");
        let stdout = BufReader::new(child.stdout.take().expect("missing child stdout"));
        let mut client = Self {
            child,
            stdin,
            stdout,
            next_id: 1,
        };

        let init = client.request(
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "spellbook-harness", "version": "0.0.0"}
            }),
        );
        assert!(init.get("error").is_none(), "initialize failed: {init}");
        client.notify("notifications/initialized");
        client
    }

    fn send(&mut self, message: &Value) {
        let mut line = serde_json::to_string(message).unwrap();
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).unwrap();
        self.stdin.flush().unwrap();
    }

    fn notify(&mut self, method: &str) {
        self.send(&json!({"jsonrpc": "2.0", "method": method}));
    }

    /// Send a request and return the whole response envelope.
    pub fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}));

        loop {
            let mut line = String::new();
            let read = self.stdout.read_line(&mut line).unwrap();
            assert!(read > 0, "server closed stdout while waiting for {method}");
            if line.trim().is_empty() {
                continue;
            }
            let message: Value = serde_json::from_str(&line)
                .unwrap_or_else(|e| panic!("non-JSON line from server ({e}): {line}"));
            if message.get("id") == Some(&json!(id)) {
                return message;
            }
        }
    }

    pub fn list_tools(&mut self) -> Vec<Value> {
        let response = self.request("tools/list", json!({}));
        response["result"]["tools"]
            .as_array()
            .cloned()
            .unwrap_or_else(|| panic!("bad tools/list response: {response}"))
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Poll for the server's exit; `None` if it is still running after `limit`.
    pub fn wait_timeout(&mut self, limit: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                return Some(status);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
    }

    /// Call a tool, returning the joined text content or the error object.
    pub fn call(&mut self, name: &str, arguments: Value) -> Result<String, Value> {
        let response = self.request("tools/call", json!({"name": name, "arguments": arguments}));
        if let Some(error) = response.get("error") {
            return Err(error.clone());
        }
        let content = response["result"]["content"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(content
            .iter()
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
