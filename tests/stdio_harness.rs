//! End-to-end tests over the stdio transport.

mod support;

use std::process::Command;
use std::time::Duration;

use serde_json::{Value, json};
use support::{McpClient, prompts_root};

const INVALID_PARAMS: i64 = -32602;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

#[test]
fn test_tools_list_advertises_every_tool() {
    let root = prompts_root();
    let mut client = McpClient::start(root.path());

    let tools = client.list_tools();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();

    assert_eq!(names.len(), 13, "{names:?}");
    assert_eq!(names[0], "prompt_read");
    assert!(names.contains(&"sdlc_orchestrate"));
    assert!(names.contains(&"repo_commit"));
    for tool in &tools {
        assert_eq!(tool["inputSchema"]["type"], "object", "{tool}");
    }
}

#[test]
fn test_prompt_tools_read_from_root() {
    let root = prompts_root();
    let mut client = McpClient::start(root.path());

    let commands = client.call("prompt.commands", json!({})).unwrap();
    assert!(commands.starts_with("# Commands"));

    let prompt = client
        .call("prompt_read", json!({"file": "prompts/planning/pdca.md"}))
        .unwrap();
    assert!(prompt.contains("# PDCA prompt"));

    let listed = client.call("prompt_list", json!({"base": "prompts"})).unwrap();
    assert!(listed.contains("planning/pdca.md"), "{listed}");
    assert!(listed.contains("v0.3.0/meta/sdlc_orchestrator.md"), "{listed}");
}

#[test]
fn test_generators_render_markdown() {
    let root = prompts_root();
    let mut client = McpClient::start(root.path());

    let pdca = client
        .call(
            "pdca_generate",
            json!({"phase": "plan", "artifact": "feature-x", "metrics": "p95", "risk": "med"}),
        )
        .unwrap();
    assert!(pdca.contains("# PDCA · PLAN · feature-x"));
    assert!(pdca.contains("**Scope:** feature"));
    assert!(pdca.contains("**Risk:** med"));

    let adr = client
        .call("arch_adr", json!({"system": "payments", "decision": "Use event sourcing"}))
        .unwrap();
    assert!(adr.starts_with("# ADR: Use event sourcing"));

    let due = client.call("due_check", json!({"path": "."})).unwrap();
    assert!(due.contains("# Due Diligence Report"));

    let rca = client
        .call("rca_analyze", json!({"log": "ERROR db timeout\nWARN retrying", "service": "billing"}))
        .unwrap();
    assert!(rca.starts_with("# RCA · billing"));
}

#[test]
fn test_orchestrator_plans_all_phases() {
    let root = prompts_root();
    let mut client = McpClient::start(root.path());

    let text = client
        .call("sdlc_orchestrate", json!({"goal": "example-service"}))
        .unwrap();
    let plan: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(plan["goal"], "example-service");
    let phases: Vec<&str> = plan["steps"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["phase"].as_str())
        .collect();
    assert_eq!(phases.first(), Some(&"requirements"));
    assert_eq!(phases.last(), Some(&"maintenance"));
}

#[test]
fn test_orchestrator_writes_and_commits_artifacts() {
    if !git_available() {
        eprintln!("git not on PATH, skipping");
        return;
    }
    let root = prompts_root();
    let mut client = McpClient::start(root.path());

    let text = client
        .call(
            "sdlc_orchestrate",
            json!({"goal": "billing", "phases": ["requirements", "design"], "write": true, "out": "sdlc"}),
        )
        .unwrap();
    let outcome: Value = serde_json::from_str(&text).unwrap();

    let written = outcome["written"].as_array().unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(outcome["commit"]["committed"], true);
    for path in written {
        let body = std::fs::read_to_string(root.path().join("sdlc").join(path.as_str().unwrap()))
            .unwrap();
        assert!(body.starts_with("# billing · "), "{body}");
    }
}

#[test]
fn test_error_paths_map_to_jsonrpc_codes() {
    let root = prompts_root();
    let mut client = McpClient::start(root.path());

    let unknown = client.call("no_such_tool", json!({})).unwrap_err();
    assert_eq!(unknown["code"], METHOD_NOT_FOUND);

    let bad_type = client.call("prompt_read", json!({"file": 42})).unwrap_err();
    assert_eq!(bad_type["code"], INVALID_PARAMS);
    assert_eq!(bad_type["data"]["errors"][0]["path"], "file");

    let escape = client
        .call("prompt_read", json!({"file": "../../etc/passwd"}))
        .unwrap_err();
    assert_eq!(escape["code"], INVALID_PARAMS);
    assert!(
        escape["message"]
            .as_str()
            .unwrap()
            .starts_with("Error executing tool prompt_read:")
    );

    let missing = client.call("prompt_read", json!({"file": "nope.md"})).unwrap_err();
    assert_eq!(missing["code"], INVALID_PARAMS);

    std::fs::write(root.path().join("catalog.json"), "{ broken").unwrap();
    let broken = client.call("prompt_list", json!({})).unwrap_err();
    assert_eq!(broken["code"], INTERNAL_ERROR);
}

#[cfg(unix)]
#[test]
fn test_sigterm_exits_cleanly_with_stdin_open() {
    let root = prompts_root();
    let mut client = McpClient::start(root.path());
    assert!(!client.list_tools().is_empty());

    let sent = Command::new("kill")
        .args(["-TERM", &client.pid().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = client
        .wait_timeout(Duration::from_secs(5))
        .expect("server still running 5s after SIGTERM");
    assert!(status.success(), "exit status {status:?}");

    if std::env::var_os("MCP_CMD").is_none() {
        let logged: String = std::fs::read_dir(root.path().join("logs"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("mcp-all."))
            .map(|e| std::fs::read_to_string(e.path()).unwrap())
            .collect();
        assert!(logged.contains("Received SIGTERM. Shutting down"), "{logged}");
        assert!(!logged.contains("duplicate signal"), "{logged}");
    }
}
