//! Tests for the prompt library tools.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::mcp::tools::{COMMANDS_FILE, PromptCommands, PromptList, PromptRead};
use crate::schema::compile;
use crate::tool::{Args, ToolContext, ToolError, ToolHandler};

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn library() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "prompts/v0.3.0/1_requirements_planning.md", "# Requirements\n\nGather needs.");
    write(dir.path(), "prompts/v0.3.0/5_testing_quality_assurance.md", "# Testing\n");
    write(dir.path(), "README.md", "# Spellbook");
    write(dir.path(), COMMANDS_FILE, "# Commands\n\n/plan - slash command for planning\n");
    dir
}

/// Validate like the dispatcher does, so defaults are applied.
fn call(handler: &dyn ToolHandler, ctx: &ToolContext, args: Value) -> Result<String, ToolError> {
    let validated = compile(&handler.descriptor().input).validate(&args).unwrap();
    let map: Map<String, Value> = validated.as_object().cloned().unwrap_or_default();
    handler.call(ctx, &Args::new(map)).map(|r| r.joined_text())
}

#[test]
fn test_prompt_read_returns_file_contents() {
    let dir = library();
    let ctx = ToolContext::new(dir.path());

    let text = call(
        &PromptRead,
        &ctx,
        json!({"file": "prompts/v0.3.0/1_requirements_planning.md"}),
    )
    .unwrap();

    assert_eq!(text, "# Requirements\n\nGather needs.");
}

#[test]
fn test_prompt_read_missing_and_escaping_files() {
    let dir = library();
    let ctx = ToolContext::new(dir.path());

    let missing = call(&PromptRead, &ctx, json!({"file": "prompts/nope.md"})).unwrap_err();
    assert!(matches!(missing, ToolError::NotFound { .. }));

    let escape = call(&PromptRead, &ctx, json!({"file": "../../etc/passwd"})).unwrap_err();
    assert!(matches!(escape, ToolError::PathEscape(_)));
}

#[test]
fn test_prompt_list_scans_markdown_without_catalog() {
    let dir = library();
    let ctx = ToolContext::new(dir.path());

    let all = call(&PromptList, &ctx, json!({})).unwrap();
    assert_eq!(
        all.lines().collect::<Vec<_>>(),
        vec![
            "COMMANDS.md",
            "README.md",
            "prompts/v0.3.0/1_requirements_planning.md",
            "prompts/v0.3.0/5_testing_quality_assurance.md",
        ]
    );

    let under = call(&PromptList, &ctx, json!({"base": "prompts"})).unwrap();
    assert_eq!(
        under.lines().collect::<Vec<_>>(),
        vec![
            "v0.3.0/1_requirements_planning.md",
            "v0.3.0/5_testing_quality_assurance.md",
        ]
    );

    let testing = call(&PromptList, &ctx, json!({"base": "prompts", "phase": "testing"})).unwrap();
    assert_eq!(testing, "v0.3.0/5_testing_quality_assurance.md");
}

#[test]
fn test_prompt_list_prefers_catalog() {
    let dir = library();
    write(
        dir.path(),
        "catalog.json",
        r#"{"prompts":[
            {"path":"prompts/v0.3.0/1_requirements_planning.md","phase":"requirements","tags":["plan"]},
            {"path":"prompts/v0.3.0/5_testing_quality_assurance.md","phase":"testing","tags":["qa"]}
        ]}"#,
    );
    let ctx = ToolContext::new(dir.path());

    let qa = call(&PromptList, &ctx, json!({"tag": "qa"})).unwrap();
    assert_eq!(qa, "prompts/v0.3.0/5_testing_quality_assurance.md");

    let all = call(&PromptList, &ctx, json!({"base": "."})).unwrap();
    assert_eq!(all.lines().count(), 2);
}

#[test]
fn test_prompt_list_missing_base_and_escape() {
    let dir = library();
    let ctx = ToolContext::new(dir.path());

    let missing = call(&PromptList, &ctx, json!({"base": "nowhere"})).unwrap_err();
    assert!(matches!(missing, ToolError::NotFound { .. }));

    let escape = call(&PromptList, &ctx, json!({"base": ".."})).unwrap_err();
    assert!(matches!(escape, ToolError::PathEscape(_)));
}

#[test]
fn test_prompt_list_malformed_catalog_is_internal() {
    let dir = library();
    write(dir.path(), "catalog.json", "[");
    let ctx = ToolContext::new(dir.path());

    let err = call(&PromptList, &ctx, json!({})).unwrap_err();
    assert!(!err.is_caller_error());
    assert!(err.to_string().contains("Malformed catalog"));
}

#[test]
fn test_prompt_commands_reads_index() {
    let dir = library();
    let ctx = ToolContext::new(dir.path());

    let text = call(&PromptCommands, &ctx, json!({})).unwrap();
    assert!(text.contains("slash command"));

    fs::remove_file(dir.path().join(COMMANDS_FILE)).unwrap();
    assert!(matches!(
        call(&PromptCommands, &ctx, json!({})),
        Err(ToolError::NotFound { .. })
    ));
}
