//! Tests for sdlc_orchestrate planning and writing.

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::git::{GitError, MockGitOps, RepoLocks};
use crate::mcp::tools::{SdlcOrchestrate, artifact_files};
use crate::orchestrator::{PlanScope, plan_sdlc};
use crate::schema::compile;
use crate::tool::{Args, ContentKind, ToolCallResult, ToolContext, ToolError, ToolHandler};

fn output(stdout: &str) -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

fn no_head(git: &mut MockGitOps) {
    git.expect_short_head().returning(|_| {
        Err(GitError::NonZeroExit {
            code: 128,
            output: "fatal: not a git repository".into(),
        })
    });
}

fn call(
    tool: &SdlcOrchestrate<MockGitOps>,
    ctx: &ToolContext,
    args: Value,
) -> Result<ToolCallResult, ToolError> {
    let validated = compile(&tool.descriptor().input)
        .validate(&args)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    let map: Map<String, Value> = validated.as_object().cloned().unwrap_or_default();
    tool.call(ctx, &Args::new(map))
}

#[test]
fn test_plan_only_returns_json_plan_stamped_with_head() {
    let dir = TempDir::new().unwrap();
    let mut git = MockGitOps::new();
    git.expect_short_head().returning(|_| Ok(output("abc1234\n")));
    git.expect_is_repo().never();
    git.expect_commit().never();
    let tool = SdlcOrchestrate::new(Arc::new(git), Arc::new(RepoLocks::new()));

    let result = call(&tool, &ToolContext::new(dir.path()), json!({"goal": "Example Service"})).unwrap();

    assert_eq!(result.content[0].kind, ContentKind::Json);
    let plan: Value = serde_json::from_str(&result.joined_text()).unwrap();
    assert_eq!(plan["scope"], "feature");
    assert_eq!(plan["goal"], "Example Service");
    let steps = plan["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 7);
    assert_eq!(steps[0]["phase"], "requirements");
    assert_eq!(
        steps[0]["artifact"],
        "docs/PDCA/example-service-requirements-abc1234.md"
    );
    assert_eq!(steps[6]["phase"], "maintenance");
}

#[test]
fn test_plan_filters_phases_and_keeps_scope() {
    let dir = TempDir::new().unwrap();
    let mut git = MockGitOps::new();
    no_head(&mut git);
    let tool = SdlcOrchestrate::new(Arc::new(git), Arc::new(RepoLocks::new()));

    let result = call(
        &tool,
        &ToolContext::new(dir.path()),
        json!({"goal": "g", "scope": "repo", "phases": ["deployment", "analysis"]}),
    )
    .unwrap();

    let plan: Value = serde_json::from_str(&result.joined_text()).unwrap();
    assert_eq!(plan["scope"], "repo");
    let phases: Vec<&str> = plan["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["phase"].as_str().unwrap())
        .collect();
    assert_eq!(phases, vec!["analysis", "deployment"]);
}

#[test]
fn test_blank_goal_is_invalid() {
    let dir = TempDir::new().unwrap();
    let tool = SdlcOrchestrate::new(Arc::new(MockGitOps::new()), Arc::new(RepoLocks::new()));

    let err = call(&tool, &ToolContext::new(dir.path()), json!({"goal": " "})).unwrap_err();

    assert!(matches!(err, ToolError::InvalidArguments(ref m) if m == "goal is required"));
}

#[test]
fn test_invalid_scope_and_phase_types_fail_validation() {
    let dir = TempDir::new().unwrap();
    let tool = SdlcOrchestrate::new(Arc::new(MockGitOps::new()), Arc::new(RepoLocks::new()));
    let ctx = ToolContext::new(dir.path());

    let scope = call(&tool, &ctx, json!({"goal": "g", "scope": "galaxy"})).unwrap_err();
    assert!(scope.to_string().contains("scope"));

    let phases = call(&tool, &ctx, json!({"goal": "g", "phases": ["ok", 3]})).unwrap_err();
    assert!(phases.to_string().contains("phases[1]"));
}

#[test]
fn test_write_materializes_artifacts_and_commits() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("prompts/v0.3.0")).unwrap();
    fs::write(
        dir.path().join("prompts/v0.3.0/5_testing_quality_assurance.md"),
        "Plan the tests.",
    )
    .unwrap();

    let mut git = MockGitOps::new();
    no_head(&mut git);
    git.expect_is_repo().returning(|_| false);
    git.expect_init().times(1).returning(|_| Ok(output("")));
    git.expect_checkout_branch().returning(|_, _| Ok(output("")));
    git.expect_add_all().returning(|_| Ok(output("")));
    git.expect_commit()
        .withf(|_, message| message == "sdlc: Checkout Flow")
        .times(1)
        .returning(|_, _| Ok(output("")));
    let tool = SdlcOrchestrate::new(Arc::new(git), Arc::new(RepoLocks::new()));

    let result = call(
        &tool,
        &ToolContext::new(dir.path()),
        json!({
            "goal": "Checkout Flow",
            "phases": ["testing", "implementation"],
            "write": true,
            "out": "out"
        }),
    )
    .unwrap();

    let outcome: Value = serde_json::from_str(&result.joined_text()).unwrap();
    let written = outcome["written"].as_array().unwrap();
    assert_eq!(written.len(), 1, "implementation has no artifact");
    let rel = written[0].as_str().unwrap();
    assert!(rel.starts_with("docs/TESTS/checkout-flow-testing-"));
    assert_eq!(outcome["commit"]["committed"], true);
    assert_eq!(outcome["commit"]["push"]["status"], "skipped");

    let body = fs::read_to_string(dir.path().join("out").join(rel)).unwrap();
    assert_eq!(body, "# Checkout Flow · testing\n\nPlan the tests.");
}

#[test]
fn test_write_rejects_out_outside_root() {
    let dir = TempDir::new().unwrap();
    let mut git = MockGitOps::new();
    git.expect_is_repo().never();
    let tool = SdlcOrchestrate::new(Arc::new(git), Arc::new(RepoLocks::new()));

    let err = call(
        &tool,
        &ToolContext::new(dir.path()),
        json!({"goal": "g", "write": true, "out": "../outside"}),
    )
    .unwrap_err();

    assert!(matches!(err, ToolError::PathEscape(_)));
}

#[test]
fn test_artifact_files_fall_back_when_prompt_missing() {
    let dir = TempDir::new().unwrap();
    let ctx = ToolContext::new(dir.path());
    let plan = plan_sdlc("Goal", PlanScope::Feature, None, "20260101T000000Z");

    let files = artifact_files(&ctx, &plan);

    assert_eq!(files.len(), 6);
    assert_eq!(
        files[0].content,
        "# Goal · requirements\n\nGenerated artifact for requirements"
    );
    assert!(files.iter().any(|f| f.path.ends_with(".yaml")));
}
