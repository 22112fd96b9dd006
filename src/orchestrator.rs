//! SDLC plan builder.
//!
//! [`plan_sdlc`] maps a goal onto the fixed seven-phase table: each phase has a
//! prompt to follow, at most one tool call to delegate, and an artifact path.
//! Planning is pure; the artifact stamp (short git SHA or UTC timestamp) is
//! resolved beforehand by [`resolve_stamp`].

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::git::GitOps;

const SLUG_MAX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanScope {
    #[default]
    Feature,
    Service,
    Repo,
}

impl PlanScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(Self::Feature),
            "service" => Some(Self::Service),
            "repo" => Some(Self::Repo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelegatedCall {
    pub tool: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub phase: String,
    pub prompt: Option<String>,
    pub tool_calls: Vec<DelegatedCall>,
    pub artifact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationPlan {
    pub scope: PlanScope,
    pub goal: String,
    pub steps: Vec<PlanStep>,
}

impl OrchestrationPlan {
    /// Steps that produce a file.
    pub fn artifacts(&self) -> impl Iterator<Item = (&PlanStep, &str)> {
        self.steps
            .iter()
            .filter_map(|s| s.artifact.as_deref().map(|a| (s, a)))
    }
}

struct PhaseSpec {
    name: &'static str,
    prompt: &'static str,
    /// Artifact directory and extension; `None` for phases without a file.
    artifact: Option<(&'static str, &'static str)>,
    call: fn(&str) -> Option<DelegatedCall>,
}

fn delegate(tool: &str, args: Value) -> Option<DelegatedCall> {
    Some(DelegatedCall {
        tool: tool.to_string(),
        args,
    })
}

fn requirements_call(goal: &str) -> Option<DelegatedCall> {
    delegate(
        "pdca_generate",
        json!({"phase": "plan", "artifact": format!("{} PDCA", or_default(goal, "work"))}),
    )
}

fn analysis_call(_goal: &str) -> Option<DelegatedCall> {
    delegate(
        "prompt_read",
        json!({"file": "prompts/v0.3.0/2_analysis_specification.md"}),
    )
}

fn architecture_call(goal: &str) -> Option<DelegatedCall> {
    delegate("api_scaffold", json!({"name": or_default(goal, "service")}))
}

fn no_call(_goal: &str) -> Option<DelegatedCall> {
    None
}

fn testing_call(_goal: &str) -> Option<DelegatedCall> {
    delegate("tests_plan", json!({"scope": "file", "target": "server.js"}))
}

fn deployment_call(_goal: &str) -> Option<DelegatedCall> {
    delegate("ci_configure", json!({"service": "github", "env": "dev"}))
}

fn maintenance_call(_goal: &str) -> Option<DelegatedCall> {
    delegate("due_check", json!({"path": ".", "strict": false}))
}

const PHASES: [PhaseSpec; 7] = [
    PhaseSpec {
        name: "requirements",
        prompt: "prompts/v0.3.0/1_requirements_planning.md",
        artifact: Some(("docs/PDCA", "md")),
        call: requirements_call,
    },
    PhaseSpec {
        name: "analysis",
        prompt: "prompts/v0.3.0/2_analysis_specification.md",
        artifact: Some(("docs/API", "md")),
        call: analysis_call,
    },
    PhaseSpec {
        name: "architecture",
        prompt: "prompts/v0.3.0/3_architecture_design.md",
        artifact: Some(("docs/ADR", "md")),
        call: architecture_call,
    },
    PhaseSpec {
        name: "implementation",
        prompt: "prompts/v0.3.0/4_implementation_development.md",
        artifact: None,
        call: no_call,
    },
    PhaseSpec {
        name: "testing",
        prompt: "prompts/v0.3.0/5_testing_quality_assurance.md",
        artifact: Some(("docs/TESTS", "md")),
        call: testing_call,
    },
    PhaseSpec {
        name: "deployment",
        prompt: "prompts/v0.3.0/6_deployment_release.md",
        artifact: Some(("docs/CI", "yaml")),
        call: deployment_call,
    },
    PhaseSpec {
        name: "maintenance",
        prompt: "prompts/v0.3.0/7_maintenance_monitoring.md",
        artifact: Some(("docs/RCA", "md")),
        call: maintenance_call,
    },
];

fn or_default<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    if s.trim().is_empty() { fallback } else { s }
}

/// Names of the fixed phase table, in order.
pub fn phase_names() -> impl Iterator<Item = &'static str> {
    PHASES.iter().map(|p| p.name)
}

/// Lower-case, collapse non-alphanumeric runs to `-`, trim dashes, cap length.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(SLUG_MAX_LEN);
    slug.trim_end_matches('-').to_string()
}

/// Build the plan for `goal`.
///
/// With `phases` absent or empty every phase is planned. Otherwise the known
/// phases are returned in table order, followed by any unrecognized names as
/// bare steps in the order given.
pub fn plan_sdlc(
    goal: &str,
    scope: PlanScope,
    phases: Option<&[String]>,
    stamp: &str,
) -> OrchestrationPlan {
    let slug = match slugify(goal) {
        s if s.is_empty() => "artifact".to_string(),
        s => s,
    };
    let requested = phases.filter(|p| !p.is_empty());
    let wanted = |name: &str| requested.is_none_or(|r| r.iter().any(|p| p == name));

    let mut steps: Vec<PlanStep> = PHASES
        .iter()
        .filter(|spec| wanted(spec.name))
        .map(|spec| PlanStep {
            phase: spec.name.to_string(),
            prompt: Some(spec.prompt.to_string()),
            tool_calls: (spec.call)(goal).into_iter().collect(),
            artifact: spec
                .artifact
                .map(|(dir, ext)| format!("{dir}/{slug}-{}-{stamp}.{ext}", spec.name)),
        })
        .collect();

    if let Some(requested) = requested {
        let mut extra: Vec<&String> = Vec::new();
        for name in requested {
            if !PHASES.iter().any(|spec| spec.name == name) && !extra.contains(&name) {
                extra.push(name);
            }
        }
        steps.extend(extra.into_iter().map(|name| PlanStep {
            phase: name.clone(),
            prompt: None,
            tool_calls: Vec::new(),
            artifact: None,
        }));
    }

    OrchestrationPlan {
        scope,
        goal: goal.to_string(),
        steps,
    }
}

/// UTC timestamp stamp, `YYYYMMDDTHHMMSSZ`.
pub fn timestamp_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Short HEAD SHA of `dir` when it is a git checkout with commits, otherwise
/// the current UTC timestamp.
pub fn resolve_stamp<G: GitOps + ?Sized>(git: &G, dir: &Path) -> String {
    git.short_head(dir)
        .ok()
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|sha| !sha.is_empty())
        .unwrap_or_else(|| timestamp_stamp(Utc::now()))
}

/// Body written for a planned artifact: a heading, then the phase prompt or a
/// placeholder line when the prompt is unavailable.
pub fn artifact_body(goal: &str, phase: &str, prompt_text: Option<&str>) -> String {
    let mut body = format!("# {goal} · {phase}\n\n");
    match prompt_text {
        Some(text) => body.push_str(text),
        None => body.push_str(&format!("Generated artifact for {phase}")),
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{GitError, MockGitOps};
    use chrono::TimeZone;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    const STAMP: &str = "20260101T000000Z";

    fn phases(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_plan_covers_every_phase_in_order() {
        let plan = plan_sdlc("Example Service", PlanScope::Feature, None, STAMP);

        let names: Vec<&str> = plan.steps.iter().map(|s| s.phase.as_str()).collect();
        assert_eq!(names, phase_names().collect::<Vec<_>>());
        assert_eq!(names.first(), Some(&"requirements"));
        assert_eq!(names.last(), Some(&"maintenance"));
        assert_eq!(
            plan.steps[0].artifact.as_deref(),
            Some("docs/PDCA/example-service-requirements-20260101T000000Z.md")
        );
        assert_eq!(plan.steps[0].tool_calls[0].tool, "pdca_generate");
        assert_eq!(plan.steps[0].tool_calls[0].args["artifact"], "Example Service PDCA");
    }

    #[test]
    fn test_implementation_has_no_artifact_and_no_call() {
        let plan = plan_sdlc("x", PlanScope::Service, None, STAMP);
        let step = plan.steps.iter().find(|s| s.phase == "implementation").unwrap();

        assert!(step.artifact.is_none());
        assert!(step.tool_calls.is_empty());
        assert_eq!(plan.artifacts().count(), 6);
    }

    #[test]
    fn test_deployment_artifact_is_yaml() {
        let plan = plan_sdlc("ci bits", PlanScope::Repo, Some(&phases(&["deployment"])), STAMP);

        assert_eq!(plan.steps.len(), 1);
        assert_eq!(
            plan.steps[0].artifact.as_deref(),
            Some("docs/CI/ci-bits-deployment-20260101T000000Z.yaml")
        );
    }

    #[test]
    fn test_filter_keeps_table_order() {
        let requested = phases(&["testing", "requirements"]);
        let plan = plan_sdlc("g", PlanScope::Feature, Some(&requested), STAMP);

        let names: Vec<&str> = plan.steps.iter().map(|s| s.phase.as_str()).collect();
        assert_eq!(names, vec!["requirements", "testing"]);
    }

    #[test]
    fn test_empty_filter_means_all_phases() {
        let plan = plan_sdlc("g", PlanScope::Feature, Some(&[]), STAMP);
        assert_eq!(plan.steps.len(), 7);
    }

    #[test]
    fn test_unknown_phases_become_bare_steps() {
        let requested = phases(&["retro", "analysis", "retro"]);
        let plan = plan_sdlc("g", PlanScope::Feature, Some(&requested), STAMP);

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].phase, "analysis");
        let bare = &plan.steps[1];
        assert_eq!(bare.phase, "retro");
        assert!(bare.prompt.is_none());
        assert!(bare.artifact.is_none());
        assert!(bare.tool_calls.is_empty());
    }

    #[test]
    fn test_blank_goal_uses_fallback_slug_and_names() {
        let plan = plan_sdlc("   ", PlanScope::Feature, None, STAMP);

        assert!(
            plan.steps[0]
                .artifact
                .as_deref()
                .unwrap()
                .starts_with("docs/PDCA/artifact-requirements-")
        );
        assert_eq!(plan.steps[0].tool_calls[0].args["artifact"], "work PDCA");
        assert_eq!(plan.steps[2].tool_calls[0].args["name"], "service");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Example Service"), "example-service");
        assert_eq!(slugify("  --Hello,  World!! "), "hello-world");
        assert_eq!(slugify("Ünïcode 2.0"), "n-code-2-0");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(&"a".repeat(80)).len(), 64);
        assert!(!slugify(&format!("{} b", "a".repeat(63))).ends_with('-'));
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(PlanScope::parse("repo"), Some(PlanScope::Repo));
        assert_eq!(PlanScope::parse("galaxy"), None);
        assert_eq!(serde_json::to_value(PlanScope::Service).unwrap(), "service");
    }

    #[test]
    fn test_timestamp_stamp_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 3).unwrap();
        assert_eq!(timestamp_stamp(now), "20261018T090503Z");
    }

    #[test]
    fn test_resolve_stamp_prefers_short_head() {
        let mut git = MockGitOps::new();
        git.expect_short_head().returning(|_| {
            Ok(Output {
                status: ExitStatus::from_raw(0),
                stdout: b"abc1234\n".to_vec(),
                stderr: Vec::new(),
            })
        });

        assert_eq!(resolve_stamp(&git, Path::new("/tmp")), "abc1234");
    }

    #[test]
    fn test_resolve_stamp_falls_back_to_timestamp() {
        let mut git = MockGitOps::new();
        git.expect_short_head().returning(|_| {
            Err(GitError::NonZeroExit {
                code: 128,
                output: "fatal: not a git repository".to_string(),
            })
        });

        let stamp = resolve_stamp(&git, Path::new("/tmp"));
        assert_eq!(stamp.len(), 16);
        assert!(stamp.ends_with('Z'));
        assert_eq!(&stamp[8..9], "T");
    }

    #[test]
    fn test_artifact_body() {
        assert_eq!(
            artifact_body("Goal", "testing", Some("Write tests.")),
            "# Goal · testing\n\nWrite tests."
        );
        assert_eq!(
            artifact_body("Goal", "testing", None),
            "# Goal · testing\n\nGenerated artifact for testing"
        );
    }
}
