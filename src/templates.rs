//! Template renderers behind the generator tools.
//!
//! Everything here is pure: arguments in, markdown or YAML text out. The
//! handlers in `mcp::tools` do the argument plumbing and any filesystem work.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as Yaml};

use crate::orchestrator::slugify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdcaPhase {
    Plan,
    Do,
    Check,
    Act,
}

impl PdcaPhase {
    fn label(self) -> &'static str {
        match self {
            PdcaPhase::Plan => "PLAN",
            PdcaPhase::Do => "DO",
            PdcaPhase::Check => "CHECK",
            PdcaPhase::Act => "ACT",
        }
    }

    fn section(self) -> &'static str {
        match self {
            PdcaPhase::Plan => {
                "## Hypothesis\n- …\n\n## Metrics\n- …\n\n## Risks & Mitigations\n- …\n"
            }
            PdcaPhase::Do => "## Change Set\n- …\n\n## Test Evidence\n- …\n\n## Rollback Plan\n- …\n",
            PdcaPhase::Check => {
                "## Findings\n- …\n\n## Data (table/snippets)\n- …\n\n## Decision\n- Proceed / Adjust / Rollback (why)\n"
            }
            PdcaPhase::Act => {
                "## Actions\n- Owner: …  Due: …\n- …\n\n## Runbook / Prompt Updates\n- …\n"
            }
        }
    }
}

/// PDCA worksheet for one phase of an artifact.
pub fn pdca(phase: PdcaPhase, artifact: &str, scope: &str, metrics: &str, risk: &str) -> String {
    let metrics = if metrics.is_empty() { "—" } else { metrics };
    format!(
        "# PDCA · {} · {artifact}\n\n**Scope:** {scope}  |  **Risk:** {risk}  |  **Metrics:** {metrics}\n\n{}\n",
        phase.label(),
        phase.section()
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DueChecks {
    pub tests_present: bool,
    pub readme_present: bool,
    pub changelog_present: bool,
    pub github_meta: bool,
}

/// Result of a due-diligence scan; serialized as-is for `format = json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueReport {
    pub path: String,
    pub checks: DueChecks,
    pub notes: Vec<String>,
}

impl DueReport {
    pub fn new(path: impl Into<String>, checks: DueChecks, strict: bool) -> Self {
        let notes = if strict {
            vec!["Strict mode: enforce all checks before merge.".to_string()]
        } else {
            Vec::new()
        };
        Self {
            path: path.into(),
            checks,
            notes,
        }
    }

    pub fn strict(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        let mark = |ok: bool| if ok { "✅" } else { "❌" };
        let mut md = format!("# Due Diligence Report\n\n**Path:** {}\n\n", self.path);
        let _ = writeln!(md, "- Tests present: {}", mark(self.checks.tests_present));
        let _ = writeln!(md, "- README present: {}", mark(self.checks.readme_present));
        let _ = writeln!(md, "- CHANGELOG present: {}", mark(self.checks.changelog_present));
        let _ = writeln!(md, "- .github meta present: {}", mark(self.checks.github_meta));
        md.push('\n');
        if self.strict() {
            md.push_str("> **Strict:** all checks required before merge.\n");
        }
        md.push('\n');
        md
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetroKind {
    Sprint,
    Release,
    Incident,
}

pub fn retro(kind: RetroKind, window: &str) -> String {
    let title = match kind {
        RetroKind::Sprint => "Sprint",
        RetroKind::Release => "Release",
        RetroKind::Incident => "Incident",
    };
    let mut md = format!("# Retrospective · {title} · {window}\n\n");
    if kind == RetroKind::Incident {
        md.push_str("## Timeline\n- Detected: …\n- Mitigated: …\n- Resolved: …\n\n");
        md.push_str("## Impact\n- …\n\n");
    }
    md.push_str("## What went well\n- …\n\n");
    md.push_str("## What didn't go well\n- …\n\n");
    if kind == RetroKind::Release {
        md.push_str("## Release metrics\n- Lead time: …\n- Change failure rate: …\n\n");
    }
    md.push_str("## Action items\n- Owner: …  Due: …\n");
    md
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    Rest,
    Grpc,
}

#[derive(Serialize)]
struct OpenApiDoc {
    openapi: &'static str,
    info: OpenApiInfo,
    paths: BTreeMap<String, PathItem>,
}

#[derive(Serialize)]
struct OpenApiInfo {
    title: String,
    version: String,
}

#[derive(Serialize, Default)]
struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<Operation>,
}

#[derive(Serialize)]
struct Operation {
    summary: String,
    responses: BTreeMap<&'static str, Response>,
}

#[derive(Serialize)]
struct Response {
    description: &'static str,
}

fn operation(summary: String, code: &'static str, description: &'static str) -> Operation {
    Operation {
        summary,
        responses: BTreeMap::from([(code, Response { description })]),
    }
}

fn pascal_case(input: &str) -> String {
    input
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        })
        .collect()
}

/// API skeleton: an OpenAPI document for REST or a proto file for gRPC.
pub fn api_scaffold(name: &str, style: ApiStyle, version: &str) -> Result<String, serde_yaml::Error> {
    let slug = match slugify(name) {
        s if s.is_empty() => "resource".to_string(),
        s => s,
    };
    match style {
        ApiStyle::Rest => {
            let doc = OpenApiDoc {
                openapi: "3.0.3",
                info: OpenApiInfo {
                    title: name.to_string(),
                    version: version.to_string(),
                },
                paths: BTreeMap::from([
                    (
                        format!("/{version}/health"),
                        PathItem {
                            get: Some(operation("Health check".into(), "200", "OK")),
                            post: None,
                        },
                    ),
                    (
                        format!("/{version}/{slug}"),
                        PathItem {
                            get: Some(operation(format!("List {name}"), "200", "OK")),
                            post: Some(operation(format!("Create {name}"), "201", "Created")),
                        },
                    ),
                    (
                        format!("/{version}/{slug}/{{id}}"),
                        PathItem {
                            get: Some(operation(format!("Get {name} by id"), "200", "OK")),
                            post: None,
                        },
                    ),
                ]),
            };
            let yaml = serde_yaml::to_string(&doc)?;
            Ok(format!(
                "# API Scaffold · {name} ({version})\n\n**Style:** REST\n\n```yaml\n{yaml}```\n"
            ))
        }
        ApiStyle::Grpc => {
            let ty = match pascal_case(name) {
                s if s.is_empty() => "Resource".to_string(),
                s => s,
            };
            let package = slug.replace('-', "_");
            let proto = format!(
                "syntax = \"proto3\";\n\npackage {package}.{version};\n\n\
                 service {ty}Service {{\n  \
                 rpc Get{ty}(Get{ty}Request) returns ({ty});\n  \
                 rpc List{ty}(List{ty}Request) returns (List{ty}Response);\n  \
                 rpc Create{ty}(Create{ty}Request) returns ({ty});\n}}\n\n\
                 message {ty} {{\n  string id = 1;\n}}\n\n\
                 message Get{ty}Request {{\n  string id = 1;\n}}\n\n\
                 message List{ty}Request {{\n  int32 page_size = 1;\n  string page_token = 2;\n}}\n\n\
                 message List{ty}Response {{\n  repeated {ty} items = 1;\n  string next_page_token = 2;\n}}\n\n\
                 message Create{ty}Request {{\n  {ty} item = 1;\n}}\n"
            );
            Ok(format!(
                "# API Scaffold · {name} ({version})\n\n**Style:** gRPC\n\n```proto\n{proto}```\n"
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiService {
    Github,
    Gitlab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiLanguage {
    Node,
    Rust,
    Python,
}

struct Toolchain {
    image: &'static str,
    setup: Option<(&'static str, &'static str, &'static str)>,
    install: &'static str,
    test: &'static str,
}

impl CiLanguage {
    fn toolchain(self) -> Toolchain {
        match self {
            CiLanguage::Node => Toolchain {
                image: "node:20",
                setup: Some(("actions/setup-node@v4", "node-version", "20")),
                install: "npm ci",
                test: "npm test",
            },
            CiLanguage::Rust => Toolchain {
                image: "rust:latest",
                setup: None,
                install: "cargo build --locked",
                test: "cargo test --locked",
            },
            CiLanguage::Python => Toolchain {
                image: "python:3.12",
                setup: Some(("actions/setup-python@v5", "python-version", "3.12")),
                install: "pip install -r requirements.txt",
                test: "pytest",
            },
        }
    }
}

fn map<const N: usize>(entries: [(&str, Yaml); N]) -> Yaml {
    let mut m = Mapping::new();
    for (k, v) in entries {
        m.insert(Yaml::from(k), v);
    }
    Yaml::Mapping(m)
}

fn step_uses(uses: &str) -> Yaml {
    map([("uses", uses.into())])
}

fn step_run(name: &str, run: &str) -> Yaml {
    map([("name", name.into()), ("run", run.into())])
}

/// CI pipeline for `service`, prefixed by a comment naming its conventional path.
pub fn ci_pipeline(
    service: CiService,
    env: &str,
    language: CiLanguage,
) -> Result<String, serde_yaml::Error> {
    let tc = language.toolchain();
    let (path, doc) = match service {
        CiService::Github => {
            let mut steps = vec![step_uses("actions/checkout@v4")];
            match tc.setup {
                Some((uses, key, version)) => steps.push(map([
                    ("uses", uses.into()),
                    ("with", map([(key, version.into())])),
                ])),
                None => steps.push(step_uses("dtolnay/rust-toolchain@stable")),
            }
            steps.push(step_run("Install", tc.install));
            steps.push(step_run("Test", tc.test));
            let doc = map([
                ("name", format!("CI ({env})").into()),
                (
                    "on",
                    map([
                        ("push", map([("branches", Yaml::Sequence(vec!["main".into()]))])),
                        ("pull_request", Yaml::Mapping(Mapping::new())),
                    ]),
                ),
                (
                    "jobs",
                    map([(
                        "build",
                        map([
                            ("runs-on", "ubuntu-latest".into()),
                            ("environment", env.into()),
                            ("steps", Yaml::Sequence(steps)),
                        ]),
                    )]),
                ),
            ]);
            (".github/workflows/ci.yml", doc)
        }
        CiService::Gitlab => {
            let job = |stage: &str, script: &str| {
                map([
                    ("stage", stage.into()),
                    ("image", tc.image.into()),
                    ("script", Yaml::Sequence(vec![script.into()])),
                ])
            };
            let doc = map([
                (
                    "stages",
                    Yaml::Sequence(vec!["build".into(), "test".into(), "deploy".into()]),
                ),
                ("variables", map([("DEPLOY_ENV", env.into())])),
                ("build", job("build", tc.install)),
                ("test", job("test", tc.test)),
                (
                    "deploy",
                    map([
                        ("stage", "deploy".into()),
                        ("image", tc.image.into()),
                        ("environment", map([("name", env.into())])),
                        (
                            "script",
                            Yaml::Sequence(vec![format!("echo \"deploying to {env}\"").into()]),
                        ),
                        ("when", "manual".into()),
                    ]),
                ),
            ]);
            (".gitlab-ci.yml", doc)
        }
    };
    Ok(format!("# {path}\n{}", serde_yaml::to_string(&doc)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestScope {
    File,
    Module,
    Service,
}

pub fn tests_plan(scope: TestScope, target: &str) -> String {
    let label = match scope {
        TestScope::File => "file",
        TestScope::Module => "module",
        TestScope::Service => "service",
    };
    let mut md = format!("# Test Plan · {label} · {target}\n\n## Scope\n- Target: `{target}` ({label})\n\n");
    md.push_str("## Unit\n- Happy path for each public function\n- Edge cases: empty, boundary, invalid input\n- Error propagation\n\n");
    if matches!(scope, TestScope::Module | TestScope::Service) {
        md.push_str("## Contract\n- Inputs and outputs between collaborators\n- Mocked dependencies at module seams\n\n");
    }
    if scope == TestScope::Service {
        md.push_str("## Integration\n- Real dependencies in a disposable environment\n\n");
        md.push_str("## End-to-end\n- Critical user journeys\n\n");
        md.push_str("## Load\n- Baseline throughput and latency targets: …\n\n");
    }
    md.push_str("## Exit Criteria\n- All planned cases pass\n- Coverage target: …\n");
    md
}

/// Counts gathered from a raw log excerpt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub lines: usize,
    pub errors: usize,
    pub warnings: usize,
    pub first_error: Option<String>,
}

impl LogSummary {
    pub fn from_log(log: &str) -> Self {
        let mut summary = LogSummary::default();
        for line in log.lines() {
            summary.lines += 1;
            let lower = line.to_lowercase();
            if ["error", "fatal", "panic"].iter().any(|k| lower.contains(k)) {
                summary.errors += 1;
                if summary.first_error.is_none() {
                    summary.first_error = Some(line.trim().to_string());
                }
            } else if lower.contains("warn") {
                summary.warnings += 1;
            }
        }
        summary
    }
}

pub fn rca(log: &str, service: Option<&str>) -> String {
    let summary = LogSummary::from_log(log);
    let service = service.filter(|s| !s.trim().is_empty()).unwrap_or("unknown service");
    let first = summary
        .first_error
        .as_deref()
        .map(|l| format!("`{l}`"))
        .unwrap_or_else(|| "none found".to_string());
    let mut md = format!("# RCA · {service}\n\n## Log Summary\n");
    let _ = writeln!(md, "- Lines: {}", summary.lines);
    let _ = writeln!(md, "- Errors: {}", summary.errors);
    let _ = writeln!(md, "- Warnings: {}", summary.warnings);
    let _ = writeln!(md, "- First error: {first}");
    md.push_str("\n## 5 Whys\n");
    for n in 1..=5 {
        let _ = writeln!(md, "{n}. Why? …");
    }
    md.push_str("\n## Root Cause\n- …\n\n## Corrective Actions\n- Owner: …  Due: …\n");
    md
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdrStatus {
    Proposed,
    Accepted,
    Superseded,
}

/// Architecture decision record dated `date` (`YYYY-MM-DD`).
pub fn adr(system: &str, decision: Option<&str>, status: AdrStatus, date: &str) -> String {
    let decision = decision.filter(|d| !d.trim().is_empty());
    let title = decision
        .map(str::to_string)
        .unwrap_or_else(|| format!("Architecture decision for {system}"));
    let status = match status {
        AdrStatus::Proposed => "Proposed",
        AdrStatus::Accepted => "Accepted",
        AdrStatus::Superseded => "Superseded",
    };
    format!(
        "# ADR: {title}\n\n- **System:** {system}\n- **Status:** {status}\n- **Date:** {date}\n\n\
         ## Context\n- …\n\n## Decision\n- {}\n\n## Consequences\n- Positive: …\n- Negative: …\n\n\
         ## Alternatives Considered\n- …\n",
        decision.unwrap_or("…")
    )
}
