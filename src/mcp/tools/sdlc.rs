//! `sdlc_orchestrate`: plan the SDLC phases for a goal and optionally write
//! and commit the planned artifacts.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::git::{self, CommitOptions, CommitReport, FileWrite, GitOps, RepoLocks};
use crate::orchestrator::{self, OrchestrationPlan, PlanScope};
use crate::schema::SchemaNode;
use crate::tool::{Args, ToolCallResult, ToolContext, ToolDescriptor, ToolError, ToolHandler};

/// Files to write for every step of `plan` that has an artifact. Each body
/// embeds the step's prompt, read from under the context root when present.
pub fn artifact_files(ctx: &ToolContext, plan: &OrchestrationPlan) -> Vec<FileWrite> {
    plan.artifacts()
        .map(|(step, artifact)| {
            let prompt = step
                .prompt
                .as_deref()
                .and_then(|p| ctx.read_text(p).ok());
            FileWrite {
                path: artifact.to_string(),
                content: orchestrator::artifact_body(&plan.goal, &step.phase, prompt.as_deref()),
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct WriteOutcome<'a> {
    plan: &'a OrchestrationPlan,
    written: Vec<String>,
    commit: CommitReport,
}

pub struct SdlcOrchestrate<G: GitOps> {
    git: Arc<G>,
    locks: Arc<RepoLocks>,
}

impl<G: GitOps> SdlcOrchestrate<G> {
    pub fn new(git: Arc<G>, locks: Arc<RepoLocks>) -> Self {
        Self { git, locks }
    }

    /// Build the plan for validated `args`, stamping from the repository at
    /// `stamp_dir`.
    pub fn plan(&self, args: &Args, stamp_dir: &Path) -> Result<OrchestrationPlan, ToolError> {
        let goal = args.required_str("goal")?;
        let scope: PlanScope = args.parse("scope")?;
        let phases = args.str_list("phases");
        let stamp = orchestrator::resolve_stamp(self.git.as_ref(), stamp_dir);
        debug!(%goal, ?scope, %stamp, "planning sdlc");
        Ok(orchestrator::plan_sdlc(goal, scope, phases.as_deref(), &stamp))
    }
}

impl<G: GitOps> ToolHandler for SdlcOrchestrate<G> {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "sdlc_orchestrate",
            "Plan SDLC phases for a goal (prompts, delegated tool calls, artifact paths); with write=true, write the artifacts and commit them.",
            SchemaNode::object()
                .required_property("goal", SchemaNode::string())
                .property(
                    "scope",
                    SchemaNode::string_enum(["feature", "service", "repo"])
                        .with_default("feature".into()),
                )
                .property(
                    "phases",
                    SchemaNode::array(SchemaNode::string())
                        .describe("Subset of phases; defaults to all seven"),
                )
                .property("write", SchemaNode::boolean().with_default(false.into()))
                .property("out", SchemaNode::string().with_default(".".into()))
                .property("branch", SchemaNode::string())
                .property("message", SchemaNode::string())
                .property("push", SchemaNode::boolean().with_default(false.into())),
        )
    }

    fn call(&self, ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let out = ctx.resolve(args.str_or("out", "."))?;

        if !args.bool("write") {
            let stamp_dir = if out.is_dir() { out.as_path() } else { ctx.root() };
            let plan = self.plan(args, stamp_dir)?;
            return ToolCallResult::json(&plan);
        }

        let outcome = self.locks.with_lock(&out, || -> Result<_, ToolError> {
            std::fs::create_dir_all(&out)?;
            let plan = self.plan(args, &out)?;
            let files = artifact_files(ctx, &plan);
            let options = CommitOptions {
                branch: args.str_or("branch", "main").to_string(),
                message: args
                    .str("message")
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("sdlc: {}", plan.goal)),
                push: args.bool("push"),
            };
            let commit = git::commit_and_push(self.git.as_ref(), &out, &files, &options)?;
            Ok((plan, files, commit))
        });
        let (plan, files, commit) = outcome?;

        info!(
            out = %out.display(),
            artifacts = files.len(),
            committed = commit.committed,
            "sdlc artifacts written"
        );
        ToolCallResult::json(&WriteOutcome {
            plan: &plan,
            written: files.into_iter().map(|f| f.path).collect(),
            commit,
        })
    }
}
