//! `repo_commit`: write files into a repository and commit them.

use std::sync::Arc;

use tracing::info;

use crate::git::{self, CommitOptions, FileWrite, GitOps, RepoLocks};
use crate::schema::SchemaNode;
use crate::tool::{Args, ToolCallResult, ToolContext, ToolDescriptor, ToolError, ToolHandler};

pub struct RepoCommit<G: GitOps> {
    git: Arc<G>,
    locks: Arc<RepoLocks>,
}

impl<G: GitOps> RepoCommit<G> {
    pub fn new(git: Arc<G>, locks: Arc<RepoLocks>) -> Self {
        Self { git, locks }
    }
}

/// Schema for a `{path, content}` batch.
pub(crate) fn files_schema() -> SchemaNode {
    SchemaNode::array(
        SchemaNode::object()
            .required_property("path", SchemaNode::string())
            .required_property("content", SchemaNode::string()),
    )
}

impl<G: GitOps> ToolHandler for RepoCommit<G> {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "repo_commit",
            "Write files under a repository folder, commit them on a branch and optionally push to origin.",
            SchemaNode::object()
                .required_property("files", files_schema())
                .property("repo", SchemaNode::string().with_default(".".into()))
                .property("branch", SchemaNode::string().with_default("main".into()))
                .property("message", SchemaNode::string().with_default("auto commit".into()))
                .property("push", SchemaNode::boolean().with_default(false.into())),
        )
    }

    fn call(&self, ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let files: Vec<FileWrite> = args.parse("files")?;
        if files.is_empty() {
            return Err(ToolError::InvalidArguments(
                "files must contain at least one entry".to_string(),
            ));
        }
        let repo = ctx.resolve(args.str_or("repo", "."))?;
        let options = CommitOptions {
            branch: args.str_or("branch", "main").to_string(),
            message: args.str_or("message", "auto commit").to_string(),
            push: args.bool("push"),
        };

        let report = self.locks.with_lock(&repo, || -> Result<_, ToolError> {
            std::fs::create_dir_all(&repo)?;
            Ok(git::commit_and_push(self.git.as_ref(), &repo, &files, &options)?)
        })?;

        info!(
            repo = %report.repo.display(),
            branch = %report.branch,
            files = report.files.len(),
            committed = report.committed,
            "repo_commit complete"
        );
        ToolCallResult::json(&report)
    }
}
