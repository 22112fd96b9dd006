//! MCP tool implementations
//!
//! Handlers are grouped by concern. [`default_registry`] assembles them in the
//! order `tools/list` advertises.

mod generators;
mod prompts;
mod quality;
mod repo;
mod sdlc;

#[cfg(test)]
mod prompts_test;
#[cfg(test)]
mod sdlc_test;

use std::sync::Arc;

use crate::git::{GitOps, RepoLocks};
use crate::registry::ToolRegistry;

pub use generators::{ApiScaffold, ArchAdr, CiConfigure, PdcaGenerate, RetroCreate, TestsPlan};
pub use prompts::{COMMANDS_FILE, PromptCommands, PromptList, PromptRead};
pub use quality::{DueCheck, RcaAnalyze, scan_due};
pub use repo::RepoCommit;
pub use sdlc::{SdlcOrchestrate, artifact_files};

/// Every tool, backed by `git` for the commit-capable ones.
///
/// Both commit-capable tools share one set of repository locks.
pub fn default_registry<G: GitOps + 'static>(git: Arc<G>) -> ToolRegistry {
    let locks = Arc::new(RepoLocks::new());
    ToolRegistry::new()
        .register(PromptRead)
        .register(PromptList)
        .register(PromptCommands)
        .register(PdcaGenerate)
        .register(DueCheck)
        .register(RetroCreate)
        .register(ApiScaffold)
        .register(CiConfigure)
        .register(TestsPlan)
        .register(RcaAnalyze)
        .register(ArchAdr)
        .register(SdlcOrchestrate::new(Arc::clone(&git), Arc::clone(&locks)))
        .register(RepoCommit::new(git, locks))
}
