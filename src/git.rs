//! Git operations for the commit-capable tools.
//!
//! [`GitOps`] is a thin trait over the `git` CLI so tests can swap in a mock.
//! [`commit_and_push`] is the write-then-commit sequence used by `repo_commit`
//! and by `sdlc_orchestrate` when it writes artifacts.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::guard::{self, PathEscapeError};

#[cfg(test)]
use mockall::automock;

/// Errors that can occur during git operations.
#[derive(Error, Diagnostic, Debug)]
pub enum GitError {
    #[error("Git command failed: {0}")]
    #[diagnostic(code(spellbook::git::command_failed))]
    CommandFailed(String),

    #[error("Git command returned non-zero exit code {code}: {output}")]
    #[diagnostic(code(spellbook::git::non_zero_exit))]
    NonZeroExit { code: i32, output: String },

    #[error("Git not installed or not in PATH")]
    #[diagnostic(code(spellbook::git::not_found))]
    GitNotFound,
}

impl GitError {
    /// `git commit` with a clean tree.
    pub fn is_nothing_to_commit(&self) -> bool {
        match self {
            GitError::NonZeroExit { output, .. } => {
                output.contains("nothing to commit") || output.contains("no changes added")
            }
            _ => false,
        }
    }
}

/// Trait for git operations. Can be mocked in tests.
#[cfg_attr(test, automock)]
pub trait GitOps: Send + Sync {
    /// Whether `path` is inside a work tree.
    fn is_repo(&self, path: &Path) -> bool;

    /// Initialize a git repository at the given path.
    fn init(&self, path: &Path) -> Result<Output, GitError>;

    /// Create or reset `branch` and switch to it (`checkout -B`).
    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<Output, GitError>;

    /// Stage every change in the work tree.
    fn add_all(&self, path: &Path) -> Result<Output, GitError>;

    /// Create a commit with the given message.
    fn commit(&self, path: &Path, message: &str) -> Result<Output, GitError>;

    /// Get the URL of a remote.
    fn remote_get_url(&self, path: &Path, name: &str) -> Result<Output, GitError>;

    /// Push `branch` to `remote`, setting upstream.
    fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<Output, GitError>;

    /// Abbreviated hash of HEAD.
    fn short_head(&self, path: &Path) -> Result<Output, GitError>;
}

/// Real implementation of GitOps using std::process::Command.
#[derive(Clone, Copy, Default)]
pub struct RealGit;

impl RealGit {
    pub fn new() -> Self {
        Self
    }

    fn run_git(&self, path: &Path, args: &[&str]) -> Result<Output, GitError> {
        debug!(dir = %path.display(), ?args, "running git");
        Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::GitNotFound
                } else {
                    GitError::CommandFailed(e.to_string())
                }
            })
    }

    fn check_output(&self, output: Output) -> Result<Output, GitError> {
        if output.status.success() {
            return Ok(output);
        }
        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let combined = match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => format!("{stdout}\n{stderr}"),
            (false, true) => stdout,
            _ => stderr,
        };
        Err(GitError::NonZeroExit {
            code,
            output: combined,
        })
    }

    fn run_checked(&self, path: &Path, args: &[&str]) -> Result<Output, GitError> {
        let output = self.run_git(path, args)?;
        self.check_output(output)
    }
}

impl GitOps for RealGit {
    fn is_repo(&self, path: &Path) -> bool {
        self.run_checked(path, &["rev-parse", "--is-inside-work-tree"])
            .map(|out| String::from_utf8_lossy(&out.stdout).trim() == "true")
            .unwrap_or(false)
    }

    fn init(&self, path: &Path) -> Result<Output, GitError> {
        self.run_checked(path, &["init"])
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<Output, GitError> {
        self.run_checked(path, &["checkout", "-B", branch])
    }

    fn add_all(&self, path: &Path) -> Result<Output, GitError> {
        self.run_checked(path, &["add", "-A"])
    }

    fn commit(&self, path: &Path, message: &str) -> Result<Output, GitError> {
        self.run_checked(path, &["commit", "-m", message])
    }

    fn remote_get_url(&self, path: &Path, name: &str) -> Result<Output, GitError> {
        self.run_checked(path, &["remote", "get-url", name])
    }

    fn push(&self, path: &Path, remote: &str, branch: &str) -> Result<Output, GitError> {
        self.run_checked(path, &["push", "-u", remote, branch])
    }

    fn short_head(&self, path: &Path) -> Result<Output, GitError> {
        self.run_checked(path, &["rev-parse", "--short", "HEAD"])
    }
}

/// One file to write before committing, relative to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitOptions {
    pub branch: String,
    pub message: String,
    pub push: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            message: "auto commit".to_string(),
            push: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PushOutcome {
    /// Push was not requested.
    Skipped,
    NoRemote,
    Pushed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub repo: PathBuf,
    pub branch: String,
    pub files: Vec<String>,
    /// False when the tree had nothing to commit.
    pub committed: bool,
    pub push: PushOutcome,
}

/// Failures of [`commit_and_push`].
#[derive(Error, Diagnostic, Debug)]
pub enum CommitError {
    #[error(transparent)]
    #[diagnostic(code(spellbook::git::path_escape))]
    PathEscape(#[from] PathEscapeError),

    #[error("Failed to write {}: {source}", path.display())]
    #[diagnostic(code(spellbook::git::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(spellbook::git::command))]
    Git(#[from] GitError),
}

/// Write `files` into `repo` (each path guarded against escaping it).
pub fn write_files(repo: &Path, files: &[FileWrite]) -> Result<Vec<PathBuf>, CommitError> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let target = guard::resolve_under(repo, &file.path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CommitError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&target, &file.content).map_err(|source| CommitError::Write {
            path: target.clone(),
            source,
        })?;
        written.push(target);
    }
    Ok(written)
}

/// Write files, then init/branch/add/commit and optionally push.
///
/// A branch switch failure is logged and ignored, as is a commit on a clean
/// tree. Push runs only when requested and an `origin` remote exists; its
/// failure is reported in the outcome rather than returned as an error.
pub fn commit_and_push<G: GitOps + ?Sized>(
    git: &G,
    repo: &Path,
    files: &[FileWrite],
    options: &CommitOptions,
) -> Result<CommitReport, CommitError> {
    write_files(repo, files)?;

    if !git.is_repo(repo) {
        info!(repo = %repo.display(), "initializing git repository");
        git.init(repo)?;
    }

    if let Err(e) = git.checkout_branch(repo, &options.branch) {
        warn!(branch = %options.branch, error = %e, "branch checkout failed, committing on current branch");
    }

    git.add_all(repo)?;

    let committed = match git.commit(repo, &options.message) {
        Ok(_) => true,
        Err(e) if e.is_nothing_to_commit() => {
            debug!(repo = %repo.display(), "nothing to commit");
            false
        }
        Err(e) => return Err(e.into()),
    };

    let push = if !options.push {
        PushOutcome::Skipped
    } else if git.remote_get_url(repo, "origin").is_err() {
        PushOutcome::NoRemote
    } else {
        match git.push(repo, "origin", &options.branch) {
            Ok(_) => PushOutcome::Pushed,
            Err(e) => {
                warn!(error = %e, "push failed");
                PushOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    };

    Ok(CommitReport {
        repo: repo.to_path_buf(),
        branch: options.branch.clone(),
        files: files.iter().map(|f| f.path.clone()).collect(),
        committed,
        push,
    })
}

/// Per-repository mutual exclusion for write-and-commit sequences.
///
/// Two calls against the same repository directory run one after the other;
/// calls against different repositories do not contend.
#[derive(Debug, Default)]
pub struct RepoLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `repo`.
    pub fn with_lock<T>(&self, repo: &Path, f: impl FnOnce() -> T) -> T {
        let key = guard::normalize(repo);
        let lock = Arc::clone(self.locks.entry(key).or_default().value());
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}
