//! Crate-level error type.
//!
//! Startup, transport and runner failures surface here; per-call failures stay
//! in [`crate::tool::ToolError`] and [`crate::dispatch::DispatchError`] and are
//! answered on the wire instead. It uses miette for fancy diagnostic output in
//! the binaries.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::git::CommitError;
use crate::schema::ValidationErrors;
use crate::tool::ToolError;

#[derive(Error, Diagnostic, Debug)]
pub enum SpellbookError {
    #[error("Prompts root not found: {}", path.display())]
    #[diagnostic(
        code(spellbook::config::root_not_found),
        help("pass --root or set SPELLBOOK_ROOT to an existing directory")
    )]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging setup failed: {message}")]
    #[diagnostic(code(spellbook::logging::init))]
    Logging { message: String },

    #[error("Transport error: {0}")]
    #[diagnostic(code(spellbook::transport))]
    Transport(String),

    #[error("Invalid arguments: {0}")]
    #[diagnostic(code(spellbook::args::invalid))]
    InvalidArguments(#[from] ValidationErrors),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(spellbook::args::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(spellbook::tool))]
    Tool(#[from] ToolError),

    #[error(transparent)]
    #[diagnostic(code(spellbook::commit))]
    Commit(#[from] CommitError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(spellbook::io))]
    Io(#[from] std::io::Error),
}

/// Result type for startup and runner operations.
pub type Result<T> = std::result::Result<T, SpellbookError>;
