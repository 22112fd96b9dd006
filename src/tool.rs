//! Handler-facing types: the [`ToolHandler`] capability, the per-server
//! [`ToolContext`], validated [`Args`], and the result/error values a handler
//! produces.

use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::git::{CommitError, GitError};
use crate::guard::{self, PathEscapeError};
use crate::schema::SchemaNode;

/// Static description of one tool, as advertised in `tools/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input: SchemaNode,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input: SchemaNode) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input,
        }
    }
}

/// One tool implementation.
///
/// Handlers are synchronous; the dispatcher runs them on the blocking pool, so
/// they are free to do file I/O and spawn `git`.
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// `args` has already passed schema validation and carries defaults.
    fn call(&self, ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError>;
}

/// Errors a handler can raise.
#[derive(Error, Diagnostic, Debug)]
pub enum ToolError {
    #[error("{0}")]
    #[diagnostic(code(spellbook::tool::invalid_arguments))]
    InvalidArguments(String),

    #[error(transparent)]
    #[diagnostic(code(spellbook::tool::path_escape))]
    PathEscape(#[from] PathEscapeError),

    #[error("File not found: {}", path.display())]
    #[diagnostic(code(spellbook::tool::not_found))]
    NotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    #[diagnostic(code(spellbook::tool::io))]
    Io(#[from] io::Error),

    #[error(transparent)]
    #[diagnostic(code(spellbook::tool::git))]
    Git(#[from] GitError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(spellbook::tool::serialization))]
    Serialization(String),

    #[error("{0}")]
    #[diagnostic(code(spellbook::tool::failed))]
    Failed(String),
}

impl ToolError {
    /// Whether the caller, rather than the server, is at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ToolError::InvalidArguments(_) | ToolError::PathEscape(_) | ToolError::NotFound { .. }
        )
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Serialization(e.to_string())
    }
}

impl From<CommitError> for ToolError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::PathEscape(e) => ToolError::PathEscape(e),
            CommitError::Write { path, source } => ToolError::Io(io::Error::new(
                source.kind(),
                format!("{}: {source}", path.display()),
            )),
            CommitError::Git(e) => ToolError::Git(e),
        }
    }
}

impl From<serde_yaml::Error> for ToolError {
    fn from(e: serde_yaml::Error) -> Self {
        ToolError::Serialization(e.to_string())
    }
}

/// Read-only state shared by every call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    root: PathBuf,
}

impl ToolContext {
    /// `root` must be absolute; the server canonicalizes it at startup.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied relative path under the root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf, ToolError> {
        Ok(guard::resolve_under(&self.root, relative)?)
    }

    /// Read a UTF-8 file under the root; a missing file is [`ToolError::NotFound`].
    pub fn read_text(&self, relative: impl AsRef<Path>) -> Result<String, ToolError> {
        let path = self.resolve(relative)?;
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ToolError::NotFound { path },
            _ => ToolError::Io(e),
        })
    }
}

/// Validated tool arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Map<String, Value>);

impl Args {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A string that must be present and non-blank.
    pub fn required_str(&self, name: &str) -> Result<&str, ToolError> {
        match self.str(name) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(ToolError::InvalidArguments(format!("{name} is required"))),
        }
    }

    /// A string with a fallback for absent or blank values.
    pub fn str_or<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.str(name).filter(|s| !s.is_empty()).unwrap_or(fallback)
    }

    pub fn bool(&self, name: &str) -> bool {
        self.0.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String elements of an array argument; absent means `None`.
    pub fn str_list(&self, name: &str) -> Option<Vec<String>> {
        self.0.get(name).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    /// Deserialize one argument, e.g. a string into an enum.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T, ToolError> {
        let value = self.0.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| ToolError::InvalidArguments(format!("{name}: {e}")))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Args {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentBlock {
    pub kind: ContentKind,
    pub text: String,
}

/// Successful tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: ContentKind::Text,
                text: text.into(),
            }],
        }
    }

    /// Pretty-printed JSON content.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        Ok(Self {
            content: vec![ContentBlock {
                kind: ContentKind::Json,
                text: serde_json::to_string_pretty(value)?,
            }],
        })
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_text_maps_missing_file_to_not_found() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path());

        let err = ctx.read_text("nope.md").unwrap_err();

        assert!(matches!(err, ToolError::NotFound { .. }));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_read_text_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path());

        let err = ctx.read_text("../outside.md").unwrap_err();

        assert!(matches!(err, ToolError::PathEscape(_)));
        assert!(err.to_string().contains("escapes base directory"));
    }

    #[test]
    fn test_args_accessors() {
        let args = Args::new(
            json!({"goal": "  ", "name": "svc", "write": true, "phases": ["a", 1, "b"]})
                .as_object()
                .unwrap()
                .clone(),
        );

        assert!(args.required_str("goal").is_err());
        assert_eq!(args.required_str("name").unwrap(), "svc");
        assert_eq!(args.str_or("missing", "dflt"), "dflt");
        assert!(args.bool("write"));
        assert!(!args.bool("push"));
        assert_eq!(args.str_list("phases").unwrap(), vec!["a", "b"]);
        assert!(args.str_list("none").is_none());
        assert_eq!(args.parse::<String>("name").unwrap(), "svc");
        assert!(matches!(
            args.parse::<bool>("name"),
            Err(ToolError::InvalidArguments(msg)) if msg.starts_with("name:")
        ));
    }

    #[test]
    fn test_json_result_is_pretty_json_block() {
        let result = ToolCallResult::json(&json!({"ok": true})).unwrap();
        assert_eq!(result.content[0].kind, ContentKind::Json);
        assert_eq!(result.joined_text(), "{\n  \"ok\": true\n}");
    }
}
