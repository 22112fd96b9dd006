//! Path containment checks.
//!
//! Every handler that touches the filesystem resolves its user-supplied path
//! through [`resolve_under`] so nothing outside the configured root is read or
//! written. The check is lexical: `.` and `..` segments are folded before the
//! comparison, symlinks are not followed.

use std::path::{Component, Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Rejection raised when a candidate path is not contained in its root.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum PathEscapeError {
    #[error("Path escapes base directory: {candidate} is outside {root}")]
    #[diagnostic(code(spellbook::guard::escape))]
    Escape { root: PathBuf, candidate: PathBuf },

    #[error("Path must be absolute: {0}")]
    #[diagnostic(code(spellbook::guard::not_absolute))]
    NotAbsolute(PathBuf),
}

/// Fold `.` and `..` segments without touching the filesystem.
///
/// A `..` at the filesystem root is dropped, matching how the OS resolves `/..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Succeeds when `candidate` is `root` itself or a descendant of it.
///
/// Both paths must already be absolute.
pub fn assert_inside(root: &Path, candidate: &Path) -> Result<(), PathEscapeError> {
    if !root.is_absolute() {
        return Err(PathEscapeError::NotAbsolute(root.to_path_buf()));
    }
    if !candidate.is_absolute() {
        return Err(PathEscapeError::NotAbsolute(candidate.to_path_buf()));
    }

    let root = normalize(root);
    let candidate = normalize(candidate);

    match candidate.strip_prefix(&root) {
        Ok(rel) if !rel.starts_with("..") => Ok(()),
        _ => Err(PathEscapeError::Escape { root, candidate }),
    }
}

/// Join `relative` onto `root`, normalize, and check containment.
///
/// An absolute `relative` replaces the root entirely (as [`Path::join`] does)
/// and is therefore only accepted when it already lies under `root`.
pub fn resolve_under(root: &Path, relative: impl AsRef<Path>) -> Result<PathBuf, PathEscapeError> {
    let candidate = normalize(&root.join(relative.as_ref()));
    assert_inside(root, &candidate)?;
    Ok(candidate)
}
