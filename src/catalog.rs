//! Prompt metadata catalog.
//!
//! A root may carry a `catalog.json` describing its prompts:
//!
//! ```json
//! { "prompts": [ { "path": "prompts/v0.3.0/1_requirements_planning.md",
//!                  "title": "Requirements", "phase": "requirements",
//!                  "tags": ["plan"] } ] }
//! ```
//!
//! When it is absent, listing falls back to scanning the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const CATALOG_FILE: &str = "catalog.json";

#[derive(Error, Diagnostic, Debug)]
pub enum CatalogError {
    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(spellbook::catalog::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed catalog {}: {source}", path.display())]
    #[diagnostic(
        code(spellbook::catalog::malformed),
        help("catalog.json must be an object with a `prompts` array")
    )]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub prompts: Vec<CatalogEntry>,
}

/// Listing filters shared by the catalog and the directory scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFilter {
    pub base: String,
    pub phase: Option<String>,
    pub tag: Option<String>,
}

impl Catalog {
    /// Load `root/catalog.json`; `Ok(None)` when there is no such file.
    pub fn load(root: &Path) -> Result<Option<Self>, CatalogError> {
        let path = root.join(CATALOG_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CatalogError::Read { path, source }),
        };
        let catalog: Catalog =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Malformed {
                path: path.clone(),
                source,
            })?;
        debug!(entries = catalog.prompts.len(), "loaded prompt catalog");
        Ok(Some(catalog))
    }

    /// Entries under `filter.base` matching the phase and tag, in catalog order.
    pub fn filter<'a>(&'a self, filter: &'a PromptFilter) -> impl Iterator<Item = &'a CatalogEntry> {
        let base = base_prefix(&filter.base);
        self.prompts.iter().filter(move |entry| {
            let under_base = base
                .as_deref()
                .is_none_or(|b| entry.path == b || entry.path.starts_with(&format!("{b}/")));
            let phase_ok = filter
                .phase
                .as_deref()
                .is_none_or(|p| entry.phase.as_deref().is_some_and(|ep| ep.eq_ignore_ascii_case(p)));
            let tag_ok = filter
                .tag
                .as_deref()
                .is_none_or(|t| entry.tags.iter().any(|et| et.eq_ignore_ascii_case(t)));
            under_base && phase_ok && tag_ok
        })
    }
}

/// `"."`, `""` and `"./"` mean the whole root.
fn base_prefix(base: &str) -> Option<String> {
    let trimmed = base.trim_start_matches("./").trim_end_matches('/');
    match trimmed {
        "" | "." => None,
        other => Some(other.to_string()),
    }
}

/// Markdown files under `dir`, as `/`-separated paths relative to `dir`, sorted.
///
/// Hidden entries are skipped. Without a catalog the phase and tag filters
/// match as case-insensitive substrings of the relative path.
pub fn scan_markdown(dir: &Path, filter: &PromptFilter) -> Vec<String> {
    let mut found = Vec::new();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .build();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if matches_substring(&relative, filter.phase.as_deref())
            && matches_substring(&relative, filter.tag.as_deref())
        {
            found.push(relative);
        }
    }
    found.sort();
    found
}

fn matches_substring(path: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| path.to_lowercase().contains(&n.to_lowercase()))
}
