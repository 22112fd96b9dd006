//! Quality tools: repository due-diligence scan and log-driven RCA.

use std::path::Path;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::schema::SchemaNode;
use crate::templates::{self, DueChecks, DueReport};
use crate::tool::{Args, ToolCallResult, ToolContext, ToolDescriptor, ToolError, ToolHandler};

const TEST_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

fn is_test_file(name: &str) -> bool {
    if name.ends_with("_test.rs") || (name.starts_with("test_") && name.ends_with(".py")) {
        return true;
    }
    let mut parts = name.rsplitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ext), Some(kind), Some(stem)) => {
            !stem.is_empty() && matches!(kind, "test" | "spec") && TEST_EXTENSIONS.contains(&ext)
        }
        _ => false,
    }
}

/// Walk `dir` (hidden entries included, `.git` skipped) and record which
/// project hygiene files exist.
pub fn scan_due(dir: &Path) -> DueChecks {
    let mut checks = DueChecks::default();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .filter_entry(|entry| entry.file_name() != ".git")
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
        let name = entry.file_name().to_string_lossy();
        checks.tests_present |= is_test_file(&name);
        checks.readme_present |= name == "README.md";
        checks.changelog_present |= name == "CHANGELOG.md";
        checks.github_meta |= entry
            .path()
            .strip_prefix(dir)
            .is_ok_and(|rel| rel.components().any(|c| c.as_os_str() == ".github"));
    }
    checks
}

/// `due_check`: tests, README, CHANGELOG and `.github` presence.
pub struct DueCheck;

impl ToolHandler for DueCheck {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "due_check",
            "Due-diligence scan of a folder: tests, README, CHANGELOG and .github metadata.",
            SchemaNode::object()
                .property("path", SchemaNode::string().with_default(".".into()))
                .property("strict", SchemaNode::boolean().with_default(false.into()))
                .property(
                    "format",
                    SchemaNode::string_enum(["md", "json"]).with_default("md".into()),
                ),
        )
    }

    fn call(&self, ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let dir = ctx.resolve(args.str_or("path", "."))?;
        if !dir.is_dir() {
            return Err(ToolError::NotFound { path: dir });
        }
        let checks = scan_due(&dir);
        debug!(path = %dir.display(), ?checks, "due check complete");
        let report = DueReport::new(dir.display().to_string(), checks, args.bool("strict"));
        match args.str_or("format", "md") {
            "json" => ToolCallResult::json(&report),
            _ => Ok(ToolCallResult::text(report.to_markdown())),
        }
    }
}

/// `rca_analyze`: summarize a log excerpt into an RCA skeleton.
pub struct RcaAnalyze;

impl ToolHandler for RcaAnalyze {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "rca_analyze",
            "Root-cause analysis from a log excerpt: summary counts plus a 5-whys skeleton.",
            SchemaNode::object()
                .required_property("log", SchemaNode::string().describe("Raw log text"))
                .property("service", SchemaNode::string()),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let log = args.required_str("log")?;
        Ok(ToolCallResult::text(templates::rca(log, args.str("service"))))
    }
}
