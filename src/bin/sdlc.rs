//! Standalone SDLC runner.
//!
//! Prints the orchestration plan for a goal, or with `--write` renders every
//! planned artifact into a fresh output directory.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::{Map, Value};
use spellbook::SpellbookError;
use spellbook::git::{self, RealGit, RepoLocks};
use spellbook::mcp::tools::{SdlcOrchestrate, artifact_files};
use spellbook::schema::compile;
use spellbook::tool::{Args, ToolContext, ToolError, ToolHandler};

const DEFAULT_OUT: &str = "__output_sample";

#[derive(Parser)]
#[command(name = "spellbook-sdlc")]
#[command(author, version, about = "Plan or render SDLC artifacts", long_about = None)]
struct Cli {
    /// Goal the plan is built for
    #[arg(long, default_value = "spellbook-mcp")]
    goal: String,

    /// Plan scope: feature, service or repo
    #[arg(long)]
    scope: Option<String>,

    /// Restrict to these phases (repeatable)
    #[arg(long = "phase")]
    phases: Vec<String>,

    /// Output directory for --write, relative to the root
    #[arg(long, default_value = DEFAULT_OUT)]
    out: String,

    /// Write artifacts instead of printing the plan
    #[arg(long)]
    write: bool,

    /// JSON object merged over the flags, e.g. '{"goal":"billing","scope":"service"}'
    #[arg(long)]
    args: Option<String>,

    /// Prompts root (defaults to the current directory)
    #[arg(long, env = "SPELLBOOK_ROOT")]
    root: Option<PathBuf>,
}

impl Cli {
    fn arguments(&self) -> Result<Map<String, Value>, SpellbookError> {
        let mut map = Map::new();
        map.insert("goal".into(), Value::String(self.goal.clone()));
        map.insert("out".into(), Value::String(self.out.clone()));
        map.insert("write".into(), Value::Bool(self.write));
        if let Some(scope) = &self.scope {
            map.insert("scope".into(), Value::String(scope.clone()));
        }
        if !self.phases.is_empty() {
            map.insert(
                "phases".into(),
                Value::Array(self.phases.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(raw) = &self.args {
            match serde_json::from_str::<Value>(raw)? {
                Value::Object(extra) => map.extend(extra),
                other => {
                    return Err(ToolError::InvalidArguments(format!(
                        "--args must be a JSON object, got {other}"
                    ))
                    .into());
                }
            }
        }
        Ok(map)
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let requested = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().map_err(SpellbookError::from)?,
    };
    let root = requested
        .canonicalize()
        .map_err(|source| SpellbookError::RootNotFound {
            path: requested.clone(),
            source,
        })?;
    let ctx = ToolContext::new(&root);
    let orchestrate = SdlcOrchestrate::new(Arc::new(RealGit::new()), Arc::new(RepoLocks::new()));

    let validated = compile(&orchestrate.descriptor().input)
        .validate(&Value::Object(cli.arguments()?))
        .map_err(SpellbookError::from)?;
    let args = match validated {
        Value::Object(map) => Args::new(map),
        _ => Args::default(),
    };
    let plan = orchestrate
        .plan(&args, &root)
        .map_err(SpellbookError::from)?;

    if !args.bool("write") {
        let json = serde_json::to_string_pretty(&plan).map_err(SpellbookError::from)?;
        println!("{json}");
        return Ok(());
    }

    let out = ctx
        .resolve(args.str_or("out", DEFAULT_OUT))
        .map_err(SpellbookError::from)?;
    if out == root {
        return Err(SpellbookError::from(ToolError::InvalidArguments(
            "out must name a directory below the root".into(),
        ))
        .into());
    }
    if out.exists() {
        std::fs::remove_dir_all(&out).map_err(SpellbookError::from)?;
    }
    let files = artifact_files(&ctx, &plan);
    let written = git::write_files(&out, &files).map_err(SpellbookError::from)?;
    for path in &written {
        println!("WROTE {}", path.display());
    }
    println!("\nAll artifacts written to {}", out.display());
    Ok(())
}
