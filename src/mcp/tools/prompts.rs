//! Prompt library tools: read, list and the slash-command index.

use tracing::debug;

use crate::catalog::{self, Catalog, PromptFilter};
use crate::schema::SchemaNode;
use crate::tool::{Args, ToolCallResult, ToolContext, ToolDescriptor, ToolError, ToolHandler};

pub const COMMANDS_FILE: &str = "COMMANDS.md";

/// `prompt_read`: one prompt file under the root.
pub struct PromptRead;

impl ToolHandler for PromptRead {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "prompt_read",
            "Read a prompt template by relative path (e.g., prompts/v0.3.0/1_requirements_planning.md).",
            SchemaNode::object().required_property(
                "file",
                SchemaNode::string().describe("Path relative to the prompts root"),
            ),
        )
    }

    fn call(&self, ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let file = args.required_str("file")?;
        ctx.read_text(file).map(ToolCallResult::text)
    }
}

/// `prompt_list`: markdown prompts under a base folder.
pub struct PromptList;

impl ToolHandler for PromptList {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "prompt_list",
            "List available prompt templates (markdown) under a base folder, optionally filtered by phase or tag.",
            SchemaNode::object()
                .property("base", SchemaNode::string().with_default(".".into()))
                .property(
                    "phase",
                    SchemaNode::string().describe("Only prompts for this SDLC phase"),
                )
                .property("tag", SchemaNode::string().describe("Only prompts with this tag")),
        )
    }

    fn call(&self, ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let filter = PromptFilter {
            base: args.str_or("base", ".").to_string(),
            phase: args.str("phase").map(str::to_string),
            tag: args.str("tag").map(str::to_string),
        };
        let dir = ctx.resolve(&filter.base)?;

        let catalog = Catalog::load(ctx.root()).map_err(|e| ToolError::Failed(e.to_string()))?;
        let paths: Vec<String> = match catalog {
            Some(catalog) => {
                debug!(base = %filter.base, "listing prompts from catalog");
                catalog.filter(&filter).map(|e| e.path.clone()).collect()
            }
            None => {
                if !dir.is_dir() {
                    return Err(ToolError::NotFound { path: dir });
                }
                catalog::scan_markdown(&dir, &filter)
            }
        };
        Ok(ToolCallResult::text(paths.join("\n")))
    }
}

/// `prompt_commands`: the `COMMANDS.md` index.
pub struct PromptCommands;

impl ToolHandler for PromptCommands {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "prompt_commands",
            "List slash-style commands for quick prompting.",
            SchemaNode::object(),
        )
    }

    fn call(&self, ctx: &ToolContext, _args: &Args) -> Result<ToolCallResult, ToolError> {
        ctx.read_text(COMMANDS_FILE).map(ToolCallResult::text)
    }
}
