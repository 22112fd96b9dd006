//! Spellbook MCP server binary.
//!
//! Wires the real git collaborator into the tool registry, installs logging
//! and signal handling, then serves MCP on stdin/stdout.

use std::sync::Arc;

use clap::Parser;
use spellbook::config::ServerConfig;
use spellbook::dispatch::Dispatcher;
use spellbook::git::RealGit;
use spellbook::lifecycle::{self, Shutdown};
use spellbook::logging;
use spellbook::mcp::{self, McpServer, tools::default_registry};
use spellbook::tool::ToolContext;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let settings = ServerConfig::parse().resolve()?;
    let guards = logging::init(&settings.logging);
    info!(
        root = %settings.root.display(),
        log_dir = %settings.logging.dir.display(),
        "starting spellbook-mcp"
    );

    let registry = default_registry(Arc::new(RealGit::new()));
    let dispatcher = Dispatcher::new(registry, ToolContext::new(&settings.root));

    // The stdin reader parks a blocking thread that a runtime drop would wait
    // on forever, so shutdown exits the process directly.
    let ct = CancellationToken::new();
    let shutdown = Arc::new(Shutdown::with_exit(
        ct.clone(),
        lifecycle::exit_releasing(guards),
    ));
    lifecycle::install_signal_handlers(shutdown.clone())
        .map_err(spellbook::SpellbookError::from)?;

    mcp::serve_stdio(McpServer::new(dispatcher), ct).await?;
    shutdown.transport_closed().await;
    Ok(())
}
