//! Model Context Protocol (MCP) server implementation
//!
//! This module exposes the tool registry over the stdio transport.
//!
//! - **server**: rmcp `ServerHandler` backed by the dispatcher
//! - **tools**: one handler per tool, grouped by concern (prompts, generators,
//!   quality, sdlc, repo)

pub mod server;
pub mod tools;


use rmcp::{ServiceExt, transport::stdio};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SpellbookError;

pub use server::McpServer;

/// Serve `server` on stdin/stdout until the client disconnects or `ct` is
/// cancelled.
pub async fn serve_stdio(server: McpServer, ct: CancellationToken) -> Result<(), SpellbookError> {
    let service = server
        .serve_with_ct(stdio(), ct)
        .await
        .map_err(|e| SpellbookError::Transport(e.to_string()))?;
    info!("MCP server started: {} v{}", server::SERVER_NAME, env!("CARGO_PKG_VERSION"));
    let reason = service
        .waiting()
        .await
        .map_err(|e| SpellbookError::Transport(e.to_string()))?;
    info!(?reason, "MCP transport closed");
    Ok(())
}
