//! Server configuration: command-line flags backed by environment variables.

use std::path::PathBuf;

use clap::Parser;

use crate::error::SpellbookError;
use crate::logging::LogConfig;

/// Spellbook MCP tool server (stdio transport).
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "spellbook-mcp")]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Prompts root (defaults to the current directory)
    #[arg(long, env = "SPELLBOOK_ROOT")]
    pub root: Option<PathBuf>,

    /// Log directory (defaults to <root>/logs)
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Mirror logs to stderr (also enabled by LOG_MCP=1|true|yes|on)
    #[arg(short, long)]
    pub verbose: bool,

    /// Rotated log files to keep
    #[arg(long, env = "LOG_ROTATE_BACKUPS", default_value_t = 3)]
    pub log_backups: usize,
}

/// Resolved startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub root: PathBuf,
    pub logging: LogConfig,
}

/// `1`, `true`, `yes` and `on` enable a toggle; anything else disables it.
pub fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| is_truthy(&v))
}

impl ServerConfig {
    /// Canonicalize the root and fill in defaults.
    pub fn resolve(self) -> Result<Settings, SpellbookError> {
        let requested = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let root = requested
            .canonicalize()
            .map_err(|source| SpellbookError::RootNotFound {
                path: requested.clone(),
                source,
            })?;
        let dir = self.log_dir.unwrap_or_else(|| root.join("logs"));
        Ok(Settings {
            logging: LogConfig {
                dir,
                verbose: self.verbose || env_flag("LOG_MCP"),
                backups: self.log_backups,
            },
            root,
        })
    }
}
