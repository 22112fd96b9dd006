//! Spellbook: a prompt-library tool server speaking MCP over stdio.
//!
//! The core is a [`dispatch::Dispatcher`] over an immutable
//! [`registry::ToolRegistry`]; [`mcp`] binds it to the transport and
//! [`lifecycle`] handles shutdown.

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod git;
pub mod guard;
pub mod lifecycle;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod registry;
pub mod schema;
pub mod templates;
pub mod tool;


pub use error::{Result, SpellbookError};
