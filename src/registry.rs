//! Tool registry and tool-name normalization.
//!
//! The registry is an explicitly constructed, immutable value: build it once
//! with [`ToolRegistry::register`], then hand it to the dispatcher.

use std::sync::Arc;

use crate::schema::{Validator, compile};
use crate::tool::{ToolDescriptor, ToolHandler};

/// Legacy dotted names and their canonical forms.
const ALIASES: &[(&str, &str)] = &[
    ("prompt.read", "prompt_read"),
    ("prompt.list", "prompt_list"),
    ("prompt.commands", "prompt_commands"),
];

/// Map an inbound tool name to its canonical underscored form.
///
/// Known aliases are looked up first; any other dot becomes an underscore.
pub fn normalize_tool_name(raw: &str) -> String {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| raw.replace('.', "_"))
}

/// A registered tool: its descriptor, compiled validator and handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub validator: Validator,
    pub handler: Arc<dyn ToolHandler>,
}

/// Ordered, immutable set of tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler under its descriptor's name.
    ///
    /// Registering a name twice replaces the earlier handler in place, keeping
    /// its position.
    pub fn register(mut self, handler: impl ToolHandler + 'static) -> Self {
        let handler: Arc<dyn ToolHandler> = Arc::new(handler);
        let descriptor = handler.descriptor();
        let entry = RegisteredTool {
            validator: compile(&descriptor.input),
            descriptor,
            handler,
        };
        match self
            .tools
            .iter_mut()
            .find(|t| t.descriptor.name == entry.descriptor.name)
        {
            Some(existing) => *existing = entry,
            None => self.tools.push(entry),
        }
        self
    }

    /// Look up by canonical name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
