//! Tool-call dispatch.
//!
//! One call flows through: normalize name, look up the tool, validate the
//! arguments against its schema, run the handler, wrap any failure. The
//! dispatcher holds no per-call state, so concurrent calls are independent.

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::registry::{ToolRegistry, normalize_tool_name};
use crate::schema::FieldError;
use crate::tool::{Args, ToolCallResult, ToolContext, ToolDescriptor, ToolError};

/// An inbound call, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallRequest {
    pub raw_name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(raw_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            raw_name: raw_name.into(),
            arguments,
        }
    }
}

/// Failure category, mapped onto JSON-RPC error codes by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MethodNotFound,
    InvalidParams,
    Internal,
}

#[derive(Error, Diagnostic, Debug)]
pub enum DispatchError {
    #[error("Unknown tool: {name}")]
    #[diagnostic(code(spellbook::dispatch::unknown_tool))]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool {tool}: {}", format_errors(.errors))]
    #[diagnostic(code(spellbook::dispatch::invalid_arguments))]
    InvalidArguments {
        tool: String,
        errors: Vec<FieldError>,
    },

    #[error("Error executing tool {tool}: {source}")]
    #[diagnostic(code(spellbook::dispatch::handler))]
    Handler {
        tool: String,
        #[source]
        source: ToolError,
    },
}

fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownTool { .. } => ErrorKind::MethodNotFound,
            DispatchError::InvalidArguments { .. } => ErrorKind::InvalidParams,
            DispatchError::Handler { source, .. } if source.is_caller_error() => {
                ErrorKind::InvalidParams
            }
            DispatchError::Handler { .. } => ErrorKind::Internal,
        }
    }

    /// Name of the tool the failure is attributed to.
    pub fn tool(&self) -> &str {
        match self {
            DispatchError::UnknownTool { name } => name,
            DispatchError::InvalidArguments { tool, .. } | DispatchError::Handler { tool, .. } => {
                tool
            }
        }
    }

    /// Structured payload for the error envelope.
    pub fn data(&self) -> Value {
        match self {
            DispatchError::InvalidArguments { tool, errors } => serde_json::json!({
                "tool": tool,
                "errors": errors,
            }),
            DispatchError::Handler { tool, source } => serde_json::json!({
                "tool": tool,
                "error": source.to_string(),
            }),
            DispatchError::UnknownTool { name } => serde_json::json!({ "tool": name }),
        }
    }
}

/// Routes validated calls to registered handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ctx: Arc<ToolContext>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, ctx: ToolContext) -> Self {
        Self {
            registry: Arc::new(registry),
            ctx: Arc::new(ctx),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Tool catalog in registry order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors().cloned().collect()
    }

    pub async fn handle(&self, request: ToolCallRequest) -> Result<ToolCallResult, DispatchError> {
        let name = normalize_tool_name(&request.raw_name);
        let Some(tool) = self.registry.get(&name) else {
            warn!(tool = %request.raw_name, "unknown tool");
            return Err(DispatchError::UnknownTool {
                name: request.raw_name,
            });
        };

        let validated = tool
            .validator
            .validate(&Value::Object(request.arguments))
            .map_err(|errors| {
                warn!(tool = %name, %errors, "argument validation failed");
                DispatchError::InvalidArguments {
                    tool: name.clone(),
                    errors: errors.0,
                }
            })?;
        let args = match validated {
            Value::Object(map) => Args::new(map),
            _ => Args::default(),
        };

        debug!(tool = %name, "dispatching tool call");
        let handler = Arc::clone(&tool.handler);
        let ctx = Arc::clone(&self.ctx);
        let outcome = tokio::task::spawn_blocking(move || handler.call(&ctx, &args))
            .await
            .unwrap_or_else(|join_err| Err(ToolError::Failed(join_err.to_string())));

        match outcome {
            Ok(result) => {
                debug!(tool = %name, blocks = result.content.len(), "tool call succeeded");
                Ok(result)
            }
            Err(source) => {
                if source.is_caller_error() {
                    warn!(tool = %name, error = %source, "tool call rejected");
                } else {
                    error!(tool = %name, error = %source, "tool call failed");
                }
                Err(DispatchError::Handler { tool: name, source })
            }
        }
    }
}
