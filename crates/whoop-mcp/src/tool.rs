//! Tool trait, argument access and the tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::{McpError, Result};
use crate::protocol::{CallToolResult, ToolInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A callable MCP tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used in `tools/call`.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Run the tool. Failures the caller should see are returned as
    /// `CallToolResult::error`; an `Err` is reserved for bad arguments.
    async fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> Result<CallToolResult>;

    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-call execution context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Fires when the client cancels the request or the server shuts down.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// The `arguments` object of a `tools/call` request.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    /// Accepts an object, `null` or nothing at all.
    pub fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self(map)),
            Some(other) => Err(McpError::invalid_params(format!(
                "arguments must be an object, got {}",
                type_name(&other)
            ))),
        }
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// A string argument; an empty string counts as absent.
    pub fn optional_str(&self, key: &str) -> Result<Option<String>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(McpError::invalid_params(format!(
                "{} must be a string, got {}",
                key,
                type_name(other)
            ))),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<String> {
        self.optional_str(key)?
            .ok_or_else(|| McpError::invalid_params(format!("{} is required", key)))
    }

    /// An integer argument. Fractional numbers are truncated.
    pub fn optional_int(&self, key: &str) -> Result<Option<i64>> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Some)
                .ok_or_else(|| McpError::invalid_params(format!("{} is out of range", key))),
            Some(other) => Err(McpError::invalid_params(format!(
                "{} must be a number, got {}",
                key,
                type_name(other)
            ))),
        }
    }

    pub fn required_int(&self, key: &str) -> Result<i64> {
        self.optional_int(key)?
            .ok_or_else(|| McpError::invalid_params(format!("{} is required", key)))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of tools available to MCP clients.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "replaced existing tool registration");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions sorted by name.
    pub fn definitions(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self.tools.values().map(|t| t.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Call a tool by name.
    ///
    /// Unknown tools and a non-object `arguments` are protocol errors.
    /// Argument validation failures become error results so the model can
    /// correct the call.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
        ctx: &ToolContext,
    ) -> Result<CallToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
        let args = ToolArgs::from_value(arguments)?;

        tracing::debug!(tool = %name, "executing tool");
        match tool.execute(args, ctx).await {
            Ok(result) => {
                if result.is_error {
                    tracing::warn!(tool = %name, error = %result.as_text(), "tool returned error");
                }
                Ok(result)
            }
            Err(McpError::InvalidParams(msg)) => {
                tracing::debug!(tool = %name, error = %msg, "invalid tool arguments");
                Ok(CallToolResult::error(msg))
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
