//! Tool registry and dispatch wrapper.
//!
//! Every tool execution goes through [`ToolRegistry::dispatch`], which
//! resolves the five outcomes a call can have before or after the body runs:
//! already aborted, unknown tool, invalid parameters, body error, success.
//! Nothing escapes dispatch as an `Err`; callers always get a [`ToolOutcome`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use lope_core::message::ToolSpec;

use crate::traits::{LopeTool, ToolContext, ToolOutcome};

/// Registry of available tools, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn LopeTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Registering a name twice replaces the earlier entry.
    pub fn register(&mut self, tool: Arc<dyn LopeTool>) {
        let name = tool.name().to_owned();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "replacing existing tool registration");
        } else {
            debug!(tool = %name, "registered tool");
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn LopeTool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Declarations for every registered tool, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Remove a tool by name.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn LopeTool>> {
        self.tools.remove(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name, mapping every failure mode to an outcome.
    ///
    /// The body is not invoked when the context is already cancelled, the
    /// name is unknown, or the arguments fail schema validation. On success
    /// the result's metadata is merged over whatever the body recorded on the
    /// context, result winning per key.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        if ctx.cancellation.is_cancelled() {
            debug!(tool = name, "skipping tool, run already cancelled");
            return ToolOutcome::new(format!("{name} aborted"), String::new())
                .with_metadata("aborted", Value::Bool(true));
        }

        let Some(tool) = self.get(name) else {
            warn!(tool = name, "unknown tool requested");
            return ToolOutcome::new("Tool not found", format!("Unknown tool: {name}"))
                .with_metadata("error", Value::Bool(true));
        };

        let violations = tool.parameters().validate(&args);
        if !violations.is_empty() {
            debug!(tool = name, count = violations.len(), "parameter validation failed");
            return ToolOutcome::new(
                "Invalid parameters",
                format!("Parameter validation failed:\n{}", violations.join("\n")),
            )
            .with_metadata("error", Value::Bool(true))
            .with_metadata(
                "validationErrors",
                Value::Array(violations.into_iter().map(Value::String).collect()),
            );
        }

        match tool.execute(args, ctx).await {
            Ok(outcome) => {
                let mut metadata = ctx.metadata_snapshot();
                metadata.extend(outcome.metadata);
                ToolOutcome {
                    title: outcome.title,
                    output: outcome.output,
                    metadata,
                }
            }
            Err(err) => {
                warn!(tool = name, error = %err, "tool execution failed");
                ToolOutcome::new(format!("{name} failed"), format!("Error: {err}"))
                    .with_metadata("error", Value::Bool(true))
                    .with_metadata("errorMessage", Value::String(err.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
