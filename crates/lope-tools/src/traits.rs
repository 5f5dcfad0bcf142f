//! Core tool trait and execution context.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use lope_core::ids::{SessionId, ToolCallId, TurnId};
use lope_core::message::ToolSpec;
use lope_core::schema::ParameterSchema;

use crate::errors::ToolError;

// ─────────────────────────────────────────────────────────────────────────────
// Execution context
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a tool can see about the run it executes in.
///
/// The context is cheap to clone; the metadata accumulator is shared between
/// clones so values recorded by a tool body are visible when the registry
/// assembles the final outcome.
#[derive(Clone)]
pub struct ToolContext {
    /// Session the invocation belongs to.
    pub session_id: SessionId,
    /// Turn the invocation belongs to.
    pub turn_id: TurnId,
    /// Name of the agent driving the run.
    pub agent_name: String,
    /// Provider-assigned call ID for this invocation.
    pub tool_call_id: ToolCallId,
    /// Cooperative cancellation for the whole run.
    pub cancellation: CancellationToken,
    /// Opaque handle to the hosting runtime. Not interpreted here; tools that
    /// know the concrete type may downcast it.
    pub runtime: Option<Arc<dyn Any + Send + Sync>>,
    metadata: Arc<Mutex<Map<String, Value>>>,
}

impl ToolContext {
    /// Create a context for one invocation.
    pub fn new(
        session_id: SessionId,
        turn_id: TurnId,
        agent_name: impl Into<String>,
        tool_call_id: ToolCallId,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            turn_id,
            agent_name: agent_name.into(),
            tool_call_id,
            cancellation,
            runtime: None,
            metadata: Arc::new(Mutex::new(Map::new())),
        }
    }

    /// Attach an opaque runtime handle.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn Any + Send + Sync>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Record a metadata value. Last write wins per key.
    pub fn record_metadata(&self, key: impl Into<String>, value: Value) {
        let _ = self.metadata.lock().insert(key.into(), value);
    }

    /// Snapshot of everything recorded so far.
    pub fn metadata_snapshot(&self) -> Map<String, Value> {
        self.metadata.lock().clone()
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("turn_id", &self.turn_id)
            .field("agent_name", &self.agent_name)
            .field("tool_call_id", &self.tool_call_id)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// What a tool execution produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolOutcome {
    /// Short human-readable summary line.
    pub title: String,
    /// Full output text handed back to the model.
    pub output: String,
    /// Structured metadata about the execution.
    pub metadata: Map<String, Value>,
}

impl ToolOutcome {
    /// An outcome with empty metadata.
    pub fn new(title: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            output: output.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata value.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        let _ = self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the metadata marks this outcome as an error.
    pub fn is_error(&self) -> bool {
        self.metadata
            .get("error")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────────────────────────────────────

/// A capability the agent can invoke.
#[async_trait]
pub trait LopeTool: Send + Sync {
    /// Unique tool name, as announced to the model.
    fn name(&self) -> &str;

    /// What the tool does, as announced to the model.
    fn description(&self) -> &str;

    /// Schema the arguments are validated against before execution.
    fn parameters(&self) -> ParameterSchema;

    /// The full declaration handed to providers.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameters(),
        }
    }

    /// Run the tool. Arguments have already passed schema validation.
    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError>;
}
