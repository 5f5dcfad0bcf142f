//! Parts: the typed segments that make up a turn.
//!
//! Assistant output arrives as an ordered sequence of parts: streamed text,
//! streamed reasoning, tool invocations, and step boundary markers. Parts are
//! created when the first corresponding stream event arrives and mutated in
//! place as later events accumulate onto them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::ids::{PartId, ToolCallId};
use crate::usage::{Cost, FinishReason, TokenUsage};

// ─────────────────────────────────────────────────────────────────────────────
// Tool invocation state
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a tool invocation.
///
/// Transitions are strictly forward: `Pending` → `Running` → `Completed` or
/// `Failed`. Terminal states never transition again; an invalid transition is
/// ignored with a debug log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ToolInvocationState {
    /// Announced by the provider; arguments may still be streaming in.
    #[serde(rename_all = "camelCase")]
    Pending {
        /// Parsed arguments (empty until finalized).
        input: Map<String, Value>,
        /// Raw buffered argument text as streamed.
        raw_arguments: String,
    },
    /// Execution has begun.
    #[serde(rename_all = "camelCase")]
    Running {
        /// Parsed arguments.
        input: Map<String, Value>,
        /// Short human-readable description of the call.
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Execution start time.
        started_at: DateTime<Utc>,
    },
    /// Execution finished successfully.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Parsed arguments.
        input: Map<String, Value>,
        /// Tool output text.
        output: String,
        /// Short human-readable description of the result.
        title: String,
        /// Structured result metadata.
        metadata: Map<String, Value>,
        /// Execution start time.
        started_at: DateTime<Utc>,
        /// Execution end time.
        ended_at: DateTime<Utc>,
    },
    /// Execution finished with an error.
    #[serde(rename_all = "camelCase")]
    Failed {
        /// Parsed arguments.
        input: Map<String, Value>,
        /// Error description.
        error: String,
        /// Execution start time.
        started_at: DateTime<Utc>,
        /// Execution end time.
        ended_at: DateTime<Utc>,
    },
}

impl ToolInvocationState {
    /// Returns `true` for `Completed` or `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    /// Returns `true` for `Pending`.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Returns `true` for `Running`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Part
// ─────────────────────────────────────────────────────────────────────────────

/// One typed segment of a turn (discriminated by `type`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Part {
    /// Streamed assistant text.
    #[serde(rename_all = "camelCase")]
    Text {
        /// Part ID.
        id: PartId,
        /// Accumulated text so far.
        content: String,
        /// When the first delta arrived.
        started_at: DateTime<Utc>,
        /// When streaming of this part finished; `None` while streaming.
        #[serde(skip_serializing_if = "Option::is_none")]
        ended_at: Option<DateTime<Utc>>,
    },
    /// Streamed reasoning (model thinking).
    #[serde(rename_all = "camelCase")]
    Reasoning {
        /// Part ID.
        id: PartId,
        /// Accumulated reasoning text so far.
        content: String,
        /// When the first delta arrived.
        started_at: DateTime<Utc>,
        /// When streaming of this part finished; `None` while streaming.
        #[serde(skip_serializing_if = "Option::is_none")]
        ended_at: Option<DateTime<Utc>>,
    },
    /// One tool invocation and its lifecycle.
    #[serde(rename_all = "camelCase")]
    ToolInvocation {
        /// Part ID.
        id: PartId,
        /// Provider-assigned call ID, unique within the turn.
        tool_call_id: ToolCallId,
        /// Tool name.
        tool_name: String,
        /// Current lifecycle state.
        state: ToolInvocationState,
    },
    /// Marks the start of one orchestrator step.
    #[serde(rename_all = "camelCase")]
    StepStart {
        /// Part ID.
        id: PartId,
    },
    /// Marks the end of one orchestrator step.
    #[serde(rename_all = "camelCase")]
    StepFinish {
        /// Part ID.
        id: PartId,
        /// Finish reason the provider reported for this step.
        finish_reason: FinishReason,
        /// Usage for this step.
        usage: TokenUsage,
        /// Cost for this step (zero placeholder).
        cost: Cost,
    },
}

impl Part {
    /// Create a text part seeded with an initial delta.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            id: PartId::new(),
            content: content.into(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Create a reasoning part seeded with an initial delta.
    #[must_use]
    pub fn reasoning(content: impl Into<String>) -> Self {
        Self::Reasoning {
            id: PartId::new(),
            content: content.into(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Create a pending tool invocation part.
    #[must_use]
    pub fn tool_invocation(tool_call_id: ToolCallId, tool_name: impl Into<String>) -> Self {
        Self::ToolInvocation {
            id: PartId::new(),
            tool_call_id,
            tool_name: tool_name.into(),
            state: ToolInvocationState::Pending {
                input: Map::new(),
                raw_arguments: String::new(),
            },
        }
    }

    /// Create a step-start marker.
    #[must_use]
    pub fn step_start() -> Self {
        Self::StepStart { id: PartId::new() }
    }

    /// Create a step-finish marker.
    #[must_use]
    pub fn step_finish(finish_reason: FinishReason, usage: TokenUsage) -> Self {
        Self::StepFinish {
            id: PartId::new(),
            finish_reason,
            usage,
            cost: Cost::default(),
        }
    }

    /// The part's ID.
    #[must_use]
    pub fn id(&self) -> &PartId {
        match self {
            Self::Text { id, .. }
            | Self::Reasoning { id, .. }
            | Self::ToolInvocation { id, .. }
            | Self::StepStart { id }
            | Self::StepFinish { id, .. } => id,
        }
    }

    /// Returns `true` for a tool invocation part.
    #[must_use]
    pub fn is_tool_invocation(&self) -> bool {
        matches!(self, Self::ToolInvocation { .. })
    }

    /// Accumulated text content, for text and reasoning parts.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content, .. } | Self::Reasoning { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Replace the accumulated content of a text or reasoning part.
    pub fn set_content(&mut self, new_content: impl Into<String>) {
        match self {
            Self::Text { content, .. } | Self::Reasoning { content, .. } => {
                *content = new_content.into();
            }
            _ => debug!(part_id = %self.id(), "set_content on non-streaming part ignored"),
        }
    }

    /// Mark a text or reasoning part as finished streaming.
    pub fn end_streaming(&mut self) {
        match self {
            Self::Text { ended_at, .. } | Self::Reasoning { ended_at, .. } => {
                if ended_at.is_none() {
                    *ended_at = Some(Utc::now());
                }
            }
            _ => {}
        }
    }

    /// Record the buffered raw argument text on a pending invocation.
    ///
    /// Ignored (with a debug log) unless the current state is `Pending`.
    pub fn set_raw_arguments(&mut self, raw: impl Into<String>) {
        if let Self::ToolInvocation {
            state: ToolInvocationState::Pending { raw_arguments, .. },
            ..
        } = self
        {
            *raw_arguments = raw.into();
        } else {
            debug!(part_id = %self.id(), "set_raw_arguments on non-pending part ignored");
        }
    }

    /// Transition a pending tool invocation to `Running`.
    ///
    /// Ignored (with a debug log) unless the current state is `Pending`.
    pub fn start_tool(&mut self, input: Map<String, Value>, title: Option<String>) {
        let Self::ToolInvocation { state, .. } = self else {
            debug!(part_id = %self.id(), "start_tool on non-invocation part ignored");
            return;
        };
        if state.is_pending() {
            *state = ToolInvocationState::Running {
                input,
                title,
                started_at: Utc::now(),
            };
        } else {
            debug!(?state, "start_tool from non-pending state ignored");
        }
    }

    /// Transition a running tool invocation to `Completed`.
    ///
    /// Ignored (with a debug log) unless the current state is `Running`.
    pub fn complete_tool(
        &mut self,
        output: impl Into<String>,
        title: impl Into<String>,
        metadata: Map<String, Value>,
    ) {
        let Self::ToolInvocation { state, .. } = self else {
            debug!(part_id = %self.id(), "complete_tool on non-invocation part ignored");
            return;
        };
        if let ToolInvocationState::Running {
            input, started_at, ..
        } = state
        {
            *state = ToolInvocationState::Completed {
                input: std::mem::take(input),
                output: output.into(),
                title: title.into(),
                metadata,
                started_at: *started_at,
                ended_at: Utc::now(),
            };
        } else {
            debug!(?state, "complete_tool from non-running state ignored");
        }
    }

    /// Transition a running tool invocation to `Failed`.
    ///
    /// Ignored (with a debug log) unless the current state is `Running`.
    pub fn fail_tool(&mut self, error: impl Into<String>) {
        let Self::ToolInvocation { state, .. } = self else {
            debug!(part_id = %self.id(), "fail_tool on non-invocation part ignored");
            return;
        };
        if let ToolInvocationState::Running {
            input, started_at, ..
        } = state
        {
            *state = ToolInvocationState::Failed {
                input: std::mem::take(input),
                error: error.into(),
                started_at: *started_at,
                ended_at: Utc::now(),
            };
        } else {
            debug!(?state, "fail_tool from non-running state ignored");
        }
    }
}
