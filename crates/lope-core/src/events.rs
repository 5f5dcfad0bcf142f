//! The canonical stream event set.
//!
//! Every provider adapter normalizes its vendor wire format into these six
//! events; the orchestrator consumes only this set and stays
//! provider-agnostic.

use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;
use crate::usage::{FinishReason, TokenUsage};

/// One canonical event from a provider stream (discriminated by `type`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// An increment of assistant text.
    #[serde(rename_all = "camelCase")]
    TextDelta {
        /// The text increment.
        delta: String,
    },
    /// An increment of reasoning (thinking) text.
    #[serde(rename_all = "camelCase")]
    ReasoningDelta {
        /// The reasoning increment.
        delta: String,
    },
    /// The provider announced a tool call.
    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        /// Provider-assigned call ID.
        tool_call_id: ToolCallId,
        /// Tool name.
        name: String,
    },
    /// An increment of a tool call's JSON argument text.
    #[serde(rename_all = "camelCase")]
    ToolCallDelta {
        /// Call this increment belongs to.
        tool_call_id: ToolCallId,
        /// The argument text increment.
        arguments_delta: String,
    },
    /// The stream finished.
    #[serde(rename_all = "camelCase")]
    Finish {
        /// Why generation stopped.
        reason: FinishReason,
        /// Usage for the step, when reported.
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
    },
    /// The stream failed.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Error description.
        error: String,
    },
}

impl StreamEvent {
    /// Returns `true` for the terminal `Finish` event.
    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }
}
