//! Provider-neutral chat messages and tool declarations.
//!
//! The orchestrator renders session history into these types; each adapter
//! converts them into its vendor's wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ToolCallId;
use crate::schema::ParameterSchema;

/// A tool declared to the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    /// Tool name (the dispatch key).
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// Parameter shape.
    pub parameters: ParameterSchema,
}

/// One content block of an assistant message (discriminated by `type`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AssistantBlock {
    /// Assistant text.
    Text {
        /// The text.
        text: String,
    },
    /// Model reasoning.
    Reasoning {
        /// The reasoning text.
        text: String,
    },
    /// A tool call the assistant made.
    #[serde(rename_all = "camelCase")]
    ToolUse {
        /// Provider-assigned call ID.
        id: ToolCallId,
        /// Tool name.
        name: String,
        /// Parsed arguments.
        input: Map<String, Value>,
    },
}

impl AssistantBlock {
    /// A text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns `true` for a tool use block.
    #[must_use]
    pub fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse { .. })
    }
}

/// A conversation message (discriminated by `role`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum ChatMessage {
    /// User message.
    User {
        /// Message text.
        content: String,
    },
    /// Assistant message.
    Assistant {
        /// Content blocks.
        content: Vec<AssistantBlock>,
    },
    /// Result of one tool call, paired by call ID.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        /// Call this result answers.
        tool_call_id: ToolCallId,
        /// Result text.
        content: String,
        /// Whether the tool errored.
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ChatMessage {
    /// Create a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: text.into(),
        }
    }

    /// Returns `true` for a tool result message.
    #[must_use]
    pub fn is_tool_result(&self) -> bool {
        matches!(self, Self::ToolResult { .. })
    }
}

/// Everything an adapter needs for one streaming request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// System prompt, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Tools available this step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    /// Max output tokens, when capped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}
