//! Wire types for the messages-style SSE dialect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default max output tokens when neither request nor config set one.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

// ─────────────────────────────────────────────────────────────────────────────
// Incoming SSE events
// ─────────────────────────────────────────────────────────────────────────────

/// One SSE event from the messages stream (discriminated by `type`).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicSseEvent {
    /// Opens the message; carries input-side usage.
    MessageStart {
        /// Message envelope.
        message: SseMessage,
    },
    /// Opens a content block.
    ContentBlockStart {
        /// Block index.
        index: u64,
        /// The opened block.
        content_block: SseContentBlock,
    },
    /// An increment for the open block.
    ContentBlockDelta {
        /// Block index.
        index: u64,
        /// The increment.
        delta: SseDelta,
    },
    /// Closes the open block.
    ContentBlockStop {
        /// Block index.
        index: u64,
    },
    /// Carries the stop reason and output-side usage.
    MessageDelta {
        /// Stop reason delta.
        delta: SseMessageDelta,
        /// Output usage so far.
        #[serde(default)]
        usage: Option<SseUsageDelta>,
    },
    /// Closes the message.
    MessageStop,
    /// Keepalive.
    Ping,
    /// In-band stream error.
    Error {
        /// Error payload.
        error: SseError,
    },
}

/// Message envelope from `message_start`.
#[derive(Clone, Debug, Deserialize)]
pub struct SseMessage {
    /// Provider message ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Model that is responding.
    #[serde(default)]
    pub model: Option<String>,
    /// Input-side usage.
    pub usage: SseUsage,
}

/// Usage block from `message_start`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SseUsage {
    /// Input tokens.
    #[serde(default)]
    pub input_tokens: u64,
    /// Output tokens (usually zero at start).
    #[serde(default)]
    pub output_tokens: u64,
    /// Tokens written to prompt cache.
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    /// Tokens read from prompt cache.
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// A content block opened by `content_block_start` (discriminated by `type`).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseContentBlock {
    /// Text block.
    Text {
        /// Seed text (usually empty).
        #[serde(default)]
        text: String,
    },
    /// Thinking block.
    Thinking {
        /// Seed thinking (usually empty).
        #[serde(default)]
        thinking: String,
    },
    /// Tool use block.
    ToolUse {
        /// Provider-assigned call ID.
        id: String,
        /// Tool name.
        name: String,
    },
}

/// An increment carried by `content_block_delta` (discriminated by `type`).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseDelta {
    /// Text increment.
    TextDelta {
        /// The text.
        text: String,
    },
    /// Thinking increment.
    ThinkingDelta {
        /// The thinking text.
        thinking: String,
    },
    /// Tool argument JSON increment.
    InputJsonDelta {
        /// The partial JSON text.
        partial_json: String,
    },
    /// Thinking signature increment; not surfaced.
    SignatureDelta {
        /// The signature fragment.
        signature: String,
    },
}

/// Stop reason carried by `message_delta`.
#[derive(Clone, Debug, Deserialize)]
pub struct SseMessageDelta {
    /// Why generation stopped, once known.
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Output usage carried by `message_delta`.
#[derive(Clone, Debug, Deserialize)]
pub struct SseUsageDelta {
    /// Output tokens so far.
    #[serde(default)]
    pub output_tokens: u64,
}

/// In-band error payload.
#[derive(Clone, Debug, Deserialize)]
pub struct SseError {
    /// Error type string.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Outgoing request
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the messages endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct AnthropicRequest {
    /// Model ID.
    pub model: String,
    /// Max output tokens.
    pub max_tokens: u32,
    /// Conversation messages.
    pub messages: Vec<AnthropicMessage>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Declared tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    /// Always `true` here.
    pub stream: bool,
}

/// One message in the request body.
#[derive(Clone, Debug, Serialize)]
pub struct AnthropicMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Content blocks.
    pub content: Vec<Value>,
}

/// Tool declaration in the request body.
#[derive(Clone, Debug, Serialize)]
pub struct AnthropicTool {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON-Schema-shaped parameter object.
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_event_parses_message_start() {
        let data = r#"{"type":"message_start","message":{"id":"msg_1","model":"m","usage":{"input_tokens":7,"cache_read_input_tokens":3}}}"#;
        let event: AnthropicSseEvent = serde_json::from_str(data).unwrap();
        let AnthropicSseEvent::MessageStart { message } = event else {
            panic!("expected message_start");
        };
        assert_eq!(message.usage.input_tokens, 7);
        assert_eq!(message.usage.cache_read_input_tokens, 3);
    }

    #[test]
    fn sse_event_parses_block_start_tool_use() {
        let data = r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"echo"}}"#;
        let event: AnthropicSseEvent = serde_json::from_str(data).unwrap();
        assert!(matches!(
            event,
            AnthropicSseEvent::ContentBlockStart {
                index: 1,
                content_block: SseContentBlock::ToolUse { .. }
            }
        ));
    }

    #[test]
    fn sse_event_parses_input_json_delta() {
        let data = r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"a\":"}}"#;
        let event: AnthropicSseEvent = serde_json::from_str(data).unwrap();
        let AnthropicSseEvent::ContentBlockDelta { delta, .. } = event else {
            panic!("expected content_block_delta");
        };
        assert!(matches!(delta, SseDelta::InputJsonDelta { partial_json } if partial_json == "{\"a\":"));
    }

    #[test]
    fn request_serializes_without_empty_options() {
        let req = AnthropicRequest {
            model: "m".into(),
            max_tokens: 64,
            messages: vec![],
            system: None,
            tools: None,
            stream: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("tools").is_none());
        assert_eq!(json["stream"], true);
    }
}
