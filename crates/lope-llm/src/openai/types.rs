//! Wire types for the chat-completions SSE dialect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Incoming chunks
// ─────────────────────────────────────────────────────────────────────────────

/// One decoded SSE chunk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    /// Choice deltas; only the first choice is consumed.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage totals; sent once near the end of the stream.
    #[serde(default)]
    pub usage: Option<ChunkUsage>,
}

/// One choice inside a chunk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkChoice {
    /// The incremental delta.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Final reason, present on the last content chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental fields of a choice delta.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text increment.
    #[serde(default)]
    pub content: Option<String>,
    /// Reasoning increment, where the backend exposes it.
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Tool call increments.
    #[serde(default)]
    pub tool_calls: Option<Vec<ChunkToolCall>>,
}

/// One tool call increment. An entry with an `id` announces a new call; an
/// entry without one extends the most recently announced call.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkToolCall {
    /// Position in the call list.
    #[serde(default)]
    pub index: Option<u32>,
    /// Provider-assigned call ID, present only on the announcing entry.
    #[serde(default)]
    pub id: Option<String>,
    /// Function name and argument fragments.
    #[serde(default)]
    pub function: Option<ChunkFunction>,
}

/// Function fields of a tool call increment.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkFunction {
    /// Tool name, present on the announcing entry.
    #[serde(default)]
    pub name: Option<String>,
    /// Argument JSON fragment.
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Usage totals.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChunkUsage {
    /// Input tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Output tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Input-side detail.
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    /// Output-side detail.
    #[serde(default)]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

/// Input token detail.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PromptTokensDetails {
    /// Tokens served from prompt cache.
    #[serde(default)]
    pub cached_tokens: u64,
}

/// Output token detail.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CompletionTokensDetails {
    /// Reasoning tokens.
    #[serde(default)]
    pub reasoning_tokens: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Outgoing request
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the chat-completions endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model ID.
    pub model: String,
    /// Conversation messages in wire shape.
    pub messages: Vec<Value>,
    /// Declared tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    /// Always `true` here.
    pub stream: bool,
    /// Asks the backend to append a usage chunk.
    pub stream_options: Value,
    /// Max output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_parses_text_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));
        assert!(chunk.choices[0].finish_reason.is_none());
    }

    #[test]
    fn chunk_parses_tool_call_announcement() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"echo","arguments":""}}]}}]}"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(data).unwrap();
        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(
            calls[0].function.as_ref().unwrap().name.as_deref(),
            Some("echo")
        );
    }

    #[test]
    fn chunk_parses_usage_only_chunk() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":4,"completion_tokens_details":{"reasoning_tokens":2}}}"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(data).unwrap();
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(
            usage.completion_tokens_details.unwrap().reasoning_tokens,
            2
        );
    }

    #[test]
    fn unknown_fields_tolerated() {
        let data = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,"model":"m","choices":[{"index":0,"delta":{"role":"assistant","content":""},"logprobs":null,"finish_reason":null}]}"#;
        let chunk: ChatCompletionChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.choices.len(), 1);
    }
}
