//! Messages-dialect stream state machine.
//!
//! Converts raw SSE events into canonical [`StreamEvent`]s. The state tracks
//! the open content block, the active tool call, and usage numbers that
//! arrive split across `message_start` and `message_delta`.

use tracing::warn;

use lope_core::events::StreamEvent;
use lope_core::ids::ToolCallId;
use lope_core::usage::{FinishReason, TokenUsage};

use super::types::{AnthropicSseEvent, SseContentBlock, SseDelta};

/// Which kind of block is currently open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockKind {
    Text,
    Thinking,
    ToolUse,
}

/// State accumulated across SSE events of one stream.
#[derive(Clone, Debug, Default)]
pub struct StreamState {
    current_block: Option<BlockKind>,
    current_tool_call_id: Option<ToolCallId>,
    input_tokens: u64,
    output_tokens: u64,
    cache_read_tokens: u64,
    cache_creation_tokens: u64,
    stop_reason: Option<String>,
}

/// Map a vendor stop reason string to a [`FinishReason`].
///
/// Unknown or missing reasons fall back to `EndTurn` with a warning.
fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | None => FinishReason::EndTurn,
        Some("tool_use") => FinishReason::ToolUse,
        Some("max_tokens") => FinishReason::MaxTokens,
        Some("stop_sequence") => FinishReason::StopSequence,
        Some(other) => {
            warn!(stop_reason = other, "unknown stop reason, treating as end_turn");
            FinishReason::EndTurn
        }
    }
}

/// Process one SSE event and return zero or more canonical events.
///
/// Call this for each decoded SSE event; the state is mutated to track
/// progress across events.
pub fn process_sse_event(event: &AnthropicSseEvent, state: &mut StreamState) -> Vec<StreamEvent> {
    match event {
        AnthropicSseEvent::MessageStart { message } => {
            state.input_tokens = message.usage.input_tokens;
            state.output_tokens = message.usage.output_tokens;
            state.cache_read_tokens = message.usage.cache_read_input_tokens;
            state.cache_creation_tokens = message.usage.cache_creation_input_tokens;
            vec![]
        }

        AnthropicSseEvent::ContentBlockStart { content_block, .. } => match content_block {
            SseContentBlock::Text { .. } => {
                state.current_block = Some(BlockKind::Text);
                vec![]
            }
            SseContentBlock::Thinking { .. } => {
                state.current_block = Some(BlockKind::Thinking);
                vec![]
            }
            SseContentBlock::ToolUse { id, name } => {
                state.current_block = Some(BlockKind::ToolUse);
                let call_id = ToolCallId::from(id.as_str());
                state.current_tool_call_id = Some(call_id.clone());
                vec![StreamEvent::ToolCallStart {
                    tool_call_id: call_id,
                    name: name.clone(),
                }]
            }
        },

        AnthropicSseEvent::ContentBlockDelta { delta, .. } => match delta {
            SseDelta::TextDelta { text } => vec![StreamEvent::TextDelta {
                delta: text.clone(),
            }],
            SseDelta::ThinkingDelta { thinking } => vec![StreamEvent::ReasoningDelta {
                delta: thinking.clone(),
            }],
            SseDelta::InputJsonDelta { partial_json } => {
                match &state.current_tool_call_id {
                    Some(id) => vec![StreamEvent::ToolCallDelta {
                        tool_call_id: id.clone(),
                        arguments_delta: partial_json.clone(),
                    }],
                    None => {
                        warn!("input_json_delta outside a tool_use block, dropping");
                        vec![]
                    }
                }
            }
            SseDelta::SignatureDelta { .. } => vec![],
        },

        AnthropicSseEvent::ContentBlockStop { .. } => {
            state.current_block = None;
            state.current_tool_call_id = None;
            vec![]
        }

        AnthropicSseEvent::MessageDelta { delta, usage } => {
            if delta.stop_reason.is_some() {
                state.stop_reason.clone_from(&delta.stop_reason);
            }
            if let Some(u) = usage {
                state.output_tokens = u.output_tokens;
            }
            vec![]
        }

        AnthropicSseEvent::MessageStop => {
            let usage = (state.input_tokens > 0 || state.output_tokens > 0).then(|| TokenUsage {
                input_tokens: state.input_tokens,
                output_tokens: state.output_tokens,
                reasoning_tokens: None,
                cache_read_tokens: (state.cache_read_tokens > 0).then_some(state.cache_read_tokens),
                cache_creation_tokens: (state.cache_creation_tokens > 0)
                    .then_some(state.cache_creation_tokens),
            });
            vec![StreamEvent::Finish {
                reason: map_stop_reason(state.stop_reason.as_deref()),
                usage,
            }]
        }

        AnthropicSseEvent::Ping => vec![],

        AnthropicSseEvent::Error { error } => {
            warn!(
                error_type = %error.error_type,
                message = %error.message,
                "in-band SSE error"
            );
            vec![StreamEvent::Error {
                error: format!("{}: {}", error.error_type, error.message),
            }]
        }
    }
}
