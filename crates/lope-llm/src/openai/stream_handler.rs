//! Chat-completions stream state machine.
//!
//! This dialect has no terminal wire event; the stream just ends after
//! `[DONE]`. The state therefore tracks `finish_reason` and `usage` last-seen
//! across chunks, and [`finish_event`] builds the canonical `Finish` once the
//! byte stream closes.

use tracing::warn;

use lope_core::events::StreamEvent;
use lope_core::ids::ToolCallId;
use lope_core::usage::{FinishReason, TokenUsage};

use super::types::{ChatCompletionChunk, ChunkUsage};

/// State accumulated across chunks of one stream.
#[derive(Clone, Debug, Default)]
pub struct StreamState {
    current_tool_call_id: Option<ToolCallId>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") | None => FinishReason::EndTurn,
        Some("tool_calls") => FinishReason::ToolUse,
        Some("length") => FinishReason::MaxTokens,
        Some(other) => {
            warn!(finish_reason = other, "unknown finish reason, treating as stop");
            FinishReason::EndTurn
        }
    }
}

fn convert_usage(usage: &ChunkUsage) -> TokenUsage {
    let reasoning = usage
        .completion_tokens_details
        .as_ref()
        .map(|d| d.reasoning_tokens)
        .filter(|&t| t > 0);
    let cached = usage
        .prompt_tokens_details
        .as_ref()
        .map(|d| d.cached_tokens)
        .filter(|&t| t > 0);
    TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        reasoning_tokens: reasoning,
        cache_read_tokens: cached,
        cache_creation_tokens: None,
    }
}

/// Process one decoded chunk and return zero or more canonical events.
///
/// Only the first choice is consumed. `finish_reason` and `usage` are
/// recorded last-seen; they surface in [`finish_event`].
pub fn process_chunk(chunk: &ChatCompletionChunk, state: &mut StreamState) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(usage) = &chunk.usage {
        state.usage = Some(convert_usage(usage));
    }

    let Some(choice) = chunk.choices.first() else {
        return events;
    };

    if choice.finish_reason.is_some() {
        state.finish_reason.clone_from(&choice.finish_reason);
    }

    if let Some(content) = &choice.delta.content {
        if !content.is_empty() {
            events.push(StreamEvent::TextDelta {
                delta: content.clone(),
            });
        }
    }

    if let Some(reasoning) = &choice.delta.reasoning_content {
        if !reasoning.is_empty() {
            events.push(StreamEvent::ReasoningDelta {
                delta: reasoning.clone(),
            });
        }
    }

    if let Some(tool_calls) = &choice.delta.tool_calls {
        for entry in tool_calls {
            if let Some(id) = &entry.id {
                let call_id = ToolCallId::from(id.as_str());
                let name = entry
                    .function
                    .as_ref()
                    .and_then(|f| f.name.clone())
                    .unwrap_or_default();
                state.current_tool_call_id = Some(call_id.clone());
                events.push(StreamEvent::ToolCallStart {
                    tool_call_id: call_id,
                    name,
                });
            }

            let arguments = entry
                .function
                .as_ref()
                .and_then(|f| f.arguments.as_deref())
                .unwrap_or_default();
            if arguments.is_empty() {
                continue;
            }
            match &state.current_tool_call_id {
                Some(call_id) => events.push(StreamEvent::ToolCallDelta {
                    tool_call_id: call_id.clone(),
                    arguments_delta: arguments.to_owned(),
                }),
                None => warn!("tool call arguments before any announced call, dropping"),
            }
        }
    }

    events
}

/// Build the terminal `Finish` event from last-seen state.
///
/// Called once when the byte stream ends.
#[must_use]
pub fn finish_event(state: &StreamState) -> StreamEvent {
    StreamEvent::Finish {
        reason: map_finish_reason(state.finish_reason.as_deref()),
        usage: state.usage.clone(),
    }
}
