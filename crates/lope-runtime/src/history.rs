//! History rendering: session turns to provider-neutral chat messages.
//!
//! User turns become plain text messages. Assistant turns become block
//! messages (text, reasoning, tool use in part order) followed by one tool
//! result message per finished invocation, pairing preserved by call ID.
//! Step markers and unfinished invocations never reach the provider: a tool
//! use block without a paired result is rejected by both vendors, so an
//! invocation left Pending or Running by a cancelled or failed step is
//! dropped from the rendered history.

use lope_core::message::{AssistantBlock, ChatMessage};
use lope_core::part::{Part, ToolInvocationState};
use lope_core::session::Session;
use lope_core::turn::Role;

/// Render the session into the message sequence sent to a provider.
#[must_use]
pub fn render_history(session: &Session) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    for turn in &session.turns {
        match turn.role {
            Role::User => messages.push(ChatMessage::user(turn.text())),
            Role::Assistant => {
                let mut blocks = Vec::new();
                let mut results = Vec::new();

                for part in &turn.parts {
                    match part {
                        Part::Text { content, .. } if !content.is_empty() => {
                            blocks.push(AssistantBlock::text(content.clone()));
                        }
                        Part::Reasoning { content, .. } if !content.is_empty() => {
                            blocks.push(AssistantBlock::Reasoning {
                                text: content.clone(),
                            });
                        }
                        Part::ToolInvocation {
                            tool_call_id,
                            tool_name,
                            state,
                            ..
                        } => match state {
                            ToolInvocationState::Completed { input, output, .. } => {
                                blocks.push(AssistantBlock::ToolUse {
                                    id: tool_call_id.clone(),
                                    name: tool_name.clone(),
                                    input: input.clone(),
                                });
                                results.push(ChatMessage::ToolResult {
                                    tool_call_id: tool_call_id.clone(),
                                    content: output.clone(),
                                    is_error: None,
                                });
                            }
                            ToolInvocationState::Failed { input, error, .. } => {
                                blocks.push(AssistantBlock::ToolUse {
                                    id: tool_call_id.clone(),
                                    name: tool_name.clone(),
                                    input: input.clone(),
                                });
                                results.push(ChatMessage::ToolResult {
                                    tool_call_id: tool_call_id.clone(),
                                    content: error.clone(),
                                    is_error: Some(true),
                                });
                            }
                            // No result to pair with yet; the call must not
                            // be sent alone.
                            ToolInvocationState::Pending { .. }
                            | ToolInvocationState::Running { .. } => {}
                        },
                        _ => {}
                    }
                }

                if !blocks.is_empty() {
                    messages.push(ChatMessage::Assistant { content: blocks });
                    messages.append(&mut results);
                }
            }
        }
    }

    messages
}
