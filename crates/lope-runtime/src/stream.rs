//! Stream consumer: folds canonical events into an in-flight turn.
//!
//! Events are consumed single-threaded in arrival order. The first delta of a
//! text or reasoning run creates its part; later deltas mutate it in place
//! with the cumulative buffer. Tool calls are appended as pending invocation
//! parts while their argument text buffers up in an insertion-ordered list,
//! executed later by the step runner.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lope_core::events::StreamEvent;
use lope_core::ids::{PartId, ToolCallId};
use lope_core::part::Part;
use lope_core::turn::Turn;
use lope_core::usage::{FinishReason, TokenUsage};
use lope_llm::EventStream;

use crate::observer::StepObserver;

/// A tool call announced this step, in announcement order.
#[derive(Clone, Debug)]
pub struct PendingCall {
    /// Provider-assigned call ID.
    pub tool_call_id: ToolCallId,
    /// Tool name.
    pub name: String,
    /// Buffered argument text, accumulated across deltas.
    pub raw_arguments: String,
}

/// What one consumed stream produced.
#[derive(Debug)]
pub struct StreamOutcome {
    /// Tool calls to execute, in start order.
    pub pending: Vec<PendingCall>,
    /// Finish reason; `Canceled` when interrupted, `Error` on stream failure.
    pub finish_reason: FinishReason,
    /// Usage reported with the finish event.
    pub usage: Option<TokenUsage>,
    /// The run was cancelled while consuming.
    pub interrupted: bool,
    /// The stream failed before finishing.
    pub errored: bool,
}

/// The part currently receiving deltas, with its cumulative buffer.
enum OpenPart {
    Text { part_id: PartId, buffer: String },
    Reasoning { part_id: PartId, buffer: String },
}

fn close_open(turn: &mut Turn, open: &mut Option<OpenPart>) {
    if let Some(part) = open.take() {
        let (OpenPart::Text { part_id, .. } | OpenPart::Reasoning { part_id, .. }) = part;
        turn.update_part(&part_id, Part::end_streaming);
    }
}

/// Consume a provider stream into the turn, returning the pending tool calls
/// and the step's finish state.
///
/// Cancellation is checked before every event; a triggered token stops
/// consumption at the next event boundary.
pub async fn consume_stream(
    mut stream: EventStream,
    turn: &mut Turn,
    observer: &dyn StepObserver,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let mut open: Option<OpenPart> = None;
    let mut pending: Vec<PendingCall> = Vec::new();
    let mut finish_reason = FinishReason::EndTurn;
    let mut usage: Option<TokenUsage> = None;
    let mut interrupted = false;
    let mut errored = false;
    let mut saw_finish = false;

    loop {
        // biased: prefer cancellation when both it and an event are ready
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                interrupted = true;
                break;
            }
            event = stream.next() => event,
        };

        match event {
            None => break,
            Some(Err(e)) => {
                warn!(error = %e, "provider stream failed mid-step");
                errored = true;
                break;
            }
            Some(Ok(stream_event)) => match stream_event {
                StreamEvent::TextDelta { delta } => {
                    observer.on_text_delta(&delta);
                    if let Some(OpenPart::Text { part_id, buffer }) = &mut open {
                        buffer.push_str(&delta);
                        let content = buffer.clone();
                        let id = part_id.clone();
                        turn.update_part(&id, |p| p.set_content(content));
                    } else {
                        close_open(turn, &mut open);
                        let part_id = turn.append_part(Part::text(delta.clone()));
                        open = Some(OpenPart::Text {
                            part_id,
                            buffer: delta,
                        });
                    }
                }

                StreamEvent::ReasoningDelta { delta } => {
                    observer.on_reasoning_delta(&delta);
                    if let Some(OpenPart::Reasoning { part_id, buffer }) = &mut open {
                        buffer.push_str(&delta);
                        let content = buffer.clone();
                        let id = part_id.clone();
                        turn.update_part(&id, |p| p.set_content(content));
                    } else {
                        close_open(turn, &mut open);
                        let part_id = turn.append_part(Part::reasoning(delta.clone()));
                        open = Some(OpenPart::Reasoning {
                            part_id,
                            buffer: delta,
                        });
                    }
                }

                StreamEvent::ToolCallStart { tool_call_id, name } => {
                    close_open(turn, &mut open);
                    if turn.find_invocation(&tool_call_id).is_some() {
                        warn!(%tool_call_id, "duplicate tool call id in turn, dropping");
                        continue;
                    }
                    let _ = turn.append_part(Part::tool_invocation(
                        tool_call_id.clone(),
                        name.clone(),
                    ));
                    pending.push(PendingCall {
                        tool_call_id,
                        name,
                        raw_arguments: String::new(),
                    });
                }

                StreamEvent::ToolCallDelta {
                    tool_call_id,
                    arguments_delta,
                } => match pending.iter_mut().find(|c| c.tool_call_id == tool_call_id) {
                    Some(call) => call.raw_arguments.push_str(&arguments_delta),
                    None => {
                        debug!(%tool_call_id, "arguments for unannounced call, dropping");
                    }
                },

                StreamEvent::Finish {
                    reason,
                    usage: reported,
                } => {
                    finish_reason = reason;
                    usage = reported;
                    saw_finish = true;
                    break;
                }

                StreamEvent::Error { error } => {
                    warn!(error, "provider reported in-band stream error");
                    errored = true;
                    break;
                }
            },
        }
    }

    close_open(turn, &mut open);

    if !saw_finish && !interrupted && !errored {
        warn!("stream ended without a finish event");
        errored = true;
    }
    if errored {
        finish_reason = FinishReason::Error;
    }
    if interrupted {
        finish_reason = FinishReason::Canceled;
    }

    StreamOutcome {
        pending,
        finish_reason,
        usage,
        interrupted,
        errored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_stream::stream;
    use lope_core::ids::SessionId;
    use lope_core::part::ToolInvocationState;
    use lope_llm::ProviderError;

    use crate::observer::NoopObserver;

    fn events(items: Vec<Result<StreamEvent, ProviderError>>) -> EventStream {
        Box::pin(futures::stream::iter(items))
    }

    fn text_delta(s: &str) -> Result<StreamEvent, ProviderError> {
        Ok(StreamEvent::TextDelta { delta: s.into() })
    }

    fn finish(reason: FinishReason) -> Result<StreamEvent, ProviderError> {
        Ok(StreamEvent::Finish {
            reason,
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                ..TokenUsage::default()
            }),
        })
    }

    #[tokio::test]
    async fn text_deltas_accumulate_into_one_part() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![
                text_delta("Hel"),
                text_delta("lo"),
                finish(FinishReason::EndTurn),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(turn.parts.len(), 1);
        assert_eq!(turn.parts[0].as_text(), Some("Hello"));
        assert_matches!(&turn.parts[0], Part::Text { ended_at: Some(_), .. });
        assert_eq!(outcome.finish_reason, FinishReason::EndTurn);
        assert!(outcome.pending.is_empty());
        assert!(!outcome.errored);
    }

    #[tokio::test]
    async fn reasoning_then_text_creates_two_parts() {
        let mut turn = Turn::assistant(SessionId::new());
        let _ = consume_stream(
            events(vec![
                Ok(StreamEvent::ReasoningDelta {
                    delta: "hmm".into(),
                }),
                text_delta("answer"),
                finish(FinishReason::EndTurn),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(turn.parts.len(), 2);
        assert_matches!(&turn.parts[0], Part::Reasoning { ended_at: Some(_), .. });
        assert_eq!(turn.parts[1].as_text(), Some("answer"));
    }

    #[tokio::test]
    async fn tool_call_buffers_arguments_in_start_order() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![
                Ok(StreamEvent::ToolCallStart {
                    tool_call_id: ToolCallId::from("call_1"),
                    name: "read".into(),
                }),
                Ok(StreamEvent::ToolCallDelta {
                    tool_call_id: ToolCallId::from("call_1"),
                    arguments_delta: "{\"pa".into(),
                }),
                Ok(StreamEvent::ToolCallStart {
                    tool_call_id: ToolCallId::from("call_2"),
                    name: "write".into(),
                }),
                Ok(StreamEvent::ToolCallDelta {
                    tool_call_id: ToolCallId::from("call_1"),
                    arguments_delta: "th\":\"x\"}".into(),
                }),
                finish(FinishReason::ToolUse),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.pending.len(), 2);
        assert_eq!(outcome.pending[0].name, "read");
        assert_eq!(outcome.pending[0].raw_arguments, "{\"path\":\"x\"}");
        assert_eq!(outcome.pending[1].name, "write");
        assert!(outcome.pending[1].raw_arguments.is_empty());

        // both invocation parts are pending in the turn
        assert!(turn.find_invocation(&ToolCallId::from("call_1")).is_some());
        assert!(turn.find_invocation(&ToolCallId::from("call_2")).is_some());
    }

    #[tokio::test]
    async fn duplicate_call_id_dropped() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![
                Ok(StreamEvent::ToolCallStart {
                    tool_call_id: ToolCallId::from("call_1"),
                    name: "read".into(),
                }),
                Ok(StreamEvent::ToolCallStart {
                    tool_call_id: ToolCallId::from("call_1"),
                    name: "read".into(),
                }),
                finish(FinishReason::ToolUse),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(
            turn.parts
                .iter()
                .filter(|p| p.is_tool_invocation())
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn orphan_argument_delta_dropped() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![
                Ok(StreamEvent::ToolCallDelta {
                    tool_call_id: ToolCallId::from("call_9"),
                    arguments_delta: "{}".into(),
                }),
                finish(FinishReason::EndTurn),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.pending.is_empty());
        assert!(turn.parts.is_empty());
    }

    #[tokio::test]
    async fn stream_error_item_marks_step_errored() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![
                text_delta("partial"),
                Err(ProviderError::Stream {
                    message: "connection reset".into(),
                }),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.errored);
        assert_eq!(outcome.finish_reason, FinishReason::Error);
        // partial text preserved
        assert_eq!(turn.parts[0].as_text(), Some("partial"));
    }

    #[tokio::test]
    async fn in_band_error_event_marks_step_errored() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![
                text_delta("partial"),
                Ok(StreamEvent::Error {
                    error: "overloaded".into(),
                }),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.errored);
        assert_eq!(turn.parts[0].as_text(), Some("partial"));
    }

    #[tokio::test]
    async fn cancellation_stops_consumption() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let s = stream! {
            yield Ok(StreamEvent::TextDelta { delta: "partial".into() });
            trigger.cancel();
            tokio::task::yield_now().await;
            yield Ok(StreamEvent::TextDelta { delta: " more".into() });
            yield Ok(StreamEvent::Finish { reason: FinishReason::EndTurn, usage: None });
        };

        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(Box::pin(s), &mut turn, &NoopObserver, &cancel).await;

        assert!(outcome.interrupted);
        assert_eq!(outcome.finish_reason, FinishReason::Canceled);
        assert_eq!(turn.parts[0].as_text(), Some("partial"));
    }

    #[tokio::test]
    async fn stream_end_without_finish_is_an_error() {
        let mut turn = Turn::assistant(SessionId::new());
        let outcome = consume_stream(
            events(vec![text_delta("x")]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;
        assert!(outcome.errored);
    }

    #[tokio::test]
    async fn pending_parts_stay_pending_until_executed() {
        let mut turn = Turn::assistant(SessionId::new());
        let _ = consume_stream(
            events(vec![
                Ok(StreamEvent::ToolCallStart {
                    tool_call_id: ToolCallId::from("call_1"),
                    name: "echo".into(),
                }),
                finish(FinishReason::ToolUse),
            ]),
            &mut turn,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await;

        let part = turn.find_invocation(&ToolCallId::from("call_1")).unwrap();
        assert_matches!(
            part,
            Part::ToolInvocation {
                state: ToolInvocationState::Pending { .. },
                ..
            }
        );
    }
}
