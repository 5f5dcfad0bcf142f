//! Step runner: executes a step's pending tool calls.
//!
//! Calls run strictly sequentially in start order. Parse failures on buffered
//! argument text substitute an empty object; the tool still runs and reports
//! its own validation errors through the registry. Failure selection follows
//! the outcome's `error` metadata flag, so registry-mapped failures and
//! successes land in the right invocation state.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lope_core::turn::Turn;
use lope_tools::{ToolContext, ToolRegistry};

use crate::observer::StepObserver;
use crate::stream::PendingCall;

fn parse_arguments(raw: &str, tool: &str) -> Map<String, Value> {
    if raw.is_empty() {
        return Map::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        debug!(tool, error = %e, "unparseable buffered arguments, substituting empty object");
        Map::new()
    })
}

/// Execute the step's pending calls against the registry, transitioning each
/// invocation part Pending → Running → Completed or Failed.
///
/// Returns the number of calls executed.
pub async fn execute_pending(
    turn: &mut Turn,
    pending: Vec<PendingCall>,
    registry: &ToolRegistry,
    agent_name: &str,
    cancel: &CancellationToken,
    observer: &dyn StepObserver,
) -> usize {
    let count = pending.len();

    for call in pending {
        let Some(part_id) = turn.invocation_part_id(&call.tool_call_id) else {
            debug!(tool_call_id = %call.tool_call_id, "no invocation part for call, skipping");
            continue;
        };

        let input = parse_arguments(&call.raw_arguments, &call.name);

        let raw = call.raw_arguments.clone();
        turn.update_part(&part_id, |p| p.set_raw_arguments(raw));

        observer.on_tool_start(&call.tool_call_id, &call.name);
        let running_input = input.clone();
        turn.update_part(&part_id, |p| p.start_tool(running_input, None));

        let ctx = ToolContext::new(
            turn.session_id.clone(),
            turn.id.clone(),
            agent_name,
            call.tool_call_id.clone(),
            cancel.clone(),
        );
        let outcome = registry.dispatch(&call.name, input, &ctx).await;

        if outcome.is_error() {
            let error = outcome.output.clone();
            turn.update_part(&part_id, |p| p.fail_tool(error));
        } else {
            let (output, title, metadata) = (
                outcome.output.clone(),
                outcome.title.clone(),
                outcome.metadata.clone(),
            );
            turn.update_part(&part_id, |p| p.complete_tool(output, title, metadata));
        }

        observer.on_tool_end(&call.tool_call_id, &call.name, &outcome);
    }

    count
}
