//! Step observer: a typed listener for in-flight step activity.
//!
//! Callers that want live output implement [`StepObserver`]; every method has
//! a no-op default, so implementors override only what they care about.
//! Notifications are delivered in consumption order, on the task driving the
//! loop.

use lope_core::ids::ToolCallId;
use lope_tools::ToolOutcome;

/// Listener for events inside one orchestrator step.
pub trait StepObserver: Send + Sync {
    /// A text delta arrived from the provider.
    fn on_text_delta(&self, _delta: &str) {}

    /// A reasoning delta arrived from the provider.
    fn on_reasoning_delta(&self, _delta: &str) {}

    /// A tool is about to execute.
    fn on_tool_start(&self, _tool_call_id: &ToolCallId, _name: &str) {}

    /// A tool finished executing.
    fn on_tool_end(&self, _tool_call_id: &ToolCallId, _name: &str, _outcome: &ToolOutcome) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {}
