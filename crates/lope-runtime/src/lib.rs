//! Agentic loop orchestrator.
//!
//! [`AgentLoop`] drives the conversation: it streams model output into the
//! session data model, executes the tool calls the model makes, feeds results
//! back as history, and repeats until the model ends its turn or the step
//! budget runs out.

pub mod errors;
pub mod history;
pub mod observer;
pub mod orchestrator;
pub mod step;
pub mod stream;

pub use errors::RuntimeError;
pub use observer::{NoopObserver, StepObserver};
pub use orchestrator::AgentLoop;
