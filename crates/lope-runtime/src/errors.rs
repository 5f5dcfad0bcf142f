//! Runtime error types.

use thiserror::Error;

/// Errors that can occur while driving the agent loop.
///
/// Provider and tool failures are not surfaced here; they are recorded in
/// the session and end the run cleanly.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A prompt is already being processed by this loop.
    #[error("agent loop is already running")]
    AlreadyRunning,
}
