//! The agentic loop.
//!
//! One [`AgentLoop`] owns a session and drives it: append the user turn,
//! then run up to `max_steps` steps. Each step streams one model response
//! into a fresh assistant turn, executes the tool calls it made, seals the
//! turn, and appends it. The loop continues only while the model both called
//! tools and did not end its turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use lope_core::message::ChatRequest;
use lope_core::part::Part;
use lope_core::session::Session;
use lope_core::turn::Turn;
use lope_core::usage::{FinishReason, TokenUsage};
use lope_llm::ChatProvider;
use lope_tools::ToolRegistry;

use crate::errors::RuntimeError;
use crate::history::render_history;
use crate::observer::{NoopObserver, StepObserver};
use crate::step::execute_pending;
use crate::stream::consume_stream;

const DEFAULT_MAX_STEPS: u32 = 12;

/// Resets the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives one session against a provider and a tool registry.
pub struct AgentLoop {
    provider: Box<dyn ChatProvider>,
    registry: ToolRegistry,
    agent_name: String,
    system_prompt: Option<String>,
    max_steps: u32,
    observer: Arc<dyn StepObserver>,
    session: Mutex<Session>,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl AgentLoop {
    /// Create a loop over a fresh session.
    #[must_use]
    pub fn new(
        provider: Box<dyn ChatProvider>,
        registry: ToolRegistry,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            agent_name: agent_name.into(),
            system_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
            observer: Arc::new(NoopObserver),
            session: Mutex::new(Session::new()),
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Set the system prompt sent with every request.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Cap the number of steps per run.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Attach a step observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }

    /// Cancel the in-flight run, if any. The run stops at its next
    /// checkpoint; already-started tools finish.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Process one user prompt to completion.
    ///
    /// Returns the final step's finish reason. The only error this surfaces
    /// is [`RuntimeError::AlreadyRunning`]; provider and tool failures are
    /// recorded in the session and end the run cleanly.
    pub async fn run(&self, prompt: impl Into<String>) -> Result<FinishReason, RuntimeError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RuntimeError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();

        let session_id = {
            let mut session = self.session.lock();
            let id = session.id.clone();
            session.append_turn(Turn::user(id.clone(), prompt));
            id
        };

        let mut last_finish = FinishReason::EndTurn;

        for step in 0..self.max_steps {
            let request = ChatRequest {
                system_prompt: self.system_prompt.clone(),
                messages: render_history(&self.session.lock()),
                tools: self.registry.specs(),
                max_tokens: None,
            };

            let mut turn = Turn::assistant(session_id.clone());
            let _ = turn.append_part(Part::step_start());

            let stream = match self.provider.stream(&request).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(step, error = %e, "provider request failed, stopping run");
                    turn.seal(FinishReason::Error, TokenUsage::default());
                    self.session.lock().append_turn(turn);
                    last_finish = FinishReason::Error;
                    break;
                }
            };

            let outcome =
                consume_stream(stream, &mut turn, self.observer.as_ref(), &cancel).await;
            let tools_requested = !outcome.pending.is_empty();

            // A cancelled or failed stream skips tool execution; the
            // partially-assembled turn is still sealed and kept.
            if !outcome.interrupted && !outcome.errored {
                let _ = execute_pending(
                    &mut turn,
                    outcome.pending,
                    &self.registry,
                    &self.agent_name,
                    &cancel,
                    self.observer.as_ref(),
                )
                .await;
            }

            let usage = outcome.usage.clone().unwrap_or_default();
            let _ = turn.append_part(Part::step_finish(outcome.finish_reason, usage.clone()));
            turn.seal(outcome.finish_reason, usage);
            self.session.lock().append_turn(turn);
            last_finish = outcome.finish_reason;

            if outcome.interrupted || outcome.errored || cancel.is_cancelled() {
                info!(step, reason = ?last_finish, "run stopped early");
                break;
            }

            // Continue only while the model called tools and did not end its
            // turn. Both conditions are required.
            if !(tools_requested && outcome.finish_reason != FinishReason::EndTurn) {
                break;
            }
            debug!(step, "continuing to next step");
        }

        Ok(last_finish)
    }
}
