//! Turns: one conversational exchange unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ids::{PartId, SessionId, ToolCallId, TurnId};
use crate::part::Part;
use crate::usage::{FinishReason, TokenUsage};

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// One turn of conversation: an ordered sequence of parts plus metadata.
///
/// Assistant turns start unsealed (`completed_at`, `finish_reason` and `usage`
/// all `None`) and are sealed exactly once when their step finishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Turn ID.
    pub id: TurnId,
    /// Owning session.
    pub session_id: SessionId,
    /// Producer of the turn.
    pub role: Role,
    /// Ordered parts. Append-only; existing parts are mutated in place,
    /// never reordered.
    pub parts: Vec<Part>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Seal time; `None` until sealed. Always `None` for user turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Why generation stopped; set by `seal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Usage for this turn; set by `seal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Turn {
    /// Create a user turn containing a single text part.
    #[must_use]
    pub fn user(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            session_id,
            role: Role::User,
            parts: vec![Part::text(text)],
            created_at: Utc::now(),
            completed_at: None,
            finish_reason: None,
            usage: None,
        }
    }

    /// Create an empty assistant turn.
    #[must_use]
    pub fn assistant(session_id: SessionId) -> Self {
        Self {
            id: TurnId::new(),
            session_id,
            role: Role::Assistant,
            parts: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            finish_reason: None,
            usage: None,
        }
    }

    /// Append a part, returning its ID. Parts are never inserted or reordered.
    pub fn append_part(&mut self, part: Part) -> PartId {
        let id = part.id().clone();
        self.parts.push(part);
        id
    }

    /// Mutate an existing part in place.
    ///
    /// A missing `part_id` is a silent no-op with a debug log; it is not an
    /// error.
    pub fn update_part(&mut self, part_id: &PartId, f: impl FnOnce(&mut Part)) {
        if let Some(part) = self.parts.iter_mut().find(|p| p.id() == part_id) {
            f(part);
        } else {
            debug!(turn_id = %self.id, part_id = %part_id, "update_part: no such part");
        }
    }

    /// Find the tool invocation part for a provider call ID.
    #[must_use]
    pub fn find_invocation(&self, call_id: &ToolCallId) -> Option<&Part> {
        self.parts.iter().find(
            |p| matches!(p, Part::ToolInvocation { tool_call_id, .. } if tool_call_id == call_id),
        )
    }

    /// Part ID of the tool invocation for a provider call ID.
    #[must_use]
    pub fn invocation_part_id(&self, call_id: &ToolCallId) -> Option<PartId> {
        self.find_invocation(call_id).map(|p| p.id().clone())
    }

    /// Seal the turn: record completion time, finish reason, and usage.
    ///
    /// The only operation allowed to set these fields. Called exactly once per
    /// assistant turn; a second call is ignored with a debug log.
    pub fn seal(&mut self, finish_reason: FinishReason, usage: TokenUsage) {
        if self.completed_at.is_some() {
            debug!(turn_id = %self.id, "seal called on already-sealed turn, ignoring");
            return;
        }
        self.completed_at = Some(Utc::now());
        self.finish_reason = Some(finish_reason);
        self.usage = Some(usage);
    }

    /// Returns `true` once `seal` has run.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Concatenated text content of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::Text { .. }))
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
