//! Sessions: the append-only conversation container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::turn::Turn;

/// A conversation: an ordered, append-only sequence of turns.
///
/// The turn sequence never shrinks or reorders. Turns are appended complete;
/// in-flight assistant turns live in the orchestrator until sealed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session ID.
    pub id: SessionId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Ordered turns.
    pub turns: Vec<Turn>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    /// Append a turn.
    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if the session has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn, if any.
    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
