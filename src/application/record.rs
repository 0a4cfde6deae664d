//! Turn outcomes and per-turn transcript records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::foundation::SessionId;
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::transition::TransitionOutcome;

/// Text returned once the turn limit is exceeded.
pub const MAX_TURNS_MESSAGE: &str = "Maximum turns reached. Ending conversation.";

/// Marker appended to a reply containing an end phrase.
pub const CONVERSATION_ENDED_MARKER: &str = "\nConversation ended.";

/// Result of one call to the orchestrator. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The turn limit was exceeded; nothing ran.
    MaxTurnsReached,
    /// A trigger fired after the metrics were updated.
    Triggered { action: String, message: String },
    /// The reply contained an end phrase. `reply` ends with the
    /// conversation-ended marker.
    Ended { reply: String },
    Reply { text: String },
}

impl TurnOutcome {
    /// Text to show the operator.
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::MaxTurnsReached => MAX_TURNS_MESSAGE,
            TurnOutcome::Triggered { message, .. } => message,
            TurnOutcome::Ended { reply } => reply,
            TurnOutcome::Reply { text } => text,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TurnOutcome::MaxTurnsReached => "max_turns_reached",
            TurnOutcome::Triggered { .. } => "triggered",
            TurnOutcome::Ended { .. } => "ended",
            TurnOutcome::Reply { .. } => "reply",
        }
    }

    /// True when the session should not be driven further.
    ///
    /// Triggers are signals to the operator, not terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnOutcome::MaxTurnsReached | TurnOutcome::Ended { .. })
    }
}

/// Everything known about one turn, for transcripts and reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnRecord {
    pub session_id: SessionId,
    pub turn: u32,
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    /// Absent when the turn limit stopped the turn before generation.
    pub ai_text: Option<String>,
    /// Active stage after the turn.
    pub stage: String,
    pub transition: Option<TransitionOutcome>,
    /// Metric values after the turn.
    pub metrics: MetricsSnapshot,
    pub outcome: TurnOutcome,
}

impl TurnRecord {
    /// One-line JSON, for transcript files.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
