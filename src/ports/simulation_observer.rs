//! Observer port: injected sink for simulation events.
//!
//! The orchestrator reports what happened on each turn here instead of
//! configuring logging itself. Observers must not block.

use serde::Serialize;

use crate::domain::foundation::SessionId;
use crate::domain::transition::TransitionOutcome;

/// Receives simulation events in order for each session.
pub trait SimulationObserver: Send + Sync {
    fn on_event(&self, event: &SimulationEvent);
}

/// One thing that happened during a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationEvent {
    pub session_id: SessionId,
    pub turn: u32,
    pub kind: SimulationEventKind,
}

impl SimulationEvent {
    pub fn new(session_id: SessionId, turn: u32, kind: SimulationEventKind) -> Self {
        Self {
            session_id,
            turn,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEventKind {
    TurnStarted { user_text: String },
    ReplyGenerated { ai_text: String },
    GenerationFailed { error: String },
    AnalyzerFailed { analyzer: String, error: String },
    StageEvaluated { outcome: TransitionOutcome },
    TriggerFired { action: String, message: String },
    ConversationEnded { reason: EndReason },
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    MaxTurns,
    EndPhrase,
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SimulationObserver for NullObserver {
    fn on_event(&self, _event: &SimulationEvent) {}
}
