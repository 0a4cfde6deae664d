//! Observer that forwards simulation events to `tracing`.

use crate::ports::{SimulationEvent, SimulationEventKind, SimulationObserver};

/// Emits one `tracing` event per simulation event.
///
/// Routine turn progress and analyzer failures (already warned about by the
/// orchestrator) are logged at `debug`. Stage changes and session end go to
/// `info`, triggers to `warn`, generation failures to `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SimulationObserver for TracingObserver {
    fn on_event(&self, event: &SimulationEvent) {
        let session_id = event.session_id;
        let turn = event.turn;

        match &event.kind {
            SimulationEventKind::TurnStarted { user_text } => {
                tracing::debug!(%session_id, turn, user_text = %user_text, "Turn started");
            }
            SimulationEventKind::ReplyGenerated { ai_text } => {
                tracing::debug!(%session_id, turn, ai_text = %ai_text, "Reply generated");
            }
            SimulationEventKind::GenerationFailed { error } => {
                tracing::error!(%session_id, turn, error = %error, "Response generation failed");
            }
            SimulationEventKind::AnalyzerFailed { analyzer, error } => {
                tracing::debug!(%session_id, turn, analyzer = %analyzer, error = %error, "Analyzer failure reported");
            }
            SimulationEventKind::StageEvaluated { outcome } => {
                if outcome.is_transition() {
                    tracing::info!(%session_id, turn, ?outcome, "Stage transition");
                } else {
                    tracing::debug!(%session_id, turn, ?outcome, "Stage evaluated");
                }
            }
            SimulationEventKind::TriggerFired { action, message } => {
                tracing::warn!(%session_id, turn, action = %action, message = %message, "Trigger activated");
            }
            SimulationEventKind::ConversationEnded { reason } => {
                tracing::info!(%session_id, turn, ?reason, "Conversation ended");
            }
        }
    }
}
