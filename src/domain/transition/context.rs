//! Snapshots handed to response generation and reporting.

use serde::Serialize;

use crate::domain::metrics::MetricsSnapshot;

/// One exchange between the operator and the persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub user_text: String,
    pub ai_text: String,
}

impl Turn {
    pub fn new(user_text: impl Into<String>, ai_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            ai_text: ai_text.into(),
        }
    }
}

/// Owned view of the engine state for the next turn's prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationContext {
    /// Id of the active stage.
    pub current_stage_id: String,
    /// Instructions of the active stage.
    pub instructions: String,
    /// Current metric values.
    pub metrics: MetricsSnapshot,
    /// Most recent turns, oldest first.
    pub history: Vec<Turn>,
    /// Background passages retrieved for the current user text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub knowledge: Vec<String>,
}

impl ConversationContext {
    /// Renders the history as alternating `User:` / `AI:` lines.
    pub fn format_history(&self) -> String {
        self.history
            .iter()
            .map(|turn| format!("User: {}\nAI: {}", turn.user_text, turn.ai_text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders the metrics as `id: value` pairs on one line.
    pub fn format_metrics(&self) -> String {
        self.metrics
            .iter()
            .map(|(id, value)| format!("{}: {:.2}", id, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ConversationContext {
        ConversationContext {
            current_stage_id: "greeting".into(),
            instructions: "Say hello".into(),
            metrics: MetricsSnapshot::new().with("trust", 50.0).with("interest", 12.346),
            history: vec![Turn::new("Hi", "Hello!"), Turn::new("Pricing?", "Let's talk needs first.")],
            knowledge: Vec::new(),
        }
    }

    #[test]
    fn formats_history_in_order() {
        assert_eq!(
            context().format_history(),
            "User: Hi\nAI: Hello!\nUser: Pricing?\nAI: Let's talk needs first."
        );
    }

    #[test]
    fn formats_metrics_with_two_decimals() {
        assert_eq!(context().format_metrics(), "trust: 50.00, interest: 12.35");
    }

    #[test]
    fn empty_history_formats_as_empty_string() {
        let mut ctx = context();
        ctx.history.clear();
        assert_eq!(ctx.format_history(), "");
    }
}
