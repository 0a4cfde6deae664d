//! Lexicon-based sentiment analyzer.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::domain::analysis::AnalyzerOutput;
use crate::ports::{AnalysisInput, AnalyzerError, TurnAnalyzer};

use super::text::tokenize;

static POSITIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "amazing", "awesome", "love", "like", "happy", "glad",
        "pleased", "helpful", "thanks", "thank", "perfect", "wonderful", "interested", "useful",
        "nice", "fantastic", "agree", "yes", "sure", "easy", "clear", "valuable", "excited",
        "impressive", "fair", "reasonable", "appreciate",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "terrible", "awful", "hate", "dislike", "angry", "annoyed", "frustrated",
        "frustrating", "confusing", "confused", "expensive", "worse", "worst", "poor", "useless",
        "problem", "issue", "wrong", "disappointed", "disappointing", "slow", "difficult", "hard",
        "unhappy", "sad", "never", "waste", "broken", "unclear",
    ]
    .into_iter()
    .collect()
});

static NEGATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["not", "no", "don't", "doesn't", "didn't", "isn't", "wasn't", "aren't", "can't", "won't", "hardly"]
        .into_iter()
        .collect()
});

/// Polarity of `text` in [-1, 1]; 0.0 when no lexicon word appears.
///
/// A negator immediately before a lexicon word flips its sign.
pub fn polarity(text: &str) -> f64 {
    let tokens = tokenize(text);
    let mut sum = 0.0;
    let mut hits = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        let sign = if POSITIVE.contains(token.as_str()) {
            1.0
        } else if NEGATIVE.contains(token.as_str()) {
            -1.0
        } else {
            continue;
        };
        let negated = i > 0 && NEGATORS.contains(tokens[i - 1].as_str());
        sum += if negated { -sign } else { sign };
        hits += 1;
    }

    if hits == 0 {
        0.0
    } else {
        sum / hits as f64
    }
}

/// Scores user and AI polarity each turn.
///
/// Emits deltas for `user_sentiment`, `ai_sentiment`, `sentiment_delta`
/// (AI minus user) and `sentiment_trend`, the change in user polarity from
/// the first turn to the latest divided by the number of turns seen.
/// All values are multiplied by `scale` so the signals can drive metrics
/// with wider ranges.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    scale: f64,
    history: Vec<f64>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            history: Vec::new(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    fn trend(&self) -> f64 {
        match (self.history.first(), self.history.last()) {
            (Some(first), Some(last)) if self.history.len() >= 2 => (last - first) / self.history.len() as f64,
            _ => 0.0,
        }
    }
}

#[async_trait]
impl TurnAnalyzer for SentimentAnalyzer {
    fn name(&self) -> &str {
        "sentiment"
    }

    async fn analyze(&mut self, input: &AnalysisInput) -> Result<AnalyzerOutput, AnalyzerError> {
        let user = polarity(&input.user_text);
        let ai = polarity(&input.ai_text);
        self.history.push(user);

        Ok(AnalyzerOutput::new()
            .with_delta("user_sentiment", user * self.scale)
            .with_delta("ai_sentiment", ai * self.scale)
            .with_delta("sentiment_delta", (ai - user) * self.scale)
            .with_delta("sentiment_trend", self.trend() * self.scale))
    }
}
