//! Reference [`TurnAnalyzer`](crate::ports::TurnAnalyzer) implementations.
//!
//! These are deliberately simple heuristics (lexicons, term overlap,
//! keyword counts). They exist to drive metrics in simulations, not to be
//! accurate language understanding.

mod flow;
mod keyword;
mod long_term;
mod sentiment;
mod text;
mod topic;

pub use flow::{
    ConversationElement, ConversationFlowAnalyzer, ElementClassifier, UnimplementedClassifier,
    CONVERSATION_FLOW_SCORE,
};
pub use keyword::{KeywordMetricAnalyzer, KeywordRule, Matcher};
pub use long_term::{trend_metric_id, LongTermTrendAnalyzer};
pub use sentiment::{polarity, SentimentAnalyzer};
pub use topic::{TopicCoherenceAnalyzer, TOPIC_COHERENCE};
