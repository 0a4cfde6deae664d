//! Knowledge retriever port: background passages for the persona's prompt.

use async_trait::async_trait;

/// Looks up passages relevant to what the operator just said.
///
/// Implementations may front a static table, a vector store or a database.
/// Results are ordered most relevant first; an empty list means nothing
/// matched.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, RetrievalError>;
}

/// Retrieval failures. The turn continues without knowledge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetrievalError {
    #[error("Knowledge source unavailable: {0}")]
    Unavailable(String),

    #[error("Knowledge retrieval timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
