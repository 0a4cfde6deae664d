//! Knowledge retriever adapters.

mod static_retriever;

pub use static_retriever::{KnowledgeEntry, StaticKnowledgeRetriever, DEFAULT_TOP_K};
