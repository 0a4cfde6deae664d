//! Knowledge retrieval configuration

use serde::Deserialize;

use crate::adapters::knowledge::{KnowledgeEntry, StaticKnowledgeRetriever, DEFAULT_TOP_K};

use super::error::ValidationError;

/// Static knowledge table consulted before each reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeConfig {
    /// Passages added to the prompt per turn
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub entries: Vec<KnowledgeEntryConfig>,
}

/// One passage. The topic is matched as a keyword too.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeEntryConfig {
    pub topic: String,

    pub text: String,

    #[serde(default)]
    pub keywords: Vec<String>,
}

impl KnowledgeConfig {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_retriever(&self) -> StaticKnowledgeRetriever {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                KnowledgeEntry::new(entry.topic.as_str(), entry.text.as_str()).with_keywords(entry.keywords.iter().cloned())
            })
            .collect();
        StaticKnowledgeRetriever::new(entries).with_top_k(self.top_k)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.top_k == 0 {
            return Err(ValidationError::InvalidKnowledgeTopK);
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.topic.trim().is_empty() || entry.text.trim().is_empty() {
                return Err(ValidationError::IncompleteKnowledgeEntry(index));
            }
        }
        Ok(())
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            entries: Vec::new(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
