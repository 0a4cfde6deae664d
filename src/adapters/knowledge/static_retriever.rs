//! In-memory knowledge table matched by keywords.

use async_trait::async_trait;

use crate::ports::{KnowledgeRetriever, RetrievalError};

/// Passages returned per query unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// One passage and the words that make it relevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub topic: String,
    keywords: Vec<String>,
    pub text: String,
}

impl KnowledgeEntry {
    /// The topic itself always counts as a keyword.
    pub fn new(topic: impl Into<String>, text: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            keywords: vec![topic.to_lowercase()],
            topic,
            text: text.into(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for keyword in keywords {
            let keyword = keyword.into().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Distinct keywords found in the lowercased query.
    fn hits(&self, lowered: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| !k.is_empty() && lowered.contains(k.as_str()))
            .count()
    }

    fn render(&self) -> String {
        if self.topic.is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", self.topic, self.text)
        }
    }
}

/// Returns up to `top_k` entries ranked by keyword hits.
///
/// Entries with the same number of hits keep their table order. Matching is
/// a case-insensitive substring test, so "APIs" matches the keyword "api".
#[derive(Debug, Clone)]
pub struct StaticKnowledgeRetriever {
    entries: Vec<KnowledgeEntry>,
    top_k: usize,
}

impl StaticKnowledgeRetriever {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synchronous lookup behind [`KnowledgeRetriever::retrieve`].
    pub fn lookup(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        if lowered.trim().is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(usize, &KnowledgeEntry)> = self
            .entries
            .iter()
            .map(|entry| (entry.hits(&lowered), entry))
            .filter(|(hits, _)| *hits > 0)
            .collect();
        // stable: ties keep table order
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        ranked
            .into_iter()
            .take(self.top_k)
            .map(|(_, entry)| entry.render())
            .collect()
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticKnowledgeRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<String>, RetrievalError> {
        let passages = self.lookup(query);
        tracing::trace!(matched = passages.len(), "Static knowledge lookup");
        Ok(passages)
    }
}
