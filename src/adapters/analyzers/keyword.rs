//! Custom metrics driven by keyword lists or regular expressions.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::domain::analysis::AnalyzerOutput;
use crate::ports::{AnalysisInput, AnalyzerError, TurnAnalyzer};

/// How a rule counts hits in the turn text.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Number of distinct keywords present (case-insensitive substring).
    Keywords(Vec<String>),
    /// Number of non-overlapping matches of a case-insensitive regex.
    Regex(Regex),
}

/// One custom metric: `delta = min(hits * weight, cap)`.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub metric: String,
    pub matcher: Matcher,
    pub weight: f64,
    pub cap: f64,
}

impl KeywordRule {
    pub fn keywords<I, S>(metric: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metric: metric.into(),
            matcher: Matcher::Keywords(keywords.into_iter().map(|k| k.into().to_lowercase()).collect()),
            weight: 1.0,
            cap: 1.0,
        }
    }

    /// Compiles `pattern` case-insensitively.
    pub fn regex(metric: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            metric: metric.into(),
            matcher: Matcher::Regex(regex),
            weight: 1.0,
            cap: 1.0,
        })
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_cap(mut self, cap: f64) -> Self {
        self.cap = cap;
        self
    }

    fn hits(&self, text: &str) -> usize {
        match &self.matcher {
            Matcher::Keywords(keywords) => {
                let lowered = text.to_lowercase();
                keywords.iter().filter(|k| lowered.contains(k.as_str())).count()
            }
            Matcher::Regex(regex) => regex.find_iter(text).count(),
        }
    }

    fn score(&self, text: &str) -> f64 {
        (self.hits(text) as f64 * self.weight).min(self.cap)
    }
}

/// Applies every configured [`KeywordRule`] to the combined turn text.
#[derive(Debug, Clone, Default)]
pub struct KeywordMetricAnalyzer {
    rules: Vec<KeywordRule>,
}

impl KeywordMetricAnalyzer {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

#[async_trait]
impl TurnAnalyzer for KeywordMetricAnalyzer {
    fn name(&self) -> &str {
        "keyword_metrics"
    }

    async fn analyze(&mut self, input: &AnalysisInput) -> Result<AnalyzerOutput, AnalyzerError> {
        let text = format!("{} {}", input.user_text, input.ai_text);
        let mut output = AnalyzerOutput::new();
        for rule in &self.rules {
            output = output.with_delta(rule.metric.as_str(), rule.score(&text));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::MetricSignal;
    use crate::domain::metrics::MetricsSnapshot;

    fn input(user: &str, ai: &str) -> AnalysisInput {
        AnalysisInput {
            turn: 1,
            user_text: user.into(),
            ai_text: ai.into(),
            stage_id: "discovery".into(),
            metrics: MetricsSnapshot::new(),
        }
    }

    #[tokio::test]
    async fn counts_distinct_keywords_case_insensitively() {
        let rule = KeywordRule::keywords("urgency", ["ASAP", "deadline", "urgent"])
            .with_weight(2.0)
            .with_cap(10.0);
        let mut analyzer = KeywordMetricAnalyzer::new(vec![rule]);

        let output = analyzer
            .analyze(&input("We need this asap, asap!", "Understood, the Deadline is noted"))
            .await
            .unwrap();
        assert_eq!(output.get("urgency"), Some(MetricSignal::Delta(4.0)));
    }

    #[tokio::test]
    async fn regex_counts_every_match() {
        let rule = KeywordRule::regex("budget", r"\$\d+").unwrap().with_cap(5.0);
        let mut analyzer = KeywordMetricAnalyzer::new(vec![rule]);

        let output = analyzer.analyze(&input("$100 or $200?", "$150 works")).await.unwrap();
        assert_eq!(output.get("budget"), Some(MetricSignal::Delta(3.0)));
    }

    #[tokio::test]
    async fn score_is_capped() {
        let rule = KeywordRule::keywords("interest", ["demo", "trial", "pricing"]).with_weight(5.0);
        let mut analyzer = KeywordMetricAnalyzer::new(vec![rule]);

        let output = analyzer.analyze(&input("demo and trial pricing", "")).await.unwrap();
        assert_eq!(output.get("interest"), Some(MetricSignal::Delta(1.0)));
    }

    #[tokio::test]
    async fn no_hits_emits_zero() {
        let rule = KeywordRule::keywords("interest", ["demo"]);
        let mut analyzer = KeywordMetricAnalyzer::new(vec![rule]);

        let output = analyzer.analyze(&input("hello", "hi")).await.unwrap();
        assert_eq!(output.get("interest"), Some(MetricSignal::Delta(0.0)));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(KeywordRule::regex("broken", "(unclosed").is_err());
    }
}
