//! Analyzer pipeline configuration

use serde::Deserialize;

use crate::adapters::analyzers::KeywordRule;

use super::error::ValidationError;

/// Which reference analyzers run, and their settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalyzersConfig {
    #[serde(default = "default_true")]
    pub sentiment: bool,

    /// Multiplier applied to sentiment signals
    #[serde(default = "default_sentiment_scale")]
    pub sentiment_scale: f64,

    #[serde(default = "default_true")]
    pub topic_coherence: bool,

    /// Window for `<metric>_trend` signals; disabled when absent
    #[serde(default)]
    pub long_term_window: Option<usize>,

    /// Runs the flow analyzer, which needs a classifier to contribute
    #[serde(default)]
    pub conversation_flow: bool,

    /// Keyword/regex driven metrics
    #[serde(default)]
    pub custom_metrics: Vec<CustomMetricConfig>,
}

/// One keyword or regex metric. Exactly as in the analyzer:
/// `delta = min(hits * weight, max)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomMetricConfig {
    pub metric: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Used instead of keywords when present
    #[serde(default)]
    pub regex: Option<String>,

    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(default = "default_max")]
    pub max: f64,
}

impl CustomMetricConfig {
    /// Builds the analyzer rule, compiling the regex if there is one.
    pub fn to_rule(&self) -> Result<KeywordRule, ValidationError> {
        let rule = match &self.regex {
            Some(pattern) => KeywordRule::regex(self.metric.as_str(), pattern).map_err(|e| {
                ValidationError::InvalidRegex {
                    metric: self.metric.clone(),
                    message: e.to_string(),
                }
            })?,
            None if !self.keywords.is_empty() => KeywordRule::keywords(self.metric.as_str(), self.keywords.iter().cloned()),
            None => return Err(ValidationError::CustomMetricWithoutMatcher(self.metric.clone())),
        };
        Ok(rule.with_weight(self.weight).with_cap(self.max))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.weight.is_finite() || !self.max.is_finite() || self.max < 0.0 {
            return Err(ValidationError::InvalidCustomMetricScale {
                metric: self.metric.clone(),
            });
        }
        self.to_rule().map(|_| ())
    }
}

impl AnalyzersConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.long_term_window, Some(w) if w < 2) {
            return Err(ValidationError::InvalidTrendWindow);
        }
        for custom in &self.custom_metrics {
            custom.validate()?;
        }
        Ok(())
    }
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            sentiment: true,
            sentiment_scale: default_sentiment_scale(),
            topic_coherence: true,
            long_term_window: None,
            conversation_flow: false,
            custom_metrics: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sentiment_scale() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

fn default_max() -> f64 {
    1.0
}
