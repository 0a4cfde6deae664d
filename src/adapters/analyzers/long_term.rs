//! Windowed metric trends.

use async_trait::async_trait;
use std::collections::VecDeque;

use crate::domain::analysis::AnalyzerOutput;
use crate::domain::metrics::{MetricsSnapshot, DEFAULT_TREND_WINDOW};
use crate::ports::{AnalysisInput, AnalyzerError, TurnAnalyzer};

/// Keeps the last `window` pre-turn snapshots and, once the window is full,
/// sets `<metric>_trend = (last - first) / window` for every metric.
///
/// The trend metrics only take effect when they are registered.
#[derive(Debug, Clone)]
pub struct LongTermTrendAnalyzer {
    window: usize,
    snapshots: VecDeque<MetricsSnapshot>,
}

impl Default for LongTermTrendAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_WINDOW)
    }
}

impl LongTermTrendAnalyzer {
    /// A window below 2 is raised to 2.
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            snapshots: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

/// Name of the trend metric derived from `metric`.
pub fn trend_metric_id(metric: &str) -> String {
    format!("{}_trend", metric)
}

#[async_trait]
impl TurnAnalyzer for LongTermTrendAnalyzer {
    fn name(&self) -> &str {
        "long_term_trend"
    }

    async fn analyze(&mut self, input: &AnalysisInput) -> Result<AnalyzerOutput, AnalyzerError> {
        if self.snapshots.len() == self.window {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(input.metrics.clone());

        let mut output = AnalyzerOutput::new();
        if self.snapshots.len() < self.window {
            return Ok(output);
        }

        let (Some(first), Some(last)) = (self.snapshots.front(), self.snapshots.back()) else {
            return Ok(output);
        };
        for (metric, latest) in last.iter() {
            if let Some(earliest) = first.get(metric) {
                output = output.with_absolute(trend_metric_id(metric), (latest - earliest) / self.window as f64);
            }
        }
        Ok(output)
    }
}
