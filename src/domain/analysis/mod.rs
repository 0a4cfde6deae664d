//! Analyzer output types and their reduction into metric deltas.

mod signal;

pub use signal::{AnalyzerOutput, DeltaAccumulator, MetricSignal};
