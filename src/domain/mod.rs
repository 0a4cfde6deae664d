//! Domain layer: metrics, stages and the stage-transition engine.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, errors)
//! - `metrics` - Bounded, decaying conversation metrics
//! - `stages` - Stages with soft metric conditions
//! - `transition` - Stochastic stage-transition engine and conversation context
//! - `triggers` - Threshold predicates that fire operator actions
//! - `analysis` - Analyzer signals and their reduction into deltas

pub mod analysis;
pub mod foundation;
pub mod metrics;
pub mod stages;
pub mod transition;
pub mod triggers;
