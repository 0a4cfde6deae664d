//! Dialogue Stages - Stage-tracking conversation simulator
//!
//! A simulated AI persona moves through interaction stages (rapport,
//! discovery, objection, ...) as decaying metrics respond to each turn.
//! Stage changes are gated by a learned transition-probability matrix, and
//! triggers or end phrases can cut a conversation short.
//!
//! Layout follows a hexagonal split: `domain` holds the engine, `ports`
//! the seams to generators, analyzers and observers, `adapters` their
//! implementations, and `application` the per-turn orchestration.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
