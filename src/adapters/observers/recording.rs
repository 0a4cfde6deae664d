//! In-memory observer for tests and reports.

use std::sync::{Arc, Mutex};

use crate::ports::{SimulationEvent, SimulationEventKind, SimulationObserver};

/// Stores every event it receives, in order.
///
/// Clones share the same buffer, so one clone can be handed to an
/// orchestrator while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SimulationEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event kinds only, for compact assertions.
    pub fn kinds(&self) -> Vec<SimulationEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimulationObserver for RecordingObserver {
    fn on_event(&self, event: &SimulationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
