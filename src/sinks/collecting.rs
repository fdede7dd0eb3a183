// src/sinks/collecting.rs

use crate::events::{EndpointEvent, EventSink};
use std::sync::Mutex;

/// An in-memory event sink.
///
/// Used by tests to assert on what the handlers reported.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<EndpointEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all collected events, in emission order.
    pub fn events(&self) -> Vec<EndpointEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: EndpointEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
