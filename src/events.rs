// src/events.rs

//! Request lifecycle events.
//!
//! Every endpoint emits:
//! - `request` when a call arrives
//! - `response` with the latency when it succeeds
//! - `error` when it fails
//!
//! Events go to an `EventSink`. The production sink writes them to the
//! JSONL event log; tests collect them in memory.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Request,
    Response,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointEvent {
    pub endpoint: &'static str,
    pub kind: EventKind,

    /// Request payload, response body, or error message.
    pub body: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl EndpointEvent {
    pub fn request(endpoint: &'static str, payload: Value) -> Self {
        Self {
            endpoint,
            kind: EventKind::Request,
            body: payload,
            latency_ms: None,
        }
    }

    pub fn response(endpoint: &'static str, response: Value, latency_ms: u64) -> Self {
        Self {
            endpoint,
            kind: EventKind::Response,
            body: response,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn error(endpoint: &'static str, error: impl Into<String>) -> Self {
        Self {
            endpoint,
            kind: EventKind::Error,
            body: Value::String(error.into()),
            latency_ms: None,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EndpointEvent);
}
