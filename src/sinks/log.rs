// src/sinks/log.rs

use crate::events::{EndpointEvent, EventKind, EventSink};
use crate::telemetry::EVENTS_TARGET;
use serde_json::Value;

/// Writes lifecycle events through `tracing` under the `codegate::events`
/// target, which the JSON log layer turns into one line per event.
///
/// Run results also carry a top-level `status` field so the metrics
/// aggregator can count passes without re-parsing the body.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: EndpointEvent) {
        let endpoint = event.endpoint;

        match event.kind {
            EventKind::Request => {
                tracing::info!(
                    target: EVENTS_TARGET,
                    endpoint,
                    payload = %event.body,
                    "request"
                );
            }
            EventKind::Response => {
                let latency_ms = event.latency_ms.unwrap_or_default();
                match event.body.get("status").and_then(Value::as_str) {
                    Some(status) => tracing::info!(
                        target: EVENTS_TARGET,
                        endpoint,
                        response = %event.body,
                        latency_ms,
                        status,
                        "response"
                    ),
                    None => tracing::info!(
                        target: EVENTS_TARGET,
                        endpoint,
                        response = %event.body,
                        latency_ms,
                        "response"
                    ),
                }
            }
            EventKind::Error => {
                let error = event.body.as_str().unwrap_or_default();
                tracing::error!(target: EVENTS_TARGET, endpoint, error, "error");
            }
        }
    }
}
