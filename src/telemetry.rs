// src/telemetry.rs

//! Tracing setup.
//!
//! Two outputs:
//! - Human-readable console output, filtered by `RUST_LOG`
//! - The event log: one JSON object per line under `<root>/logs`,
//!   rotated daily and pruned after `retention_days` files
//!
//! The event log only receives request lifecycle events (target
//! `codegate::events`) and ignores `RUST_LOG`.
//!
//! The returned guard flushes the event log writer when dropped, so
//! it must live as long as the process.

use crate::config::LoggingConfig;
use crate::util::ensure_dir;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::Targets, fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub const LOG_FILE_PREFIX: &str = "app";
pub const LOG_FILE_SUFFIX: &str = "log";

/// Target used by `LogEventSink`.
pub const EVENTS_TARGET: &str = "codegate::events";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "codegate=info,tower_http=info".into())
}

/// Console logging only. Used by the one-shot CLI commands.
pub fn init_console() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(env_filter()))
        .try_init()
        .context("Failed to initialise tracing")
}

/// Console logging plus the rotating JSONL event log.
pub fn init_with_event_log(cfg: &LoggingConfig) -> Result<WorkerGuard> {
    let dir = cfg.log_dir();
    ensure_dir(&dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(cfg.retention_days.max(1))
        .build(&dir)
        .with_context(|| format!("Failed to open event log in {:?}", dir))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);

    event_log_subscriber(env_filter(), writer)
        .try_init()
        .context("Failed to initialise tracing")?;

    Ok(guard)
}

/// Registry with a console layer filtered by `console_filter` and a JSON
/// layer that only takes lifecycle events.
fn event_log_subscriber<W>(console_filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(console_filter))
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(Targets::new().with_target(EVENTS_TARGET, Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EndpointEvent, EventSink};
    use crate::sinks::LogEventSink;
    use serde_json::json;

    #[test]
    fn event_log_ignores_console_filter_and_other_targets() {
        let dir = tempfile::tempdir().unwrap();
        let writer = tracing_appender::rolling::never(dir.path(), "events.log");

        // console quieted down to warnings only
        let subscriber = event_log_subscriber(EnvFilter::new("warn"), writer);

        tracing::subscriber::with_default(subscriber, || {
            LogEventSink.emit(EndpointEvent::request("infer", json!({ "prompt": "x" })));
            LogEventSink.emit(EndpointEvent::response("infer", json!({ "code": "y" }), 12));
            LogEventSink.emit(EndpointEvent::error("infer", "backend down"));
            tracing::info!(target: "codegate::sandbox", "sandbox run started");
            tracing::error!(target: "codegate::server", "unrelated failure");
        });

        let log = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
        let lines: Vec<serde_json::Value> = log
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        let messages: Vec<&str> = lines
            .iter()
            .map(|l| l["message"].as_str().unwrap())
            .collect();
        assert_eq!(messages, vec!["request", "response", "error"]);
        assert_eq!(lines[1]["latency_ms"], 12);
        assert_eq!(lines[2]["level"], "ERROR");
    }
}
