// src/metrics.rs

//! Daily usage report built from the JSONL event log.
//!
//! This module counts, for one UTC day:
//! - Incoming requests
//! - Average response latency
//! - Error events
//! - Sandbox runs, and how many of them passed
//!
//! Lines that are not JSON, carry no timestamp, or belong to another day
//! are ignored.

use crate::telemetry::LOG_FILE_PREFIX;
use crate::util::ensure_dir;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: String,
    pub total_requests: u64,
    pub avg_latency_ms: f64,
    pub errors: u64,
    pub tests_total: u64,
    pub tests_passed: u64,
}

/// Aggregate log lines for `date`.
pub fn aggregate_lines<'a, I>(lines: I, date: NaiveDate) -> DailyStats
where
    I: IntoIterator<Item = &'a str>,
{
    let day = date.format("%Y-%m-%d").to_string();

    let mut stats = DailyStats {
        date: day.clone(),
        total_requests: 0,
        avg_latency_ms: 0.0,
        errors: 0,
        tests_total: 0,
        tests_passed: 0,
    };
    let mut latencies: Vec<f64> = Vec::new();

    for line in lines {
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };

        match entry.get("timestamp").and_then(Value::as_str) {
            Some(ts) if ts.starts_with(&day) => {}
            _ => continue,
        }

        let message = entry.get("message").and_then(Value::as_str);
        let endpoint = entry.get("endpoint").and_then(Value::as_str);

        match message {
            Some("request") => stats.total_requests += 1,
            Some("response") => {
                if let Some(ms) = entry.get("latency_ms").and_then(Value::as_f64) {
                    latencies.push(ms);
                }
                if endpoint == Some("run-tests") {
                    stats.tests_total += 1;
                    if entry.get("status").and_then(Value::as_str) == Some("passed") {
                        stats.tests_passed += 1;
                    }
                }
            }
            _ => {}
        }

        if entry.get("level").and_then(Value::as_str) == Some("ERROR") {
            stats.errors += 1;
        }
    }

    if !latencies.is_empty() {
        stats.avg_latency_ms = latencies.iter().sum::<f64>() / latencies.len() as f64;
    }

    stats
}

/// Aggregate every event log file in `dir`.
pub fn aggregate_dir(dir: &Path, date: NaiveDate) -> Result<DailyStats> {
    if !dir.is_dir() {
        bail!("Log directory not found: {}", dir.display());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {:?}", dir))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(LOG_FILE_PREFIX))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut content = String::new();
    for file in &files {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read log file {:?}", file))?;
        content.push_str(&raw);
        content.push('\n');
    }

    Ok(aggregate_lines(content.lines(), date))
}

/// Write `<out_dir>/<date>.csv` with a header row.
pub fn write_csv(out_dir: &Path, stats: &DailyStats) -> Result<PathBuf> {
    ensure_dir(out_dir)?;
    let path = out_dir.join(format!("{}.csv", stats.date));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.serialize(stats).context("Failed to write metrics row")?;
    writer.flush().context("Failed to flush metrics file")?;

    Ok(path)
}
