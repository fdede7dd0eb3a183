// src/util.rs

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

/// Ensure a directory exists (create it if missing).
///
/// This is used when:
/// - creating the event log directory
/// - writing metrics reports
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {:?}", path))
}

/// Milliseconds since `start`, saturating.
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
