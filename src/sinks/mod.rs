// src/sinks/mod.rs

pub mod collecting;
pub mod log;

pub use collecting::CollectingEventSink;
pub use log::LogEventSink;
