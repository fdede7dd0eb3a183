// src/lib.rs

//! Backend between an editor client and three external services:
//! a completion backend, a vector store, and a code sandbox.

pub mod auth;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod knowledge;
pub mod metrics;
pub mod postprocess;
pub mod prompt;
pub mod run_id;
pub mod sandbox;
pub mod scaffold;
pub mod server;
pub mod sinks;
pub mod telemetry;
pub mod util;
