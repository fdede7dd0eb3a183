// src/commands.rs

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::knowledge::{KnowledgeBase, LocalVectorStore};
use crate::{ingest, metrics, scaffold, server, telemetry};

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => {
            telemetry::init_console()?;
            scaffold::init_config(&cli.config)
        }

        Command::Serve { addr } => {
            let mut cfg = Config::load(&cli.config)?;

            // CLI overrides
            if let Some(a) = addr {
                cfg.server.addr = a;
            }

            let _guard = telemetry::init_with_event_log(&cfg.logging)?;
            server::serve(cfg).await
        }

        Command::Ingest { dir } => {
            telemetry::init_console()?;
            let cfg = Config::load(&cli.config)?;

            let store = LocalVectorStore::open(&cfg.knowledge.path).with_context(|| {
                format!("Failed to open vector store at {:?}", cfg.knowledge.path)
            })?;
            let kb = KnowledgeBase::new(Arc::new(store));

            let added = ingest::ingest_dir(&kb, &dir).await?;
            eprintln!("Added {} document(s) from {}", added, dir.display());
            Ok(())
        }

        Command::Metrics { log_dir, out } => {
            telemetry::init_console()?;
            let cfg = Config::load(&cli.config)?;
            let log_dir = log_dir.unwrap_or_else(|| cfg.logging.log_dir());

            let stats = metrics::aggregate_dir(&log_dir, Utc::now().date_naive())?;
            let path = metrics::write_csv(&out, &stats)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        }
    }
}
