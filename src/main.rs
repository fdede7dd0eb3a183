// src/main.rs

//! codegate
//!
//! Entry point for the codegate binary.
//!
//! Responsibilities of this file:
//! - Load `.env`
//! - Parse CLI arguments
//! - Hand off to the command dispatcher

use anyhow::Result;
use clap::Parser;
use codegate::{cli, commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    commands::run(cli).await
}
