//! # docqa-cli
//!
//! The `docqa` command: `ingest` builds an index from a directory of extracted
//! text, `ask` answers one question, and `chat` runs an interactive loop.
//! Providers are reached through an OpenAI-compatible API configured by flags
//! or environment variables (a `.env` file is loaded first).

pub mod cli;
pub mod commands;

use std::sync::Arc;

use anyhow::Result;
use docqa_telemetry::{QueryTraceStore, init_with_store};

pub use cli::{Cli, Command};

/// Install logging and dispatch the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let traces = Arc::new(QueryTraceStore::new());
    init_with_store(cli.log_format, traces.clone())?;

    match &cli.command {
        Command::Ingest(args) => commands::ingest(args, &cli.provider).await,
        Command::Ask(args) => commands::ask(args, &cli.provider, &traces).await,
        Command::Chat(args) => commands::chat(args, &cli.provider, &traces).await,
    }
}
