use clap::Parser;
use docqa_cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    run(Cli::parse()).await
}
