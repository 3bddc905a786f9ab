mod cli;
mod docs;
mod error;
mod llm;
mod rag;
mod retry;
mod state;

use anyhow::Context;
use clap::Parser;

use cli::Cli;
use state::{AppState, RagConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing question: clap prints usage to stderr and exits nonzero.
    let cli = Cli::parse();

    let mut config = RagConfig::from_env().context("invalid configuration")?;
    cli.apply(&mut config);

    // stdout carries only the JSON result line.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let state = AppState::new(config).context("failed to initialize clients")?;
    let output = cli::ask(&state, &cli.question)
        .await
        .context("question answering failed")?;

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}
