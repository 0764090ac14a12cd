// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rengo CLI - headless chat front end
//!
//! Reads `<channel> <user> <command> [args]` lines from stdin or a script
//! file and prints the bot's replies. Game state lives in the configured
//! state directory and survives restarts.

use anyhow::{Context, Result};
use clap::Parser;
use rengo_cli::{load_config, Bot};
use rengo_core::{JsonFileStore, Registry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(name = "rengo", about = "Team Go sessions for chat channels", version)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Override the state directory from the config
    #[clap(long)]
    state_dir: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[clap(short, long)]
    script: Option<PathBuf>,

    /// Enable debug logging
    #[clap(long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(state_dir) = args.state_dir {
        config.state_dir = state_dir;
    }

    let store = JsonFileStore::open(&config.state_dir)
        .with_context(|| format!("Failed to open state directory {}", config.state_dir.display()))?;
    let state_dir = store.dir().display().to_string();
    let registry = Registry::load(Arc::new(store))?;
    tracing::info!(
        %state_dir,
        active_games = registry.channels().len(),
        "Rengo bot ready"
    );

    let bot = Bot::new(registry, config);

    match args.script {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            run(&bot, BufReader::new(file)).await
        }
        None => run(&bot, BufReader::new(tokio::io::stdin())).await,
    }
}

/// Feed every input line to the bot until EOF or Ctrl+C
async fn run(bot: &Bot, input: impl AsyncBufRead + Unpin) -> Result<()> {
    let mut lines = input.lines();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }

            result = lines.next_line() => {
                let line = match result {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => return Err(e).context("Error reading input"),
                };

                if let Some(reply) = bot.handle(&line) {
                    println!("{}", reply);
                }
            }
        }
    }

    Ok(())
}
