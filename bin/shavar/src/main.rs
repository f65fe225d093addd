//! Shavar CLI - Command-line client for chunked blocklist services.
//!
//! Provides commands for:
//! - One-shot list updates
//! - URL lookups against the mirrored lists
//! - A continuous polling loop

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use shavar_client::{Client, ClientConfig};
use shavar_core::ListName;
use shavar_store::MemoryStore;

/// Shavar blocklist client CLI.
#[derive(Parser)]
#[command(name = "shavar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Base URL of the list service
    #[arg(long)]
    server: String,

    /// API key
    #[arg(long)]
    key: String,

    /// Scratch-state file path
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Lists to operate on, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    lists: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the configured lists once
    Update {
        /// Poll even when no list is due
        #[arg(long)]
        force: bool,
    },

    /// Look a URL up against the mirrored lists
    Lookup {
        /// URL to check
        url: String,
    },

    /// Poll continuously, sleeping until the next deadline
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting tracing subscriber")?;

    let lists = cli
        .lists
        .iter()
        .map(|name| ListName::new(name))
        .collect::<Result<Vec<_>, _>>()
        .context("parsing list names")?;

    let mut config = ClientConfig::new(cli.server, cli.key);
    if let Some(path) = cli.data_file {
        config.data_file_path = path;
    }

    let store = Arc::new(MemoryStore::new());
    let client = Client::new(config, store).context("constructing client")?;

    match cli.command {
        Commands::Update { force } => {
            let wait = if force {
                client.force_update(&lists).await
            } else {
                client.update(&lists).await
            };
            println!("next poll in {}s", wait.as_secs());
        }

        Commands::Lookup { url } => {
            // The in-memory store starts cold; mirror the lists first.
            client.force_update(&lists).await;
            let matches = client.lookup(&lists, &url).await?;
            if matches.is_empty() {
                println!("{url}: clean");
            } else {
                for list in matches {
                    println!("{url}: listed on {list}");
                }
            }
        }

        Commands::Watch => loop {
            let wait = client.update(&lists).await;
            // Never spin, never oversleep a short server deadline.
            let wait = wait.clamp(Duration::from_secs(1), Duration::from_secs(3600));
            info!(secs = wait.as_secs(), "sleeping until next poll");
            tokio::time::sleep(wait).await;
        },
    }

    Ok(())
}
