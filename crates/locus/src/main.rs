use anyhow::Context;
use clap::{Parser, Subcommand};
use locus_common::protocol::{HealRequest, RawBatchHealRequest};
use locus_engine::{ConfigLoader, Healer, LocusConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Suggest replacements for broken UI locators", long_about = None)]
struct Args {
    /// Configuration file. Defaults to ./locus.yaml, then ~/.locus/config.yaml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Skip the context reranking pass
    #[arg(long, global = true)]
    no_rerank: bool,

    /// Skip vision hinting
    #[arg(long, global = true)]
    no_vision: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Heal a single request read from a JSON file
    Heal {
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Heal a batch of requests read from a JSON file
    Batch {
        #[arg(short, long)]
        requests: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays valid JSON.
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(args.config.as_deref()).await?;
    if args.no_rerank {
        config.rerank.enabled = false;
    }
    if args.no_vision {
        config.vision.enabled = false;
    }
    let healer = Healer::from_config(config);

    match args.command {
        Command::Heal { request } => {
            let request: HealRequest = read_json(&request).await?;
            match healer.heal(&request).await {
                Ok(response) => print_json(&response)?,
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Batch { requests } => {
            let batch: RawBatchHealRequest = read_json(&requests).await?;
            info!("Healing {} requests", batch.requests.len());
            match healer.heal_batch_raw(&batch).await {
                Ok(response) => print_json(&response)?,
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<LocusConfig> {
    match path {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ConfigLoader::load_default()
            .await
            .context("Failed to load default config"),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid request JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
