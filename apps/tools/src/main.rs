use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::SharedDataLayer;
use shared::{
    domain::{ConsentChoice, ConsentStatus},
    store::ConsentStore,
};
use storage::Storage;
use tracing_subscriber::EnvFilter;

mod config;
mod simulation;

use config::{load_settings, normalize_database_url};
use simulation::simulate_visit;

/// Simulates page loads of the consent gate against a persistent origin store.
#[derive(Parser, Debug)]
#[command(name = "consent-tools")]
struct Cli {
    /// Settings file; defaults to ./consent.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    origin: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the page once without interacting.
    Load,
    /// Load the page and click Accept.
    Accept,
    /// Load the page and click Decline.
    Decline,
    /// Print the stored consent status for the origin.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }
    if let Some(origin) = cli.origin {
        settings.origin = origin;
    }

    let storage = Storage::new(&normalize_database_url(&settings.database_url)).await?;
    storage.health_check().await?;
    let store = storage.for_origin(&settings.origin)?;

    let choice = match cli.command {
        Command::Status => {
            let raw = store.get_item(&settings.consent.storage_key).await?;
            let status = ConsentStatus::from_stored(raw.as_deref())?;
            println!(
                "origin={} {}={} status={status:?}",
                store.origin(),
                settings.consent.storage_key,
                raw.as_deref().unwrap_or("<unset>")
            );
            for item in store.list_items().await? {
                println!("  {}={} (updated {})", item.key, item.value, item.updated_at);
            }
            return Ok(());
        }
        Command::Load => None,
        Command::Accept => Some(ConsentChoice::Accept),
        Command::Decline => Some(ConsentChoice::Decline),
    };

    let report = simulate_visit(
        store,
        settings.consent,
        SharedDataLayer::global(),
        choice,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
