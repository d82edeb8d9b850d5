//! Pairing Bot for Zulip
//!
//! Listens for private messages, lets users register pairing interests
//! with `add`/`remove`/`list`, and answers `search` queries for people
//! who share an interest.

mod bot;
mod command;
mod config;
mod errors;
mod health;
#[cfg(test)]
mod mocks;
mod registry;
mod store;
mod zulip;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::PairingBot;
use crate::config::Config;
use crate::health::AppState;
use crate::registry::InterestRegistry;
use crate::store::RedbStore;
use crate::zulip::ZulipClient;

/// Pairing Bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/pairing-bot.toml")]
    config: String,

    /// Zulip server URL (overrides config file)
    #[arg(long, env = "ZULIP_SITE")]
    site: Option<String>,

    /// Bot account email (overrides config file)
    #[arg(long, env = "ZULIP_EMAIL")]
    email: Option<String>,

    /// Bot API key (overrides config file)
    #[arg(long, env = "ZULIP_API_KEY")]
    api_key: Option<String>,

    /// Record database path (overrides config file)
    #[arg(long, env = "PAIRING_BOT_DB")]
    db: Option<String>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3000")]
    health_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pairing_bot=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pairing Bot");

    let args = Args::parse();

    // Load configuration
    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, reading environment");
        Config::from_env()?
    };

    // Override with CLI arguments
    if let Some(site) = args.site {
        config.zulip.site = site;
    }
    if let Some(email) = args.email {
        config.zulip.email = email;
    }
    if let Some(api_key) = args.api_key {
        config.zulip.api_key = api_key;
    }
    if let Some(db) = args.db {
        config.store.path = db;
    }

    let store = RedbStore::open(std::path::Path::new(&config.store.path))
        .with_context(|| format!("Failed to open record store at {}", config.store.path))?;
    let registry = InterestRegistry::new(store);
    let client = ZulipClient::new(&config.zulip);

    // Health check server
    let health = AppState::new(Some(config.zulip.email.clone()));
    {
        let health = health.clone();
        let port = args.health_port;
        tokio::spawn(async move {
            if let Err(e) = health::start_health_server(health, port).await {
                error!("Health server failed: {}", e);
            }
        });
    }

    let bot = PairingBot::new(client, registry, &config.zulip, health);
    if let Err(e) = bot.run().await {
        error!(error = %e, "Pairing bot exited with error");
        std::process::exit(1);
    }

    Ok(())
}
