//! Configuration management for pairing-bot

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub zulip: ZulipConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Zulip connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZulipConfig {
    /// Zulip server base URL
    #[serde(default = "default_site")]
    pub site: String,
    /// Bot account email
    pub email: String,
    /// Bot API key
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Streams to subscribe to; empty means every stream on the server
    #[serde(default)]
    pub subscribed_streams: Vec<String>,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the embedded record database
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("ZULIP_EMAIL").context("ZULIP_EMAIL not set")?;
        let api_key = std::env::var("ZULIP_API_KEY").context("ZULIP_API_KEY not set")?;

        let site = std::env::var("ZULIP_SITE").unwrap_or_else(|_| default_site());
        let path = std::env::var("PAIRING_BOT_DB").unwrap_or_else(|_| default_db_path());

        Ok(Config {
            zulip: ZulipConfig {
                site,
                email,
                api_key,
                subscribed_streams: Vec::new(),
            },
            store: StoreConfig { path },
        })
    }
}

fn default_site() -> String {
    "https://recurse.zulipchat.com".to_string()
}

fn default_api_key() -> String {
    std::env::var("ZULIP_API_KEY").unwrap_or_default()
}

fn default_db_path() -> String {
    "pairing-bot.redb".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}
