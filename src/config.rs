//! Configuration
//!
//! Values come from an optional TOML file, `POLYBOT__SECTION__KEY`
//! environment variables, and finally the `POLYMARKET_*` variables the
//! desk has always read from `.env`.

use crate::error::{BotError, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Historical environment variables, in the order they are reported when missing
pub const ENV_HOST: &str = "POLYMARKET_HOST";
pub const ENV_PRIVATE_KEY: &str = "POLYMARKET_KEY";
pub const ENV_API_KEY: &str = "POLYMARKET_API_KEY";
pub const ENV_API_SECRET: &str = "POLYMARKET_API_SECRET";
pub const ENV_API_PASSPHRASE: &str = "POLYMARKET_API_PASSPHRASE";
pub const ENV_PROXY_ADDRESS: &str = "POLYMARKET_PROXY_ADDRESS";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub api_passphrase: String,
    /// Proxy wallet that holds the funds (order maker)
    #[serde(default)]
    pub proxy_address: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// 0 = EOA, 1 = Polymarket proxy, 2 = Gnosis safe
    #[serde(default = "default_signature_type")]
    pub signature_type: u8,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            private_key: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
            proxy_address: String::new(),
            chain_id: default_chain_id(),
            signature_type: default_signature_type(),
        }
    }
}

fn default_host() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_chain_id() -> u64 {
    137
}

fn default_signature_type() -> u8 {
    1
}

/// Where the flat files live
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_scheduled_tasks")]
    pub scheduled_tasks: String,
    #[serde(default = "default_orders_to_run")]
    pub orders_to_run: String,
    /// Directory receiving market exports
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            scheduled_tasks: default_scheduled_tasks(),
            orders_to_run: default_orders_to_run(),
            export_dir: default_export_dir(),
        }
    }
}

impl FilesConfig {
    pub fn scheduled_tasks_path(&self) -> PathBuf {
        expand(&self.scheduled_tasks)
    }

    pub fn orders_to_run_path(&self) -> PathBuf {
        expand(&self.orders_to_run)
    }

    pub fn export_dir(&self) -> PathBuf {
        expand(&self.export_dir)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn default_scheduled_tasks() -> String {
    "scheduled_tasks.csv".to_string()
}

fn default_orders_to_run() -> String {
    "orders_to_run.csv".to_string()
}

fn default_export_dir() -> String {
    ".".to_string()
}

/// Scheduled task runner settings
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_gtd_buffer_secs")]
    pub gtd_expiration_buffer_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            gtd_expiration_buffer_secs: default_gtd_buffer_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_gtd_buffer_secs() -> u64 {
    crate::types::GTD_EXPIRATION_BUFFER_SECS
}

impl Config {
    /// Load from `path` (optional) and the environment
    pub fn load(path: &str) -> Result<Self> {
        let overrides = [
            ("polymarket.host", ENV_HOST),
            ("polymarket.private_key", ENV_PRIVATE_KEY),
            ("polymarket.api_key", ENV_API_KEY),
            ("polymarket.api_secret", ENV_API_SECRET),
            ("polymarket.api_passphrase", ENV_API_PASSPHRASE),
            ("polymarket.proxy_address", ENV_PROXY_ADDRESS),
        ];

        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("POLYBOT")
                    .prefix_separator("__")
                    .separator("__"),
            );

        for (key, var) in overrides {
            let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Check credentials before the client is built.
    ///
    /// Host, private key and proxy address are always required. The API key,
    /// secret and passphrase come as a set: all three, or none of them (the
    /// client then derives them from the private key).
    pub fn validate(&self) -> Result<()> {
        let pm = &self.polymarket;
        let mut required = vec![
            (ENV_HOST, &pm.host),
            (ENV_PRIVATE_KEY, &pm.private_key),
        ];
        if !self.derive_api_credentials() {
            required.push((ENV_API_KEY, &pm.api_key));
            required.push((ENV_API_SECRET, &pm.api_secret));
            required.push((ENV_API_PASSPHRASE, &pm.api_passphrase));
        }
        required.push((ENV_PROXY_ADDRESS, &pm.proxy_address));

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BotError::Config(format!(
                "Missing environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    /// True when no API credential is configured at all
    pub fn derive_api_credentials(&self) -> bool {
        let pm = &self.polymarket;
        [&pm.api_key, &pm.api_secret, &pm.api_passphrase]
            .iter()
            .all(|v| v.trim().is_empty())
    }
}
