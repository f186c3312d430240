pub mod schema;

pub use schema::BridgeConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration problems that prevent the bridge from starting.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("AAP_BASE_URL is not set. Provide AAP_BASE_URL and either AAP_TOKEN or AAP_USERNAME/AAP_PASSWORD.")]
    MissingBaseUrl,

    #[error("invalid base URL '{0}': {1}")]
    InvalidBaseUrl(String, String),

    #[error("no credentials configured: set AAP_TOKEN, or both AAP_USERNAME and AAP_PASSWORD")]
    MissingCredentials,

    #[error("invalid timeout '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),
}

/// Default config file location (~/.aap-bridge/config.toml).
pub fn default_config_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".aap-bridge").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".aap-bridge/config.toml"))
}

/// Load config from the given path, or return defaults if it does not exist.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read bridge config file")?;
        let config: BridgeConfig =
            toml::from_str(&contents).context("Failed to parse bridge config (TOML)")?;
        Ok(config)
    } else {
        debug!("No config file at {}, using defaults", path.display());
        Ok(BridgeConfig::default())
    }
}

/// Resolve the effective configuration: file, then `.env`, then process
/// environment.
pub fn resolve_config(path: &Path) -> Result<BridgeConfig> {
    let mut config = load_config(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    match dotenvy::dotenv() {
        Ok(env_path) => debug!("Loaded environment from {}", env_path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("Failed to load .env file"),
    }

    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}
