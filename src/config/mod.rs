use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const APPLICATION_NAME: &str = "banlog";
const DEFAULT_CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DB_FILENAME: &str = "banlog.db";

/// Immutable application configuration, resolved once at startup and passed
/// by reference into every operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path of the SQLite database file. Defaults to the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_filepath: Option<String>,

    /// telegra.ph access token for publishing reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegraph_access_token: Option<String>,

    /// ipgeolocation.io API key for resolving ban action IPs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipgeolocation_api_key: Option<String>,

    /// Google AI API key; when absent, reports are generated without insights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_ai_api_key: Option<String>,
}

impl Config {
    /// Load the configuration from `custom_path`, or from the default
    /// location (`$XDG_CONFIG_HOME/banlog/config.json`, falling back to
    /// `~/.config/banlog/config.json`). A missing default file is created
    /// with defaults on first run. Environment variables override file
    /// values afterwards.
    pub fn load(custom_path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = match custom_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let bytes = fs::read(&config_path)
                .with_context(|| format!("failed to read config file '{}'", config_path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse config file '{}'", config_path.display()))?
        } else if custom_path.is_none() {
            let config = Self::default();
            if let Err(e) = write_default_config(&config_path, &config) {
                tracing::warn!("failed to create default config file: {e:#}");
            } else {
                info!("created default config file: '{}'", config_path.display());
            }
            config
        } else {
            anyhow::bail!("config file '{}' does not exist", config_path.display());
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        for (var, field) in [
            ("BANLOG_DB_FILEPATH", &mut self.db_filepath),
            (
                "BANLOG_TELEGRAPH_ACCESS_TOKEN",
                &mut self.telegraph_access_token,
            ),
            (
                "BANLOG_IPGEOLOCATION_API_KEY",
                &mut self.ipgeolocation_api_key,
            ),
            ("BANLOG_GOOGLE_AI_API_KEY", &mut self.google_ai_api_key),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *field = Some(value);
                }
            }
        }
    }

    /// Resolved path of the database file.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.db_filepath {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(config_dir()?.join(DEFAULT_DB_FILENAME)),
        }
    }

    /// sqlx connection URL for the database file; creates the file on first
    /// open.
    pub fn database_url(&self) -> Result<String> {
        Ok(database_url_for(&self.database_path()?))
    }
}

fn database_url_for(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

fn config_dir() -> Result<PathBuf> {
    // per the XDG base directory spec, a relative XDG_CONFIG_HOME is ignored
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if dir.starts_with('/') => Ok(PathBuf::from(dir).join(APPLICATION_NAME)),
        _ => {
            let home = std::env::var("HOME").context("HOME is not set")?;
            Ok(PathBuf::from(home).join(".config").join(APPLICATION_NAME))
        }
    }
}

fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(DEFAULT_CONFIG_FILENAME))
}

fn write_default_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(config)?;
    fs::write(path, bytes)
        .with_context(|| format!("failed to write config file '{}'", path.display()))?;
    Ok(())
}
