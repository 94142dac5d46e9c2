use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::API_BASE;

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Backend API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend REST API (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional bearer token sent on every request.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Pipeline tunables. The safety ceilings guard against a misbehaving
/// or infinite-paginating backend; hitting one truncates the walk
/// rather than failing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Page size for general paginated walks.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Page ceiling for general paginated walks.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Page size for the bulk trade-aggregation walk.
    #[serde(default = "default_trade_page_size")]
    pub trade_page_size: u32,
    /// Page ceiling for the bulk trade-aggregation walk.
    #[serde(default = "default_trade_max_pages")]
    pub trade_max_pages: u32,
    /// Item cap for the bulk trade-aggregation walk.
    #[serde(default = "default_trade_max_items")]
    pub trade_max_items: usize,
    /// How many ranked users survive truncation.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

fn default_base_url() -> String {
    API_BASE.to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    1000
}

fn default_trade_page_size() -> u32 {
    1000
}

fn default_trade_max_pages() -> u32 {
    100
}

fn default_trade_max_items() -> usize {
    10_000
}

fn default_leaderboard_size() -> usize {
    crate::DEFAULT_LEADERBOARD_SIZE
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            trade_page_size: default_trade_page_size(),
            trade_max_pages: default_trade_max_pages(),
            trade_max_items: default_trade_max_items(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            settings: SettingsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load config from `path`, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
