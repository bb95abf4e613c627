//! Client configuration management.
//!
//! This module resolves the backend origin from the environment and
//! persists the small amount of client state worth keeping between runs
//! (currently the last login email).
//!
//! Configuration is stored at `~/.config/vidtrends/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "vidtrends";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable naming the backend origin
const API_URL_VAR: &str = "VIDTRENDS_API_URL";

/// Default backend origin for local development
const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    /// Load the persisted config, then apply the environment override.
    pub fn load() -> Result<Self> {
        // Pick up a .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_VAR) {
            if !url.is_empty() {
                config.base_url = Some(url);
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Backend origin with any trailing slash removed, so request paths
    /// can be appended verbatim.
    pub fn api_base_url(&self) -> String {
        let url = self.base_url.as_deref().unwrap_or(DEFAULT_API_URL);
        url.trim_end_matches('/').to_string()
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for persisted session state.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url() {
        assert_eq!(Config::default().api_base_url(), "http://localhost:5000");

        let config = Config {
            base_url: Some("https://api.vidtrends.example/".to_string()),
            last_email: None,
        };
        assert_eq!(config.api_base_url(), "https://api.vidtrends.example");
    }
}
