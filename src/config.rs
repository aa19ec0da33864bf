//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then `config.json` in the user's
//! config directory (`<config dir>/roster-keeper/config.json`), then
//! environment variables, then command-line flags (applied by the binary).
//!
//! Environment variables:
//! - `DISCORD_TOKEN` - bot token
//! - `ROSTER_CHANNEL_ID` - channel that holds the roster messages
//! - `ROSTER_DATABASE_PATH` - SQLite file (default: platform data dir)
//! - `ROSTER_DISCORD_API_URL` - Discord API base URL

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::discord::DEFAULT_API_URL;

const APP_NAME: &str = "roster-keeper";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// SQLite file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    pub channel_id: Option<String>,
    pub discord_token: Option<String>,
    pub discord_api_url: String,
    pub bind_address: String,
    pub port: u16,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            channel_id: None,
            discord_token: None,
            discord_api_url: DEFAULT_API_URL.to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl RosterConfig {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match get_config_path() {
            Ok(path) => Self::from_file(&path)?,
            Err(e) => {
                tracing::debug!("No config directory, using defaults: {}", e);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Override fields from environment variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("DISCORD_TOKEN") {
            self.discord_token = Some(token);
        }
        if let Some(channel) = non_empty("ROSTER_CHANNEL_ID") {
            self.channel_id = Some(channel);
        }
        if let Some(path) = non_empty("ROSTER_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = non_empty("ROSTER_DISCORD_API_URL") {
            self.discord_api_url = url;
        }
    }

    /// The roster channel, required by anything that publishes.
    pub fn require_channel(&self) -> Result<&str> {
        self.channel_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No roster channel configured (set ROSTER_CHANNEL_ID)"))
    }

    /// The bot token, required to talk to Discord.
    pub fn require_token(&self) -> Result<&str> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No Discord bot token configured (set DISCORD_TOKEN)"))
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RosterConfig::from_file(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, RosterConfig::default());
        assert_eq!(config.discord_api_url, "https://discord.com/api/v10");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "channel_id": "1234", "port": 8080 }"#).unwrap();

        let config = RosterConfig::from_file(&path).unwrap();
        assert_eq!(config.channel_id.as_deref(), Some("1234"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(RosterConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISCORD_TOKEN", "secret"),
            ("ROSTER_CHANNEL_ID", "999"),
            ("ROSTER_DATABASE_PATH", ""),
        ]);
        let mut config = RosterConfig {
            channel_id: Some("1234".to_string()),
            database_path: Some(PathBuf::from("/var/lib/roster.db")),
            ..Default::default()
        };

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.require_token().unwrap(), "secret");
        assert_eq!(config.require_channel().unwrap(), "999");
        // Empty values don't clear what the file set
        assert_eq!(config.database_path, Some(PathBuf::from("/var/lib/roster.db")));
    }

    #[test]
    fn test_require_channel_without_value() {
        let config = RosterConfig::default();
        assert!(config.require_channel().is_err());
        assert!(config.require_token().is_err());
    }
}
