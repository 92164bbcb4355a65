//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::ConfigError;
use crate::domain::entities::UserId;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub default_commands: DefaultCommandsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    /// Username commands must be addressed to in groups; taken from the
    /// platform when empty
    pub username: String,
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: Option<String>,
    pub poll_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// SQLite file; in-memory when unset
    pub database_path: Option<PathBuf>,
    /// Prefix of every conversation key
    pub namespace: String,
}

/// Which built-in commands to register
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DefaultCommandsConfig {
    pub ping: bool,
    pub cancel: bool,
    pub feedback: bool,
    pub promote: bool,
    pub demote: bool,
    pub update_commands: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "chatpipe".to_string(),
            username: String::new(),
            owner_id: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            poll_timeout_seconds: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: Some(PathBuf::from("chatpipe.db")),
            namespace: "chatpipe".to_string(),
        }
    }
}

impl Default for DefaultCommandsConfig {
    fn default() -> Self {
        Self {
            ping: true,
            cancel: true,
            feedback: true,
            promote: true,
            demote: true,
            update_commands: true,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn load_env() -> Self {
        // Defaults overridden by environment variables
        let mut config = Config::default();

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.telegram.token = Some(token);
            config.telegram.enabled = true;
        }

        if let Ok(username) = std::env::var("BOT_USERNAME") {
            config.bot.username = username;
        }

        if let Ok(owner) = std::env::var("BOT_OWNER_ID") {
            match owner.trim().parse() {
                Ok(id) => config.bot.owner_id = Some(id),
                Err(_) => tracing::warn!("Ignoring BOT_OWNER_ID '{}': not a user id", owner),
            }
        }

        if let Ok(path) = std::env::var("BOT_DATABASE") {
            config.storage.database_path = Some(PathBuf::from(path));
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue("storage.namespace must not be empty".to_string()));
        }
        if self.storage.namespace.contains(':') {
            return Err(ConfigError::InvalidValue("storage.namespace must not contain ':'".to_string()));
        }
        if self.telegram.enabled && self.telegram.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(ConfigError::MissingField("telegram.token".to_string()));
        }
        if self.telegram.poll_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue("telegram.poll-timeout-seconds must be positive".to_string()));
        }
        if self.bot.username.starts_with('@') {
            return Err(ConfigError::InvalidValue("bot.username must not start with '@'".to_string()));
        }
        Ok(())
    }
}
