//! Bot configuration — TOML file with environment overrides.
//!
//! Lives at `~/.kinowatch/config.toml` unless an explicit path is given.
//! The bot token may come from the file or from the environment
//! (`KINOWATCH_BOT_TOKEN`, falling back to `BOT_TOKEN`); having neither is
//! fatal at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KinowatchError, Result};

pub const TOKEN_ENV: &str = "KINOWATCH_BOT_TOKEN";
pub const TOKEN_ENV_FALLBACK: &str = "BOT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KinowatchConfig {
    /// Telegram bot token. Environment variables take precedence.
    #[serde(default)]
    pub bot_token: String,

    #[serde(default)]
    pub guide: GuideConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// One subscriber chat id per line, append-only.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideConfig {
    /// TV-guide search endpoint; the movie title is passed as a query param.
    #[serde(default = "default_guide_url")]
    pub search_url: String,

    /// Movie title to look for in the listings.
    #[serde(default = "default_movie_title")]
    pub movie_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Local hour of day the daily broadcast fires.
    #[serde(default = "default_hour")]
    pub hour: u32,

    /// Local minute of the trigger hour.
    #[serde(default)]
    pub minute: u32,

    /// Seconds between wall-clock polls while idle.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_guide_url() -> String {
    "https://tv.yandex.ru/search".into()
}
fn default_movie_title() -> String {
    "John Wick".into()
}
fn default_hour() -> u32 {
    10
}
fn default_poll_interval() -> u64 {
    30
}
fn default_registry_path() -> PathBuf {
    KinowatchConfig::home_dir().join("users.txt")
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            search_url: default_guide_url(),
            movie_title: default_movie_title(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            minute: 0,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl KinowatchConfig {
    /// Directory holding config and subscriber state.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kinowatch")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, or defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KinowatchError::ConfigNotFound(format!("{}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| KinowatchError::config(format!("serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Resolve the bot token: environment first, then the config file.
    pub fn resolve_token(&self) -> Result<String> {
        for var in [TOKEN_ENV, TOKEN_ENV_FALLBACK] {
            if let Ok(token) = std::env::var(var) {
                if !token.trim().is_empty() {
                    return Ok(token);
                }
            }
        }
        if !self.bot_token.trim().is_empty() {
            return Ok(self.bot_token.clone());
        }
        Err(KinowatchError::config(format!(
            "bot token not set — export {TOKEN_ENV} or add bot_token to {}",
            Self::default_path().display()
        )))
    }
}
