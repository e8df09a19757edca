use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::audio::WorkerSettings;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,
    pub skip_quorum: usize,
    pub self_deafen: bool,

    // Comandos básicos
    pub max_repeat: usize,
    pub welcome_members: bool,
    pub message_cache_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to [`Config::default`]; only `DISCORD_TOKEN`
    /// is required. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            discord_token: get("DISCORD_TOKEN").context("DISCORD_TOKEN no está configurado")?,
            guild_id: get("GUILD_ID").map(|s| parse("GUILD_ID", &s)).transpose()?,

            default_volume: parse_or(&get, "DEFAULT_VOLUME", defaults.default_volume)?,
            skip_quorum: parse_or(&get, "SKIP_QUORUM", defaults.skip_quorum)?,
            self_deafen: parse_or(&get, "SELF_DEAFEN", defaults.self_deafen)?,

            max_repeat: parse_or(&get, "MAX_REPEAT", defaults.max_repeat)?,
            welcome_members: parse_or(&get, "WELCOME_MEMBERS", defaults.welcome_members)?,
            message_cache_size: parse_or(
                &get,
                "MESSAGE_CACHE_SIZE",
                defaults.message_cache_size,
            )?,
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Skip quorum must be at least 1
    /// - Repeat limit must be at least 1
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if self.skip_quorum == 0 {
            anyhow::bail!("Skip quorum must be greater than 0");
        }

        if self.max_repeat == 0 {
            anyhow::bail!("Max repeat must be greater than 0");
        }

        Ok(())
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            skip_quorum: self.skip_quorum,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: Guild {}\n  \
            Audio: {}% vol, {} votes to skip, deafen={}\n  \
            Basic: repeat<={}, welcome={}, {} cached messages",
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0).round() as u32,
            self.skip_quorum,
            self.self_deafen,
            self.max_repeat,
            self.welcome_members,
            self.message_cache_size
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,

            default_volume: 0.6,
            skip_quorum: 3,
            self_deafen: true,

            max_repeat: 5,
            welcome_members: false,
            message_cache_size: 200,
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Valor inválido para {key}: {value}"))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse(key, &value),
        None => Ok(default),
    }
}
