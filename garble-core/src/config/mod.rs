//! Configuration management for garble.
//!
//! Secrets come from environment variables, settings from a TOML file.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `GARBLE_PUBLISHER_TOKEN` - bearer token for the publishing endpoint
//! - `GARBLE_TRANSLATOR_API_KEY` - optional translation service key
//!
//! ## Settings (TOML File)
//! Located at `~/.config/garble/config.toml`:
//! ```toml
//! [chain]
//! strategy = "random"
//! random_chain_length = 12
//!
//! [publish]
//! daily_limit = 17
//!
//! [logging]
//! level = "info"
//! ```

mod secrets;
mod settings;

use crate::types::ChainStrategy;

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    BreakerSettings, ChainSettings, LoggingSettings, PublishSettings, PublisherSettings,
    QualitySettings, RetrySettings, SchedulerSettings, Settings, SettingsError, SourceSettings,
    StorageSettings, TranslatorSettings,
};

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Chain strategy '{0}' has no languages configured")]
    EmptyLanguageList(ChainStrategy),

    #[error("Language pool has {pool} entries but random chains need {needed}")]
    PoolTooSmall { pool: usize, needed: usize },

    #[error("Publisher URL is not configured ([publisher].url)")]
    PublisherUrlMissing,
}

impl Config {
    /// Load configuration from all sources and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;
        let config = Self { secrets, settings };
        config.validate()?;
        Ok(config)
    }

    /// Check that both chain strategies can build a chain and that publishing is wired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chain = &self.settings.chain;
        if chain.fixed_languages.is_empty() {
            return Err(ConfigError::EmptyLanguageList(ChainStrategy::Fixed));
        }
        if chain.language_pool.is_empty() {
            return Err(ConfigError::EmptyLanguageList(ChainStrategy::Random));
        }
        if chain.language_pool.len() < chain.random_chain_length {
            return Err(ConfigError::PoolTooSmall {
                pool: chain.language_pool.len(),
                needed: chain.random_chain_length,
            });
        }
        if self
            .settings
            .publisher
            .url
            .as_deref()
            .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::PublisherUrlMissing);
        }
        Ok(())
    }

    /// Default chain strategy (the fallback is its opposite).
    pub fn default_strategy(&self) -> ChainStrategy {
        self.settings.chain.strategy
    }

    pub fn publisher_token(&self) -> Option<&str> {
        self.secrets.publisher_token.as_deref()
    }

    pub fn translator_api_key(&self) -> Option<&str> {
        self.secrets.translator_api_key.as_deref()
    }
}

/// Load .env file if it exists (for development convenience).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
