//! Settings configuration loaded from TOML files.
//!
//! This module handles non-sensitive configuration stored in TOML format
//! in the XDG config directory (~/.config/garble/config.toml).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::ChainStrategy;

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# garble configuration file
# Located at: ~/.config/garble/config.toml
#
# This file contains non-sensitive configuration.
# Secrets are loaded from environment variables:
#   - GARBLE_PUBLISHER_TOKEN
#   - GARBLE_TRANSLATOR_API_KEY (optional)

[chain]
# "random" draws random_chain_length languages from language_pool per attempt,
# "fixed" walks fixed_languages in order.
strategy = "random"
fixed_languages = ["ja", "fi", "ar", "ko", "hu", "zh", "ru", "tr", "el", "hi"]
random_chain_length = 12
hop_delay_seconds = 5
hop_jitter_seconds = 2
stuck_threshold = 4

[breaker]
failure_threshold = 2
cooldown_days = 7

[quality]
min_length_ratio = 0.33
english_min_confidence = 0.6
english_margin = 0.15

[retry]
attempts_per_strategy = 33

[publish]
daily_limit = 17
min_spacing_minutes = 15
cooldown_minutes = 17
hard_floor_minutes = 90
reset_buffer_seconds = 120
queue_max_attempts = 5
items_per_tick = 1
history_size = 200

[translator]
base_url = "http://127.0.0.1:5000"
timeout_seconds = 30

[publisher]
# url = "https://example.com/api/posts"
timeout_seconds = 30

[sources]
# path = "/var/lib/garble/sources.json"

[scheduler]
tick_minutes = 30

[storage]
# data_dir = "/var/lib/garble"

[logging]
level = "info"
"#;

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Translation chain configuration
    #[serde(default)]
    pub chain: ChainSettings,

    /// Per-language circuit breaker configuration
    #[serde(default)]
    pub breaker: BreakerSettings,

    /// Quality gate thresholds
    #[serde(default)]
    pub quality: QualitySettings,

    /// Retry budget
    #[serde(default)]
    pub retry: RetrySettings,

    /// Publish budget, pacing and queue limits
    #[serde(default)]
    pub publish: PublishSettings,

    /// Translation service endpoint
    #[serde(default)]
    pub translator: TranslatorSettings,

    /// Publishing endpoint
    #[serde(default)]
    pub publisher: PublisherSettings,

    /// Source text feed
    #[serde(default)]
    pub sources: SourceSettings,

    /// Tick timing
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Durable state location
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Translation chain settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainSettings {
    /// Default language-selection strategy (the other one is the fallback)
    #[serde(default = "default_chain_strategy")]
    pub strategy: ChainStrategy,

    /// Ordered hop targets used by the fixed strategy
    #[serde(default = "default_fixed_languages")]
    pub fixed_languages: Vec<String>,

    /// Pool the random strategy draws from (also used for degenerate-output recovery)
    #[serde(default = "default_language_pool")]
    pub language_pool: Vec<String>,

    /// Number of languages drawn per random chain
    #[serde(default = "default_random_chain_length")]
    pub random_chain_length: usize,

    /// Base delay between hops, in seconds
    #[serde(default = "default_hop_delay_seconds")]
    pub hop_delay_seconds: f64,

    /// Maximum random jitter added to the hop delay, in seconds
    #[serde(default = "default_hop_jitter_seconds")]
    pub hop_jitter_seconds: f64,

    /// Identical consecutive outputs after which a run is considered stuck
    #[serde(default = "default_stuck_threshold")]
    pub stuck_threshold: u32,
}

/// Circuit breaker settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerSettings {
    /// Consecutive failures before a language is skipped
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Days an open breaker stays open before auto-resetting
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u64,
}

/// Quality gate settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualitySettings {
    /// Minimum stripped length relative to the stripped original
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,

    /// Minimum detector confidence (0..1) that the candidate is English
    #[serde(default = "default_english_min_confidence")]
    pub english_min_confidence: f64,

    /// Minimum confidence gap between English and the runner-up guess
    #[serde(default = "default_english_margin")]
    pub english_margin: f64,
}

/// Retry settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    /// Attempts per strategy (the first attempt counts toward the primary strategy)
    #[serde(default = "default_attempts_per_strategy")]
    pub attempts_per_strategy: u32,
}

/// Publish pacing settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishSettings {
    /// Publishes allowed in any rolling 24 hours
    #[serde(default = "default_daily_limit")]
    pub daily_limit: usize,

    /// Minimum minutes between two publishes
    #[serde(default = "default_min_spacing_minutes")]
    pub min_spacing_minutes: i64,

    /// Self-imposed cooldown after a successful publish, in minutes
    #[serde(default = "default_publish_cooldown_minutes")]
    pub cooldown_minutes: i64,

    /// Floor applied after any hard rejection, in minutes
    #[serde(default = "default_hard_floor_minutes")]
    pub hard_floor_minutes: i64,

    /// Seconds added to a server-supplied reset time
    #[serde(default = "default_reset_buffer_seconds")]
    pub reset_buffer_seconds: i64,

    /// Queue attempts after which an item is evicted
    #[serde(default = "default_queue_max_attempts")]
    pub queue_max_attempts: u32,

    /// New source items processed per tick
    #[serde(default = "default_items_per_tick")]
    pub items_per_tick: usize,

    /// Published texts kept for duplicate detection
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Translation service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslatorSettings {
    /// Base URL of the LibreTranslate-compatible service
    #[serde(default = "default_translator_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Publisher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublisherSettings {
    /// Endpoint receiving `POST {"text": ...}`
    pub url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Source feed settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceSettings {
    /// JSON file holding `[{"id": ..., "text": ...}]`
    pub path: Option<String>,
}

/// Scheduler settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerSettings {
    /// Minutes between ticks
    #[serde(default = "default_tick_minutes")]
    pub tick_minutes: u64,
}

/// Storage settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Override for the data directory holding durable state
    pub data_dir: Option<String>,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_chain_strategy() -> ChainStrategy {
    ChainStrategy::Random
}

fn default_fixed_languages() -> Vec<String> {
    ["ja", "fi", "ar", "ko", "hu", "zh", "ru", "tr", "el", "hi"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_language_pool() -> Vec<String> {
    [
        "ar", "az", "bg", "bn", "ca", "cs", "da", "de", "el", "eo", "es", "et", "fa", "fi", "fr",
        "ga", "he", "hi", "hu", "id", "it", "ja", "ko", "lt", "lv", "ms", "nb", "nl", "pl", "pt",
        "ro", "ru", "sk", "sl", "sq", "sv", "th", "tl", "tr", "uk", "ur", "zh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_random_chain_length() -> usize {
    12
}

fn default_hop_delay_seconds() -> f64 {
    5.0
}

fn default_hop_jitter_seconds() -> f64 {
    2.0
}

fn default_stuck_threshold() -> u32 {
    4
}

fn default_failure_threshold() -> u32 {
    2
}

fn default_cooldown_days() -> u64 {
    7
}

fn default_min_length_ratio() -> f64 {
    0.33
}

fn default_english_min_confidence() -> f64 {
    0.6
}

fn default_english_margin() -> f64 {
    0.15
}

fn default_attempts_per_strategy() -> u32 {
    33
}

fn default_daily_limit() -> usize {
    17
}

fn default_min_spacing_minutes() -> i64 {
    15
}

fn default_publish_cooldown_minutes() -> i64 {
    17
}

fn default_hard_floor_minutes() -> i64 {
    90
}

fn default_reset_buffer_seconds() -> i64 {
    120
}

fn default_queue_max_attempts() -> u32 {
    5
}

fn default_items_per_tick() -> usize {
    1
}

fn default_history_size() -> usize {
    200
}

fn default_translator_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_tick_minutes() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            strategy: default_chain_strategy(),
            fixed_languages: default_fixed_languages(),
            language_pool: default_language_pool(),
            random_chain_length: default_random_chain_length(),
            hop_delay_seconds: default_hop_delay_seconds(),
            hop_jitter_seconds: default_hop_jitter_seconds(),
            stuck_threshold: default_stuck_threshold(),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_days: default_cooldown_days(),
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            min_length_ratio: default_min_length_ratio(),
            english_min_confidence: default_english_min_confidence(),
            english_margin: default_english_margin(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts_per_strategy: default_attempts_per_strategy(),
        }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            min_spacing_minutes: default_min_spacing_minutes(),
            cooldown_minutes: default_publish_cooldown_minutes(),
            hard_floor_minutes: default_hard_floor_minutes(),
            reset_buffer_seconds: default_reset_buffer_seconds(),
            queue_max_attempts: default_queue_max_attempts(),
            items_per_tick: default_items_per_tick(),
            history_size: default_history_size(),
        }
    }
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            base_url: default_translator_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_minutes: default_tick_minutes(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Data directory not found")]
    DataDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    /// The file is located at `~/.config/garble/config.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// Uses XDG config directory: `~/.config/garble/config.toml`
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("GARBLE_CONFIG_DIR") {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("garble");

        Ok(config_dir.join("config.toml"))
    }

    /// Directory holding durable state (rate limits, queue, publish record).
    pub fn data_dir(&self) -> Result<PathBuf, SettingsError> {
        if let Some(dir) = self.storage.data_dir.as_deref() {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::data_dir()
            .ok_or(SettingsError::DataDirNotFound)?
            .join("garble"))
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)?;
        Ok(())
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Languages a chain built with `strategy` walks before the final English hop.
    pub fn languages_for(&self, strategy: ChainStrategy) -> &[String] {
        match strategy {
            ChainStrategy::Fixed => &self.chain.fixed_languages,
            ChainStrategy::Random => &self.chain.language_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.chain.strategy, ChainStrategy::Random);
        assert_eq!(settings.chain.random_chain_length, 12);
        assert_eq!(settings.chain.stuck_threshold, 4);
        assert!(settings.chain.language_pool.len() >= settings.chain.random_chain_length);

        assert_eq!(settings.breaker.failure_threshold, 2);
        assert_eq!(settings.breaker.cooldown_days, 7);

        assert_eq!(settings.retry.attempts_per_strategy, 33);

        assert_eq!(settings.publish.daily_limit, 17);
        assert_eq!(settings.publish.min_spacing_minutes, 15);
        assert_eq!(settings.publish.cooldown_minutes, 17);
        assert_eq!(settings.publish.hard_floor_minutes, 90);
        assert_eq!(settings.publish.queue_max_attempts, 5);

        assert_eq!(settings.scheduler.tick_minutes, 30);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.publisher.url.is_none());
    }

    #[test]
    fn test_default_file_parses_to_defaults() {
        let settings = Settings::from_toml(DEFAULT_CONFIG_TOML).unwrap();
        let defaults = Settings::default();

        assert_eq!(settings.chain.strategy, defaults.chain.strategy);
        assert_eq!(settings.chain.fixed_languages, defaults.chain.fixed_languages);
        assert_eq!(settings.publish.daily_limit, defaults.publish.daily_limit);
        assert_eq!(settings.translator.base_url, defaults.translator.base_url);
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[chain]
strategy = "fixed"
fixed_languages = ["de", "ja"]

[publish]
daily_limit = 3
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.chain.strategy, ChainStrategy::Fixed);
        assert_eq!(settings.languages_for(ChainStrategy::Fixed), ["de", "ja"]);
        assert_eq!(settings.publish.daily_limit, 3);
        // Untouched fields keep their defaults
        assert_eq!(settings.publish.min_spacing_minutes, 15);
        assert_eq!(settings.chain.random_chain_length, 12);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.publisher.url = Some("https://example.com/posts".to_string());
        settings.storage.data_dir = Some("/tmp/garble-data".to_string());
        settings.save_to_path(&path).expect("save failed");

        let content = fs::read_to_string(&path).expect("read failed");
        let loaded = Settings::from_toml(&content).expect("parse failed");

        assert_eq!(
            loaded.publisher.url.as_deref(),
            Some("https://example.com/posts")
        );
        assert_eq!(
            loaded.data_dir().unwrap(),
            PathBuf::from("/tmp/garble-data")
        );
    }

    #[test]
    fn test_config_path_uses_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let value = dir.path().to_string_lossy().to_string();

        // SAFETY: test-scoped env mutation.
        unsafe { std::env::set_var("GARBLE_CONFIG_DIR", &value) };
        let path = Settings::config_path().unwrap();
        // SAFETY: test-scoped env mutation cleanup.
        unsafe { std::env::remove_var("GARBLE_CONFIG_DIR") };

        assert_eq!(path, dir.path().join("config.toml"));
    }
}
