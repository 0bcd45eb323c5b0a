pub mod config;
pub mod types;

// Config re-exports
pub use config::{
    BreakerSettings, ChainSettings, Config, ConfigError, LoggingSettings, PublishSettings,
    PublisherSettings, QualitySettings, RetrySettings, SchedulerSettings, Secrets, SecretsError,
    Settings, SettingsError, SourceSettings, StorageSettings, TranslatorSettings, load_dotenv,
};

// Type re-exports
pub use types::{ChainStrategy, SourceItem, ENGLISH};
