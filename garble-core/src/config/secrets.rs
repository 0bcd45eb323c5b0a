//! Secrets configuration loaded from environment variables only.
//!
//! Tokens and API keys never live in the TOML settings file.

use std::env;

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Publishing service bearer token (env: GARBLE_PUBLISHER_TOKEN)
    pub publisher_token: Option<String>,

    /// Translation service API key (env: GARBLE_TRANSLATOR_API_KEY)
    pub translator_api_key: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// Loads a `.env` file first if one is present (development convenience).
    pub fn from_env() -> Result<Self, SecretsError> {
        super::load_dotenv();

        Self::from_env_inner()
    }

    /// Internal method to load from environment without loading .env
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        let secrets = Self {
            publisher_token: non_empty_var("GARBLE_PUBLISHER_TOKEN"),
            translator_api_key: non_empty_var("GARBLE_TRANSLATOR_API_KEY"),
        };

        if secrets.publisher_token.is_none() {
            return Err(SecretsError::MissingSecret(
                "GARBLE_PUBLISHER_TOKEN".to_string(),
            ));
        }

        Ok(secrets)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
