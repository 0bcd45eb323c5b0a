use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Identifier the publishing platform assigned to a created post.
pub type PublishedId = String;

const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The platform refused the post because a quota is exhausted.
    #[error("rate limited (reset at {reset:?})")]
    RateLimited { reset: Option<i64> },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid publisher configuration: {0}")]
    Config(String),
}

impl PublishError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Server-supplied reset time in epoch seconds, when the platform sent one.
    pub fn server_reset(&self) -> Option<i64> {
        match self {
            Self::RateLimited { reset } => *reset,
            _ => None,
        }
    }
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<PublishedId, PublishError>;
}

/// Posts text to a JSON endpoint authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: serde_json::Value,
}

impl HttpPublisher {
    pub fn new(
        url: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| PublishError::Config("token is not a valid header value".into()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

fn parse_reset(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(RATE_LIMIT_RESET_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
}

#[async_trait::async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, text: &str) -> Result<PublishedId, PublishError> {
        let response = self
            .client
            .post(&self.url)
            .json(&PublishRequest { text })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let reset = parse_reset(response.headers());
            warn!("publisher returned 429 (reset: {reset:?})");
            return Err(PublishError::RateLimited { reset });
        }

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: PublishResponse = response.json().await?;
        let id = match payload.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };
        debug!("published post {id}");
        Ok(id)
    }
}
