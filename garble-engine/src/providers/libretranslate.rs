use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    DetectError, Detection, LanguageDetector, LanguageGuess, TranslateError, Translator,
};

/// Client for a LibreTranslate-compatible service.
#[derive(Debug, Clone)]
pub struct LibreTranslateClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DetectGuess {
    language: String,
    /// Percentage, 0-100.
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl LibreTranslateClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or(text)
}

#[async_trait::async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        let request = TranslateRequest {
            q: text,
            source: "auto",
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(self.endpoint("translate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslateError::Timeout
                } else {
                    TranslateError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;
        let translated = body
            .translated_text
            .ok_or_else(|| TranslateError::InvalidResponse("missing translatedText".to_string()))?;
        debug!("translated {} chars into '{target}'", text.len());
        Ok(translated)
    }
}

#[async_trait::async_trait]
impl LanguageDetector for LibreTranslateClient {
    async fn detect(&self, text: &str) -> Result<Detection, DetectError> {
        let request = DetectRequest {
            q: text,
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(self.endpoint("detect"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let guesses: Vec<DetectGuess> = response.json().await?;
        Detection::from_guesses(
            guesses
                .into_iter()
                .map(|g| LanguageGuess::new(g.language, (g.confidence / 100.0).clamp(0.0, 1.0)))
                .collect(),
        )
        .ok_or(DetectError::Empty)
    }
}
