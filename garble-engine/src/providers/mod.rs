//! Collaborator contracts the engine is built on (translation, language
//! detection, publishing, source acquisition) and their default
//! implementations.

pub mod libretranslate;
pub mod publisher;
pub mod sources;

pub use libretranslate::LibreTranslateClient;
pub use publisher::{HttpPublisher, PublishError, PublishedId, Publisher};
pub use sources::{FileSourceFeed, SourceError, SourceFeed};

/// Translation failures. Every variant is treated as a transient hop failure.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("detector returned no guesses")]
    Empty,
}

/// One language guess with confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    pub code: String,
    pub confidence: f64,
}

impl LanguageGuess {
    pub fn new(code: impl Into<String>, confidence: f64) -> Self {
        Self {
            code: code.into(),
            confidence,
        }
    }
}

/// Result of language detection: the top guess plus an optional runner-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub top: LanguageGuess,
    pub runner_up: Option<LanguageGuess>,
}

impl Detection {
    pub fn single(code: impl Into<String>, confidence: f64) -> Self {
        Self {
            top: LanguageGuess::new(code, confidence),
            runner_up: None,
        }
    }

    /// Build from unordered guesses; `None` when there are none.
    pub fn from_guesses(mut guesses: Vec<LanguageGuess>) -> Option<Self> {
        guesses.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut iter = guesses.into_iter();
        let top = iter.next()?;
        Some(Self {
            top,
            runner_up: iter.next(),
        })
    }

    pub fn is(&self, code: &str) -> bool {
        self.top.code.eq_ignore_ascii_case(code)
    }
}

/// One hop: translate `text` into `target`. Protected spans are the caller's concern.
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError>;
}

#[async_trait::async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Detection, DetectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_orders_guesses() {
        let detection = Detection::from_guesses(vec![
            LanguageGuess::new("de", 0.2),
            LanguageGuess::new("en", 0.7),
            LanguageGuess::new("nl", 0.1),
        ])
        .unwrap();
        assert!(detection.is("EN"));
        assert_eq!(detection.runner_up.unwrap().code, "de");
    }

    #[test]
    fn detection_from_nothing_is_none() {
        assert!(Detection::from_guesses(Vec::new()).is_none());
    }
}
