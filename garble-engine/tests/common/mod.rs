//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use garble_core::{ChainStrategy, Settings, SourceItem};
use garble_engine::providers::{PublishError, PublishedId, SourceError};
use garble_engine::{
    ChainExecutor, CircuitBreaker, DetectError, Detection, LanguageDetector, Publisher,
    QualityGate, RetryOrchestrator, SourceFeed, TranslateError, Translator,
};

type Reply = dyn Fn(&str, &str) -> Result<String, TranslateError> + Send + Sync;

pub struct ScriptedTranslator {
    reply: Box<Reply>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedTranslator {
    pub fn new(
        reply: impl Fn(&str, &str) -> Result<String, TranslateError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Appends the target code to the text; English hops add " indeed".
    pub fn drifting() -> Arc<Self> {
        Self::new(|text, lang| {
            Ok(if lang == "en" {
                format!("{text} indeed")
            } else {
                format!("{text} {lang}")
            })
        })
    }

    /// Target languages requested so far, in order.
    pub fn targets(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, lang)| lang.clone())
            .collect()
    }

    /// Texts handed to the translator so far, in order.
    pub fn inputs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslateError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), target.to_string()));
        (self.reply)(text, target)
    }
}

/// Always answers with the same detection.
pub struct FixedDetector(pub Detection);

impl FixedDetector {
    pub fn english() -> Arc<Self> {
        Arc::new(Self(Detection::single("en", 0.95)))
    }

    pub fn unsure_english() -> Arc<Self> {
        Arc::new(Self(Detection::single("en", 0.5)))
    }
}

#[async_trait::async_trait]
impl LanguageDetector for FixedDetector {
    async fn detect(&self, _text: &str) -> Result<Detection, DetectError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PublishPlan {
    Succeed,
    RateLimited(Option<i64>),
    Fail(u16),
}

#[derive(Default)]
pub struct StubPublisher {
    plan: Mutex<VecDeque<PublishPlan>>,
    attempts: Mutex<Vec<String>>,
    published: Mutex<Vec<String>>,
}

impl StubPublisher {
    /// Follows `plan` call by call, succeeding once it runs out.
    pub fn with_plan(plan: impl IntoIterator<Item = PublishPlan>) -> Arc<Self> {
        Arc::new(Self {
            plan: Mutex::new(plan.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::with_plan([])
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Publisher for StubPublisher {
    async fn publish(&self, text: &str) -> Result<PublishedId, PublishError> {
        self.attempts.lock().unwrap().push(text.to_string());
        let step = self
            .plan
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PublishPlan::Succeed);
        match step {
            PublishPlan::Succeed => {
                let mut published = self.published.lock().unwrap();
                published.push(text.to_string());
                Ok(format!("post-{}", published.len()))
            }
            PublishPlan::RateLimited(reset) => Err(PublishError::RateLimited { reset }),
            PublishPlan::Fail(status) => Err(PublishError::Api {
                status,
                message: "stub failure".to_string(),
            }),
        }
    }
}

pub struct StaticFeed(pub Vec<SourceItem>);

impl StaticFeed {
    pub fn new(items: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self(
            items
                .iter()
                .map(|(id, text)| SourceItem::new(*id, *text))
                .collect(),
        ))
    }
}

#[async_trait::async_trait]
impl SourceFeed for StaticFeed {
    async fn fetch(&self) -> Result<Vec<SourceItem>, SourceError> {
        Ok(self.0.clone())
    }
}

/// Defaults with no hop delay, a small language set and few retries.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.chain.strategy = ChainStrategy::Fixed;
    settings.chain.fixed_languages = vec!["ja".into(), "fi".into()];
    settings.chain.language_pool = vec!["ja".into(), "fi".into(), "ar".into()];
    settings.chain.random_chain_length = 2;
    settings.chain.hop_delay_seconds = 0.0;
    settings.chain.hop_jitter_seconds = 0.0;
    settings.retry.attempts_per_strategy = 2;
    settings
}

pub fn orchestrator(
    translator: Arc<ScriptedTranslator>,
    detector: Arc<FixedDetector>,
    settings: &Settings,
) -> RetryOrchestrator {
    let chain = ChainExecutor::new(
        translator,
        Arc::new(CircuitBreaker::default()),
        &settings.chain,
    );
    let gate = QualityGate::new(detector, settings.quality.clone());
    RetryOrchestrator::new(chain, gate, settings)
}
