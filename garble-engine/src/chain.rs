//! Drives one translation chain: a sequence of hops, each feeding its output
//! into the next.
//!
//! Hops whose target language has an open circuit are skipped. A hop that
//! errors records a breaker failure and the chain moves on with the text it
//! had. A hop that comes back degenerate (empty, a lone punctuation mark)
//! gets one recovery attempt through a different language from the pool. If
//! `stuck_threshold` hops in a row return the same text the run is abandoned.

use std::sync::Arc;
use std::time::Duration;

use garble_core::{ChainSettings, ENGLISH};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::providers::Translator;

/// Whether a hop's output is unusable as input for the next hop.
pub fn is_degenerate(text: &str) -> bool {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(c), None) => !c.is_alphanumeric(),
        _ => false,
    }
}

/// Outcome of one chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRun {
    pub final_text: String,
    /// False when no hop produced usable output; `final_text` is then the input.
    pub succeeded_at_least_once: bool,
    /// The run stopped early because hops stopped changing the text.
    pub aborted_stuck: bool,
    /// Hops that produced usable output, including identical ones.
    pub hops_completed: usize,
}

pub struct ChainExecutor {
    translator: Arc<dyn Translator>,
    breaker: Arc<CircuitBreaker>,
    language_pool: Vec<String>,
    stuck_threshold: u32,
    hop_delay: Duration,
    hop_jitter: Duration,
}

impl ChainExecutor {
    pub fn new(
        translator: Arc<dyn Translator>,
        breaker: Arc<CircuitBreaker>,
        settings: &ChainSettings,
    ) -> Self {
        Self {
            translator,
            breaker,
            language_pool: settings.language_pool.clone(),
            stuck_threshold: settings.stuck_threshold.max(2),
            hop_delay: Duration::from_secs_f64(settings.hop_delay_seconds.max(0.0)),
            hop_jitter: Duration::from_secs_f64(settings.hop_jitter_seconds.max(0.0)),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `initial` through `languages` in order.
    pub async fn run(&self, initial: &str, languages: &[String]) -> ChainRun {
        let mut current = initial.to_string();
        let mut previous_output: Option<String> = None;
        let mut identical = 0u32;
        let mut succeeded = false;
        let mut hops_completed = 0usize;
        let mut first_hop = true;

        for lang in languages {
            if self.breaker.is_open(lang) {
                debug!("skipping '{lang}': circuit open");
                continue;
            }
            if !first_hop {
                self.pause().await;
            }
            first_hop = false;

            let output = match self.translator.translate(&current, lang).await {
                Ok(output) => output,
                Err(e) => {
                    warn!("hop to '{lang}' failed: {e}");
                    self.breaker.record_failure(lang);
                    continue;
                }
            };

            let output = if is_degenerate(&output) {
                warn!("hop to '{lang}' returned degenerate output {output:?}");
                self.breaker.record_failure(lang);
                match self.recover(&current, lang).await {
                    Some(recovered) => recovered,
                    None => continue,
                }
            } else {
                self.breaker.record_success(lang);
                output
            };

            succeeded = true;
            hops_completed += 1;
            debug!("hop {hops_completed} via '{lang}': {output:?}");

            let repeated = previous_output
                .as_deref()
                .is_some_and(|previous| previous.trim() == output.trim());
            identical = if repeated { identical + 1 } else { 1 };
            if identical >= self.stuck_threshold {
                info!("chain stuck after {identical} identical hop outputs, aborting run");
                return ChainRun {
                    final_text: output,
                    succeeded_at_least_once: succeeded,
                    aborted_stuck: true,
                    hops_completed,
                };
            }
            previous_output = Some(output.clone());
            current = output;
        }

        ChainRun {
            final_text: current,
            succeeded_at_least_once: succeeded,
            aborted_stuck: false,
            hops_completed,
        }
    }

    /// Final hop back to English. `None` when the hop fails or is degenerate.
    pub async fn back_to_english(&self, text: &str) -> Option<String> {
        self.pause().await;
        match self.translator.translate(text, ENGLISH).await {
            Ok(output) if !is_degenerate(&output) => Some(output),
            Ok(output) => {
                warn!("final hop to English returned degenerate output {output:?}");
                None
            }
            Err(e) => {
                warn!("final hop to English failed: {e}");
                None
            }
        }
    }

    /// One retry of a degenerate hop through a different, random language.
    async fn recover(&self, text: &str, failed: &str) -> Option<String> {
        let alternate = {
            let candidates: Vec<&String> = self
                .language_pool
                .iter()
                .filter(|lang| lang.as_str() != failed && !self.breaker.is_open(lang))
                .collect();
            let mut rng = rand::thread_rng();
            candidates.choose(&mut rng).map(|lang| lang.to_string())
        };
        let Some(alternate) = alternate else {
            debug!("no alternate language available to recover from '{failed}'");
            return None;
        };

        match self.translator.translate(text, &alternate).await {
            Ok(output) if !is_degenerate(&output) => {
                info!("recovered degenerate hop '{failed}' via '{alternate}'");
                self.breaker.record_success(&alternate);
                Some(output)
            }
            Ok(_) => {
                self.breaker.record_failure(&alternate);
                None
            }
            Err(e) => {
                warn!("recovery hop to '{alternate}' failed: {e}");
                self.breaker.record_failure(&alternate);
                None
            }
        }
    }

    async fn pause(&self) {
        let delay = self.jittered_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn jittered_delay(&self) -> Duration {
        let base = self.hop_delay.as_secs_f64();
        let jitter = self.hop_jitter.as_secs_f64();
        if jitter <= 0.0 {
            return self.hop_delay;
        }
        let offset = rand::thread_rng().gen_range(-jitter..=jitter);
        Duration::from_secs_f64((base + offset).max(0.0))
    }
}
