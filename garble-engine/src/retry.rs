//! Repeats chain attempts until the quality gate accepts one.
//!
//! The primary strategy gets `attempts_per_strategy` attempts (the first one
//! included), then the other strategy gets as many. Every attempt whose
//! output the detector reads as English is kept as a candidate; when nothing
//! is accepted the funniest candidate wins.

use std::sync::Arc;

use garble_core::{ChainStrategy, Settings};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::chain::ChainExecutor;
use crate::quality::QualityGate;
use crate::scoring::{FunninessScorer, WordDriftScorer};
use crate::tokens::mask_protected;

/// Result of `produce`.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub final_text: String,
    pub accepted: bool,
    /// Attempts run, across both strategies.
    pub attempts: u32,
}

/// Language lists the two strategies draw from.
#[derive(Debug, Clone)]
pub struct ChainSelector {
    fixed_languages: Vec<String>,
    language_pool: Vec<String>,
    random_chain_length: usize,
}

impl ChainSelector {
    pub fn new(
        fixed_languages: Vec<String>,
        language_pool: Vec<String>,
        random_chain_length: usize,
    ) -> Self {
        Self {
            fixed_languages,
            language_pool,
            random_chain_length,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.languages_for(ChainStrategy::Fixed).to_vec(),
            settings.languages_for(ChainStrategy::Random).to_vec(),
            settings.chain.random_chain_length,
        )
    }

    /// Hop targets for one attempt.
    pub fn select(&self, strategy: ChainStrategy) -> Vec<String> {
        match strategy {
            ChainStrategy::Fixed => self.fixed_languages.clone(),
            ChainStrategy::Random => {
                let mut rng = rand::thread_rng();
                let mut chosen: Vec<String> = self
                    .language_pool
                    .choose_multiple(&mut rng, self.random_chain_length)
                    .cloned()
                    .collect();
                chosen.shuffle(&mut rng);
                chosen
            }
        }
    }
}

pub struct RetryOrchestrator {
    chain: ChainExecutor,
    gate: QualityGate,
    selector: ChainSelector,
    scorer: Arc<dyn FunninessScorer>,
    attempts_per_strategy: u32,
    default_strategy: ChainStrategy,
}

struct Attempt {
    final_text: String,
    accepted: bool,
    english: bool,
}

impl RetryOrchestrator {
    pub fn new(chain: ChainExecutor, gate: QualityGate, settings: &Settings) -> Self {
        Self {
            chain,
            gate,
            selector: ChainSelector::from_settings(settings),
            scorer: Arc::new(WordDriftScorer),
            attempts_per_strategy: settings.retry.attempts_per_strategy.max(1),
            default_strategy: settings.chain.strategy,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn FunninessScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Produce a publishable text using the configured default strategy first.
    pub async fn produce(&self, original: &str, recently_published: &[String]) -> Produced {
        self.produce_with(original, self.default_strategy, recently_published)
            .await
    }

    /// Produce a publishable text starting with `primary`, falling back to the
    /// other strategy. Never fails: an unaccepted result is still returned.
    pub async fn produce_with(
        &self,
        original: &str,
        primary: ChainStrategy,
        recently_published: &[String],
    ) -> Produced {
        let mut candidates: Vec<String> = Vec::new();
        let mut last_text = original.to_string();
        let mut attempts = 0u32;

        for strategy in [primary, primary.other()] {
            for _ in 0..self.attempts_per_strategy {
                attempts += 1;
                let Some(attempt) = self
                    .attempt(original, strategy, recently_published)
                    .await
                else {
                    continue;
                };

                if attempt.accepted {
                    info!("attempt {attempts} ({strategy}) accepted");
                    return Produced {
                        final_text: attempt.final_text,
                        accepted: true,
                        attempts,
                    };
                }
                if attempt.english {
                    candidates.push(attempt.final_text.clone());
                }
                last_text = attempt.final_text;
            }
            if strategy == primary {
                info!(
                    "{strategy} strategy exhausted after {} attempts, switching to {}",
                    self.attempts_per_strategy,
                    strategy.other()
                );
            }
        }

        let final_text = self.funniest(&candidates, original).unwrap_or_else(|| {
            warn!("no English candidates collected, falling back to the last attempt");
            last_text
        });
        warn!(
            "no attempt accepted after {attempts} tries, keeping best-effort {final_text:?}"
        );
        Produced {
            final_text,
            accepted: false,
            attempts,
        }
    }

    /// One full chain plus the final English hop and gate evaluation. Protected
    /// spans are masked for the chain and restored before the gate runs.
    /// `None` when the chain got stuck and the attempt was abandoned.
    async fn attempt(
        &self,
        original: &str,
        strategy: ChainStrategy,
        recently_published: &[String],
    ) -> Option<Attempt> {
        let languages = self.selector.select(strategy);
        debug!("{strategy} chain: {}", languages.join(" -> "));

        let masked = mask_protected(original);
        let run = self.chain.run(masked.text(), &languages).await;
        if run.aborted_stuck {
            return None;
        }

        let english = match self.chain.back_to_english(&run.final_text).await {
            Some(text) => text,
            None => run.final_text,
        };
        let final_text = masked.restore(&english);

        let verdict = self
            .gate
            .evaluate(&final_text, original, recently_published)
            .await;
        let mut accepted = verdict.acceptable;
        if accepted && !run.succeeded_at_least_once {
            debug!("chain produced no successful hop, rejecting");
            accepted = false;
        }
        if !accepted {
            debug!("rejected {final_text:?}: {}", verdict.summary());
        }

        Some(Attempt {
            english: verdict.detected_english(),
            final_text,
            accepted,
        })
    }

    fn funniest(&self, candidates: &[String], original: &str) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for candidate in candidates {
            let score = self.scorer.score(candidate, original);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
        best.map(|(text, _)| text.clone())
    }
}
