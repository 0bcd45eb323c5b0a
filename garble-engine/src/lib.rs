pub mod chain;
pub mod circuit_breaker;
pub mod coordinator;
pub mod providers;
pub mod quality;
pub mod retry;
pub mod runner;
pub mod scoring;
pub mod state;
pub mod tokens;

pub use chain::{ChainExecutor, ChainRun};
pub use circuit_breaker::CircuitBreaker;
pub use coordinator::{Coordinator, TickOutcome};
pub use providers::{
    DetectError, Detection, LanguageDetector, LanguageGuess, PublishError, PublishedId, Publisher,
    SourceError, SourceFeed, TranslateError, Translator,
};
pub use quality::{Predicate, QualityGate, QualityVerdict};
pub use retry::{ChainSelector, Produced, RetryOrchestrator};
pub use runner::{run_locked_tick, start_tick_runner};
pub use scoring::{FunninessScorer, WordDriftScorer};
pub use state::DurableState;
