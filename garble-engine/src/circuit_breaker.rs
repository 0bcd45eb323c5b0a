//! Per-language circuit breaker for translation hops.
//!
//! A hop target that fails `failure_threshold` times in a row is skipped by
//! every chain until `cooldown` has passed since it opened, then gets a
//! clean slate. Any success resets the count immediately. State lives only
//! for the process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Consecutive failures that open the breaker for a language.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 2;
/// How long an open breaker stays open.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Default, Clone, Copy)]
struct CircuitEntry {
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Shared, lock-based breaker keyed by target language code.
pub struct CircuitBreaker {
    states: Mutex<HashMap<String, CircuitEntry>>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Whether hops to `lang` should currently be skipped.
    pub fn is_open(&self, lang: &str) -> bool {
        self.is_open_at(lang, Instant::now())
    }

    pub fn is_open_at(&self, lang: &str, now: Instant) -> bool {
        let mut states = self.states.lock().expect("CircuitBreaker lock poisoned");
        let Some(entry) = states.get(lang) else {
            return false;
        };
        if entry.failure_count < self.failure_threshold {
            return false;
        }
        match entry.opened_at {
            Some(opened_at) if now.saturating_duration_since(opened_at) >= self.cooldown => {
                info!("circuit for '{lang}' cooled down, re-enabling");
                states.remove(lang);
                false
            }
            _ => true,
        }
    }

    pub fn record_failure(&self, lang: &str) {
        self.record_failure_at(lang, Instant::now());
    }

    pub fn record_failure_at(&self, lang: &str, now: Instant) {
        let mut states = self.states.lock().expect("CircuitBreaker lock poisoned");
        let entry = states.entry(lang.to_string()).or_default();
        entry.failure_count += 1;
        if entry.failure_count == self.failure_threshold {
            entry.opened_at = Some(now);
            warn!(
                "circuit opened for '{lang}' after {} consecutive failures",
                entry.failure_count
            );
        }
    }

    pub fn record_success(&self, lang: &str) {
        let mut states = self.states.lock().expect("CircuitBreaker lock poisoned");
        states.remove(lang);
    }

    /// Consecutive failures currently recorded for `lang`.
    pub fn failure_count(&self, lang: &str) -> u32 {
        let states = self.states.lock().expect("CircuitBreaker lock poisoned");
        states.get(lang).map_or(0, |entry| entry.failure_count)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_language_is_closed() {
        let cb = CircuitBreaker::default();
        assert!(!cb.is_open("ja"));
    }

    #[test]
    fn opens_only_at_threshold() {
        let cb = CircuitBreaker::default();
        cb.record_failure("ja");
        assert!(!cb.is_open("ja"));
        cb.record_failure("ja");
        assert!(cb.is_open("ja"));
    }

    #[test]
    fn success_resets_count() {
        let cb = CircuitBreaker::default();
        cb.record_failure("ja");
        cb.record_success("ja");
        cb.record_failure("ja");
        assert!(!cb.is_open("ja"));
        assert_eq!(cb.failure_count("ja"), 1);

        cb.record_failure("ja");
        assert!(cb.is_open("ja"));
        cb.record_success("ja");
        assert!(!cb.is_open("ja"));
        assert_eq!(cb.failure_count("ja"), 0);
    }

    #[test]
    fn auto_resets_after_cooldown() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(60));
        let start = Instant::now();
        cb.record_failure_at("fi", start);
        cb.record_failure_at("fi", start);

        assert!(cb.is_open_at("fi", start + Duration::from_secs(59)));
        assert!(!cb.is_open_at("fi", start + Duration::from_secs(60)));
        assert_eq!(cb.failure_count("fi"), 0);
    }

    #[test]
    fn opened_at_is_set_once() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(60));
        let start = Instant::now();
        cb.record_failure_at("fi", start);
        cb.record_failure_at("fi", start);
        // Further failures while open must not push the cooldown out.
        cb.record_failure_at("fi", start + Duration::from_secs(30));
        assert!(!cb.is_open_at("fi", start + Duration::from_secs(61)));
    }

    #[test]
    fn languages_are_independent() {
        let cb = CircuitBreaker::default();
        cb.record_failure("ar");
        cb.record_failure("ar");
        assert!(cb.is_open("ar"));
        assert!(!cb.is_open("ko"));
        assert_eq!(cb.failure_count("ar"), 2);
        assert_eq!(cb.failure_count("ko"), 0);
    }
}
