//! Accept/reject predicates applied to a finished chain's English output.
//!
//! Every predicate runs on every candidate and each failure is reported, so
//! a verdict explains all of what is wrong with a text rather than the first
//! thing. Measurements use the candidate with protected spans stripped;
//! duplicate detection compares the untouched text.

use std::fmt;
use std::sync::Arc;

use garble_core::{ENGLISH, QualitySettings};
use tracing::debug;

use crate::providers::{Detection, LanguageDetector};
use crate::tokens::strip_protected;

const PROBLEMATIC_LITERALS: &[&str] = &["/", ":", ".", "", " "];

/// The individual checks a candidate can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    TooShort,
    Degenerate,
    PunctuationOnly,
    ExactDuplicate,
    NoOp,
    WrongLanguage,
    ProblematicLiteral,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TooShort => "too_short",
            Self::Degenerate => "degenerate",
            Self::PunctuationOnly => "punctuation_only",
            Self::ExactDuplicate => "exact_duplicate",
            Self::NoOp => "no_op",
            Self::WrongLanguage => "wrong_language",
            Self::ProblematicLiteral => "problematic_literal",
        };
        f.write_str(name)
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityVerdict {
    pub acceptable: bool,
    /// One human-readable message per failed predicate.
    pub reasons: Vec<String>,
    pub failed: Vec<Predicate>,
    /// Detector output for the stripped candidate, when detection ran.
    pub detection: Option<Detection>,
}

impl QualityVerdict {
    pub fn failed(&self, predicate: Predicate) -> bool {
        self.failed.contains(&predicate)
    }

    /// Whether the detector's top guess was English, regardless of confidence.
    pub fn detected_english(&self) -> bool {
        self.detection.as_ref().is_some_and(|d| d.is(ENGLISH))
    }

    pub fn summary(&self) -> String {
        if self.acceptable {
            "accepted".to_string()
        } else {
            self.reasons.join("; ")
        }
    }
}

pub struct QualityGate {
    detector: Arc<dyn LanguageDetector>,
    settings: QualitySettings,
}

impl QualityGate {
    pub fn new(detector: Arc<dyn LanguageDetector>, settings: QualitySettings) -> Self {
        Self { detector, settings }
    }

    pub async fn evaluate(
        &self,
        candidate: &str,
        original: &str,
        recently_published: &[String],
    ) -> QualityVerdict {
        let stripped = strip_protected(candidate);
        let stripped_original = strip_protected(original);
        let length = stripped.chars().count();
        let original_length = stripped_original.chars().count();

        let mut failures: Vec<(Predicate, String)> = Vec::new();

        let min_length = original_length as f64 * self.settings.min_length_ratio;
        if (length as f64) < min_length {
            failures.push((
                Predicate::TooShort,
                format!(
                    "too short: {length} chars, need at least {:.0}% of the original's {original_length}",
                    self.settings.min_length_ratio * 100.0
                ),
            ));
        }

        if length <= 1 {
            failures.push((
                Predicate::Degenerate,
                format!("degenerate: {length} chars after stripping"),
            ));
        }

        if !stripped.is_empty() && stripped.chars().all(|c| !c.is_alphanumeric()) {
            failures.push((
                Predicate::PunctuationOnly,
                "punctuation only: no letters or digits".to_string(),
            ));
        }

        if recently_published.iter().any(|text| text == candidate) {
            failures.push((
                Predicate::ExactDuplicate,
                "exact duplicate of a previously published text".to_string(),
            ));
        }

        if stripped == stripped_original {
            failures.push((
                Predicate::NoOp,
                "no-op: identical to the original".to_string(),
            ));
        }

        let detection = if stripped.is_empty() {
            failures.push((
                Predicate::WrongLanguage,
                "wrong language: nothing left to detect".to_string(),
            ));
            None
        } else {
            match self.detector.detect(&stripped).await {
                Ok(detection) => {
                    if let Some(reason) = self.english_failure(&detection) {
                        failures.push((Predicate::WrongLanguage, reason));
                    }
                    Some(detection)
                }
                Err(e) => {
                    failures.push((
                        Predicate::WrongLanguage,
                        format!("wrong language: detection failed: {e}"),
                    ));
                    None
                }
            }
        };

        if PROBLEMATIC_LITERALS.contains(&stripped.as_str()) || stripped.starts_with('/') {
            failures.push((
                Predicate::ProblematicLiteral,
                format!("problematic literal: {stripped:?}"),
            ));
        }

        let (failed, reasons): (Vec<_>, Vec<_>) = failures.into_iter().unzip();
        let verdict = QualityVerdict {
            acceptable: failed.is_empty(),
            reasons,
            failed,
            detection,
        };
        debug!("quality verdict for {candidate:?}: {}", verdict.summary());
        verdict
    }

    /// `None` when the detection counts as confidently English.
    fn english_failure(&self, detection: &Detection) -> Option<String> {
        let top = &detection.top;
        if !detection.is(ENGLISH) {
            return Some(format!(
                "wrong language: detected '{}' ({:.2})",
                top.code, top.confidence
            ));
        }
        if top.confidence <= self.settings.english_min_confidence {
            return Some(format!(
                "wrong language: English confidence {:.2} not above {:.2}",
                top.confidence, self.settings.english_min_confidence
            ));
        }
        let runner_up = detection.runner_up.as_ref().map_or(0.0, |g| g.confidence);
        let margin = top.confidence - runner_up;
        if margin <= self.settings.english_margin {
            return Some(format!(
                "wrong language: English leads the runner-up by only {margin:.2}"
            ));
        }
        None
    }
}
