//! Value types shared across the garble crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language code every chain starts from and returns to.
pub const ENGLISH: &str = "en";

/// How the languages of a translation chain are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStrategy {
    /// The configured `fixed_languages`, in order.
    Fixed,
    /// A fresh shuffle drawn without replacement from `language_pool`.
    Random,
}

impl ChainStrategy {
    /// The strategy to fall back to once this one has exhausted its attempts.
    pub fn other(self) -> Self {
        match self {
            Self::Fixed => Self::Random,
            Self::Random => Self::Fixed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for ChainStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown chain strategy '{other}'")),
        }
    }
}

/// One piece of source text waiting to be garbled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: String,
    pub text: String,
}

impl SourceItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_other_flips() {
        assert_eq!(ChainStrategy::Fixed.other(), ChainStrategy::Random);
        assert_eq!(ChainStrategy::Random.other(), ChainStrategy::Fixed);
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("Fixed".parse::<ChainStrategy>(), Ok(ChainStrategy::Fixed));
        assert_eq!(" random ".parse::<ChainStrategy>(), Ok(ChainStrategy::Random));
        assert!("shuffle".parse::<ChainStrategy>().is_err());
    }

    #[test]
    fn strategy_serializes_lowercase() {
        let json = serde_json::to_string(&ChainStrategy::Random).unwrap();
        assert_eq!(json, "\"random\"");
    }
}
