use serde::{Deserialize, Serialize};
use std::fmt;

/// Which strategy produced the served HTML. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyTag {
    Selectors,
    HeuristicPicker,
    ParagraphAggregate,
    AmpFallback,
    Rss,
}

impl StrategyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selectors => "selectors",
            Self::HeuristicPicker => "heuristic-picker",
            Self::ParagraphAggregate => "paragraph-aggregate",
            Self::AmpFallback => "amp-fallback",
            Self::Rss => "rss",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub strategy: StrategyTag,
    /// Characters of text in the served HTML.
    pub text_length: usize,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub html: String,
    pub metadata: ExtractionMetadata,
}

/// A content node picked by one of the selection strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Inner HTML of the chosen node, or synthesized paragraphs.
    pub html: String,
    /// Raw trimmed text.
    pub text: String,
    pub text_len: usize,
    pub strategy: StrategyTag,
}

impl Candidate {
    pub fn new(html: String, text: &str, strategy: StrategyTag) -> Self {
        let text = text.trim().to_string();
        Self {
            html,
            text_len: text.chars().count(),
            text,
            strategy,
        }
    }
}
