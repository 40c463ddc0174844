use thiserror::Error;

use crate::fetcher::FetchError;

#[derive(Error, Debug, Clone)]
pub enum ExtractError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("no content node found")]
    NoContentFound,

    #[error("insufficient content ({text_len} chars)")]
    InsufficientContent { text_len: usize },

    #[error("article is behind a paywall")]
    Paywall,
}

/// What the route layer should show instead of the article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Link out to the publisher.
    LinkOut,
    /// Show the feed's short description.
    ShortDescription,
}

impl ExtractError {
    pub fn fallback(&self) -> Fallback {
        match self {
            Self::Paywall => Fallback::LinkOut,
            _ => Fallback::ShortDescription,
        }
    }

    /// Paywalls and thin pages won't change on a retry; fetch failures might.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Fetch(e) => !e.should_retry(),
            Self::NoContentFound | Self::InsufficientContent { .. } | Self::Paywall => true,
        }
    }
}
