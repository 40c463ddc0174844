use serde::{Deserialize, Serialize};

use crate::urls::normalize_url;

/// Pre-extracted article content, typically a feed item's `content:encoded`.
pub trait FeedContent: Send + Sync {
    /// Content for the article at `url` (already normalized), if any.
    fn content_for(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub link: String,
    pub content: String,
}

/// In-memory feed items keyed by normalized link.
#[derive(Debug, Clone, Default)]
pub struct FeedIndex {
    items: Vec<FeedItem>,
}

impl FeedIndex {
    pub fn new(items: impl IntoIterator<Item = FeedItem>) -> Self {
        let items = items
            .into_iter()
            .filter(|item| !item.link.trim().is_empty())
            .map(|item| FeedItem {
                link: normalize_url(item.link.trim()),
                content: item.content,
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FeedContent for FeedIndex {
    /// Exact link match first; otherwise the first item whose link is a
    /// prefix of `url` (feeds often drop a trailing path segment).
    fn content_for(&self, url: &str) -> Option<String> {
        let target = normalize_url(url);
        self.items
            .iter()
            .find(|item| item.link == target)
            .or_else(|| self.items.iter().find(|item| target.starts_with(&item.link)))
            .map(|item| item.content.clone())
    }
}
