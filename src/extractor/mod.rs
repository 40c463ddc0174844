pub mod cleaner;
pub mod dom;
pub mod errors;
pub mod feed;
pub mod model;
pub mod paywall;
pub mod rules;
pub mod selector;

#[cfg(test)]
mod tests;

pub use errors::{ExtractError, Fallback};
pub use feed::{FeedContent, FeedIndex, FeedItem};
pub use model::{Candidate, ExtractionMetadata, ExtractionResult, StrategyTag};
pub use rules::{ExtractionRules, Thresholds};
pub use selector::{ContentStrategy, StrategyChain, select_content_node};

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::ExtractionCache;
use crate::config::{Config, ConfigError};
use crate::fetcher::{FetchOptions, Fetcher};
use crate::urls::{amp_url, normalize_url};

const DEFAULT_MAX_RETRIES: u32 = 2;
const AMP_RETRIES: u32 = 1;

/// A selected and sanitized content body, before finalization.
#[derive(Debug, Clone)]
pub struct Sanitized {
    pub html: String,
    /// Raw candidate text length; zero when sanitizing left nothing.
    pub text_len: usize,
    pub strategy: StrategyTag,
}

impl Sanitized {
    fn from_candidate(candidate: Candidate, rules: &ExtractionRules) -> Self {
        let html = cleaner::sanitize(&candidate.html, rules);
        let text_len = if html.trim().is_empty() {
            0
        } else {
            candidate.text_len
        };
        Self {
            html,
            text_len,
            strategy: candidate.strategy,
        }
    }
}

/// Select, paywall-check and sanitize the body of a fetched page.
///
/// `Ok(None)` means no strategy found anything.
pub fn analyze_page(html: &str, rules: &ExtractionRules) -> Result<Option<Sanitized>, ExtractError> {
    let document = dom::parse_document(html);
    let candidate = match StrategyChain::standard().select(&document, rules) {
        Ok(candidate) => candidate,
        Err(ExtractError::NoContentFound) => return Ok(None),
        Err(e) => return Err(e),
    };

    let sanitized = Sanitized::from_candidate(candidate, rules);
    if sanitized.text_len > 0 || sanitized.strategy == StrategyTag::ParagraphAggregate {
        return Ok(Some(sanitized));
    }

    // Sanitizing emptied the node; the page may still hold loose paragraphs.
    debug!(strategy = %sanitized.strategy, "sanitized body empty, trying paragraphs");
    match selector::ParagraphAggregate.try_extract(&document, None, rules) {
        Some(candidate) if paywall::detect_paywall(&candidate.text, rules) => {
            Err(ExtractError::Paywall)
        }
        Some(candidate) => Ok(Some(Sanitized::from_candidate(candidate, rules))),
        None => Ok(Some(sanitized)),
    }
}

/// Node-level selection on an AMP mirror. Paywalled or empty mirrors yield
/// `None`; they never fail an extraction.
pub fn analyze_amp(html: &str, rules: &ExtractionRules) -> Option<Sanitized> {
    let document = dom::parse_document(html);
    let candidate = StrategyChain::primary().select(&document, rules).ok()?;
    let sanitized = Sanitized::from_candidate(candidate, rules);
    (sanitized.text_len > 0).then(|| Sanitized {
        strategy: StrategyTag::AmpFallback,
        ..sanitized
    })
}

/// Fetches article pages and turns them into clean, publishable HTML.
#[derive(Clone)]
pub struct Extractor {
    fetcher: Fetcher,
    cache: ExtractionCache,
    rules: Arc<ExtractionRules>,
    feed: Option<Arc<dyn FeedContent>>,
    max_retries: u32,
}

impl Extractor {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            cache: ExtractionCache::default(),
            rules: Arc::new(ExtractionRules::default()),
            feed: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let fetcher = Fetcher::new(config.fetch_config()).map_err(|e| ConfigError::InvalidValue {
            field: "http_client",
            reason: e.to_string(),
        })?;
        Ok(Self::new(fetcher)
            .with_rules(config.load_rules()?)
            .with_cache(ExtractionCache::new(config.cache_max_entries()))
            .with_max_retries(config.max_retries()))
    }

    pub fn with_rules(mut self, rules: ExtractionRules) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    pub fn with_cache(mut self, cache: ExtractionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_feed(mut self, feed: Arc<dyn FeedContent>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    pub fn normalize_url(&self, url: &str) -> String {
        normalize_url(url)
    }

    /// Extract the article at `url`, bypassing the cache.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract_article(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let normalized = normalize_url(url);
        let t = &self.rules.thresholds;

        if let Some(result) = self.feed_result(url, &normalized) {
            info!(text_len = result.metadata.text_length, "served from feed content");
            return Ok(result);
        }

        let page = self
            .fetcher
            .fetch_page(url, &FetchOptions::default(), self.max_retries)
            .await?;
        let mut best = analyze_page(&page.body_utf8, &self.rules)?;
        let mut base_url = page.url_final;

        if best.as_ref().is_none_or(|b| b.text_len < t.short_content)
            && let Some(amp) = amp_url(url)
            && let Some((mirror, final_url)) = self.fetch_amp(&amp).await
            && mirror.text_len > best.as_ref().map_or(0, |b| b.text_len)
        {
            debug!(text_len = mirror.text_len, "amp mirror improved on page");
            best = Some(mirror);
            base_url = final_url;
        }

        let Some(best) = best else {
            warn!("no content node found");
            return Err(ExtractError::NoContentFound);
        };
        if best.text_len < t.min_content {
            warn!(text_len = best.text_len, "content too short");
            return Err(ExtractError::InsufficientContent {
                text_len: best.text_len,
            });
        }

        let html = cleaner::finalize(&best.html, &base_url);
        let text_length = dom::fragment_text_len(&html);
        info!(strategy = %best.strategy, text_length, "extracted article");

        Ok(ExtractionResult {
            html,
            metadata: ExtractionMetadata {
                strategy: best.strategy,
                text_length,
                source_url: url.to_string(),
            },
        })
    }

    /// Cache read-through around [`Self::extract_article`]. Only successes are
    /// cached.
    pub async fn extract_article_cached(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        if let Some(hit) = self.cache.get(url) {
            debug!(url, "cache hit");
            return Ok(hit);
        }
        let result = self.extract_article(url).await?;
        self.cache.set(url, &result);
        Ok(result)
    }

    pub fn get_cached_extraction(&self, url: &str) -> Option<ExtractionResult> {
        self.cache.get(url)
    }

    pub fn set_cached_extraction(&self, url: &str, result: &ExtractionResult) {
        self.cache.set(url, result);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn feed_result(&self, url: &str, normalized: &str) -> Option<ExtractionResult> {
        let content = self.feed.as_ref()?.content_for(normalized)?;
        if dom::trimmed_len(&content) <= self.rules.thresholds.feed_min_content {
            return None;
        }

        let base = Url::parse(normalized).ok()?;
        let html = cleaner::finalize(&content, &base);
        Some(ExtractionResult {
            metadata: ExtractionMetadata {
                strategy: StrategyTag::Rss,
                text_length: dom::fragment_text_len(&html),
                source_url: url.to_string(),
            },
            html,
        })
    }

    async fn fetch_amp(&self, amp: &str) -> Option<(Sanitized, Url)> {
        let page = match self
            .fetcher
            .fetch_page(amp, &FetchOptions::default(), AMP_RETRIES)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                debug!(url = amp, error = %e, "amp mirror unavailable");
                return None;
            }
        };
        let mirror = analyze_amp(&page.body_utf8, &self.rules)?;
        Some((mirror, page.url_final))
    }
}
