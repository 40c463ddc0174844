//! Short-lived cache of finished extractions, keyed by normalized URL.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::extractor::model::{ExtractionMetadata, ExtractionResult};
use crate::urls::normalize_url;

pub const DEFAULT_TTL_MINUTES: i64 = 10;
pub const DEFAULT_MAX_ENTRIES: usize = 512;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub normalized_url: String,
    pub html: String,
    pub metadata: ExtractionMetadata,
    pub inserted_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn to_result(&self) -> ExtractionResult {
        ExtractionResult {
            html: self.html.clone(),
            metadata: self.metadata.clone(),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.inserted_at) <= ttl
    }
}

/// Cheaply clonable handle; clones share the same entries.
#[derive(Debug, Clone)]
pub struct ExtractionCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: Option<usize>,
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_ENTRIES))
    }
}

impl ExtractionCache {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            max_entries,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, url: &str) -> Option<ExtractionResult> {
        self.get_at(url, Utc::now())
    }

    /// Lookup as of `now`. An expired entry is removed and reported absent.
    pub fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<ExtractionResult> {
        let key = normalize_url(url);
        {
            let entry = self.entries.get(&key)?;
            if entry.is_fresh(now, self.ttl) {
                return Some(entry.to_result());
            }
        } // shard lock released before removal

        let ttl = self.ttl;
        self.entries
            .remove_if(&key, |_, entry| !entry.is_fresh(now, ttl));
        debug!(url = %key, "expired cache entry dropped");
        None
    }

    pub fn set(&self, url: &str, result: &ExtractionResult) {
        self.set_at(url, result, Utc::now());
    }

    /// Store `result`, replacing any entry for the same normalized URL. When
    /// full, the oldest other entry is evicted first.
    pub fn set_at(&self, url: &str, result: &ExtractionResult, now: DateTime<Utc>) {
        let key = normalize_url(url);

        if let Some(max) = self.max_entries
            && !self.entries.contains_key(&key)
            && self.entries.len() >= max
        {
            self.evict_oldest();
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                normalized_url: key,
                html: result.html.clone(),
                metadata: result.metadata.clone(),
                inserted_at: now,
            },
        );
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(url = %key, "evicted oldest cache entry");
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry that has outlived the TTL as of `now`. Returns how
    /// many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        before.saturating_sub(self.entries.len())
    }
}
