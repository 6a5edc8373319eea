//! LRU cache of ranked search results.
//!
//! Keys are fingerprints of the normalized query fields plus the search
//! parameters. Every index mutation clears the whole cache, so an entry is
//! only ever served against the index state it was computed from.
//!
//! A zero capacity is a misconfiguration; the cache then runs disabled and
//! every lookup misses instead of failing the search.

use std::fmt;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{QsError, Result};
use crate::question::QuestionQuery;
use crate::search::embeddings::normalize_text;
use crate::search::engine::SimilarQuestion;

/// Default cache size for query results (number of queries)
pub const DEFAULT_CAPACITY: usize = 256;

/// Cache key: hex SHA-256 over the normalized query and search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a query. Pure: same inputs, same key.
    #[must_use]
    pub fn compute(query: &QuestionQuery, top_k: usize, threshold: f64) -> Self {
        let mut hasher = Sha256::new();
        let fields = [
            normalize_text(&query.stem),
            normalize_text(&query.correct_answer),
            query.question_type.as_str().to_string(),
            query.difficulty_level.to_string(),
            query.subject.trim().to_lowercase(),
            query.id.clone().unwrap_or_default(),
            top_k.to_string(),
            format!("{:016x}", threshold.to_bits()),
        ];
        for field in &fields {
            hasher.update(field.as_bytes());
            // Unit separator so ("ab", "c") and ("a", "bc") differ.
            hasher.update([0x1f_u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// Cached ranked list with metadata for cache management.
#[derive(Debug, Clone)]
pub struct CachedSearch {
    pub results: Vec<SimilarQuestion>,
    /// When this entry was cached
    pub cached_at: DateTime<Utc>,
    /// Number of times this entry was hit
    pub hit_count: u64,
}

/// Thread-safe LRU cache for search results.
pub struct SearchCache {
    inner: Option<Mutex<LruCache<Fingerprint, CachedSearch>>>,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SearchCache {
    /// Create a cache, degrading to always-miss if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap_or_else(|err| {
            warn!(error = %err, "search cache disabled");
            Self::disabled()
        })
    }

    /// Create a cache, failing on a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            QsError::CacheUnavailable("cache capacity must be at least 1".to_string())
        })?;
        Ok(Self {
            inner: Some(Mutex::new(LruCache::new(capacity))),
        })
    }

    /// A cache that stores nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { inner: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |c| c.lock().cap().get())
    }

    /// Get cached results, promoting the entry to most recently used.
    pub fn get(&self, key: &Fingerprint) -> Option<Vec<SimilarQuestion>> {
        let mut cache = self.inner.as_ref()?.lock();
        let entry = cache.get_mut(key)?;
        entry.hit_count += 1;
        Some(entry.results.clone())
    }

    /// Cache results, evicting the least recently used entry when full.
    pub fn put(&self, key: Fingerprint, results: Vec<SimilarQuestion>) {
        if let Some(cache) = &self.inner {
            cache.lock().put(
                key,
                CachedSearch {
                    results,
                    cached_at: Utc::now(),
                    hit_count: 0,
                },
            );
        }
    }

    /// Metadata of a cached entry without touching its recency.
    #[must_use]
    pub fn peek(&self, key: &Fingerprint) -> Option<CachedSearch> {
        let cache = self.inner.as_ref()?.lock();
        cache.peek(key).cloned()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.inner {
            cache.lock().clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |c| c.lock().len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
