//! Usage statistics for the search engine.
//!
//! A single [`SearchStats`] aggregator lives inside the engine behind one
//! mutex; every figure reported is derived from its running counters.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::search::index::BuildResult;

/// Summary of the most recent full build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub indexed: usize,
    pub skipped: usize,
    pub dimension: usize,
    pub elapsed_ms: f64,
    pub built_at: DateTime<Utc>,
}

impl From<&BuildResult> for BuildSummary {
    fn from(result: &BuildResult) -> Self {
        Self {
            indexed: result.indexed,
            skipped: result.skipped,
            dimension: result.dimension,
            elapsed_ms: result.elapsed_ms,
            built_at: Utc::now(),
        }
    }
}

/// Running counters. Mutated only by the engine.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    searches: u64,
    cache_hits: u64,
    cache_misses: u64,
    total_latency: Duration,
    builds: u64,
    inserts: u64,
    removals: u64,
    last_build: Option<BuildSummary>,
}

impl SearchStats {
    pub fn record_search(&mut self, cache_hit: bool, latency: Duration) {
        self.searches += 1;
        if cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        self.total_latency += latency;
    }

    pub fn record_build(&mut self, result: &BuildResult) {
        self.builds += 1;
        self.last_build = Some(BuildSummary::from(result));
    }

    pub fn record_inserts(&mut self, count: usize) {
        self.inserts += count as u64;
    }

    pub fn record_removal(&mut self) {
        self.removals += 1;
    }

    #[must_use]
    pub const fn searches(&self) -> u64 {
        self.searches
    }

    #[must_use]
    pub const fn last_build(&self) -> Option<&BuildSummary> {
        self.last_build.as_ref()
    }

    /// Hit rate as a percentage (0-100).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cache_hit_rate(&self) -> f64 {
        if self.searches == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.searches as f64 * 100.0
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_latency_ms(&self) -> f64 {
        if self.searches == 0 {
            0.0
        } else {
            self.total_latency.as_secs_f64() * 1000.0 / self.searches as f64
        }
    }

    #[must_use]
    pub fn snapshot(&self, indexed_questions: usize, cache_size: usize, cache_capacity: usize) -> StatsSnapshot {
        StatsSnapshot {
            total_searches: self.searches,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            cache_hit_rate: self.cache_hit_rate(),
            average_search_time_ms: self.average_latency_ms(),
            total_search_time_ms: self.total_latency.as_secs_f64() * 1000.0,
            indexed_questions,
            cache_size,
            cache_capacity,
            builds: self.builds,
            inserts: self.inserts,
            removals: self.removals,
            last_build: self.last_build.clone(),
        }
    }
}

/// Cumulative engine statistics as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_searches: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Percentage, 0-100
    pub cache_hit_rate: f64,
    pub average_search_time_ms: f64,
    pub total_search_time_ms: f64,
    pub indexed_questions: usize,
    pub cache_size: usize,
    pub cache_capacity: usize,
    pub builds: u64,
    pub inserts: u64,
    pub removals: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build: Option<BuildSummary>,
}

/// Shape of the current index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub total_questions: usize,
    pub vector_dimension: usize,
    pub vectorizer: String,
    pub by_subject: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_difficulty: BTreeMap<u8, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build: Option<BuildSummary>,
}
