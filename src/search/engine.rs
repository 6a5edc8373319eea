//! Search engine orchestrator
//!
//! Owns the question index, the result cache, the scorer and the statistics
//! aggregator. No parallel work runs while the index lock is held: builds
//! vectorize before taking the write lock, and searches score a snapshot
//! after releasing the read lock. Every mutation bumps the index generation
//! and clears the cache under the write lock; a search stores its results
//! only if the generation is still the one it scored against, so the cache
//! never holds results computed from an older index state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{QsError, Result};
use crate::question::{QuestionQuery, QuestionRecord};
use crate::search::cache::{Fingerprint, SearchCache};
use crate::search::embeddings::{FeatureVector, HashVectorizer, Vectorizer};
use crate::search::index::{BuildResult, IndexEntry, IndexSnapshot, PreparedBatch, QuestionIndex};
use crate::search::scoring::{Scored, SimilarityBreakdown, SimilarityScorer};
use crate::search::stats::{IndexStatistics, SearchStats, StatsSnapshot};

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarQuestion {
    /// 1-based rank
    pub rank: usize,
    pub question: QuestionRecord,
    pub similarity_score: f64,
    pub similarity_breakdown: SimilarityBreakdown,
    pub match_reasons: Vec<String>,
}

pub struct SearchEngine {
    vectorizer: Arc<dyn Vectorizer>,
    index: RwLock<QuestionIndex>,
    cache: SearchCache,
    scorer: SimilarityScorer,
    stats: Mutex<SearchStats>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(
            Arc::new(HashVectorizer::default()),
            SimilarityScorer::default(),
            SearchCache::default(),
        )
    }
}

impl SearchEngine {
    #[must_use]
    pub fn new(vectorizer: Arc<dyn Vectorizer>, scorer: SimilarityScorer, cache: SearchCache) -> Self {
        Self {
            index: RwLock::new(QuestionIndex::new(Arc::clone(&vectorizer))),
            vectorizer,
            cache,
            scorer,
            stats: Mutex::new(SearchStats::default()),
        }
    }

    /// Construct from configuration with the hash vectorizer.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let vectorizer = HashVectorizer::new(config.vectorizer.dims)
            .with_ngram_max(config.vectorizer.ngram_max);
        Self::from_config_with_vectorizer(config, Arc::new(vectorizer))
    }

    /// Construct from configuration with a caller-supplied vectorizer.
    pub fn from_config_with_vectorizer(
        config: &Config,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> Result<Self> {
        let scorer = SimilarityScorer::new(config.scoring.weights)?
            .with_reason_thresholds(config.scoring.reasons);
        let cache = if config.cache.enabled {
            SearchCache::new(config.cache.capacity)
        } else {
            SearchCache::disabled()
        };
        Ok(Self::new(vectorizer, scorer, cache))
    }

    #[must_use]
    pub const fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    #[must_use]
    pub const fn cache(&self) -> &SearchCache {
        &self.cache
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectorizer.dims()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<QuestionRecord> {
        self.index.read().get(id).map(|entry| entry.record().clone())
    }

    /// Rebuild the index from scratch and clear the cache.
    pub fn build_index(&self, records: &[QuestionRecord]) -> BuildResult {
        let batch = PreparedBatch::vectorize(self.vectorizer.as_ref(), records);
        let mut index = self.index.write();
        let result = index.commit_build(batch);
        self.cache.invalidate_all();
        drop(index);

        self.stats.lock().record_build(&result);
        result
    }

    /// Upsert one record. Returns true if it replaced an existing entry.
    pub fn insert(&self, record: QuestionRecord) -> Result<bool> {
        let id = record.id.clone();
        let mut index = self.index.write();
        let replaced = index.insert(record).map_err(|err| match err {
            QsError::VectorizationSkipped { id, reason } => {
                QsError::InvalidArgument(format!("question {id}: {reason}"))
            }
            other => other,
        })?;
        self.cache.invalidate_all();
        drop(index);

        self.stats.lock().record_inserts(1);
        debug!(id = %id, replaced, "question inserted");
        Ok(replaced)
    }

    /// Upsert a batch with a single cache invalidation.
    pub fn insert_batch(&self, records: &[QuestionRecord]) -> BuildResult {
        let batch = PreparedBatch::vectorize(self.vectorizer.as_ref(), records);
        let mut index = self.index.write();
        let result = index.commit_batch(batch);
        if result.indexed > 0 {
            self.cache.invalidate_all();
        }
        drop(index);

        self.stats.lock().record_inserts(result.indexed);
        result
    }

    /// Delete one entry. Returns false if the id was not indexed.
    pub fn remove(&self, id: &str) -> bool {
        let mut index = self.index.write();
        let removed = index.remove(id).is_some();
        if removed {
            self.cache.invalidate_all();
        }
        drop(index);

        if removed {
            self.stats.lock().record_removal();
            debug!(id = %id, "question removed");
        }
        removed
    }

    /// Rank indexed questions by similarity to `query`.
    ///
    /// Results have composite score >= `similarity_threshold`, are ordered by
    /// score descending then id ascending, and number at most `top_k`. An
    /// empty index yields an empty list.
    pub fn find_similar(
        &self,
        query: &QuestionQuery,
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<SimilarQuestion>> {
        validate_search_args(top_k, similarity_threshold)?;
        query.validate()?;

        let start = Instant::now();
        let fingerprint = Fingerprint::compute(query, top_k, similarity_threshold);

        let index = self.index.read();
        if let Some(results) = self.cache.get(&fingerprint) {
            drop(index);
            self.stats.lock().record_search(true, start.elapsed());
            debug!(fingerprint = %fingerprint, count = results.len(), "search cache hit");
            return Ok(results);
        }
        let snapshot = index.snapshot();
        drop(index);

        let query_vector = self.vectorizer.vectorize(&query.view());
        if query_vector.dims() != self.vectorizer.dims() {
            return Err(QsError::DimensionMismatch {
                expected: self.vectorizer.dims(),
                actual: query_vector.dims(),
            });
        }

        let results = self.rank(&snapshot, query, &query_vector, top_k, similarity_threshold);

        let index = self.index.read();
        if index.generation() == snapshot.generation() {
            self.cache.put(fingerprint.clone(), results.clone());
        }
        drop(index);

        let elapsed = start.elapsed();
        self.stats.lock().record_search(false, elapsed);
        trace!(
            fingerprint = %fingerprint,
            count = results.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "search cache miss"
        );
        Ok(results)
    }

    fn rank(
        &self,
        snapshot: &IndexSnapshot,
        query: &QuestionQuery,
        query_vector: &FeatureVector,
        top_k: usize,
        threshold: f64,
    ) -> Vec<SimilarQuestion> {
        let query_side = Scored {
            question: query.view(),
            vector: query_vector,
        };
        let entries: Vec<&IndexEntry> = snapshot
            .entries()
            .filter(|entry| query.id.as_deref() != Some(entry.id()))
            .collect();

        let mut scored: Vec<(&IndexEntry, SimilarityBreakdown)> = entries
            .par_iter()
            .map(|entry| (*entry, self.scorer.score(query_side, entry.scored())))
            .filter(|(_, breakdown)| breakdown.composite >= threshold)
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.composite
                .total_cmp(&sa.composite)
                .then_with(|| a.id().cmp(b.id()))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (entry, breakdown))| SimilarQuestion {
                rank: i + 1,
                question: entry.record().clone(),
                similarity_score: breakdown.composite,
                match_reasons: self.scorer.match_reasons(&breakdown),
                similarity_breakdown: breakdown,
            })
            .collect()
    }

    /// Cumulative usage statistics.
    #[must_use]
    pub fn get_statistics(&self) -> StatsSnapshot {
        let indexed = self.len();
        self.stats
            .lock()
            .snapshot(indexed, self.cache.len(), self.cache.capacity())
    }

    /// Composition of the current index.
    #[must_use]
    pub fn index_statistics(&self) -> IndexStatistics {
        let index = self.index.read();
        let mut by_subject = BTreeMap::new();
        let mut by_type = BTreeMap::new();
        let mut by_difficulty = BTreeMap::new();
        for entry in index.all_entries() {
            let facets = entry.facets();
            *by_subject.entry(facets.subject.clone()).or_insert(0) += 1;
            *by_type
                .entry(facets.question_type.as_str().to_string())
                .or_insert(0) += 1;
            *by_difficulty.entry(facets.difficulty).or_insert(0) += 1;
        }
        let total_questions = index.len();
        drop(index);

        IndexStatistics {
            total_questions,
            vector_dimension: self.vectorizer.dims(),
            vectorizer: self.vectorizer.name().to_string(),
            by_subject,
            by_type,
            by_difficulty,
            last_build: self.stats.lock().last_build().cloned(),
        }
    }
}

fn validate_search_args(top_k: usize, threshold: f64) -> Result<()> {
    if top_k < 1 {
        return Err(QsError::InvalidArgument("top_k must be at least 1".to_string()));
    }
    if !(0.0..=1.0).contains(&threshold) {
        return Err(QsError::InvalidArgument(format!(
            "similarity_threshold {threshold} out of range 0-1"
        )));
    }
    Ok(())
}
