//! In-memory question index
//!
//! Rebuildable store mapping question ids to their feature vectors and
//! facets. Entries are kept ordered by id so iteration, and therefore
//! scoring order, is reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{QsError, Result};
use crate::question::{QuestionRecord, QuestionType, QuestionView};
use crate::search::embeddings::{FeatureVector, Vectorizer};
use crate::search::scoring::Scored;

/// Denormalized categorical attributes compared without vector math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facets {
    pub question_type: QuestionType,
    pub difficulty: u8,
    /// Trimmed, lowercased subject
    pub subject: String,
}

/// A record with its vector and facets. Immutable once created.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    record: QuestionRecord,
    vector: FeatureVector,
    facets: Facets,
}

impl IndexEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    #[must_use]
    pub const fn record(&self) -> &QuestionRecord {
        &self.record
    }

    #[must_use]
    pub const fn vector(&self) -> &FeatureVector {
        &self.vector
    }

    #[must_use]
    pub const fn facets(&self) -> &Facets {
        &self.facets
    }

    /// Scoring view: record text plus denormalized facets.
    #[must_use]
    pub fn scored(&self) -> Scored<'_> {
        Scored {
            question: QuestionView {
                stem: &self.record.stem,
                answer: &self.record.correct_answer,
                question_type: self.facets.question_type,
                difficulty: self.facets.difficulty,
                subject: &self.facets.subject,
            },
            vector: &self.vector,
        }
    }
}

/// A record excluded from the index and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Outcome of a bulk build or batch insert.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildResult {
    /// Distinct ids written by this operation
    pub indexed: usize,
    /// Accepted records that overwrote an entry with the same id
    pub replaced: usize,
    /// Records rejected as validation errors
    pub skipped: usize,
    /// Vector dimension of the index
    pub dimension: usize,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_records: Vec<SkippedRecord>,
}

/// Records vectorized ahead of a build or batch insert.
///
/// Produced without touching the index, so the parallel work never runs
/// while a caller holds the index lock.
pub struct PreparedBatch {
    entries: Vec<IndexEntry>,
    skipped_records: Vec<SkippedRecord>,
    dimension: usize,
    started: Instant,
}

impl PreparedBatch {
    /// Validate and vectorize `records` in parallel, keeping input order.
    #[must_use]
    pub fn vectorize(vectorizer: &dyn Vectorizer, records: &[QuestionRecord]) -> Self {
        let started = Instant::now();
        let prepared: Vec<Result<IndexEntry>> = records
            .par_iter()
            .map(|record| make_entry(vectorizer, record.clone()))
            .collect();

        let mut entries = Vec::with_capacity(prepared.len());
        let mut skipped_records = Vec::new();
        for outcome in prepared {
            match outcome {
                Ok(entry) => entries.push(entry),
                Err(QsError::VectorizationSkipped { id, reason }) => {
                    warn!(id = %id, reason = %reason, "skipping question record");
                    skipped_records.push(SkippedRecord { id, reason });
                }
                Err(other) => {
                    warn!(error = %other, "skipping question record");
                    skipped_records.push(SkippedRecord {
                        id: String::new(),
                        reason: other.to_string(),
                    });
                }
            }
        }

        Self {
            entries,
            skipped_records,
            dimension: vectorizer.dims(),
            started,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type EntryMap = BTreeMap<String, Arc<IndexEntry>>;

/// Point-in-time view of the index entries, usable without the index lock.
#[derive(Clone)]
pub struct IndexSnapshot {
    entries: Arc<EntryMap>,
    generation: u64,
}

impl IndexSnapshot {
    /// Mutation count of the index when the snapshot was taken.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending id order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.entries.values().map(AsRef::as_ref)
    }
}

/// Id-keyed store of [`IndexEntry`] values.
///
/// Entries sit behind an `Arc` so snapshots are cheap; mutations copy the
/// map only while a snapshot of the old state is still alive.
pub struct QuestionIndex {
    vectorizer: Arc<dyn Vectorizer>,
    entries: Arc<EntryMap>,
    generation: u64,
}

impl QuestionIndex {
    #[must_use]
    pub fn new(vectorizer: Arc<dyn Vectorizer>) -> Self {
        Self {
            vectorizer,
            entries: Arc::new(BTreeMap::new()),
            generation: 0,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectorizer.dims()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped by every mutation that changes the entry set.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            entries: Arc::clone(&self.entries),
            generation: self.generation,
        }
    }

    /// Entries in ascending id order, as of the call.
    pub fn all_entries(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.entries.values().map(AsRef::as_ref)
    }

    /// Vectorize and replace the whole index with `records`.
    ///
    /// Never fails as a whole: records that cannot be vectorized are skipped
    /// and reported in the result.
    pub fn build(&mut self, records: &[QuestionRecord]) -> BuildResult {
        let batch = PreparedBatch::vectorize(self.vectorizer.as_ref(), records);
        self.commit_build(batch)
    }

    /// Vectorize and upsert a batch without clearing existing entries.
    pub fn insert_batch(&mut self, records: &[QuestionRecord]) -> BuildResult {
        let batch = PreparedBatch::vectorize(self.vectorizer.as_ref(), records);
        self.commit_batch(batch)
    }

    /// Replace the whole index with an already vectorized batch.
    pub fn commit_build(&mut self, batch: PreparedBatch) -> BuildResult {
        self.entries = Arc::new(BTreeMap::new());
        self.generation += 1;
        let result = self.store(batch);
        info!(
            indexed = result.indexed,
            replaced = result.replaced,
            skipped = result.skipped,
            dimension = result.dimension,
            elapsed_ms = result.elapsed_ms,
            "question index built"
        );
        result
    }

    /// Upsert an already vectorized batch.
    pub fn commit_batch(&mut self, batch: PreparedBatch) -> BuildResult {
        let result = self.store(batch);
        if result.indexed > 0 {
            self.generation += 1;
        }
        debug!(
            indexed = result.indexed,
            replaced = result.replaced,
            skipped = result.skipped,
            total = self.entries.len(),
            "question batch inserted"
        );
        result
    }

    /// Vectorize and upsert one record. Returns true if an entry was replaced.
    pub fn insert(&mut self, record: QuestionRecord) -> Result<bool> {
        let entry = make_entry(self.vectorizer.as_ref(), record)?;
        let replaced = Arc::make_mut(&mut self.entries)
            .insert(entry.id().to_string(), Arc::new(entry))
            .is_some();
        self.generation += 1;
        Ok(replaced)
    }

    /// Remove an entry by id. Returns the removed entry, if any.
    pub fn remove(&mut self, id: &str) -> Option<Arc<IndexEntry>> {
        if !self.entries.contains_key(id) {
            return None;
        }
        let removed = Arc::make_mut(&mut self.entries).remove(id);
        self.generation += 1;
        removed
    }

    fn store(&mut self, batch: PreparedBatch) -> BuildResult {
        let PreparedBatch {
            entries,
            skipped_records,
            dimension,
            started,
        } = batch;

        let mut result = BuildResult {
            dimension,
            skipped: skipped_records.len(),
            skipped_records,
            ..BuildResult::default()
        };
        if !entries.is_empty() {
            let map = Arc::make_mut(&mut self.entries);
            let mut written = BTreeSet::new();
            // Input order is kept, so the last duplicate wins.
            for entry in entries {
                let id = entry.id().to_string();
                if map.insert(id.clone(), Arc::new(entry)).is_some() {
                    result.replaced += 1;
                }
                written.insert(id);
            }
            result.indexed = written.len();
        }
        result.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }
}

fn make_entry(vectorizer: &dyn Vectorizer, record: QuestionRecord) -> Result<IndexEntry> {
    if let Err(err) = record.validate() {
        return Err(QsError::VectorizationSkipped {
            id: record.id,
            reason: validation_reason(err),
        });
    }

    let vector = vectorizer.vectorize(&record.view());
    let expected = vectorizer.dims();
    if vector.dims() != expected {
        return Err(QsError::VectorizationSkipped {
            id: record.id,
            reason: QsError::DimensionMismatch {
                expected,
                actual: vector.dims(),
            }
            .to_string(),
        });
    }

    let facets = Facets {
        question_type: record.question_type,
        difficulty: record.difficulty_level,
        subject: record.subject.trim().to_lowercase(),
    };
    Ok(IndexEntry {
        record,
        vector,
        facets,
    })
}

fn validation_reason(err: QsError) -> String {
    match err {
        QsError::InvalidArgument(msg) => msg,
        other => other.to_string(),
    }
}
