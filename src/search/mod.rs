//! Question similarity search
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                 find_similar(query, top_k, threshold)          │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                ┌───────────────────────────────┐   hit
//!                │   SearchCache (cache.rs)      │ ──────► ranked list
//!                └───────────────────────────────┘
//!                                │ miss
//!                                ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │  Vectorizer (embeddings.rs)  │  │  QuestionIndex (index.rs)    │
//! │  query -> FeatureVector      │  │  id -> vector + facets       │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!                     │                          │
//!                     └──────────┬───────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │  SimilarityScorer (scoring.rs)│
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!              filter >= threshold, sort, truncate top_k
//! ```

pub mod cache;
pub mod embeddings;
pub mod engine;
pub mod index;
pub mod scoring;
pub mod stats;

// Re-export main types
pub use cache::{Fingerprint, SearchCache};
pub use embeddings::{FeatureVector, HashVectorizer, Vectorizer, normalize_text};
pub use engine::{SearchEngine, SimilarQuestion};
pub use index::{BuildResult, IndexEntry, IndexSnapshot, PreparedBatch, QuestionIndex, SkippedRecord};
pub use scoring::{ReasonThresholds, ScoringWeights, SimilarityBreakdown, SimilarityScorer};
pub use stats::{BuildSummary, IndexStatistics, StatsSnapshot};
