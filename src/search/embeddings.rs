//! Hash embeddings for question text
//!
//! Implements FNV-1a feature hashing over character n-grams of normalized
//! stem and answer text. No model dependencies, fully deterministic, and
//! language-agnostic (CJK text has no word boundaries, so characters are
//! the unit rather than whitespace tokens).

use unicode_normalization::UnicodeNormalization;

use crate::question::QuestionView;

/// Default embedding dimension
pub const DEFAULT_DIMS: usize = 384;

/// Default maximum n-gram length
pub const DEFAULT_NGRAM_MAX: usize = 2;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Operators kept by normalization; they carry meaning in math stems.
const MATH_OPERATORS: &[char] = &['+', '-', '*', '/', '=', '<', '>', '^', '%', '×', '÷'];

/// Weight of answer-text grams relative to stem grams
const ANSWER_WEIGHT: f32 = 0.5;

/// Fixed-dimension feature vector attached to an index entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    #[must_use]
    pub const fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn zeros(dims: usize) -> Self {
        Self(vec![0.0; dims])
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Cosine similarity clamped to [0, 1]; zero if either side is all-zero.
    #[must_use]
    pub fn cosine(&self, other: &Self) -> f32 {
        cosine_similarity(&self.0, &other.0).clamp(0.0, 1.0)
    }
}

/// Turns a question into a feature vector.
///
/// Implementations must be deterministic and must always return exactly
/// `dims()` values.
pub trait Vectorizer: Send + Sync {
    /// Output dimension
    fn dims(&self) -> usize;

    /// Vectorize a question's stem and answer text
    fn vectorize(&self, question: &QuestionView<'_>) -> FeatureVector;

    /// Short backend name for statistics
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Hash embedder using FNV-1a over character n-grams
#[derive(Debug, Clone)]
pub struct HashVectorizer {
    /// Embedding dimension (default: 384)
    dims: usize,
    /// Longest n-gram emitted (default: 2)
    ngram_max: usize,
}

impl Default for HashVectorizer {
    fn default() -> Self {
        Self {
            dims: DEFAULT_DIMS,
            ngram_max: DEFAULT_NGRAM_MAX,
        }
    }
}

impl HashVectorizer {
    /// Create embedder with specified dimension. A zero dimension is bumped to 1.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            ngram_max: DEFAULT_NGRAM_MAX,
        }
    }

    #[must_use]
    pub fn with_ngram_max(mut self, ngram_max: usize) -> Self {
        self.ngram_max = ngram_max.max(1);
        self
    }

    #[must_use]
    pub const fn ngram_max(&self) -> usize {
        self.ngram_max
    }

    /// Embed free text into an L2-normalized vector
    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dims];
        self.accumulate(&normalize_text(text), 1.0, &mut vector);
        l2_normalize(&mut vector);
        vector
    }

    fn accumulate(&self, normalized: &str, weight: f32, vector: &mut [f32]) {
        let chars: Vec<char> = normalized.chars().collect();
        for n in 1..=self.ngram_max {
            if chars.len() < n {
                break;
            }
            // Unigrams are noisy on their own; longer grams carry order.
            let gram_weight = if n == 1 { weight * 0.5 } else { weight };
            let mut buf = String::new();
            for window in chars.windows(n) {
                buf.clear();
                buf.extend(window);
                let bucket = bucket_for(&buf, self.dims);
                vector[bucket] += gram_weight;
            }
        }
    }
}

impl Vectorizer for HashVectorizer {
    fn dims(&self) -> usize {
        self.dims
    }

    fn vectorize(&self, question: &QuestionView<'_>) -> FeatureVector {
        let stem = normalize_text(question.stem);
        if stem.is_empty() {
            return FeatureVector::zeros(self.dims);
        }

        let mut vector = vec![0.0; self.dims];
        self.accumulate(&stem, 1.0, &mut vector);
        self.accumulate(&normalize_text(question.answer), ANSWER_WEIGHT, &mut vector);
        l2_normalize(&mut vector);
        FeatureVector::new(vector)
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

/// Case-fold and strip whitespace and punctuation.
///
/// NFKC folds full-width forms (`：`, `４`) onto their ASCII counterparts
/// first, so `解方程：２x` and `解方程 2X` normalize identically.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || MATH_OPERATORS.contains(c))
        .collect()
}

/// Compute cosine similarity between two embeddings
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    if a == b && a.iter().any(|v| *v != 0.0) {
        return 1.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[allow(clippy::cast_possible_truncation)]
fn bucket_for(gram: &str, dims: usize) -> usize {
    (fnv1a(gram.as_bytes()) % dims as u64) as usize
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{QuestionRecord, QuestionType};

    fn record(stem: &str, answer: &str) -> QuestionRecord {
        QuestionRecord::new("Q", stem, answer, QuestionType::Calculation, 2, "math")
    }

    #[test]
    fn normalize_folds_case_width_and_punctuation() {
        assert_eq!(normalize_text("解方程：２X + 3 = 7。"), "解方程2x+3=7");
        assert_eq!(normalize_text("  Hello,   World! "), "helloworld");
        assert_eq!(normalize_text("...!?"), "");
    }

    #[test]
    fn vectorize_is_deterministic_and_sized() {
        let vectorizer = HashVectorizer::new(64);
        let r = record("求解方程：4x+1=9", "x=2");
        let a = vectorizer.vectorize(&r.view());
        let b = vectorizer.vectorize(&r.view());
        assert_eq!(a, b);
        assert_eq!(a.dims(), 64);
        assert!(!a.is_zero());
    }

    #[test]
    fn empty_stem_yields_zero_vector() {
        let vectorizer = HashVectorizer::default();
        let v = vectorizer.vectorize(&record("  ，。 ", "x=2").view());
        assert!(v.is_zero());
        assert_eq!(v.dims(), DEFAULT_DIMS);
    }

    #[test]
    fn superficial_differences_compare_equal() {
        let vectorizer = HashVectorizer::default();
        let a = vectorizer.vectorize(&record("Solve: 2x + 3 = 7", "x = 2").view());
        let b = vectorizer.vectorize(&record("solve 2X+3=7", "X=2").view());
        assert!((a.cosine(&b) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn related_text_scores_higher_than_unrelated() {
        let vectorizer = HashVectorizer::default();
        let query = vectorizer.vectorize(&record("求解方程：4x+1=9", "x=2").view());
        let close = vectorizer.vectorize(&record("解方程：2x+3=7", "x=2").view());
        let far = vectorizer.vectorize(&record("分析古诗情感", "...").view());
        assert!(query.cosine(&close) > query.cosine(&far));
    }

    #[test]
    fn cosine_handles_zero_and_mismatched_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.3, 0.4], &[0.3, 0.4]), 1.0);
    }

    #[test]
    fn zero_dims_is_bumped() {
        let vectorizer = HashVectorizer::new(0);
        assert_eq!(vectorizer.dims(), 1);
        assert_eq!(vectorizer.embed("abc").len(), 1);
    }
}
