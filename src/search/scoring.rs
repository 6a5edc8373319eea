//! Multi-factor similarity between two questions
//!
//! The composite score is a convex combination of five sub-scores, each in
//! [0, 1]:
//!
//! | factor                | source                                     |
//! |-----------------------|--------------------------------------------|
//! | text_similarity       | cosine of the two feature vectors           |
//! | answer_similarity     | normalized Levenshtein ratio of the answers |
//! | type_match            | identical question type                     |
//! | difficulty_proximity  | `1 - abs(d1 - d2) / 4`                      |
//! | subject_match         | case-insensitive subject equality           |
//!
//! Match reasons are descriptive labels only; they never affect ranking.

use serde::{Deserialize, Serialize};

use crate::error::{QsError, Result};
use crate::question::{MAX_DIFFICULTY, MIN_DIFFICULTY, QuestionView};
use crate::search::embeddings::{FeatureVector, normalize_text};

/// Allowed drift of the weight sum from 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Largest possible difficulty gap on the 1-5 scale
const MAX_DIFFICULTY_GAP: f64 = (MAX_DIFFICULTY - MIN_DIFFICULTY) as f64;

/// Per-factor weights of the composite score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub text: f64,
    pub answer: f64,
    pub question_type: f64,
    pub difficulty: f64,
    pub subject: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            text: 0.4,
            answer: 0.2,
            question_type: 0.15,
            difficulty: 0.15,
            subject: 0.1,
        }
    }
}

impl ScoringWeights {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.text + self.answer + self.question_type + self.difficulty + self.subject
    }

    /// Reject negative, non-finite, or non-normalized weights.
    pub fn validate(&self) -> Result<()> {
        let parts = [
            ("text", self.text),
            ("answer", self.answer),
            ("question_type", self.question_type),
            ("difficulty", self.difficulty),
            ("subject", self.subject),
        ];
        for (name, value) in parts {
            if !value.is_finite() || value < 0.0 {
                return Err(QsError::InvalidWeights(format!(
                    "{name} weight must be a non-negative number, got {value}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(QsError::InvalidWeights(format!(
                "weights must sum to 1.0, got {sum:.6}"
            )));
        }
        Ok(())
    }
}

/// Sub-score levels above which a human-readable match reason is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonThresholds {
    pub text: f64,
    pub answer: f64,
    pub difficulty: f64,
}

impl Default for ReasonThresholds {
    fn default() -> Self {
        Self {
            text: 0.7,
            answer: 0.8,
            difficulty: 1.0,
        }
    }
}

/// Per-comparison similarity record. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub text_similarity: f64,
    pub answer_similarity: f64,
    pub type_match: f64,
    pub difficulty_proximity: f64,
    pub subject_match: f64,
    pub composite: f64,
}

/// Side of a comparison: question fields plus its feature vector.
#[derive(Debug, Clone, Copy)]
pub struct Scored<'a> {
    pub question: QuestionView<'a>,
    pub vector: &'a FeatureVector,
}

/// Computes [`SimilarityBreakdown`]s under a validated weight set.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    weights: ScoringWeights,
    reasons: ReasonThresholds,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            reasons: ReasonThresholds::default(),
        }
    }
}

impl SimilarityScorer {
    /// Create a scorer, rejecting weights that do not form a convex combination.
    pub fn new(weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            weights,
            reasons: ReasonThresholds::default(),
        })
    }

    #[must_use]
    pub const fn with_reason_thresholds(mut self, reasons: ReasonThresholds) -> Self {
        self.reasons = reasons;
        self
    }

    #[must_use]
    pub const fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a query against a candidate.
    #[must_use]
    pub fn score(&self, query: Scored<'_>, candidate: Scored<'_>) -> SimilarityBreakdown {
        let text_similarity = f64::from(query.vector.cosine(candidate.vector));
        let answer_similarity = answer_similarity(query.question.answer, candidate.question.answer);
        let type_match = indicator(query.question.question_type == candidate.question.question_type);
        let difficulty_proximity =
            difficulty_proximity(query.question.difficulty, candidate.question.difficulty);
        let subject_match = indicator(subjects_match(query.question.subject, candidate.question.subject));

        let w = &self.weights;
        let weighted = w.text * text_similarity
            + w.answer * answer_similarity
            + w.question_type * type_match
            + w.difficulty * difficulty_proximity
            + w.subject * subject_match;
        // Dividing by the (validated) sum absorbs float drift so a perfect
        // match lands on exactly 1.0.
        let composite = (weighted / w.sum()).clamp(0.0, 1.0);

        SimilarityBreakdown {
            text_similarity,
            answer_similarity,
            type_match,
            difficulty_proximity,
            subject_match,
            composite,
        }
    }

    /// Labels for the factors that cleared their reporting threshold.
    #[must_use]
    pub fn match_reasons(&self, breakdown: &SimilarityBreakdown) -> Vec<String> {
        let mut reasons = Vec::new();
        if breakdown.text_similarity > self.reasons.text {
            reasons.push("content highly similar".to_string());
        }
        if breakdown.answer_similarity > self.reasons.answer {
            reasons.push("answer closely matches".to_string());
        }
        if breakdown.type_match >= 1.0 {
            reasons.push("type matches exactly".to_string());
        }
        if breakdown.difficulty_proximity >= self.reasons.difficulty {
            reasons.push("same difficulty level".to_string());
        }
        if breakdown.subject_match >= 1.0 {
            reasons.push("same subject".to_string());
        }
        reasons
    }
}

/// Edit-distance ratio of normalized answers. Two empty answers are identical.
#[must_use]
pub fn answer_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_text(a), &normalize_text(b)).clamp(0.0, 1.0)
}

#[must_use]
pub fn difficulty_proximity(a: u8, b: u8) -> f64 {
    let gap = f64::from(a.abs_diff(b));
    (1.0 - gap / MAX_DIFFICULTY_GAP).clamp(0.0, 1.0)
}

fn subjects_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

const fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{QuestionRecord, QuestionType};
    use crate::search::embeddings::{HashVectorizer, Vectorizer};

    fn score_pair(a: &QuestionRecord, b: &QuestionRecord) -> SimilarityBreakdown {
        let vectorizer = HashVectorizer::default();
        let va = vectorizer.vectorize(&a.view());
        let vb = vectorizer.vectorize(&b.view());
        SimilarityScorer::default().score(
            Scored {
                question: a.view(),
                vector: &va,
            },
            Scored {
                question: b.view(),
                vector: &vb,
            },
        )
    }

    #[test]
    fn default_weights_are_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let weights = ScoringWeights {
            text: 0.5,
            ..ScoringWeights::default()
        };
        let err = SimilarityScorer::new(weights).unwrap_err();
        assert!(matches!(err, QsError::InvalidWeights(_)));
    }

    #[test]
    fn negative_weights_rejected() {
        let weights = ScoringWeights {
            text: 0.6,
            answer: -0.2,
            question_type: 0.3,
            difficulty: 0.2,
            subject: 0.1,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn identical_questions_score_one() {
        let q = QuestionRecord::new("Q1", "解方程：2x+3=7", "x=2", QuestionType::Calculation, 2, "math");
        let b = score_pair(&q, &q);
        assert_eq!(b.text_similarity, 1.0);
        assert_eq!(b.answer_similarity, 1.0);
        assert_eq!(b.composite, 1.0);
    }

    #[test]
    fn difficulty_proximity_scale() {
        assert_eq!(difficulty_proximity(2, 2), 1.0);
        assert_eq!(difficulty_proximity(1, 5), 0.0);
        assert!((difficulty_proximity(2, 3) - 0.75).abs() < 1e-12);
        assert_eq!(difficulty_proximity(0, 9), 0.0);
    }

    #[test]
    fn answer_similarity_uses_normalized_edit_ratio() {
        assert_eq!(answer_similarity("x = 2", "X=2"), 1.0);
        assert!((answer_similarity("x=2", "x=5") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(answer_similarity("", ""), 1.0);
        assert_eq!(answer_similarity("...", "x=2"), 0.0);
    }

    #[test]
    fn subject_match_is_case_insensitive() {
        let a = QuestionRecord::new("A", "x", "", QuestionType::Essay, 3, "Math");
        let b = QuestionRecord::new("B", "y", "", QuestionType::Analysis, 3, " math ");
        let breakdown = score_pair(&a, &b);
        assert_eq!(breakdown.subject_match, 1.0);
        assert_eq!(breakdown.type_match, 0.0);
    }

    #[test]
    fn components_stay_in_unit_interval() {
        let a = QuestionRecord::new("A", "分析古诗情感", "...", QuestionType::Analysis, 3, "chinese");
        let b = QuestionRecord::new("B", "求解方程：4x+1=9", "x=2", QuestionType::Calculation, 1, "math");
        let s = score_pair(&a, &b);
        for v in [
            s.text_similarity,
            s.answer_similarity,
            s.type_match,
            s.difficulty_proximity,
            s.subject_match,
            s.composite,
        ] {
            assert!((0.0..=1.0).contains(&v), "{v}");
        }
        assert!(s.composite < 0.2);
    }

    #[test]
    fn match_reasons_follow_thresholds() {
        let scorer = SimilarityScorer::default();
        let breakdown = SimilarityBreakdown {
            text_similarity: 0.9,
            answer_similarity: 0.5,
            type_match: 1.0,
            difficulty_proximity: 0.75,
            subject_match: 0.0,
            composite: 0.6,
        };
        let reasons = scorer.match_reasons(&breakdown);
        assert_eq!(reasons, vec!["content highly similar", "type matches exactly"]);
    }
}
