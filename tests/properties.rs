use proptest::prelude::*;

use qsim::question::{QuestionQuery, QuestionType};
use qsim::search::scoring::Scored;
use qsim::search::{
    Fingerprint, HashVectorizer, SearchEngine, SimilarityScorer, Vectorizer, normalize_text,
};
use qsim::test_utils::fixtures::synthetic_bank;

fn question_type() -> impl Strategy<Value = QuestionType> {
    prop::sample::select(QuestionType::ALL.to_vec())
}

fn query() -> impl Strategy<Value = QuestionQuery> {
    (
        ".{0,40}",
        "[a-z0-9=+]{0,8}",
        question_type(),
        1u8..=5,
        prop::sample::select(vec!["math", "physics", "chinese", "history"]),
    )
        .prop_map(|(stem, answer, ty, difficulty, subject)| {
            QuestionQuery::new(stem, answer, ty, difficulty, subject)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_hash_vector_deterministic(text in ".*") {
        let vectorizer = HashVectorizer::new(64);
        prop_assert_eq!(vectorizer.embed(&text), vectorizer.embed(&text));
    }

    #[test]
    fn test_hash_vector_length_and_norm(text in ".*", dim in 1usize..256usize) {
        let vector = HashVectorizer::new(dim).embed(&text);
        prop_assert_eq!(vector.len(), dim);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_is_idempotent(text in "[a-zA-Z0-9 ,.!?+=：２\u{4e00}-\u{4e2f}]{0,40}") {
        let once = normalize_text(&text);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn test_results_respect_bounds(q in query(), top_k in 1usize..15, threshold in 0.0f64..=1.0) {
        let engine = SearchEngine::default();
        engine.build_index(&synthetic_bank(40));

        let results = engine.find_similar(&q, top_k, threshold).unwrap();
        prop_assert!(results.len() <= top_k);
        for (i, item) in results.iter().enumerate() {
            prop_assert_eq!(item.rank, i + 1);
            prop_assert!(item.similarity_score >= threshold);
            prop_assert!((0.0..=1.0).contains(&item.similarity_score));
        }
        for pair in results.windows(2) {
            prop_assert!(
                pair[0].similarity_score > pair[1].similarity_score
                    || (pair[0].similarity_score == pair[1].similarity_score
                        && pair[0].question.id < pair[1].question.id)
            );
        }
    }

    #[test]
    fn test_search_deterministic_across_engines(q in query(), top_k in 1usize..10) {
        let bank = synthetic_bank(30);
        let first = SearchEngine::default();
        first.build_index(&bank);
        let second = SearchEngine::default();
        second.build_index(&bank);

        let a = first.find_similar(&q, top_k, 0.0).unwrap();
        let b = second.find_similar(&q, top_k, 0.0).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_score_symmetric_in_bounds(a in query(), b in query()) {
        let vectorizer = HashVectorizer::default();
        let scorer = SimilarityScorer::default();
        let va = vectorizer.vectorize(&a.view());
        let vb = vectorizer.vectorize(&b.view());
        let sa = Scored { question: a.view(), vector: &va };
        let sb = Scored { question: b.view(), vector: &vb };

        let ab = scorer.score(sa, sb);
        let ba = scorer.score(sb, sa);
        prop_assert!((0.0..=1.0).contains(&ab.composite));
        prop_assert!((ab.composite - ba.composite).abs() < 1e-9);
    }

    #[test]
    fn test_fingerprint_stable(q in query(), top_k in 1usize..50) {
        prop_assert_eq!(
            Fingerprint::compute(&q, top_k, 0.3),
            Fingerprint::compute(&q.clone(), top_k, 0.3)
        );
    }
}
