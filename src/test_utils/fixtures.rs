//! Question bank fixtures.

use crate::question::{QuestionQuery, QuestionRecord, QuestionType};

/// Two linear-equation questions and one poetry analysis question.
#[must_use]
pub fn scenario_bank() -> Vec<QuestionRecord> {
    vec![
        QuestionRecord::new("Q1", "解方程：2x+3=7", "x=2", QuestionType::Calculation, 2, "math"),
        QuestionRecord::new("Q2", "解方程：3x-5=10", "x=5", QuestionType::Calculation, 2, "math"),
        QuestionRecord::new("Q3", "分析古诗情感", "...", QuestionType::Analysis, 3, "chinese"),
    ]
}

/// Query that should rank Q1 above Q2 and exclude Q3.
#[must_use]
pub fn scenario_query() -> QuestionQuery {
    QuestionQuery::new("求解方程：4x+1=9", "x=2", QuestionType::Calculation, 2, "math")
}

const SUBJECTS: [&str; 4] = ["math", "physics", "chinese", "history"];

/// A deterministic bank of `count` varied records, ids `B0000`..
#[must_use]
pub fn synthetic_bank(count: usize) -> Vec<QuestionRecord> {
    (0..count)
        .map(|i| {
            let ty = QuestionType::ALL[i % QuestionType::ALL.len()];
            let subject = SUBJECTS[i % SUBJECTS.len()];
            #[allow(clippy::cast_possible_truncation)]
            let difficulty = (i % 5) as u8 + 1;
            QuestionRecord::new(
                format!("B{i:04}"),
                format!("{subject} question {i}: compute {a}x + {b} = {c}", a = i % 7 + 1, b = i % 11, c = i % 13),
                format!("x={}", i % 9),
                ty,
                difficulty,
                subject,
            )
        })
        .collect()
}

/// Serialize records as JSON Lines.
#[must_use]
pub fn to_jsonl(records: &[QuestionRecord]) -> String {
    records
        .iter()
        .filter_map(|r| serde_json::to_string(r).ok())
        .collect::<Vec<_>>()
        .join("\n")
}
