//! Question records as supplied by the import pipeline and the grading layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QsError, Result};

/// Lowest difficulty level on the 1-5 scale
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest difficulty level on the 1-5 scale
pub const MAX_DIFFICULTY: u8 = 5;

/// Question type
///
/// Serializes as snake_case; deserializes through [`FromStr`], so the wire
/// format accepts the same spellings and aliases as the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum QuestionType {
    Calculation,
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
    Essay,
    Analysis,
    Synthesis,
}

impl QuestionType {
    pub const ALL: [Self; 9] = [
        Self::Calculation,
        Self::SingleChoice,
        Self::MultipleChoice,
        Self::TrueFalse,
        Self::FillBlank,
        Self::ShortAnswer,
        Self::Essay,
        Self::Analysis,
        Self::Synthesis,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calculation => "calculation",
            Self::SingleChoice => "single_choice",
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::FillBlank => "fill_blank",
            Self::ShortAnswer => "short_answer",
            Self::Essay => "essay",
            Self::Analysis => "analysis",
            Self::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = QsError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "calculation" | "computation" => Ok(Self::Calculation),
            "single_choice" | "choice" => Ok(Self::SingleChoice),
            "multiple_choice" => Ok(Self::MultipleChoice),
            "true_false" | "true_or_false" | "judge" => Ok(Self::TrueFalse),
            "fill_blank" | "blank" => Ok(Self::FillBlank),
            "short_answer" => Ok(Self::ShortAnswer),
            "essay" => Ok(Self::Essay),
            "analysis" => Ok(Self::Analysis),
            "synthesis" => Ok(Self::Synthesis),
            _ => Err(QsError::InvalidArgument(format!(
                "unknown question type '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for QuestionType {
    type Error = QsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// A question held in the bank. Immutable once indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub stem: String,
    #[serde(default, alias = "answer")]
    pub correct_answer: String,
    #[serde(alias = "type")]
    pub question_type: QuestionType,
    #[serde(alias = "difficulty")]
    pub difficulty_level: u8,
    pub subject: String,
}

impl QuestionRecord {
    pub fn new(
        id: impl Into<String>,
        stem: impl Into<String>,
        correct_answer: impl Into<String>,
        question_type: QuestionType,
        difficulty_level: u8,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            stem: stem.into(),
            correct_answer: correct_answer.into(),
            question_type,
            difficulty_level,
            subject: subject.into(),
        }
    }

    /// Check the structural constraints a record must satisfy before indexing.
    ///
    /// An empty stem is allowed; it vectorizes to the zero vector.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(QsError::InvalidArgument(
                "question id must not be empty".to_string(),
            ));
        }
        validate_facets(self.difficulty_level, &self.subject)
    }

    #[must_use]
    pub fn view(&self) -> QuestionView<'_> {
        QuestionView {
            stem: &self.stem,
            answer: &self.correct_answer,
            question_type: self.question_type,
            difficulty: self.difficulty_level,
            subject: &self.subject,
        }
    }

    /// The query form of this record, carrying its id for self-exclusion.
    #[must_use]
    pub fn to_query(&self) -> QuestionQuery {
        QuestionQuery {
            id: Some(self.id.clone()),
            stem: self.stem.clone(),
            correct_answer: self.correct_answer.clone(),
            question_type: self.question_type,
            difficulty_level: self.difficulty_level,
            subject: self.subject.clone(),
        }
    }
}

/// A question to search for. Same shape as a record, but the id is optional.
///
/// When an id is present, the indexed entry with that id is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub stem: String,
    #[serde(default, alias = "answer")]
    pub correct_answer: String,
    #[serde(alias = "type")]
    pub question_type: QuestionType,
    #[serde(alias = "difficulty")]
    pub difficulty_level: u8,
    pub subject: String,
}

impl QuestionQuery {
    pub fn new(
        stem: impl Into<String>,
        correct_answer: impl Into<String>,
        question_type: QuestionType,
        difficulty_level: u8,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            stem: stem.into(),
            correct_answer: correct_answer.into(),
            question_type,
            difficulty_level,
            subject: subject.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_facets(self.difficulty_level, &self.subject)
    }

    #[must_use]
    pub fn view(&self) -> QuestionView<'_> {
        QuestionView {
            stem: &self.stem,
            answer: &self.correct_answer,
            question_type: self.question_type,
            difficulty: self.difficulty_level,
            subject: &self.subject,
        }
    }
}

/// Borrowed view over the fields that feed vectorization and scoring.
#[derive(Debug, Clone, Copy)]
pub struct QuestionView<'a> {
    pub stem: &'a str,
    pub answer: &'a str,
    pub question_type: QuestionType,
    pub difficulty: u8,
    pub subject: &'a str,
}

fn validate_facets(difficulty: u8, subject: &str) -> Result<()> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        return Err(QsError::InvalidArgument(format!(
            "difficulty {difficulty} out of range {MIN_DIFFICULTY}-{MAX_DIFFICULTY}"
        )));
    }
    if subject.trim().is_empty() {
        return Err(QsError::InvalidArgument(
            "subject must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_round_trips_through_str() {
        for ty in QuestionType::ALL {
            assert_eq!(ty.as_str().parse::<QuestionType>().unwrap(), ty);
        }
    }

    #[test]
    fn question_type_accepts_aliases() {
        assert_eq!("Judge".parse::<QuestionType>().unwrap(), QuestionType::TrueFalse);
        assert_eq!("fill-blank".parse::<QuestionType>().unwrap(), QuestionType::FillBlank);
        assert_eq!(" choice ".parse::<QuestionType>().unwrap(), QuestionType::SingleChoice);
        assert!("poetry".parse::<QuestionType>().is_err());
    }

    #[test]
    fn record_deserializes_with_aliases() {
        let json = r#"{"id":"Q1","stem":"2+2","answer":"4","type":"calculation","difficulty":1,"subject":"math"}"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.correct_answer, "4");
        assert_eq!(record.question_type, QuestionType::Calculation);
        assert_eq!(record.difficulty_level, 1);
    }

    #[test]
    fn wire_type_accepts_cli_spellings() {
        for (raw, expected) in [
            ("\"Calculation\"", QuestionType::Calculation),
            ("\"fill-blank\"", QuestionType::FillBlank),
            ("\" choice \"", QuestionType::SingleChoice),
            ("\"true_or_false\"", QuestionType::TrueFalse),
        ] {
            assert_eq!(serde_json::from_str::<QuestionType>(raw).unwrap(), expected);
        }
        let err = serde_json::from_str::<QuestionType>("\"poetry\"").unwrap_err();
        assert!(err.to_string().contains("unknown question type"));
        assert_eq!(
            serde_json::to_string(&QuestionType::FillBlank).unwrap(),
            "\"fill_blank\""
        );
    }

    #[test]
    fn validate_rejects_bad_difficulty_and_blank_id() {
        let mut record = QuestionRecord::new("Q1", "stem", "a", QuestionType::Essay, 3, "chinese");
        assert!(record.validate().is_ok());

        record.difficulty_level = 0;
        assert!(record.validate().is_err());
        record.difficulty_level = 6;
        assert!(record.validate().is_err());

        record.difficulty_level = 5;
        record.id = "  ".to_string();
        assert!(record.validate().is_err());
    }

    #[test]
    fn empty_stem_is_valid() {
        let record = QuestionRecord::new("Q1", "", "", QuestionType::Essay, 3, "chinese");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn query_from_record_keeps_id() {
        let record = QuestionRecord::new("Q7", "stem", "a", QuestionType::Analysis, 2, "history");
        let query = record.to_query();
        assert_eq!(query.id.as_deref(), Some("Q7"));
        assert!(query.validate().is_ok());
    }
}
