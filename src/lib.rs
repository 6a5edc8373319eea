//! qsim - question similarity search
//!
//! Finds the questions in a growing question bank that are most similar to
//! a newly submitted or generated one, using a weighted multi-factor score
//! over hashed text features and categorical facets.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod question;
pub mod search;
pub mod test_utils;

pub use error::{QsError, Result};
pub use question::{QuestionQuery, QuestionRecord, QuestionType};
pub use search::{SearchEngine, SimilarQuestion};
