//! Question bank loading.
//!
//! The import pipeline hands the engine a validated question collection as
//! either a JSON array or JSON Lines (one record per line). Record-level
//! validation happens later, at index build time; this module only
//! rejects text that is not a question list at all.

use std::path::Path;

use tracing::debug;

use crate::error::{QsError, Result};
use crate::question::QuestionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankFormat {
    JsonArray,
    JsonLines,
}

impl BankFormat {
    /// Pick a format from the file extension, falling back to the content.
    #[must_use]
    pub fn detect(path: Option<&Path>, raw: &str) -> Self {
        let by_extension = path
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match by_extension.as_deref() {
            Some("jsonl" | "ndjson") => Self::JsonLines,
            Some("json") => Self::JsonArray,
            _ => {
                if raw.trim_start().starts_with('[') {
                    Self::JsonArray
                } else {
                    Self::JsonLines
                }
            }
        }
    }
}

/// Read a question bank file.
pub fn load_questions(path: &Path) -> Result<Vec<QuestionRecord>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| QsError::Import(format!("read {}: {err}", path.display())))?;
    let format = BankFormat::detect(Some(path), &raw);
    let records = parse_questions(&raw, format)?;
    debug!(path = %path.display(), count = records.len(), ?format, "question bank loaded");
    Ok(records)
}

pub fn parse_questions(raw: &str, format: BankFormat) -> Result<Vec<QuestionRecord>> {
    match format {
        BankFormat::JsonArray => serde_json::from_str(raw)
            .map_err(|err| QsError::Import(format!("parse question array: {err}"))),
        BankFormat::JsonLines => raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|err| QsError::Import(format!("line {}: {err}", i + 1)))
            })
            .collect(),
    }
}
