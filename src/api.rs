//! Wire types for the `find_similar` endpoint.
//!
//! The HTTP layer that hosts these lives outside this crate; it parses the
//! request body into [`FindSimilarRequest`], calls [`handle_find_similar`]
//! and serializes the [`FindSimilarResponse`] it gets back. The handler
//! never fails: errors are reported in the envelope with `success = false`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SearchConfig;
use crate::error::{QsError, Result};
use crate::question::QuestionQuery;
use crate::search::{IndexStatistics, SearchEngine, SimilarQuestion, StatsSnapshot};

/// Body of `POST /find_similar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindSimilarRequest {
    pub query_question: QuestionQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
}

impl FindSimilarRequest {
    /// Parse a JSON request body.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| QsError::InvalidArgument(format!("malformed request: {err}")))
    }

    /// `(top_k, threshold)` with absent values taken from `defaults`.
    #[must_use]
    pub fn resolve(&self, defaults: &SearchConfig) -> (usize, f64) {
        (
            self.top_k.unwrap_or(defaults.default_top_k),
            self.similarity_threshold
                .unwrap_or(defaults.default_threshold),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindSimilarData {
    pub similar_questions: Vec<SimilarQuestion>,
    pub total_found: usize,
    pub search_statistics: StatsSnapshot,
    pub index_statistics: IndexStatistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl From<&QsError> for ApiError {
    fn from(err: &QsError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindSimilarResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FindSimilarData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl FindSimilarResponse {
    /// Wrap results together with the engine's current statistics.
    #[must_use]
    pub fn success(engine: &SearchEngine, similar_questions: Vec<SimilarQuestion>) -> Self {
        Self {
            success: true,
            data: Some(FindSimilarData {
                total_found: similar_questions.len(),
                similar_questions,
                search_statistics: engine.get_statistics(),
                index_statistics: engine.index_statistics(),
            }),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(err: &QsError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError::from(err)),
        }
    }
}

/// Run a request against `engine`, filling absent parameters from `defaults`.
#[must_use]
pub fn handle_find_similar(
    engine: &SearchEngine,
    request: &FindSimilarRequest,
    defaults: &SearchConfig,
) -> FindSimilarResponse {
    let (top_k, threshold) = request.resolve(defaults);

    match engine.find_similar(&request.query_question, top_k, threshold) {
        Ok(similar_questions) => FindSimilarResponse::success(engine, similar_questions),
        Err(err) => {
            warn!(code = err.code(), error = %err, "find_similar rejected");
            FindSimilarResponse::failure(&err)
        }
    }
}

/// Parse a raw JSON body and run it; malformed bodies become failure envelopes.
#[must_use]
pub fn handle_find_similar_json(
    engine: &SearchEngine,
    raw: &str,
    defaults: &SearchConfig,
) -> FindSimilarResponse {
    match FindSimilarRequest::from_json(raw) {
        Ok(request) => handle_find_similar(engine, &request, defaults),
        Err(err) => FindSimilarResponse::failure(&err),
    }
}
