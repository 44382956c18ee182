//! Mapping of search errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_search_repository::SearchIndexError;
use serde_json::json;
use thiserror::Error;

/// Body message for 503 responses.
pub const UNAVAILABLE_MESSAGE: &str = "search temporarily unavailable";

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The store cannot answer right now.
    #[error("{UNAVAILABLE_MESSAGE}")]
    Unavailable,

    /// The request was rejected by the store.
    #[error("{0}")]
    BadRequest(String),
}

impl From<SearchIndexError> for ApiError {
    fn from(err: SearchIndexError) -> Self {
        match err {
            SearchIndexError::ValidationError(msg) => Self::BadRequest(msg),
            _ => Self::Unavailable,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
