//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! including both low-level store errors and query-level errors.

use thiserror::Error;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait and `ProductSearchService`.
/// [`SearchIndexError::is_retriable`] tells the indexer whether an apply
/// failure is worth another attempt.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., version out of range, rejected document).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to write a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to create the search index or alias.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to run a search.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Search is temporarily unavailable.
    #[error("Search temporarily unavailable: {0}")]
    Unavailable(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Whether repeating the same operation may succeed.
    ///
    /// Validation and parse failures are deterministic for a given document
    /// and are never retried.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::ValidationError(_) | Self::ParseError(_))
    }
}
