//! Request and response types for search index operations.

use catalog_search_shared::ProductId;

/// Result of applying one event to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The document was written or removed.
    Applied,
    /// The stored document has a newer version; nothing was changed.
    Stale,
    /// Delete of a document that does not exist; nothing was changed.
    Absent,
}

impl ApplyOutcome {
    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Stale => "stale",
            Self::Absent => "absent",
        }
    }
}

/// Request to delete a product document.
///
/// A `version` of `0` removes the document unconditionally. A non-zero version
/// removes it only if the stored document is not newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteProductRequest {
    /// The product's identifier.
    pub product_id: ProductId,
    /// Catalog version of the delete.
    pub version: u64,
}

impl DeleteProductRequest {
    /// Whether the delete is subject to the version guard.
    pub fn is_guarded(&self) -> bool {
        self.version > 0
    }
}

/// Request to find products whose name or description contains `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProductsRequest {
    /// Non-empty, trimmed text matched case-insensitively.
    pub text: String,
    /// Maximum number of documents to return.
    pub limit: usize,
}
