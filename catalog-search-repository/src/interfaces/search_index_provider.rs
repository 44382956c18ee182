//! Search index provider trait definition.
//!
//! This module defines the abstract interface for product index operations,
//! allowing for different store implementations (OpenSearch, in-memory).

use async_trait::async_trait;
use catalog_search_shared::{IndexedProduct, ProductId};

use crate::errors::SearchIndexError;
use crate::types::{ApplyOutcome, DeleteProductRequest, SearchProductsRequest};

/// Abstracts the document store holding indexed products.
///
/// Implementations are injected into the indexer's projector and into
/// `ProductSearchService`, which keeps both testable with in-memory stores.
///
/// # Version guard
///
/// `upsert_product` and guarded `delete_product` calls must be a single atomic
/// conditional write: the change is applied only if the incoming version is
/// greater than or equal to the stored version. A rejected write is reported as
/// [`ApplyOutcome::Stale`], not as an error.
///
/// # Index Initialization
///
/// Implementations should call `ensure_index_exists` during application startup
/// so the index and its secondary indexes exist before any document operation.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the index, its mappings and alias exist, creating them if necessary.
    ///
    /// Must be idempotent: calling it against an initialized store succeeds
    /// without changing anything.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Check that the store answers requests.
    async fn ping(&self) -> Result<(), SearchIndexError>;

    /// Replace the document for `product.id` with `product`, creating it if absent.
    ///
    /// # Returns
    ///
    /// * `Ok(ApplyOutcome::Applied)` - The document now equals `product`
    /// * `Ok(ApplyOutcome::Stale)` - A newer version is stored; nothing changed
    /// * `Err(SearchIndexError)` - If the write fails
    async fn upsert_product(
        &self,
        product: &IndexedProduct,
    ) -> Result<ApplyOutcome, SearchIndexError>;

    /// Delete a product document.
    ///
    /// # Returns
    ///
    /// * `Ok(ApplyOutcome::Applied)` - The document was removed
    /// * `Ok(ApplyOutcome::Absent)` - There was no document to remove
    /// * `Ok(ApplyOutcome::Stale)` - A guarded delete lost to a newer document
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_product(
        &self,
        request: &DeleteProductRequest,
    ) -> Result<ApplyOutcome, SearchIndexError>;

    /// Fetch a single product document by id.
    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<IndexedProduct>, SearchIndexError>;

    /// Find products whose name or description contains the request text,
    /// ignoring case, ordered by id.
    async fn search_products(
        &self,
        request: &SearchProductsRequest,
    ) -> Result<Vec<IndexedProduct>, SearchIndexError>;
}
