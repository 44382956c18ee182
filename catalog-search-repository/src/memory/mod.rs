//! In-memory search index provider.
//!
//! `InMemoryProvider` keeps documents in a process-local ordered map. It
//! implements the same version guard as the OpenSearch provider and is used by
//! tests and by local runs with `SEARCH_STORE=memory`.
//!
//! # Example
//!
//! ```
//! use catalog_search_repository::{InMemoryProvider, SearchIndexProvider};
//! use catalog_search_shared::IndexedProduct;
//!
//! # tokio_test_block_on(async {
//! let store = InMemoryProvider::new();
//! let doc = IndexedProduct {
//!     id: 1,
//!     name: "Kettle".to_string(),
//!     price: 19.5,
//!     description: None,
//!     category_name: None,
//!     version: 1,
//! };
//! store.upsert_product(&doc).await.unwrap();
//! assert_eq!(store.len(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use catalog_search_shared::{IndexedProduct, ProductId};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{ApplyOutcome, DeleteProductRequest, SearchProductsRequest};
use crate::utils;

type Documents = BTreeMap<ProductId, IndexedProduct>;

/// Process-local document store keyed by product id.
#[derive(Default)]
pub struct InMemoryProvider {
    documents: RwLock<Documents>,
    unavailable: AtomicBool,
    failing_writes: AtomicUsize,
}

impl InMemoryProvider {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `products`.
    pub fn with_products(products: impl IntoIterator<Item = IndexedProduct>) -> Self {
        let documents = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            documents: RwLock::new(documents),
            ..Self::default()
        }
    }

    /// Make every operation fail with a connection error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `count` writes fail with a retriable error.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored documents, ordered by id.
    pub fn documents(&self) -> Vec<IndexedProduct> {
        self.documents
            .read()
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), SearchIndexError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SearchIndexError::connection("In-memory store is unavailable"))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<(), SearchIndexError> {
        self.check_available()?;
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            Err(SearchIndexError::index("Injected write failure"))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Documents>, SearchIndexError> {
        self.documents
            .read()
            .map_err(|_| SearchIndexError::unknown("In-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Documents>, SearchIndexError> {
        self.documents
            .write()
            .map_err(|_| SearchIndexError::unknown("In-memory store lock poisoned"))
    }
}

#[async_trait]
impl SearchIndexProvider for InMemoryProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        self.check_available()
    }

    async fn ping(&self) -> Result<(), SearchIndexError> {
        self.check_available()
    }

    async fn upsert_product(
        &self,
        product: &IndexedProduct,
    ) -> Result<ApplyOutcome, SearchIndexError> {
        self.check_write()?;
        let mut docs = self.write()?;
        if let Some(stored) = docs.get(&product.id) {
            if stored.version > product.version {
                return Ok(ApplyOutcome::Stale);
            }
        }
        docs.insert(product.id, product.clone());
        Ok(ApplyOutcome::Applied)
    }

    async fn delete_product(
        &self,
        request: &DeleteProductRequest,
    ) -> Result<ApplyOutcome, SearchIndexError> {
        self.check_write()?;
        let mut docs = self.write()?;
        match docs.get(&request.product_id) {
            None => Ok(ApplyOutcome::Absent),
            Some(stored) if request.is_guarded() && stored.version > request.version => {
                Ok(ApplyOutcome::Stale)
            }
            Some(_) => {
                docs.remove(&request.product_id);
                Ok(ApplyOutcome::Applied)
            }
        }
    }

    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<IndexedProduct>, SearchIndexError> {
        self.check_available()?;
        Ok(self.read()?.get(&product_id).cloned())
    }

    async fn search_products(
        &self,
        request: &SearchProductsRequest,
    ) -> Result<Vec<IndexedProduct>, SearchIndexError> {
        self.check_available()?;
        let needle = request.text.to_lowercase();
        let docs = self.read()?;
        Ok(docs
            .values()
            .filter(|doc| {
                utils::contains_ignore_case(&doc.name, &needle)
                    || doc
                        .description
                        .as_deref()
                        .is_some_and(|d| utils::contains_ignore_case(d, &needle))
            })
            .take(request.limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(
        id: ProductId,
        name: &str,
        description: Option<&str>,
        version: u64,
    ) -> IndexedProduct {
        IndexedProduct {
            id,
            name: name.to_string(),
            price: 10.0,
            description: description.map(str::to_string),
            category_name: None,
            version,
        }
    }

    fn search(text: &str) -> SearchProductsRequest {
        SearchProductsRequest {
            text: text.to_string(),
            limit: 100,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let store = InMemoryProvider::new();
        let doc = product(1, "Kettle", Some("Steel"), 1);

        assert_eq!(store.upsert_product(&doc).await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(store.get_product(1).await.unwrap(), Some(doc));
        assert_eq!(store.get_product(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reapplying_same_event_is_idempotent() {
        let store = InMemoryProvider::new();
        let doc = product(1, "Kettle", None, 3);

        store.upsert_product(&doc).await.unwrap();
        let first = store.documents();
        assert_eq!(store.upsert_product(&doc).await.unwrap(), ApplyOutcome::Applied);
        assert_eq!(store.documents(), first);
    }

    #[tokio::test]
    async fn test_older_version_is_stale() {
        let store = InMemoryProvider::new();
        store.upsert_product(&product(1, "New name", None, 5)).await.unwrap();

        let outcome = store.upsert_product(&product(1, "Old name", None, 4)).await.unwrap();

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(store.get_product(1).await.unwrap().unwrap().name, "New name");
    }

    #[tokio::test]
    async fn test_delete_absent_document() {
        let store = InMemoryProvider::new();
        let outcome = store
            .delete_product(&DeleteProductRequest { product_id: 9, version: 0 })
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Absent);
    }

    #[tokio::test]
    async fn test_guarded_delete_loses_to_newer_document() {
        let store = InMemoryProvider::with_products([product(1, "Kettle", None, 7)]);

        let stale = store
            .delete_product(&DeleteProductRequest { product_id: 1, version: 6 })
            .await
            .unwrap();
        assert_eq!(stale, ApplyOutcome::Stale);
        assert_eq!(store.len(), 1);

        let applied = store
            .delete_product(&DeleteProductRequest { product_id: 1, version: 7 })
            .await
            .unwrap();
        assert_eq!(applied, ApplyOutcome::Applied);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unversioned_delete_is_unconditional() {
        let store = InMemoryProvider::with_products([product(1, "Kettle", None, 7)]);
        let outcome = store
            .delete_product(&DeleteProductRequest { product_id: 1, version: 0 })
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_name_or_description_ignoring_case() {
        let store = InMemoryProvider::with_products([
            product(1, "Wireless Headphones", Some("Noise cancelling"), 1),
            product(2, "USB-C Cable", Some("60W charge, braided, on sale."), 1),
            product(3, "Kettle", None, 1),
            product(4, "SALE bundle", None, 1),
        ]);

        let ids: Vec<_> = store
            .search_products(&search("SALE"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let store =
            InMemoryProvider::with_products((1..=5).map(|id| product(id, "Cable", None, 1)));
        let results = store
            .search_products(&SearchProductsRequest {
                text: "cable".to_string(),
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(results.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = InMemoryProvider::new();
        store.set_unavailable(true);

        assert!(store.ping().await.is_err());
        assert!(store.search_products(&search("x")).await.is_err());
        assert!(store.upsert_product(&product(1, "Kettle", None, 1)).await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_write_failures_are_retriable() {
        let store = InMemoryProvider::new();
        store.fail_next_writes(1);

        let err = store.upsert_product(&product(1, "Kettle", None, 1)).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(
            store.upsert_product(&product(1, "Kettle", None, 1)).await.unwrap(),
            ApplyOutcome::Applied
        );
    }
}
