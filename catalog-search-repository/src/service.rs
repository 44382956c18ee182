//! Product search service.
//!
//! This module provides the read side of the search index. It is shared by the
//! HTTP API and by library callers, and never writes to the store.

use std::sync::Arc;

use catalog_search_shared::{ProductSearchQuery, SearchProductRecord};
use tracing::{debug, warn};

use crate::config::ProductSearchServiceConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::SearchProductsRequest;

/// Answers text searches from the product index.
///
/// The query text is trimmed and matched case-insensitively as a literal
/// substring of the product name or description. Results are ordered by id and
/// capped at `max_results`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use catalog_search_repository::{InMemoryProvider, ProductSearchService};
/// use catalog_search_shared::ProductSearchQuery;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = ProductSearchService::new(Arc::new(InMemoryProvider::new()));
/// let records = service.search(&ProductSearchQuery::text("headphones")).await?;
/// # Ok(())
/// # }
/// ```
pub struct ProductSearchService {
    provider: Arc<dyn SearchIndexProvider>,
    config: ProductSearchServiceConfig,
}

impl ProductSearchService {
    /// Create a service with the default result cap.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, ProductSearchServiceConfig::default())
    }

    /// Create a service with a custom configuration.
    pub fn with_config(
        provider: Arc<dyn SearchIndexProvider>,
        config: ProductSearchServiceConfig,
    ) -> Self {
        Self { provider, config }
    }

    /// Search products by name or description.
    ///
    /// # Returns
    ///
    /// * `Ok(vec![])` - If the query is absent or blank; the store is not contacted
    /// * `Ok(records)` - Matching products ordered by id
    /// * `Err(SearchIndexError::Unavailable)` - If the store cannot answer
    pub async fn search(
        &self,
        query: &ProductSearchQuery,
    ) -> Result<Vec<SearchProductRecord>, SearchIndexError> {
        let Some(text) = query.normalized_text() else {
            debug!("Blank search query, returning no results");
            return Ok(Vec::new());
        };

        let request = SearchProductsRequest {
            text: text.to_string(),
            limit: query.limit.clamp(1, self.config.max_results),
        };

        match self.provider.search_products(&request).await {
            Ok(products) => Ok(products.into_iter().map(SearchProductRecord::from).collect()),
            Err(e @ SearchIndexError::ValidationError(_)) => Err(e),
            Err(e) => {
                warn!(error = %e, text = %request.text, "Search store unavailable");
                Err(SearchIndexError::unavailable(e.to_string()))
            }
        }
    }

    /// Check that the underlying store answers.
    pub async fn health(&self) -> Result<(), SearchIndexError> {
        self.provider
            .ping()
            .await
            .map_err(|e| SearchIndexError::unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProvider;
    use catalog_search_shared::IndexedProduct;

    fn product(id: i64, name: &str, description: Option<&str>) -> IndexedProduct {
        IndexedProduct {
            id,
            name: name.to_string(),
            price: 129.99,
            description: description.map(str::to_string),
            category_name: Some("Electronics".to_string()),
            version: 1,
        }
    }

    fn service_with(
        products: Vec<IndexedProduct>,
    ) -> (Arc<InMemoryProvider>, ProductSearchService) {
        let store = Arc::new(InMemoryProvider::with_products(products));
        let service = ProductSearchService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty_without_store() {
        let (store, service) = service_with(vec![product(1, "Wireless Headphones", None)]);
        store.set_unavailable(true);

        for query in [ProductSearchQuery::default(), ProductSearchQuery::text("   ")] {
            assert!(service.search(&query).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_query_is_trimmed() {
        let (_, service) = service_with(vec![product(1, "Wireless Headphones", None)]);

        let records = service
            .search(&ProductSearchQuery::text("  headphones \n"))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].price, 129.99);
        assert_eq!(records[0].category_name.as_deref(), Some("Electronics"));
    }

    #[tokio::test]
    async fn test_results_capped_by_config() {
        let store = Arc::new(InMemoryProvider::with_products(
            (1..=10).map(|id| product(id, "Cable", None)),
        ));
        let service = ProductSearchService::with_config(
            store,
            ProductSearchServiceConfig { max_results: 3 },
        );

        let records = service
            .search(&ProductSearchQuery::text("cable"))
            .await
            .unwrap();

        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_unavailable() {
        let (store, service) = service_with(vec![product(1, "Kettle", None)]);
        store.set_unavailable(true);

        let result = service.search(&ProductSearchQuery::text("kettle")).await;

        assert!(matches!(result, Err(SearchIndexError::Unavailable(_))));
        assert!(matches!(service.health().await, Err(SearchIndexError::Unavailable(_))));
    }
}
