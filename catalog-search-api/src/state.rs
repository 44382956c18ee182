//! Shared state for request handlers.

use std::sync::Arc;

use catalog_search_repository::ProductSearchService;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<ProductSearchService>,
}

impl AppState {
    pub fn new(search: ProductSearchService) -> Self {
        Self {
            search: Arc::new(search),
        }
    }
}
