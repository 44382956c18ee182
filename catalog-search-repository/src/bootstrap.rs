//! Store bootstrap.
//!
//! Opens the configured document store and makes sure its index exists before
//! the indexer or the API touches any document.

use std::sync::Arc;

use tracing::info;

use crate::config::{StoreKind, StoreSettings};
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::memory::InMemoryProvider;
use crate::opensearch::{connect_with_retry, IndexConfig};

/// Connect to the store described by `settings` and initialize its index.
///
/// In retry mode this waits until OpenSearch is reachable. Index creation is
/// idempotent, so every process may call this on startup.
pub async fn open_store(
    settings: &StoreSettings,
) -> Result<Arc<dyn SearchIndexProvider>, SearchIndexError> {
    let provider: Arc<dyn SearchIndexProvider> = match settings.kind {
        StoreKind::OpenSearch => {
            let index_config = IndexConfig::new(&settings.index_alias, settings.index_version);
            let provider = connect_with_retry(
                &settings.url,
                index_config,
                settings.connection_mode,
                settings.retry_interval,
            )
            .await?;
            Arc::new(provider)
        }
        StoreKind::Memory => Arc::new(InMemoryProvider::new()),
    };

    provider.ensure_index_exists().await?;
    info!(
        store = ?settings.kind,
        alias = %settings.index_alias,
        "Search store ready"
    );
    Ok(provider)
}
