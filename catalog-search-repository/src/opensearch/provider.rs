//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use catalog_search_shared::{IndexedProduct, ProductId};
use opensearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsAliasParts, IndicesPutAliasParts},
    params::VersionType,
    DeleteParts, GetParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{ApplyOutcome, DeleteProductRequest, SearchProductsRequest};
use crate::utils;

/// HTTP status OpenSearch returns when an external version check fails.
const VERSION_CONFLICT: u16 = 409;

/// HTTP status for a missing document.
const NOT_FOUND: u16 = 404;

/// OpenSearch provider implementation.
///
/// Documents are addressed through the index alias and keyed by product id.
/// The version guard is delegated to OpenSearch external versioning
/// (`version_type=external_gte`), so each conditional write is one atomic
/// request.
///
/// # Example
///
/// ```ignore
/// use catalog_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::new("products", 0))?;
/// provider.ensure_index_exists().await?;
/// provider.upsert_product(&doc).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider for the specified URL.
    ///
    /// No request is sent; use [`SearchIndexProvider::ping`] to check reachability.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias and version
    pub fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Point the alias at the versioned index. Adding an existing alias is a no-op.
    async fn put_alias(&self, index_name: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(
                &[index_name],
                &self.index_config.alias,
            ))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::index_creation(format!(
                "Put alias failed with status {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    /// Build the wildcard query body for a substring search.
    fn search_body(request: &SearchProductsRequest) -> Value {
        let pattern = format!("*{}*", utils::escape_wildcard(&request.text));
        json!({
            "size": request.limit,
            "query": {
                "bool": {
                    "should": [
                        { "wildcard": { "name.raw": { "value": pattern, "case_insensitive": true } } },
                        { "wildcard": { "description.raw": { "value": pattern, "case_insensitive": true } } }
                    ],
                    "minimum_should_match": 1
                }
            },
            "sort": [{ "id": "asc" }]
        })
    }

    /// Extract the `_source` documents from a search response body.
    fn parse_search_hits(body: &Value) -> Result<Vec<IndexedProduct>, SearchIndexError> {
        let hits = body["hits"]["hits"]
            .as_array()
            .ok_or_else(|| SearchIndexError::parse("Search response has no hits array"))?;

        hits.iter()
            .map(|hit| {
                serde_json::from_value::<IndexedProduct>(hit["_source"].clone())
                    .map_err(|e| {
                        SearchIndexError::parse(format!("Invalid product document: {}", e))
                    })
            })
            .collect()
    }

    /// Map an error response to a store error, preserving retriability.
    async fn error_from_response(
        response: Response,
        operation: &str,
        make: fn(String) -> SearchIndexError,
    ) -> SearchIndexError {
        let status = response.status_code();
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, operation = operation, "Request failed");
        let message = format!("{} failed with status {}: {}", operation, status, body);
        if status.as_u16() == 400 {
            SearchIndexError::validation(message)
        } else {
            make(message)
        }
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the versioned index with its mappings and alias if the alias is missing.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let alias = self.index_config.alias.as_str();
        let index_name = self.index_config.index_name();

        let exists = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            info!(alias = %alias, "Search index alias already exists");
            return Ok(());
        }

        let mut body = get_index_settings();
        body["aliases"] = json!({ alias: { "is_write_index": true } });

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index_name, alias = %alias, "Created search index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            // Index exists without the alias, or another instance created it first.
            info!(
                index = %index_name,
                alias = %alias,
                "Search index already exists, attaching alias"
            );
            return self.put_alias(&index_name).await;
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(SearchIndexError::index_creation(format!(
            "Create index failed with status {}: {}",
            status, error_body
        )))
    }

    async fn ping(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            Ok(())
        } else {
            Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                response.status_code()
            )))
        }
    }

    /// Index the full document with `version_type=external_gte`.
    ///
    /// OpenSearch rejects the write with 409 when the stored version is higher,
    /// which is reported as `Stale`.
    async fn upsert_product(
        &self,
        product: &IndexedProduct,
    ) -> Result<ApplyOutcome, SearchIndexError> {
        let doc_id = product.document_id();
        let version = utils::external_version(product.version)?;

        let response = self
            .client
            .index(IndexParts::IndexId(&self.index_config.alias, &doc_id))
            .version(version)
            .version_type(VersionType::ExternalGte)
            .body(product)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            debug!(doc_id = %doc_id, version = product.version, "Document indexed");
            return Ok(ApplyOutcome::Applied);
        }
        if status.as_u16() == VERSION_CONFLICT {
            debug!(
                doc_id = %doc_id,
                version = product.version,
                "Stored document is newer, skipping"
            );
            return Ok(ApplyOutcome::Stale);
        }

        Err(Self::error_from_response(response, "Index", SearchIndexError::IndexError).await)
    }

    /// Delete by id. Guarded deletes use `version_type=external_gte`.
    async fn delete_product(
        &self,
        request: &DeleteProductRequest,
    ) -> Result<ApplyOutcome, SearchIndexError> {
        let doc_id = request.product_id.to_string();

        let mut delete = self
            .client
            .delete(DeleteParts::IndexId(&self.index_config.alias, &doc_id));
        if request.is_guarded() {
            delete = delete
                .version(utils::external_version(request.version)?)
                .version_type(VersionType::ExternalGte);
        }

        let response = delete
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        match status.as_u16() {
            _ if status.is_success() => {
                debug!(doc_id = %doc_id, "Document deleted");
                Ok(ApplyOutcome::Applied)
            }
            NOT_FOUND => {
                debug!(doc_id = %doc_id, "Document already absent");
                Ok(ApplyOutcome::Absent)
            }
            VERSION_CONFLICT => {
                debug!(
                    doc_id = %doc_id,
                    version = request.version,
                    "Stored document is newer, keeping it"
                );
                Ok(ApplyOutcome::Stale)
            }
            _ => Err(
                Self::error_from_response(response, "Delete", SearchIndexError::DeleteError).await,
            ),
        }
    }

    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<IndexedProduct>, SearchIndexError> {
        let doc_id = product_id.to_string();

        let response = self
            .client
            .get(GetParts::IndexId(&self.index_config.alias, &doc_id))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let err =
                Self::error_from_response(response, "Get", SearchIndexError::QueryError).await;
            return Err(err);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        serde_json::from_value(body["_source"].clone())
            .map(Some)
            .map_err(|e| SearchIndexError::parse(format!("Invalid product document: {}", e)))
    }

    async fn search_products(
        &self,
        request: &SearchProductsRequest,
    ) -> Result<Vec<IndexedProduct>, SearchIndexError> {
        let alias = self.index_config.alias.as_str();

        let response = self
            .client
            .search(SearchParts::Index(&[alias]))
            .body(Self::search_body(request))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let err =
                Self::error_from_response(response, "Search", SearchIndexError::QueryError).await;
            return Err(err);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let products = Self::parse_search_hits(&body)?;
        debug!(text = %request.text, hits = products.len(), "Search completed");
        Ok(products)
    }
}
