//! HTTP request handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_search_shared::{ProductSearchQuery, SearchProductRecord};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Health check endpoint. Always 200 while the process serves requests.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.search.health().await {
        Ok(()) => "up",
        Err(e) => {
            warn!(error = %e, "Search store unreachable");
            "down"
        }
    };
    (StatusCode::OK, Json(json!({ "status": "ok", "store": store })))
}

/// `GET /api/products/search?q=<text>`
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<ProductSearchQuery>,
) -> Result<Json<Vec<SearchProductRecord>>, ApiError> {
    let records = state.search.search(&query).await?;
    debug!(query = ?query.query, hits = records.len(), "Search answered");
    Ok(Json(records))
}
