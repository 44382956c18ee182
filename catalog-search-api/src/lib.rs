//! # Catalog Search API
//!
//! HTTP front end of the product search index. Every request is answered from
//! the document store; the catalog database is never queried.
//!
//! ## Routes
//!
//! - `GET /api/products/search?q=<text>`: matching products, ordered by id
//! - `GET /health`: liveness, with the store's reachability in the body

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use config::ApiSettings;
pub use error::ApiError;
pub use state::AppState;

/// CORS for a public, read-only API.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Create the Axum application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/products/search", get(handlers::search_products))
        .route("/health", get(handlers::health_check))
        .layer(create_cors_layer())
        .with_state(state)
}

/// Run the server on `addr` until Ctrl-C or SIGTERM.
pub async fn run_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Server listening on {}", addr);
    info!("- Search endpoint: http://{}/api/products/search?q=", addr);
    info!("- Health endpoint: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutting down search API");
}
