//! Catalog Search API entry point.

use anyhow::Context;
use catalog_search_api::{create_app, run_server, ApiSettings, AppState};
use catalog_search_repository::{open_store, ProductSearchService};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("catalog_search_api=info,catalog_search_repository=info,tower_http=info")
    });

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"))
        || env::var("AXIOM_TOKEN").is_ok();

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    info!("Starting catalog search API...");

    let settings = ApiSettings::from_env().context("invalid configuration")?;

    let store = open_store(&settings.store).await.map_err(|e| {
        error!(error = %e, "Failed to open search store");
        e
    })?;

    let service = ProductSearchService::with_config(store, settings.search.clone());
    let app = create_app(AppState::new(service));

    run_server(app, settings.bind_addr).await
}
