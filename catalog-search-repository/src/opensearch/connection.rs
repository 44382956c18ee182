//! Connection handling for OpenSearch.

use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::{IndexConfig, OpenSearchProvider};

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection at a fixed interval until it succeeds.
    Retry,
}

impl FromStr for ConnectionMode {
    type Err = String;

    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            "retry" => Ok(Self::Retry),
            other => Err(format!(
                "unknown connection mode '{}', expected 'retry' or 'fail-fast'",
                other
            )),
        }
    }
}

/// Connect to OpenSearch, retrying according to `mode`.
///
/// A connection counts as established once the cluster answers a ping. Only
/// ping failures are retried; a URL the client cannot use fails in every mode.
pub async fn connect_with_retry(
    url: &str,
    index_config: IndexConfig,
    mode: ConnectionMode,
    retry_interval: Duration,
) -> Result<OpenSearchProvider, SearchIndexError> {
    let provider = OpenSearchProvider::new(url, index_config)?;

    loop {
        match provider.ping().await {
            Ok(()) => return Ok(provider),
            Err(e) => match mode {
                ConnectionMode::FailFast => {
                    return Err(SearchIndexError::connection(format!(
                        "Failed to connect to OpenSearch: {}",
                        e
                    )));
                }
                ConnectionMode::Retry => {
                    warn!(
                        opensearch_url = %url,
                        error = %e,
                        retry_interval_secs = retry_interval.as_secs(),
                        "Failed to connect to OpenSearch, retrying..."
                    );
                    sleep(retry_interval).await;
                }
            },
        }
    }
}
