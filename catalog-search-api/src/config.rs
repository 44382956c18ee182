//! API settings read from the environment.

use std::env;
use std::net::SocketAddr;

use catalog_search_repository::{ProductSearchServiceConfig, StoreSettings};
use catalog_search_shared::config::parsed_var;
use catalog_search_shared::ConfigError;

/// Default listen address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub bind_addr: SocketAddr,
    pub store: StoreSettings,
    pub search: ProductSearchServiceConfig,
}

impl ApiSettings {
    /// Read settings from the process environment.
    ///
    /// `API_BIND_ADDR` (default 0.0.0.0:8080), `SEARCH_MAX_RESULTS` (default 100)
    /// and the store variables read by [`StoreSettings`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_addr = DEFAULT_BIND_ADDR
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "API_BIND_ADDR".to_string(),
                value: DEFAULT_BIND_ADDR.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            bind_addr: parsed_var(&lookup, "API_BIND_ADDR", default_addr)?,
            store: StoreSettings::from_lookup(&lookup)?,
            search: ProductSearchServiceConfig::from_lookup(&lookup)?,
        })
    }
}
