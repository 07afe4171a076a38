//! Wiring of the store, both API engines and the async count source.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiDefinition, ApiEngine, CacheOptions};
use crate::config::Config;
use crate::counter::{CountSource, SimulatedCount};
use crate::endpoints::{counter, quotes};
use crate::error::AppError;
use crate::store::{AppState, Store};

/// Store with the three slices, optionally seeded from `preloaded`.
pub fn make_store(preloaded: Option<AppState>) -> Store {
    Store::new(preloaded.unwrap_or_default())
}

/// Everything a front end needs to drive the application.
pub struct AppContext {
    pub config: Config,
    pub store: Store,
    pub quotes: ApiEngine,
    pub counter_api: ApiEngine,
    pub count_source: Arc<dyn CountSource>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Self::with_store(config, make_store(None))
    }

    /// Build the engines on top of an existing store.
    pub fn with_store(config: &Config, store: Store) -> Result<Self, AppError> {
        let options = CacheOptions::from(&config.cache);

        let quotes = ApiEngine::new(
            &store,
            ApiDefinition {
                reducer_path: quotes::REDUCER_PATH,
                base_url: config.quotes_api.base_url.clone(),
                timeout: Duration::from_secs(config.quotes_api.timeout_seconds),
            },
            options.clone(),
        )?;
        let counter_api = ApiEngine::new(
            &store,
            ApiDefinition {
                reducer_path: counter::REDUCER_PATH,
                base_url: config.counter_api.base_url.clone(),
                timeout: Duration::from_secs(config.counter_api.timeout_seconds),
            },
            options,
        )?;
        let count_source: Arc<dyn CountSource> =
            Arc::new(SimulatedCount::new(config.counter.async_delay()));

        tracing::debug!(
            quotes = %quotes.base_url(),
            counter = %counter_api.base_url(),
            "App context ready"
        );

        Ok(Self {
            config: config.clone(),
            store,
            quotes,
            counter_api,
            count_source,
        })
    }
}
