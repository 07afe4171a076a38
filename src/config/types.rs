use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::CacheOptions;
use crate::endpoints::{counter, quotes};

/// Root configuration container.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub quotes_api: QuotesApiConfig,
    #[serde(default)]
    pub counter_api: CounterApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Local counter slice settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Delay of the simulated async increment in milliseconds (default: 500).
    #[serde(default = "default_async_delay_ms")]
    pub async_delay_ms: u64,
}

/// Quotes endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotesApiConfig {
    #[serde(default = "default_quotes_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Number of quotes fetched per request (default: 10).
    #[serde(default = "default_quotes_limit")]
    pub limit: u32,
}

/// Counter-service endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterApiConfig {
    #[serde(default = "default_counter_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Cache lifecycle shared by both APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Retention of unsubscribed entries in seconds (default: 60).
    #[serde(default = "default_keep_unused_data_for_seconds")]
    pub keep_unused_data_for_seconds: u64,
    #[serde(default = "default_true")]
    pub refetch_on_focus: bool,
    #[serde(default = "default_true")]
    pub refetch_on_reconnect: bool,
}

/// Local counter service (`tally serve`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bind address (host:port).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_async_delay_ms() -> u64 {
    500
}

fn default_quotes_base_url() -> String {
    quotes::DEFAULT_BASE_URL.to_string()
}

fn default_counter_base_url() -> String {
    counter::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_quotes_limit() -> u32 {
    10
}

fn default_keep_unused_data_for_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            async_delay_ms: default_async_delay_ms(),
        }
    }
}

impl Default for QuotesApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_quotes_base_url(),
            timeout_seconds: default_timeout_seconds(),
            limit: default_quotes_limit(),
        }
    }
}

impl Default for CounterApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_counter_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_data_for_seconds: default_keep_unused_data_for_seconds(),
            refetch_on_focus: true,
            refetch_on_reconnect: true,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl CounterConfig {
    pub fn async_delay(&self) -> Duration {
        Duration::from_millis(self.async_delay_ms)
    }
}

impl From<&CacheConfig> for CacheOptions {
    fn from(cache: &CacheConfig) -> Self {
        Self {
            keep_unused_data_for: Duration::from_secs(cache.keep_unused_data_for_seconds),
            refetch_on_focus: cache.refetch_on_focus,
            refetch_on_reconnect: cache.refetch_on_reconnect,
        }
    }
}
