//! Configuration loaded from `~/.config/tally-store/config.toml`.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{
    CacheConfig, Config, CounterApiConfig, CounterConfig, QuotesApiConfig, ServiceConfig,
};
