use std::net::AddrParseError;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while assembling or starting the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },
}
