//! Error types for the quote tool.

use dex_aggregator::{error::DexError, network::NetworkError, registry::RegistryError};

use crate::config::ConfigError;

/// Main error type for the quote tool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error("DEX error: {0}")]
    Dex(#[from] DexError),
}

impl From<NetworkError> for Error {
    fn from(value: NetworkError) -> Self {
        Self::Dex(value.into())
    }
}

impl From<RegistryError> for Error {
    fn from(value: RegistryError) -> Self {
        Self::Dex(value.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
