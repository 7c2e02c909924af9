//! Simulation server errors.

use crate::catalog::CatalogError;
use cr_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("authentication failed for user {username}")]
    AuthFailed { username: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ServerError> for cr_common::Error {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::AuthFailed { username } => cr_common::Error::AuthFailed { username },
            ServerError::Catalog(e) => e.into(),
            ServerError::Config(e) => e.into(),
            ServerError::Io(e) => cr_common::Error::Io(e),
            other => cr_common::Error::Server(other.to_string()),
        }
    }
}
