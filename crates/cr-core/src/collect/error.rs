//! Collection errors.

use super::driver::DriverError;
use crate::catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("invalid prompt pattern for privilege level '{level}': {source}")]
    InvalidPattern {
        level: String,
        #[source]
        source: regex::Error,
    },

    #[error("prompt {prompt:?} matches no privilege level")]
    UnknownPrivilege { prompt: String },

    #[error("privilege level prompts must be collected first")]
    PromptsNotCollected,

    #[error("collection incomplete: {0}")]
    Incomplete(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<CollectError> for cr_common::Error {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::Driver(DriverError::ConnectionClosed) => {
                cr_common::Error::ConnectionClosed("endpoint closed the connection".to_string())
            }
            CollectError::Catalog(e) => e.into(),
            other => cr_common::Error::Collection(other.to_string()),
        }
    }
}
