//! Catalog errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid catalog: {0}")]
    Invalid(String),
}

impl From<CatalogError> for cr_common::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Io { source, .. } => cr_common::Error::Io(source),
            CatalogError::Parse(e) => cr_common::Error::Catalog(e.to_string()),
            CatalogError::Invalid(msg) => cr_common::Error::CatalogInvalid(msg),
        }
    }
}
