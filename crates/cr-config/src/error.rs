//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("replay mode invalid: '{0}' (expected record, replay, or overwrite)")]
    InvalidReplayMode(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML at {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl From<ConfigError> for cr_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidReplayMode(mode) => cr_common::Error::InvalidReplayMode(mode),
            ConfigError::Io { source, .. } => cr_common::Error::Io(source),
            other => cr_common::Error::Config(other.to_string()),
        }
    }
}
