//! Error types for chanreplay.

use thiserror::Error;

/// Result type alias for chanreplay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for chanreplay.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid replay mode: {0}")]
    InvalidReplayMode(String),

    // Replay contract errors (20-29)
    #[error("recorded connection profile does not match current connection profile: {0}")]
    ProfileMismatch(String),

    #[error("unexpected channel input at position {position}: expected {expected}, got {actual}")]
    UnexpectedInput {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("replay exhausted: {0}")]
    ReplayExhausted(String),

    #[error("network blocked and no session recorded for {0}")]
    NetworkBlocked(String),

    #[error("transcript corrupted: {0}")]
    TranscriptCorrupted(String),

    // Catalog errors (30-39)
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid catalog: {0}")]
    CatalogInvalid(String),

    // Collection errors (40-49)
    #[error("collection failed: {0}")]
    Collection(String),

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    // Server errors (50-59)
    #[error("simulation server error: {0}")]
    Server(String),

    #[error("authentication failed for user {username}")]
    AuthFailed { username: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidReplayMode(_) => 11,
            Error::ProfileMismatch(_) => 20,
            Error::UnexpectedInput { .. } => 21,
            Error::ReplayExhausted(_) => 22,
            Error::NetworkBlocked(_) => 23,
            Error::TranscriptCorrupted(_) => 24,
            Error::Catalog(_) => 30,
            Error::CatalogInvalid(_) => 31,
            Error::Collection(_) => 40,
            Error::ConnectionClosed(_) => 41,
            Error::Server(_) => 50,
            Error::AuthFailed { .. } => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Yaml(_) => 62,
        }
    }

    /// True for errors that mean the client under test diverged from its
    /// recording. These are never retried.
    pub fn is_replay_violation(&self) -> bool {
        (20..30).contains(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_concern() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::ProfileMismatch("port".into()).code(), 20);
        assert_eq!(Error::CatalogInvalid("x".into()).code(), 31);
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io.code(), 60);
    }

    #[test]
    fn replay_violations_are_identified() {
        let err = Error::UnexpectedInput {
            position: 2,
            expected: "show version".into(),
            actual: "show run".into(),
        };
        assert!(err.is_replay_violation());
        assert!(!Error::Server("x".into()).is_replay_violation());
        assert!(err.to_string().contains("position 2"));
    }
}
