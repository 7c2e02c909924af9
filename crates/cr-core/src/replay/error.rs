//! Replay contract errors.

use std::path::PathBuf;
use thiserror::Error;

/// Which channel operation ran past the end of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOperation {
    Read,
    Write,
}

impl std::fmt::Display for ReplayOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayOperation::Read => write!(f, "read"),
            ReplayOperation::Write => write!(f, "write"),
        }
    }
}

/// Errors raised while recording, loading, or replaying transcripts.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("recorded connection profile does not match current connection profile: {differences}")]
    ProfileMismatch { differences: String },

    #[error(
        "expected channel input does not match actual channel input at position {position}: \
         expected {expected:?} (redacted={expected_redacted}), got {actual:?} (redacted={actual_redacted})"
    )]
    UnexpectedInput {
        position: usize,
        expected: Option<String>,
        actual: String,
        expected_redacted: bool,
        actual_redacted: bool,
    },

    #[error("no more recorded interactions to replay ({operation} attempted)")]
    Exhausted { operation: ReplayOperation },

    #[error("network blocked and no session recorded for instance {instance}")]
    NetworkBlocked { instance: String },

    #[error("no recorded session for instance {instance}")]
    MissingInstance { instance: String },

    #[error("unknown instance {instance}")]
    UnknownInstance { instance: String },

    #[error("transcript at {path} is unusable: {message}")]
    Corrupted { path: PathBuf, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ReplayError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReplayError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ReplayError> for cr_common::Error {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::ProfileMismatch { differences } => {
                cr_common::Error::ProfileMismatch(differences)
            }
            ReplayError::UnexpectedInput {
                position,
                expected,
                actual,
                ..
            } => cr_common::Error::UnexpectedInput {
                position,
                expected: expected.unwrap_or_else(|| "<no further input>".to_string()),
                actual,
            },
            ReplayError::Exhausted { operation } => {
                cr_common::Error::ReplayExhausted(format!("{} past end of transcript", operation))
            }
            ReplayError::NetworkBlocked { instance } => cr_common::Error::NetworkBlocked(instance),
            ReplayError::Io { source, .. } => cr_common::Error::Io(source),
            ReplayError::Yaml(e) => cr_common::Error::Yaml(e),
            other => cr_common::Error::TranscriptCorrupted(other.to_string()),
        }
    }
}
