//! Replay mode selection.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a session harness treats the channel it wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Talk to the real endpoint and save the transcript, unless one exists.
    Record,
    /// Serve the stored transcript; never contact the endpoint.
    Replay,
    /// Talk to the real endpoint and replace any stored transcript.
    Overwrite,
}

impl ReplayMode {
    /// True when the harness must contact the real endpoint.
    pub fn is_recording(self) -> bool {
        matches!(self, ReplayMode::Record | ReplayMode::Overwrite)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReplayMode::Record => "record",
            ReplayMode::Replay => "replay",
            ReplayMode::Overwrite => "overwrite",
        }
    }
}

impl std::fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(ReplayMode::Record),
            "replay" => Ok(ReplayMode::Replay),
            "overwrite" => Ok(ReplayMode::Overwrite),
            _ => Err(ConfigError::InvalidReplayMode(s.to_string())),
        }
    }
}
