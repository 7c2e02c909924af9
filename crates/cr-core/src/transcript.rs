//! Linear transcript model and persistence.
//!
//! A transcript file maps instance identifiers to one recorded session each:
//!
//! ```yaml
//! "10.0.0.1:22:system::0":
//!   connection_profile:
//!     host: 10.0.0.1
//!     port: 22
//!     ...
//!   interactions:
//!     - channel_output: "router#"
//!       expected_channel_input: show version
//!       expected_channel_input_redacted: false
//! ```
//!
//! Interaction `i` holds everything read strictly between write `i-1` and
//! write `i`. A final interaction may carry `expected_channel_input: null`
//! when output was read after the last write.

use crate::replay::ReplayError;
use cr_common::InstanceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Substituted for the input of redacted writes before it is stored.
pub const REDACTED_INPUT: &str = "REDACTED";

/// Non-secret shape of a connection. Secrets are reduced to "was one used".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub auth_username: String,
    pub auth_password: bool,
    pub auth_private_key: bool,
    pub auth_private_key_passphrase: bool,
    pub auth_bypass: bool,
    pub transport: String,
    /// Only network-style drivers carry a secondary (enable) credential.
    #[serde(default)]
    pub auth_secondary: bool,
}

impl ConnectionProfile {
    /// Names and values of every field that differs from `other`.
    pub fn differences(&self, other: &ConnectionProfile) -> Vec<String> {
        let mut out = Vec::new();
        let mut check = |name: &str, a: String, b: String| {
            if a != b {
                out.push(format!("{name}: recorded={a} actual={b}"));
            }
        };
        check("host", self.host.clone(), other.host.clone());
        check("port", self.port.to_string(), other.port.to_string());
        check(
            "auth_username",
            self.auth_username.clone(),
            other.auth_username.clone(),
        );
        check(
            "auth_password",
            self.auth_password.to_string(),
            other.auth_password.to_string(),
        );
        check(
            "auth_private_key",
            self.auth_private_key.to_string(),
            other.auth_private_key.to_string(),
        );
        check(
            "auth_private_key_passphrase",
            self.auth_private_key_passphrase.to_string(),
            other.auth_private_key_passphrase.to_string(),
        );
        check(
            "auth_bypass",
            self.auth_bypass.to_string(),
            other.auth_bypass.to_string(),
        );
        check("transport", self.transport.clone(), other.transport.clone());
        check(
            "auth_secondary",
            self.auth_secondary.to_string(),
            other.auth_secondary.to_string(),
        );
        out
    }

    /// Telnet-family transports interleave login prompts with reads.
    pub fn is_telnet(&self) -> bool {
        self.transport.contains("telnet")
    }
}

/// One write and the output read before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub channel_output: String,
    pub expected_channel_input: Option<String>,
    #[serde(default)]
    pub expected_channel_input_redacted: bool,
}

/// Recorded traffic of one logical connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySession {
    pub connection_profile: ConnectionProfile,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

impl ReplaySession {
    /// A session with no interactions cannot be replayed and must be
    /// recorded again.
    pub fn is_replayable(&self) -> bool {
        !self.interactions.is_empty()
    }
}

/// All sessions recorded during one test, keyed by instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    pub sessions: BTreeMap<InstanceId, ReplaySession>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ReplayError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ReplayError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load a transcript file.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path).map_err(|e| ReplayError::io(path, e))?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            ReplayError::Yaml(source) => ReplayError::Corrupted {
                path: path.to_path_buf(),
                message: source.to_string(),
            },
            other => other,
        })
    }

    /// Write the transcript to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ReplayError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ReplayError::io(parent, e))?;
            }
        }
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml).map_err(|e| ReplayError::io(path, e))
    }

    pub fn get(&self, instance: &InstanceId) -> Option<&ReplaySession> {
        self.sessions.get(instance)
    }

    pub fn insert(&mut self, instance: InstanceId, session: ReplaySession) {
        self.sessions.insert(instance, session);
    }

    /// True when every recorded instance has at least one interaction.
    pub fn is_replayable(&self) -> bool {
        self.sessions.values().all(ReplaySession::is_replayable)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
