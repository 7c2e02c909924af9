//! Connection instance and session identity types.
//!
//! A transcript file may hold several logical connections opened by one test.
//! Each is keyed by an [`InstanceId`] built from the connection's host, port,
//! transport, optional logging uid, and a sequence number counting earlier
//! connections that share the same prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one logical connection inside a transcript.
///
/// Format: `<host>:<port>:<transport>:<uid>:<sequence>`
/// Example: `10.0.0.1:22:system::0`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    /// Build the prefix shared by every connection to the same endpoint.
    pub fn prefix(host: &str, port: u16, transport: &str, uid: &str) -> String {
        format!("{}:{}:{}:{}", host, port, transport, uid)
    }

    /// Create an identifier from its components.
    pub fn new(host: &str, port: u16, transport: &str, uid: &str, sequence: usize) -> Self {
        InstanceId(format!(
            "{}:{}",
            Self::prefix(host, port, transport, uid),
            sequence
        ))
    }

    /// Synthesize the next identifier for an endpoint, given the identifiers
    /// already handed out in this session.
    pub fn next<'a, I>(host: &str, port: u16, transport: &str, uid: &str, existing: I) -> Self
    where
        I: IntoIterator<Item = &'a InstanceId>,
    {
        let prefix = Self::prefix(host, port, transport, uid);
        let sequence = existing
            .into_iter()
            .filter(|id| {
                id.0.strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_prefix(':'))
                    .is_some_and(|sequence| sequence.parse::<usize>().is_ok())
            })
            .count();
        Self::new(host, port, transport, uid, sequence)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

/// Name of a transcript file (without the `.yaml` extension).
///
/// Usually derived from the test name; ad-hoc sessions get a timestamped
/// name: `chanreplay_session_<unix-seconds>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionName(pub String);

impl SessionName {
    /// Generate a timestamped session name.
    pub fn new() -> Self {
        SessionName(format!(
            "chanreplay_session_{}",
            chrono::Utc::now().timestamp()
        ))
    }

    /// Build a session name from a test name, optionally qualified by the
    /// test's enclosing group (`Group.test_name`).
    pub fn for_test(test_name: &str, group: Option<&str>) -> Self {
        match group {
            Some(group) => SessionName(format!("{}.{}", group, test_name)),
            None => SessionName(test_name.to_string()),
        }
    }

    /// File name of the transcript for this session.
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.0)
    }
}

impl Default for SessionName {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
