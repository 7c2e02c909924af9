//! Endpoint driver boundary.
//!
//! The collector never speaks a transport itself. It drives a real endpoint
//! through whatever channel-driving client the caller already uses, seen
//! through [`EndpointDriver`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The endpoint dropped the connection. Expected during collection.
    #[error("connection closed by endpoint")]
    ConnectionClosed,

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("driver failure: {0}")]
    Failed(String),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named endpoint mode and how to move into and out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeLevel {
    pub name: String,
    /// Regex matching this level's prompt.
    pub pattern: String,
    #[serde(default)]
    pub previous_priv: String,
    #[serde(default)]
    pub deescalate: String,
    #[serde(default)]
    pub escalate: String,
    /// Escalating into this level asks for the secondary credential.
    #[serde(default)]
    pub escalate_auth: bool,
    #[serde(default)]
    pub escalate_prompt: String,
}

/// Channel-driving client used by the collector.
pub trait EndpointDriver {
    /// Privilege levels in the driver's declared order.
    fn privilege_levels(&self) -> &[PrivilegeLevel];

    /// Level the driver normally settles in after opening.
    fn default_privilege_level(&self) -> &str;

    fn open(&mut self) -> Result<(), DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;

    fn is_alive(&self) -> bool;

    fn acquire_privilege(&mut self, level: &str) -> Result<(), DriverError>;

    fn get_prompt(&mut self) -> Result<String, DriverError>;

    /// Send `input` plus a return and read until any of `expected` appears.
    fn send_input_and_read(
        &mut self,
        input: &str,
        expected: &[String],
    ) -> Result<Vec<u8>, DriverError>;

    /// Raw write without a trailing return.
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), DriverError>;

    fn send_return(&mut self) -> Result<(), DriverError>;

    /// Read until any of `patterns` appears. Used after hidden input, where
    /// no echo can be waited for.
    fn read_until_any(&mut self, patterns: &[String]) -> Result<Vec<u8>, DriverError>;

    /// Run the on-open hook; returns every write it issued, in order.
    fn run_on_open(&mut self) -> Result<Vec<String>, DriverError>;

    /// Run the on-close hook; returns every write it issued, in order.
    fn run_on_close(&mut self) -> Result<Vec<String>, DriverError>;

    /// Whether `open`/`close` run the hooks automatically.
    fn set_hooks_enabled(&mut self, enabled: bool);

    /// Secondary (enable) credential.
    fn auth_secondary(&self) -> &str;

    fn return_char(&self) -> &str {
        "\n"
    }
}
