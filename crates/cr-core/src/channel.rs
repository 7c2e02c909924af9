//! Channel capability traits.
//!
//! A channel is the read/write boundary of a channel-driving client: text
//! goes in through `write`, device output comes back through `read`. The
//! recorder wraps a live channel and the replayer stands in for one, so both
//! implement these traits explicitly instead of patching a client at runtime.
//!
//! Two flavours exist because clients drive channels either from a dedicated
//! thread ([`Channel`]) or cooperatively ([`AsyncChannel`]). In the async
//! flavour only `read` suspends; writes are handed to the transport
//! immediately.

use crate::replay::ReplayError;
use async_trait::async_trait;
use regex::bytes::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors surfaced through a channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("channel closed by remote end")]
    Closed,

    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Blocking channel.
pub trait Channel {
    /// Send `input` to the endpoint. `redacted` marks secrets (passwords)
    /// that must never be logged or persisted.
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError>;

    /// Read whatever output is available, blocking until some arrives.
    fn read(&mut self) -> Result<Vec<u8>, ChannelError>;
}

/// Cooperative channel; suspension happens only in `read`.
#[async_trait]
pub trait AsyncChannel: Send {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError>;

    async fn read(&mut self) -> Result<Vec<u8>, ChannelError>;
}

/// Remove carriage returns, as device output is stored with `\n` endings.
pub fn strip_carriage_returns(buf: &[u8]) -> Vec<u8> {
    buf.iter().copied().filter(|&b| b != b'\r').collect()
}

fn ansi_pattern() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| {
        Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07]*\x07|[@-Z\\-_])")
            .unwrap_or_else(|e| panic!("static ANSI pattern failed to compile: {e}"))
    })
}

/// Strip ANSI escape sequences (CSI, OSC, and two-byte escapes).
pub fn strip_ansi(buf: &[u8]) -> Vec<u8> {
    ansi_pattern().replace_all(buf, &b""[..]).into_owned()
}

/// Decode device bytes, falling back to lossy decoding on invalid UTF-8.
pub fn decode_output(buf: &[u8]) -> String {
    match std::str::from_utf8(buf) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(buf).into_owned(),
    }
}
