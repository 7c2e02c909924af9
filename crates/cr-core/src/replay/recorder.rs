//! Capture recorder.
//!
//! Wraps a live channel and observes its traffic without changing what the
//! client sees. Writes are appended to a write log together with the length
//! of the read buffer at that moment; reads are appended (carriage returns
//! removed) to a single read buffer. Serialization slices the read buffer at
//! each write's offset to rebuild per-interaction output.

use super::token::{mask_opt, TokenMask};
use crate::channel::{
    decode_output, strip_ansi, strip_carriage_returns, AsyncChannel, Channel, ChannelError,
};
use crate::transcript::{ConnectionProfile, Interaction, ReplaySession, REDACTED_INPUT};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// One write as seen by the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteLogEntry {
    /// Input as stored: `REDACTED` for secrets, volatile tokens masked.
    pub input: String,
    pub redacted: bool,
    /// Read-buffer length when the write happened.
    pub read_offset: usize,
}

impl WriteLogEntry {
    pub fn new(input: impl Into<String>, redacted: bool, read_offset: usize) -> Self {
        Self {
            input: input.into(),
            redacted,
            read_offset,
        }
    }
}

/// Write log plus raw read buffer for one connection.
#[derive(Debug, Default)]
pub struct CaptureLog {
    writes: Vec<WriteLogEntry>,
    reads: Vec<u8>,
    mask: Option<TokenMask>,
}

/// Capture log shared between a recorder and the harness that saves it.
pub type SharedCaptureLog = Arc<Mutex<CaptureLog>>;

impl CaptureLog {
    pub fn new(mask: Option<TokenMask>) -> Self {
        Self {
            writes: Vec::new(),
            reads: Vec::new(),
            mask,
        }
    }

    /// Build a log from an existing write log and read buffer.
    pub fn from_parts(writes: Vec<WriteLogEntry>, reads: Vec<u8>) -> Self {
        Self {
            writes,
            reads,
            mask: None,
        }
    }

    pub fn shared(self) -> SharedCaptureLog {
        Arc::new(Mutex::new(self))
    }

    pub fn write_log(&self) -> &[WriteLogEntry] {
        &self.writes
    }

    pub fn read_buffer(&self) -> &[u8] {
        &self.reads
    }

    /// Log a write at the current read offset.
    pub fn record_write(&mut self, input: &str, redacted: bool) {
        let effective = if redacted {
            REDACTED_INPUT.to_string()
        } else {
            mask_opt(self.mask.as_ref(), input)
        };
        self.writes
            .push(WriteLogEntry::new(effective, redacted, self.reads.len()));
    }

    /// Append a raw read; returns the bytes with carriage returns removed.
    pub fn record_read(&mut self, raw: &[u8]) -> Vec<u8> {
        let buf = strip_carriage_returns(raw);
        self.reads.extend_from_slice(&buf);
        buf
    }

    /// Drop telnet login noise.
    ///
    /// Telnet transports produce empty reads before the banner and extra
    /// returns around the username/password exchange. Keeps the write log up
    /// to and including the first redacted write (the password) plus the most
    /// recent write, then discards everything before the write of
    /// `auth_username`. Output read before the username is folded into the
    /// first remaining interaction.
    pub fn trim_telnet_login(&mut self, auth_username: &str) {
        if self.writes.is_empty() {
            return;
        }

        let last_index = self.writes.len() - 1;
        let mut kept: Vec<WriteLogEntry> = match self.writes.iter().position(|w| w.redacted) {
            Some(cut) => {
                let mut kept = self.writes[..=cut].to_vec();
                if cut < last_index {
                    kept.push(self.writes[last_index].clone());
                }
                kept
            }
            None => self.writes.clone(),
        };

        if let Some(start) = kept.iter().position(|w| w.input == auth_username) {
            kept.drain(..start);
        }

        debug!(
            before = self.writes.len(),
            after = kept.len(),
            "trimmed telnet login writes"
        );
        self.writes = kept;
    }

    /// Rebuild the ordered interactions.
    pub fn interactions(&self) -> Vec<Interaction> {
        let total = self.reads.len();
        let mut interactions = Vec::with_capacity(self.writes.len() + 1);
        let mut previous = 0usize;

        for entry in &self.writes {
            let end = entry.read_offset.min(total);
            let start = previous.min(end);
            interactions.push(Interaction {
                channel_output: self.decode(&self.reads[start..end]),
                expected_channel_input: Some(entry.input.clone()),
                expected_channel_input_redacted: entry.redacted,
            });
            previous = end;
        }

        // Output read after the final write (the client never wrote again)
        // becomes a trailing read-only interaction.
        if previous < total {
            interactions.push(Interaction {
                channel_output: self.decode(&self.reads[previous..]),
                expected_channel_input: None,
                expected_channel_input_redacted: false,
            });
        }

        interactions
    }

    /// Produce the persisted form of this connection.
    pub fn serialize(&self, connection_profile: ConnectionProfile) -> ReplaySession {
        ReplaySession {
            connection_profile,
            interactions: self.interactions(),
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        mask_opt(self.mask.as_ref(), &decode_output(bytes))
    }
}

pub(crate) fn lock(log: &SharedCaptureLog) -> MutexGuard<'_, CaptureLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Channel wrapper that records traffic of the channel it wraps.
pub struct Recorder<C> {
    inner: C,
    log: SharedCaptureLog,
    strip_ansi: bool,
}

impl<C> Recorder<C> {
    pub fn new(inner: C, log: SharedCaptureLog) -> Self {
        Self {
            inner,
            log,
            strip_ansi: false,
        }
    }

    /// Strip ANSI sequences from what the client receives. The stored
    /// transcript keeps the raw bytes.
    pub fn with_ansi_stripping(mut self, enabled: bool) -> Self {
        self.strip_ansi = enabled;
        self
    }

    pub fn log(&self) -> SharedCaptureLog {
        Arc::clone(&self.log)
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn before_write(&self, input: &str, redacted: bool) {
        lock(&self.log).record_write(input, redacted);
        if redacted {
            debug!("write: REDACTED");
        } else {
            debug!("write: {:?}", input);
        }
    }

    fn after_read(&self, raw: &[u8]) -> Vec<u8> {
        let buf = lock(&self.log).record_read(raw);
        debug!("read: {:?}", String::from_utf8_lossy(&buf));
        if self.strip_ansi {
            strip_ansi(&buf)
        } else {
            buf
        }
    }
}

impl<C: Channel> Channel for Recorder<C> {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        self.before_write(input, redacted);
        self.inner.write(input, redacted)
    }

    fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        let raw = self.inner.read()?;
        Ok(self.after_read(&raw))
    }
}

#[async_trait]
impl<C: AsyncChannel> AsyncChannel for Recorder<C> {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        self.before_write(input, redacted);
        self.inner.write(input, redacted)
    }

    async fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        let raw = self.inner.read().await?;
        Ok(self.after_read(&raw))
    }
}
