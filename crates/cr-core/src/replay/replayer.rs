//! Deterministic replayer.
//!
//! Stands in for a live channel. Two independent cursors walk a recorded
//! session: one over expected inputs (checked on every write) and one over
//! outputs (returned on every read). Any divergence is fatal; the client under
//! test no longer behaves the way it did when the transcript was recorded.

use super::profile::validate_profile;
use super::token::{TokenMask, TOKEN_PLACEHOLDER};
use super::{ReplayError, ReplayOperation};
use crate::channel::{strip_ansi, AsyncChannel, Channel, ChannelError};
use crate::transcript::{ConnectionProfile, ReplaySession, REDACTED_INPUT};
use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug)]
struct ExpectedInput {
    input: Option<String>,
    redacted: bool,
}

/// Replays one recorded session.
#[derive(Debug)]
pub struct Replayer {
    outputs: VecDeque<String>,
    inputs: VecDeque<ExpectedInput>,
    writes_replayed: usize,
    reads_replayed: usize,
    mask: Option<TokenMask>,
    pending_token: Option<String>,
    strip_ansi: bool,
}

impl Replayer {
    /// Build a replayer after checking that the connection being opened has
    /// the same shape as the recorded one.
    pub fn new(session: &ReplaySession, observed: &ConnectionProfile) -> Result<Self, ReplayError> {
        validate_profile(&session.connection_profile, observed)?;

        let outputs = session
            .interactions
            .iter()
            .map(|i| i.channel_output.clone())
            .collect();
        let inputs = session
            .interactions
            .iter()
            .map(|i| ExpectedInput {
                input: i.expected_channel_input.clone(),
                redacted: i.expected_channel_input_redacted,
            })
            .collect();

        Ok(Self {
            outputs,
            inputs,
            writes_replayed: 0,
            reads_replayed: 0,
            mask: None,
            pending_token: None,
            strip_ansi: false,
        })
    }

    /// Apply the same volatile-token masking used when recording.
    pub fn with_token_mask(mut self, mask: Option<TokenMask>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_ansi_stripping(mut self, enabled: bool) -> Self {
        self.strip_ansi = enabled;
        self
    }

    /// Check a write against the next expected input.
    pub fn replay_write(&mut self, input: &str, redacted: bool) -> Result<(), ReplayError> {
        let position = self.writes_replayed;
        let expected = self.inputs.pop_front().ok_or(ReplayError::Exhausted {
            operation: ReplayOperation::Write,
        })?;
        self.writes_replayed += 1;

        let effective = if redacted {
            REDACTED_INPUT.to_string()
        } else if let Some(mask) = &self.mask {
            if let Some(token) = mask.capture(input) {
                self.pending_token = Some(token);
            }
            mask.mask(input)
        } else {
            input.to_string()
        };

        if expected.input.as_deref() != Some(effective.as_str()) || expected.redacted != redacted
        {
            return Err(ReplayError::UnexpectedInput {
                position,
                expected: expected.input,
                actual: effective,
                expected_redacted: expected.redacted,
                actual_redacted: redacted,
            });
        }

        if redacted {
            debug!("write: REDACTED");
        } else {
            debug!("write: {:?}", input);
        }
        Ok(())
    }

    /// Return the next recorded output.
    pub fn replay_read(&mut self) -> Result<Vec<u8>, ReplayError> {
        let mut output = self.outputs.pop_front().ok_or(ReplayError::Exhausted {
            operation: ReplayOperation::Read,
        })?;
        let position = self.reads_replayed;
        self.reads_replayed += 1;

        if output.contains(TOKEN_PLACEHOLDER) {
            if let Some(token) = self.pending_token.take() {
                output = output.replace(TOKEN_PLACEHOLDER, &token);
            }
        }

        debug!(position, "read: {:?}", output);
        let buf = output.into_bytes();
        Ok(if self.strip_ansi { strip_ansi(&buf) } else { buf })
    }

    pub fn remaining_reads(&self) -> usize {
        self.outputs.len()
    }

    pub fn remaining_writes(&self) -> usize {
        self.inputs.len()
    }

    /// Both cursors reached the end together. Partial consumption at
    /// teardown is allowed, so callers decide whether this matters.
    pub fn is_fully_consumed(&self) -> bool {
        self.outputs.is_empty() && self.inputs.iter().all(|i| i.input.is_none())
    }
}

impl Channel for Replayer {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        Ok(self.replay_write(input, redacted)?)
    }

    fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        Ok(self.replay_read()?)
    }
}

#[async_trait]
impl AsyncChannel for Replayer {
    fn write(&mut self, input: &str, redacted: bool) -> Result<(), ChannelError> {
        Ok(self.replay_write(input, redacted)?)
    }

    async fn read(&mut self) -> Result<Vec<u8>, ChannelError> {
        Ok(self.replay_read()?)
    }
}
