//! Session record/replay engine.
//!
//! - [`Recorder`] wraps a live channel and captures its traffic into a
//!   [`CaptureLog`].
//! - [`Replayer`] stands in for a live channel using a recorded session.
//! - [`validate_profile`] refuses replay against a differently shaped
//!   connection.
//! - [`ReplayHarness`] scopes one test's session and persists it.

pub mod error;
pub mod harness;
pub mod profile;
pub mod recorder;
pub mod replayer;
pub mod token;

pub use error::{ReplayError, ReplayOperation};
pub use harness::{ConnectionDescriptor, HarnessOptions, ReplayHarness, SessionChannel};
pub use profile::validate_profile;
pub use recorder::{CaptureLog, Recorder, SharedCaptureLog, WriteLogEntry};
pub use replayer::Replayer;
pub use token::{TokenMask, TOKEN_PLACEHOLDER};
