//! chanreplay core library.
//!
//! Deterministic record/replay of interactive channel sessions, plus a
//! catalog-driven simulator that stands in for a real endpoint.
//!
//! - [`transcript`]: the linear transcript format and its persistence
//! - [`channel`]: blocking and cooperative channel capability traits
//! - [`replay`]: recorder, replayer, profile validation and the session harness
//! - [`catalog`]: the event catalog served by the simulator
//! - [`collect`]: builds an event catalog by driving a real endpoint
//! - [`server`]: the simulation server and its per-connection state machine

pub mod catalog;
pub mod catalog_cli;
pub mod channel;
pub mod collect;
pub mod exit_codes;
pub mod logging;
pub mod replay;
pub mod server;
pub mod transcript;
pub mod transcript_cli;

pub use catalog::{CatalogError, Event, EventCatalog, OnOpenPhase};
pub use channel::{AsyncChannel, Channel, ChannelError};
pub use collect::{Collector, CollectorOptions, EndpointDriver, InteractSpec, PrivilegeLevel};
pub use exit_codes::ExitCode;
pub use replay::{
    ConnectionDescriptor, HarnessOptions, Recorder, ReplayError, ReplayHarness, Replayer,
    SessionChannel, TokenMask,
};
pub use server::{Effect, SimulatedSession, SimulationServer};
pub use transcript::{ConnectionProfile, Interaction, ReplaySession, Transcript};

/// Print a JSON envelope on stdout.
pub(crate) fn print_json(value: &serde_json::Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("chanreplay: failed to serialize output: {}", e);
            ExitCode::InternalError
        }
    }
}
