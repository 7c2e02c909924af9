//! Event catalog served by the simulation server.

pub mod error;
pub mod model;

pub use error::CatalogError;
pub use model::{
    Event, EventBucket, EventCatalog, InteractStep, InteractiveEvent, OnOpenPhase, PhaseBuckets,
    StandardEvent, AUTH_SECONDARY, CLOSES_CONNECTION, REDACTED_STEP, UNKNOWN_INPUT,
};
