//! chanreplay common types, identifiers, and errors.
//!
//! This crate provides foundational types shared by the other workspace crates:
//! - Connection instance identifiers and session names
//! - CLI output formats
//! - Schema version of machine-readable CLI output
//! - The unified error type used at the CLI boundary

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::{InstanceId, SessionName};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
