//! Catalog collection from a real endpoint.

pub mod collector;
pub mod driver;
pub mod error;

pub use collector::{Collector, CollectorOptions, InteractSpec};
pub use driver::{DriverError, EndpointDriver, PrivilegeLevel};
pub use error::CollectError;
