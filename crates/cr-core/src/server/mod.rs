//! Catalog-driven endpoint simulator.
//!
//! [`SimulationServer`] accepts TCP clients, authenticates them against the
//! sentinel credential and runs one [`SimulatedSession`] per connection.
//! The [`EventCatalog`](crate::catalog::EventCatalog) is loaded once and
//! shared read-only.

pub mod auth;
pub mod connection;
pub mod error;
pub mod listener;
pub mod session;

pub use auth::{key_fingerprint, parse_public_key_line, Authenticator};
pub use connection::Connection;
pub use error::ServerError;
pub use listener::{ListenerStats, SimulationServer};
pub use session::{Effect, SimulatedSession};
