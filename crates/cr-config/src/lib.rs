//! chanreplay configuration loading and validation.
//!
//! This crate provides:
//! - Replay mode selection (record / replay / overwrite)
//! - Replay settings resolution (explicit → environment → defaults)
//! - Typed simulation-server configuration loaded from TOML

pub mod error;
pub mod mode;
pub mod server;
pub mod settings;

pub use error::ConfigError;
pub use mode::ReplayMode;
pub use server::{ServerConfig, DEFAULT_KEY_FINGERPRINT, DEFAULT_PORT, SENTINEL_CREDENTIAL};
pub use settings::{ReplaySettings, SettingsOverrides, DEFAULT_SESSION_DIR};
