//! Simulation server configuration.
//!
//! Loaded from TOML. Every field has a default so an empty file (or no file)
//! yields a usable test server listening on localhost.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default TCP port of the simulation server.
pub const DEFAULT_PORT: u16 = 2222;

/// Username and password accepted by the simulation server, and the value
/// hidden dialog steps expect as the secondary credential.
pub const SENTINEL_CREDENTIAL: &str = "chanreplay";

/// OpenSSH-style fingerprint of the fixed test public key.
pub const DEFAULT_KEY_FINGERPRINT: &str = "SHA256:rb1CVtQCkWBAzm1AxV7xR7BLBawUwFUlUVFVu+QYQBM";

const CONFIG_DIR_NAME: &str = "chanreplay";
const CONFIG_FILE_NAME: &str = "server.toml";

/// Typed `server.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub listen_address: String,

    /// Port to bind; 0 asks the OS for a free port.
    pub port: u16,

    /// Event catalog produced by the collector.
    pub catalog_path: PathBuf,

    /// Sentinel login username.
    pub username: String,

    /// Sentinel login password.
    pub password: String,

    /// Public key fingerprint accepted in place of a password.
    pub key_fingerprint: String,

    /// Value hidden dialog steps accept (e.g. enable secret).
    pub secondary_credential: String,

    /// Maximum concurrent connections (0 = unlimited).
    pub max_connections: usize,

    /// Login attempts before the connection is dropped.
    pub max_auth_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            catalog_path: PathBuf::from("chanreplay_catalog.yaml"),
            username: SENTINEL_CREDENTIAL.to_string(),
            password: SENTINEL_CREDENTIAL.to_string(),
            key_fingerprint: DEFAULT_KEY_FINGERPRINT.to_string(),
            secondary_credential: SENTINEL_CREDENTIAL.to_string(),
            max_connections: 0,
            max_auth_attempts: 3,
        }
    }
}

impl ServerConfig {
    /// Default location: `<config_dir>/chanreplay/server.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load from an explicit path, or from the default path when it exists,
    /// or fall back to defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        let path = Self::default_path();
        if path.is_file() {
            debug!(path = %path.display(), "loading server config");
            Self::load_from_file(&path)
        } else {
            debug!("no server config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Semantic validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.listen_address.trim().is_empty() {
            return Err(invalid("listen_address", "must not be empty"));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(invalid("username/password", "sentinel credentials must not be empty"));
        }
        if self.catalog_path.as_os_str().is_empty() {
            return Err(invalid("catalog_path", "must not be empty"));
        }
        if self.max_auth_attempts == 0 {
            return Err(invalid("max_auth_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// `address:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ServerConfig::from_toml("", Path::new("server.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "127.0.0.1:2222");
    }

    #[test]
    fn partial_document_overrides_fields() {
        let doc = r#"
            port = 3022
            catalog_path = "/srv/catalog.yaml"
            max_connections = 4
        "#;
        let config = ServerConfig::from_toml(doc, Path::new("server.toml")).unwrap();
        assert_eq!(config.port, 3022);
        assert_eq!(config.catalog_path, PathBuf::from("/srv/catalog.yaml"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.username, SENTINEL_CREDENTIAL);
    }

    #[test]
    fn rejects_empty_credentials() {
        let err = ServerConfig::from_toml("password = \"\"", Path::new("server.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_zero_auth_attempts() {
        let err =
            ServerConfig::from_toml("max_auth_attempts = 0", Path::new("s.toml")).unwrap_err();
        assert!(err.to_string().contains("max_auth_attempts"));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let err = ServerConfig::from_toml("port = [", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn load_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "port = 4022\n").unwrap();
        let config = ServerConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.port, 4022);
    }

    #[test]
    fn missing_explicit_file_is_io_error() {
        let err = ServerConfig::resolve(Some(Path::new("/nonexistent/server.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
