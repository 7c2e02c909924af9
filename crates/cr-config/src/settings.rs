//! Replay settings resolution.
//!
//! Test runners choose the replay mode, the session directory, and a few
//! switches. Values are resolved in order: explicit (CLI flag / fixture
//! argument) → environment → defaults.

use crate::error::ConfigError;
use crate::mode::ReplayMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default directory (relative to the test's working directory) that holds
/// transcript files.
pub const DEFAULT_SESSION_DIR: &str = "chanreplay_sessions";

const ENV_MODE: &str = "CHANREPLAY_MODE";
const ENV_DIR: &str = "CHANREPLAY_DIR";
const ENV_OVERWRITE: &str = "CHANREPLAY_OVERWRITE";
const ENV_DISABLE: &str = "CHANREPLAY_DISABLE";
const ENV_BLOCK_NETWORK: &str = "CHANREPLAY_BLOCK_NETWORK";

/// Explicitly supplied values; `None` defers to the environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub mode: Option<String>,
    pub directory: Option<PathBuf>,
    pub overwrite: Option<Vec<String>>,
    pub disabled: Option<bool>,
    pub block_network: Option<bool>,
}

/// Fully resolved replay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySettings {
    pub mode: ReplayMode,
    pub directory: PathBuf,
    /// Test names whose sessions are re-recorded regardless of `mode`.
    #[serde(default)]
    pub overwrite: Vec<String>,
    /// Disable record/replay entirely; tests talk to real endpoints.
    #[serde(default)]
    pub disabled: bool,
    /// Never contact a real endpoint; tests without a transcript are skipped.
    #[serde(default)]
    pub block_network: bool,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Replay,
            directory: PathBuf::from(DEFAULT_SESSION_DIR),
            overwrite: Vec::new(),
            disabled: false,
            block_network: false,
        }
    }
}

impl ReplaySettings {
    /// Resolve settings against the process environment.
    pub fn resolve(overrides: SettingsOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve settings against an arbitrary variable lookup.
    pub fn resolve_with<F>(overrides: SettingsOverrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mode = match overrides.mode.or_else(|| env(ENV_MODE)) {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };

        let directory = overrides
            .directory
            .or_else(|| env(ENV_DIR).map(PathBuf::from))
            .unwrap_or(defaults.directory);

        let overwrite = overrides
            .overwrite
            .or_else(|| env(ENV_OVERWRITE).map(|raw| split_list(&raw)))
            .unwrap_or_default();

        let disabled = match overrides.disabled {
            Some(v) => v,
            None => env_flag(&env, ENV_DISABLE)?.unwrap_or(false),
        };

        let block_network = match overrides.block_network {
            Some(v) => v,
            None => env_flag(&env, ENV_BLOCK_NETWORK)?.unwrap_or(false),
        };

        Ok(Self {
            mode,
            directory,
            overwrite,
            disabled,
            block_network,
        })
    }

    /// Mode to use for a particular test; tests named in the overwrite list
    /// are always re-recorded.
    pub fn effective_mode(&self, test_name: &str) -> ReplayMode {
        if self.overwrite.iter().any(|name| name == test_name) {
            ReplayMode::Overwrite
        } else {
            self.mode
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_flag<F>(env: &F, key: &str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = env(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", raw),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let settings =
            ReplaySettings::resolve_with(SettingsOverrides::default(), env_from(&[])).unwrap();
        assert_eq!(settings, ReplaySettings::default());
    }

    #[test]
    fn env_fills_unset_values() {
        let env = env_from(&[
            ("CHANREPLAY_MODE", "record"),
            ("CHANREPLAY_DIR", "/tmp/sessions"),
            ("CHANREPLAY_OVERWRITE", "test_a, test_b,,"),
            ("CHANREPLAY_BLOCK_NETWORK", "1"),
        ]);
        let settings = ReplaySettings::resolve_with(SettingsOverrides::default(), env).unwrap();
        assert_eq!(settings.mode, ReplayMode::Record);
        assert_eq!(settings.directory, PathBuf::from("/tmp/sessions"));
        assert_eq!(settings.overwrite, vec!["test_a", "test_b"]);
        assert!(settings.block_network);
        assert!(!settings.disabled);
    }

    #[test]
    fn explicit_beats_env() {
        let env = env_from(&[("CHANREPLAY_MODE", "record")]);
        let overrides = SettingsOverrides {
            mode: Some("overwrite".into()),
            ..Default::default()
        };
        let settings = ReplaySettings::resolve_with(overrides, env).unwrap();
        assert_eq!(settings.mode, ReplayMode::Overwrite);
    }

    #[test]
    fn invalid_mode_is_a_configuration_error() {
        let env = env_from(&[("CHANREPLAY_MODE", "rewind")]);
        let err = ReplaySettings::resolve_with(SettingsOverrides::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidReplayMode(_)));
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let env = env_from(&[("CHANREPLAY_DISABLE", "maybe")]);
        let err = ReplaySettings::resolve_with(SettingsOverrides::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn overwrite_list_forces_overwrite_mode() {
        let settings = ReplaySettings {
            overwrite: vec!["test_show_version".into()],
            ..Default::default()
        };
        assert_eq!(
            settings.effective_mode("test_show_version"),
            ReplayMode::Overwrite
        );
        assert_eq!(settings.effective_mode("test_other"), ReplayMode::Replay);
    }
}
