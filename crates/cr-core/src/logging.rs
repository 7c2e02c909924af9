//! Log subscriber setup for the `chanreplay` binary.
//!
//! Logs always go to stderr so stdout stays machine-readable.

use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "CHANREPLAY_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = cr_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "human" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(cr_common::Error::Config(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

/// Level used when `CHANREPLAY_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Build the filter: `-v` flags win over the environment.
pub fn build_filter(verbosity: u8) -> EnvFilter {
    if verbosity == 0 {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            return filter;
        }
    }
    EnvFilter::new(default_directive(verbosity))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(format: LogFormat, verbosity: u8) {
    let filter = build_filter(verbosity);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
