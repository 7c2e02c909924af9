//! Exit codes for the chanreplay CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.

/// Exit codes for chanreplay operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Configuration error
    ConfigError = 10,

    /// Catalog missing, unparsable, or invalid
    CatalogError = 11,

    /// Transcript missing, corrupted, or not replayable
    TranscriptError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Map a unified error onto the exit code reported for it.
    pub fn for_error(err: &cr_common::Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::TranscriptError,
            30..=39 => ExitCode::CatalogError,
            60 => ExitCode::IoError,
            61..=69 => ExitCode::TranscriptError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
