//! Process exit codes
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success: report produced |
//! | 1 | Failure: bad input, configuration, decoding or output error |
//! | 2 | Unavailable: an item history never became available |
//! | 130 | Cancelled: interrupted before the export finished |
//!
//! Usage errors are reported by clap with its own exit code (2).

use std::process;

use trackexport_core::ExportError;

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
    Unavailable = 2,
    Cancelled = 130,
}

impl ExitCode {
    /// Exit code for a failed run.
    ///
    /// Looks through the `anyhow` context chain for the engine error.
    pub fn from_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<ExportError>() {
            Some(ExportError::FetchTimeout { .. }) => ExitCode::Unavailable,
            Some(ExportError::Cancelled { .. }) => ExitCode::Cancelled,
            _ => ExitCode::Failure,
        }
    }

    /// Get the numeric value
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}
