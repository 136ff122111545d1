//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the dupeguard application.
///
/// - 0: Success (with or without duplicates)
/// - 1: General error (unexpected failure)
/// - 2: Configuration or root-path error, nothing was scanned
/// - 3: Partial success (some files were skipped or actions failed)
/// - 130: Interrupted by user (Ctrl+C); a partial report was still emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without per-file errors.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Fatal configuration error: the pipeline never started.
    ConfigError = 2,
    /// Partial success: completed, but some files were skipped or failed.
    PartialSuccess = 3,
    /// Interrupted: cancelled by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DG000",
            Self::GeneralError => "DG001",
            Self::ConfigError => "DG002",
            Self::PartialSuccess => "DG003",
            Self::Interrupted => "DG130",
        }
    }

    /// Whether the run produced a report.
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Success | Self::PartialSuccess | Self::Interrupted)
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DG002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
