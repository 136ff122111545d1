//! JSON output formatter for reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-05-01T12:00:00+00:00",
//!   "exit_code": 0,
//!   "exit_code_name": "DG000",
//!   "dry_run": true,
//!   "action": "delete",
//!   "algorithm": "fast",
//!   "interrupted": false,
//!   "plans": [
//!     {
//!       "digest_hex": "900150983cd24fb0d6963f7d28e17f72",
//!       "size": 3,
//!       "keeper": "/data/a.txt",
//!       "removable": [
//!         { "path": "/data/b.txt", "size": 3, "succeeded": true,
//!           "declined": false, "error": null, "destination": null }
//!       ]
//!     }
//!   ],
//!   "warnings": [],
//!   "summary": { "files_scanned": 3, "groups_found": 1, "...": 0 }
//! }
//! ```

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::report::Report;
use crate::error::ExitCode;

/// Report wrapped with generation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// RFC 3339 generation time (UTC)
    pub generated_at: String,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DG000")
    pub exit_code_name: &'static str,
    /// The report itself
    #[serde(flatten)]
    pub report: &'a Report,
}

impl<'a> JsonOutput<'a> {
    /// Wrap a report, stamping the current time and its exit code.
    #[must_use]
    pub fn new(report: &'a Report) -> Self {
        let exit_code = report.exit_code();
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            report,
        }
    }

    /// Override the exit code (e.g. when the caller computed a different one).
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code.as_i32();
        self.exit_code_name = exit_code.code_prefix();
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
