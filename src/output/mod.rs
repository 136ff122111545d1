//! Report aggregation and formatters.
//!
//! This module provides:
//! - [`ReportGenerator`] to fold pipeline results into a [`Report`]
//! - JSON for automation and scripting
//! - Plain text for terminals
//!
//! # Example
//!
//! ```no_run
//! use dupeguard::actions::ExecutionResult;
//! use dupeguard::duplicates::{ActionMode, DuplicateFinder};
//! use dupeguard::output::{JsonOutput, ReportGenerator};
//! use dupeguard::scanner::HashAlgorithm;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (_groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let report = ReportGenerator::new(true, ActionMode::ReportOnly, HashAlgorithm::Fast)
//!     .generate(&[], &summary, &ExecutionResult::default());
//! println!("{}", JsonOutput::new(&report).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod report;
pub mod text;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use json::{JsonOutput, JsonOutputError};
pub use report::{
    PlanReport, RemovableReport, Report, ReportGenerator, ReportSummary, Warning, WarningKind,
};
pub use text::TextOutput;

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Write `report` in this format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_report<W: std::io::Write>(
        self,
        report: &Report,
        writer: &mut W,
    ) -> Result<(), JsonOutputError> {
        match self {
            Self::Text => TextOutput::new(report).write_to(writer)?,
            Self::Json => JsonOutput::new(report).write_to(writer, true)?,
        }
        Ok(())
    }
}
