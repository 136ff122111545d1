//! Report aggregation.
//!
//! [`ReportGenerator`] folds the plans, the executor's outcomes and the scan
//! summary into a single [`Report`]. It performs no I/O. A dry run and the
//! matching real run produce reports that differ only in `dry_run` and
//! `bytes_reclaimed`.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::actions::{ActionOutcome, ExecutionResult};
use crate::duplicates::{ActionMode, DuplicatePlan, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::HashAlgorithm;

/// Outcome of one removable file as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovableReport {
    /// File path
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Whether the action was applied (or would be, in a dry run)
    pub succeeded: bool,
    /// Whether the file was declined interactively
    pub declined: bool,
    /// Failure message, if any
    pub error: Option<String>,
    /// Quarantine destination for moves
    pub destination: Option<String>,
}

/// One duplicate group with its keeper and removables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    /// Full hex digest shared by the group
    pub digest_hex: String,
    /// Size of each member in bytes
    pub size: u64,
    /// Path of the kept file
    pub keeper: String,
    /// Removable files and their outcomes
    pub removable: Vec<RemovableReport>,
}

/// Kind of recovered per-file problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    /// Skipped during traversal
    Scan,
    /// Excluded from grouping because it could not be read
    Hash,
}

/// A recovered per-file problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Where the problem happened
    pub kind: WarningKind,
    /// Affected path
    pub path: String,
    /// Error message
    pub message: String,
}

/// Summary counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Files seen by the scanner
    pub files_scanned: usize,
    /// Hard links and followed symlinks not counted as separate copies
    pub aliases_skipped: usize,
    /// Duplicate groups planned
    pub groups_found: usize,
    /// Removable files across all groups
    pub duplicate_files: usize,
    /// Bytes freed if every removable is processed
    pub bytes_reclaimable: u64,
    /// Bytes actually freed on disk
    pub bytes_reclaimed: u64,
    /// Files skipped because of scan or hash errors
    pub files_skipped: usize,
    /// Failed actions
    pub action_errors: usize,
    /// `files_skipped + action_errors`
    pub error_count: usize,
}

/// Complete result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Whether this was a simulation
    pub dry_run: bool,
    /// Plan-wide action (`delete`, `move:<dest>`, `report-only`)
    pub action: String,
    /// Digest algorithm used
    pub algorithm: HashAlgorithm,
    /// Whether cancellation cut the run short
    pub interrupted: bool,
    /// One entry per duplicate group
    pub plans: Vec<PlanReport>,
    /// Recovered scan and hash problems
    pub warnings: Vec<Warning>,
    /// Summary counters
    pub summary: ReportSummary,
}

impl Report {
    /// Exit code implied by this report.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if self.summary.error_count > 0 {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        }
    }
}

/// Builds a [`Report`] from pipeline results.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    dry_run: bool,
    action: ActionMode,
    algorithm: HashAlgorithm,
}

impl ReportGenerator {
    /// Create a generator for one run's settings.
    #[must_use]
    pub fn new(dry_run: bool, action: ActionMode, algorithm: HashAlgorithm) -> Self {
        Self {
            dry_run,
            action,
            algorithm,
        }
    }

    /// Aggregate everything into a report.
    ///
    /// Removables without an outcome (the run was cancelled first) are
    /// reported as not succeeded with no error.
    #[must_use]
    pub fn generate(
        &self,
        plans: &[DuplicatePlan],
        scan: &ScanSummary,
        execution: &ExecutionResult,
    ) -> Report {
        let outcomes: HashMap<&Path, &ActionOutcome> = execution
            .outcomes
            .iter()
            .map(|o| (o.record.path.as_path(), o))
            .collect();

        let plan_reports: Vec<PlanReport> = plans
            .iter()
            .map(|plan| PlanReport {
                digest_hex: plan.group.digest.to_hex(),
                size: plan.group.size(),
                keeper: display_path(&plan.keeper.path),
                removable: plan
                    .removable
                    .iter()
                    .map(|record| {
                        let outcome = outcomes.get(record.path.as_path());
                        RemovableReport {
                            path: display_path(&record.path),
                            size: record.size,
                            succeeded: outcome.is_some_and(|o| o.succeeded),
                            declined: outcome.is_some_and(|o| o.declined),
                            error: outcome.and_then(|o| o.error.clone()),
                            destination: outcome
                                .and_then(|o| o.destination.as_deref())
                                .map(display_path),
                        }
                    })
                    .collect(),
            })
            .collect();

        let warnings: Vec<Warning> = scan
            .scan_errors
            .iter()
            .map(|e| Warning {
                kind: WarningKind::Scan,
                path: display_path(e.path()),
                message: e.to_string(),
            })
            .chain(scan.hash_errors.iter().map(|e| Warning {
                kind: WarningKind::Hash,
                path: display_path(e.path()),
                message: e.to_string(),
            }))
            .collect();

        let files_skipped = scan.skipped_files();
        let action_errors = execution.failure_count();
        let summary = ReportSummary {
            files_scanned: scan.total_files,
            aliases_skipped: scan.aliases_skipped,
            groups_found: plans.len(),
            duplicate_files: plans.iter().map(|p| p.removable.len()).sum(),
            bytes_reclaimable: plans.iter().map(DuplicatePlan::reclaimable_bytes).sum(),
            bytes_reclaimed: execution.bytes_reclaimed,
            files_skipped,
            action_errors,
            error_count: files_skipped + action_errors,
        };

        Report {
            dry_run: self.dry_run,
            action: self.action.to_string(),
            algorithm: self.algorithm,
            interrupted: scan.interrupted || execution.interrupted,
            plans: plan_reports,
            warnings,
            summary,
        }
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
