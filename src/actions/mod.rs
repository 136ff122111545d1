//! File actions module.
//!
//! This module provides functionality for:
//! - Permanent deletion of removable duplicates
//! - Moving duplicates into a quarantine directory
//! - Dry-run simulation with identical outcomes
//! - TOCTOU verification to detect modified files
//!
//! ```no_run
//! use dupeguard::actions::ActionExecutor;
//! use dupeguard::duplicates::DuplicatePlan;
//!
//! let plans: Vec<DuplicatePlan> = Vec::new();
//! let result = ActionExecutor::new("/data").with_dry_run(true).execute(&plans);
//! println!("{} file(s) would be processed", result.success_count());
//! ```

pub mod delete;
pub mod executor;

pub use delete::{
    delete_file, move_to_quarantine, quarantine_destination, ActionError, FileSnapshot,
};
pub use executor::{
    ActionExecutor, ActionOutcome, AutoConfirm, AutoDecline, Decision, DecisionProvider, ExecutionResult,
    TerminalPrompt,
};
