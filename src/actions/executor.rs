//! Plan execution with per-file fault isolation.
//!
//! [`ActionExecutor`] walks every [`DuplicatePlan`] and applies its action to
//! each removable file. A failure on one file becomes a failed
//! [`ActionOutcome`] and processing moves on. Keepers are never touched, and
//! a keeper that vanished or changed since the scan fails every removable of
//! its group with [`ActionError::KeeperChanged`].
//!
//! Before each mutation a [`DecisionProvider`] is consulted. [`AutoConfirm`]
//! proceeds with everything; [`TerminalPrompt`] asks on a terminal.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::delete::{delete_file, move_to_quarantine, quarantine_destination, ActionError, FileSnapshot};
use crate::duplicates::{ActionMode, DuplicatePlan};
use crate::events::{EventSink, LogSink, Phase};
use crate::scanner::FileRecord;

/// Answer from a [`DecisionProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply the action to this file
    Proceed,
    /// Leave this file alone and continue
    Skip,
    /// Leave this file alone and stop processing
    Stop,
}

/// Consulted before every mutating action.
pub trait DecisionProvider: Send + Sync {
    /// Decide whether `action` may be applied to `record`.
    fn decide(&self, record: &FileRecord, action: &ActionMode) -> Decision;
}

/// Non-interactive provider that confirms every action.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl DecisionProvider for AutoConfirm {
    fn decide(&self, _record: &FileRecord, _action: &ActionMode) -> Decision {
        Decision::Proceed
    }
}

/// Non-interactive provider that declines every action.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDecline;

impl DecisionProvider for AutoDecline {
    fn decide(&self, _record: &FileRecord, _action: &ActionMode) -> Decision {
        Decision::Skip
    }
}

/// Asks `Delete <path>? [y/N/q]` for each file.
///
/// `y` proceeds, `q` stops the run, anything else skips. End of input stops.
pub struct TerminalPrompt {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl TerminalPrompt {
    /// Prompt on stdin/stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::with_io(io::BufReader::new(io::stdin()), io::stderr())
    }

    /// Prompt on arbitrary streams.
    #[must_use]
    pub fn with_io(
        input: impl BufRead + Send + 'static,
        output: impl Write + Send + 'static,
    ) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    fn ask(&self, question: &str) -> io::Result<Option<String>> {
        {
            let mut out = self
                .output
                .lock()
                .map_err(|_| io::Error::other("prompt output poisoned"))?;
            write!(out, "{question} [y/N/q] ")?;
            out.flush()?;
        }

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .map_err(|_| io::Error::other("prompt input poisoned"))?
            .read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim().to_lowercase()))
    }
}

impl std::fmt::Debug for TerminalPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPrompt").finish_non_exhaustive()
    }
}

impl DecisionProvider for TerminalPrompt {
    fn decide(&self, record: &FileRecord, action: &ActionMode) -> Decision {
        let verb = match action {
            ActionMode::Delete => "Delete",
            ActionMode::Move(_) => "Move",
            ActionMode::ReportOnly => return Decision::Proceed,
        };

        match self.ask(&format!("{verb} {}?", record.path.display())) {
            Ok(Some(answer)) => match answer.as_str() {
                "y" | "yes" => Decision::Proceed,
                "q" | "quit" => Decision::Stop,
                _ => Decision::Skip,
            },
            Ok(None) => Decision::Stop,
            Err(e) => {
                log::warn!("Prompt failed ({e}); stopping");
                Decision::Stop
            }
        }
    }
}

/// Result of processing one removable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The removable file
    pub record: FileRecord,
    /// Whether the action was applied (or would be, in a dry run)
    pub succeeded: bool,
    /// Whether the decision provider declined the action
    pub declined: bool,
    /// Failure message when the action failed
    pub error: Option<String>,
    /// Quarantine destination for moves
    pub destination: Option<PathBuf>,
}

impl ActionOutcome {
    fn success(record: &FileRecord, destination: Option<PathBuf>) -> Self {
        Self {
            record: record.clone(),
            succeeded: true,
            declined: false,
            error: None,
            destination,
        }
    }

    fn failure(record: &FileRecord, error: &ActionError) -> Self {
        Self {
            record: record.clone(),
            succeeded: false,
            declined: false,
            error: Some(error.to_string()),
            destination: None,
        }
    }

    fn declined(record: &FileRecord) -> Self {
        Self {
            record: record.clone(),
            succeeded: false,
            declined: true,
            error: None,
            destination: None,
        }
    }

    /// Whether this outcome represents an action error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything the executor did.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// One outcome per removable file processed, in plan order
    pub outcomes: Vec<ActionOutcome>,
    /// Bytes actually freed on disk
    pub bytes_reclaimed: u64,
    /// Whether cancellation or a `Stop` decision ended the run early
    pub interrupted: bool,
}

impl ExecutionResult {
    /// Number of successful outcomes.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Number of failed outcomes.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }

    /// Number of declined files.
    #[must_use]
    pub fn declined_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.declined).count()
    }
}

/// Applies or simulates duplicate plans.
pub struct ActionExecutor {
    root: PathBuf,
    dry_run: bool,
    decisions: Arc<dyn DecisionProvider>,
    events: Arc<dyn EventSink>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ActionExecutor {
    /// Executor for plans built from a scan of `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            decisions: Arc::new(AutoConfirm),
            events: Arc::new(LogSink),
            shutdown_flag: None,
        }
    }

    /// Simulate instead of mutating.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the decision provider.
    #[must_use]
    pub fn with_decision_provider(mut self, decisions: Arc<dyn DecisionProvider>) -> Self {
        self.decisions = decisions;
        self
    }

    /// Set the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root the plans were built from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Process every removable file of every plan.
    ///
    /// Files not reached because of cancellation get no outcome.
    #[must_use]
    pub fn execute(&self, plans: &[DuplicatePlan]) -> ExecutionResult {
        let total: usize = plans.iter().map(|p| p.removable.len()).sum();
        let mut result = ExecutionResult::default();

        self.events.on_phase_start(Phase::Execute, total);
        log::info!(
            "{} {} file(s) across {} group(s)",
            if self.dry_run { "Simulating" } else { "Processing" },
            total,
            plans.len()
        );

        'plans: for plan in plans {
            for record in &plan.removable {
                if self.is_shutdown_requested() {
                    log::info!("Execution interrupted");
                    result.interrupted = true;
                    break 'plans;
                }

                let outcome = match self.process(plan, record) {
                    Some(outcome) => outcome,
                    None => {
                        log::info!("Stopped by user");
                        result.interrupted = true;
                        break 'plans;
                    }
                };

                if outcome.succeeded && !self.dry_run && plan.action.is_mutating() {
                    result.bytes_reclaimed += record.size;
                }
                self.events
                    .on_progress(Phase::Execute, result.outcomes.len() + 1, &record.path);
                self.events.on_outcome(&outcome);
                result.outcomes.push(outcome);
            }
        }

        self.events.on_phase_end(Phase::Execute);
        result
    }

    /// `None` means the decision provider asked to stop.
    fn process(&self, plan: &DuplicatePlan, record: &FileRecord) -> Option<ActionOutcome> {
        let action = &plan.action;
        if !action.is_mutating() {
            return Some(ActionOutcome::success(record, None));
        }

        if self.dry_run {
            let destination = action
                .destination()
                .and_then(|q| quarantine_destination(&record.path, &self.root, q).ok());
            log::debug!("[dry-run] would {action}: {}", record.path.display());
            return Some(ActionOutcome::success(record, destination));
        }

        if let Err(e) = verify_keeper(&plan.keeper) {
            return Some(ActionOutcome::failure(record, &e));
        }

        match self.decisions.decide(record, action) {
            Decision::Proceed => {}
            Decision::Skip => return Some(ActionOutcome::declined(record)),
            Decision::Stop => return None,
        }

        Some(match self.apply(&plan.keeper, record, action) {
            Ok(destination) => ActionOutcome::success(record, destination),
            Err(e) => ActionOutcome::failure(record, &e),
        })
    }

    fn apply(
        &self,
        keeper: &FileRecord,
        record: &FileRecord,
        action: &ActionMode,
    ) -> Result<Option<PathBuf>, ActionError> {
        verify_keeper(keeper)?;
        FileSnapshot::from_record(record).verify()?;

        match action {
            ActionMode::Delete => delete_file(&record.path).map(|()| None),
            ActionMode::Move(quarantine) => {
                move_to_quarantine(&record.path, &self.root, quarantine).map(Some)
            }
            ActionMode::ReportOnly => Ok(None),
        }
    }
}

/// The kept copy must still match its scan snapshot before any sibling goes.
fn verify_keeper(keeper: &FileRecord) -> Result<(), ActionError> {
    FileSnapshot::from_record(keeper).verify().map_err(|e| {
        log::warn!("Keeper {} failed verification: {e}", keeper.path.display());
        ActionError::KeeperChanged(keeper.path.clone())
    })
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("root", &self.root)
            .field("dry_run", &self.dry_run)
            .field("shutdown_flag", &self.shutdown_flag)
            .finish_non_exhaustive()
    }
}
