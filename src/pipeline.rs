//! End-to-end pipeline: scan, size filter, hash, group, plan, execute, report.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::actions::{ActionExecutor, AutoConfirm, DecisionProvider};
use crate::config::PipelineOptions;
use crate::duplicates::{plan_groups, DuplicateFinder, DuplicatePlan, FinderError, ScanSummary};
use crate::events::{EventSink, LogSink};
use crate::output::{Report, ReportGenerator};

/// One configured run over a root directory.
pub struct Pipeline {
    options: PipelineOptions,
    events: Arc<dyn EventSink>,
    decisions: Arc<dyn DecisionProvider>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    /// Pipeline with log-backed events and automatic confirmation.
    #[must_use]
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            events: Arc::new(LogSink),
            decisions: Arc::new(AutoConfirm),
            shutdown_flag: None,
        }
    }

    /// Set the event sink shared by every stage.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Set the decision provider consulted before each mutation.
    #[must_use]
    pub fn with_decision_provider(mut self, decisions: Arc<dyn DecisionProvider>) -> Self {
        self.decisions = decisions;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Options this pipeline runs with.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Scan and plan without executing anything.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the root cannot be scanned at all.
    pub fn plan(&self) -> Result<(Vec<DuplicatePlan>, ScanSummary), FinderError> {
        let mut config = self.options.finder_config().with_events(self.events.clone());
        if let Some(ref flag) = self.shutdown_flag {
            config = config.with_shutdown_flag(flag.clone());
        }

        let (groups, summary) = DuplicateFinder::new(config).find_duplicates(&self.options.root)?;
        let plans = plan_groups(&groups, self.options.settings.keep, &self.options.action);
        Ok((plans, summary))
    }

    /// Run every stage and return the report.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the root cannot be scanned at all. Every
    /// per-file problem is recorded in the report instead.
    pub fn run(&self) -> Result<Report, FinderError> {
        let (plans, summary) = self.plan()?;
        Ok(self.execute(&plans, &summary))
    }

    /// Execute already computed plans and build the report.
    #[must_use]
    pub fn execute(&self, plans: &[DuplicatePlan], summary: &ScanSummary) -> Report {
        let mut executor = ActionExecutor::new(&self.options.root)
            .with_dry_run(self.options.dry_run)
            .with_decision_provider(self.decisions.clone())
            .with_events(self.events.clone());
        if let Some(ref flag) = self.shutdown_flag {
            executor = executor.with_shutdown_flag(flag.clone());
        }

        let execution = executor.execute(plans);
        ReportGenerator::new(
            self.options.dry_run,
            self.options.action.clone(),
            self.options.settings.algorithm,
        )
        .generate(plans, summary, &execution)
    }
}
