//! dupeguard - content-addressed duplicate file finder
//!
//! Files are bucketed by size, hashed in full with a selected digest
//! (MD5 for speed, SHA-256 for adversarial input) and grouped by digest,
//! optionally verified byte for byte. One keeper per group is chosen by a
//! deterministic rule and the rest are deleted, quarantined or reported,
//! with dry-run simulation and per-file fault isolation.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod events;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod signal;

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::actions::{AutoConfirm, AutoDecline, DecisionProvider, TerminalPrompt};
use crate::cli::Cli;
use crate::config::Settings;
use crate::duplicates::{ActionMode, DuplicatePlan};
use crate::error::ExitCode;
use crate::events::LogSink;
use crate::pipeline::Pipeline;

/// Run the application for parsed command-line arguments.
///
/// Logging must already be initialised by the caller.
///
/// # Errors
///
/// Returns [`config::ConfigError`] for invalid configuration,
/// [`duplicates::FinderError`] if the root cannot be scanned, and I/O
/// errors from writing the report.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let handler = signal::install_handler()?;
    let args = cli.scan;

    let settings = Settings::load(cli.config.as_deref(), &args.overrides())?;
    let options = settings.resolve(&args.root, args.action.clone(), args.dry_run)?;
    log::debug!(
        "Resolved options: {options:?} (log level {})",
        logging::current_level_name()
    );

    let mut pipeline = Pipeline::new(options)
        .with_events(Arc::new(LogSink))
        .with_shutdown_flag(handler.get_flag());

    let (plans, summary) = pipeline.plan()?;

    let options = pipeline.options();
    if options.action.is_mutating() && !options.dry_run && !plans.is_empty() {
        let decisions: Arc<dyn DecisionProvider> = if args.interactive {
            Arc::new(TerminalPrompt::stdio())
        } else if options.action == ActionMode::Delete && !args.yes {
            if confirm_batch(&plans)? {
                Arc::new(AutoConfirm)
            } else {
                log::info!("Deletion declined; no files changed");
                Arc::new(AutoDecline)
            }
        } else {
            Arc::new(AutoConfirm)
        };
        pipeline = pipeline.with_decision_provider(decisions);
    }

    let report = pipeline.execute(&plans, &summary);

    match args.report {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create report file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            args.format.write_report(&report, &mut writer)?;
            writer.flush()?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            args.format.write_report(&report, &mut writer)?;
        }
    }

    Ok(report.exit_code())
}

/// One-time confirmation before a real delete.
fn confirm_batch(plans: &[DuplicatePlan]) -> io::Result<bool> {
    let files: usize = plans.iter().map(|p| p.removable.len()).sum();
    let bytes: u64 = plans.iter().map(DuplicatePlan::reclaimable_bytes).sum();

    let mut stderr = io::stderr();
    write!(
        stderr,
        "Permanently delete {files} duplicate file(s) ({})? [y/N] ",
        bytesize::ByteSize::b(bytes)
    )?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
