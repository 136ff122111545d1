//! Pipeline event reporting.
//!
//! Every stage receives an [`EventSink`] explicitly and reports phase
//! boundaries, per-file progress, recovered errors and action outcomes
//! through it. There is no process-wide progress state.
//!
//! # Example
//!
//! ```
//! use dupeguard::events::{EventSink, Phase};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl EventSink for Counter {
//!     fn on_phase_start(&self, _phase: Phase, _total: usize) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//! ```

use std::fmt;
use std::path::Path;

use crate::actions::ActionOutcome;
use crate::scanner::{HashError, ScanError};

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Directory traversal
    Scan,
    /// Size bucketing
    SizeFilter,
    /// Content hashing
    Hash,
    /// Byte-for-byte collision verification
    Verify,
    /// Applying or simulating actions
    Execute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::SizeFilter => "size-filter",
            Self::Hash => "hash",
            Self::Verify => "verify",
            Self::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Receiver for pipeline events.
///
/// All methods default to no-ops. Hashing runs on a worker pool, so
/// implementations must tolerate concurrent calls.
pub trait EventSink: Send + Sync {
    /// Called when a phase starts. `total` is 0 when unknown up front.
    fn on_phase_start(&self, _phase: Phase, _total: usize) {}

    /// Called for each item a phase processes.
    fn on_progress(&self, _phase: Phase, _current: usize, _path: &Path) {}

    /// Called when a file is skipped during traversal.
    fn on_scan_error(&self, _error: &ScanError) {}

    /// Called when a file is excluded because it could not be read.
    fn on_hash_error(&self, _error: &HashError) {}

    /// Called after each removable file is processed.
    fn on_outcome(&self, _outcome: &ActionOutcome) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, _phase: Phase) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

/// Sink that forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        if total > 0 {
            log::info!("Phase {phase}: {total} item(s)");
        } else {
            log::info!("Phase {phase} started");
        }
    }

    fn on_progress(&self, phase: Phase, current: usize, path: &Path) {
        log::trace!("[{phase}] #{current} {}", path.display());
    }

    fn on_scan_error(&self, error: &ScanError) {
        log::warn!("Skipped during scan: {error}");
    }

    fn on_hash_error(&self, error: &HashError) {
        log::warn!("Excluded from grouping: {error}");
    }

    fn on_outcome(&self, outcome: &ActionOutcome) {
        match &outcome.error {
            Some(err) => log::warn!("Action failed for {}: {err}", outcome.record.path.display()),
            None if outcome.declined => {
                log::info!("Declined: {}", outcome.record.path.display());
            }
            None => log::debug!("Processed: {}", outcome.record.path.display()),
        }
    }

    fn on_phase_end(&self, phase: Phase) {
        log::debug!("Phase {phase} finished");
    }
}
