//! Command-line interface definitions for dupeguard.
//!
//! This module defines all CLI arguments using the clap derive API. Options
//! that also exist in the config file are optional here so that an unset
//! flag leaves the file or environment value in place.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates directly under ~/Downloads
//! dupeguard ~/Downloads
//!
//! # Recursive scan, SHA-256, JSON report
//! dupeguard -r -a strong --format json ~/Downloads
//!
//! # Preview quarantining everything but the oldest copy
//! dupeguard -r --keep oldest --action move:/tmp/quarantine --dry-run ~/Photos
//!
//! # Delete duplicates without the confirmation prompt
//! dupeguard -r --action delete --yes ~/Photos
//! ```

use clap::{Args, Parser};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::duplicates::{ActionMode, KeepRule};
use crate::output::OutputFormat;
use crate::scanner::HashAlgorithm;

/// Content-addressed duplicate file finder.
///
/// dupeguard groups files by identical content (size filter, then a full
/// content digest), keeps one file per group and deletes, quarantines or
/// just reports the rest.
#[derive(Debug, Parser)]
#[command(name = "dupeguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Arguments controlling one scan.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan for duplicates
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Digest algorithm: fast (MD5) or strong (SHA-256)
    #[arg(short, long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Which file of each group to keep
    #[arg(short, long, value_enum, value_name = "RULE")]
    pub keep: Option<KeepRule>,

    /// What to do with the other files: delete, move:<DEST> or report-only
    #[arg(long, value_name = "ACTION", default_value = "report-only")]
    pub action: ActionMode,

    /// Show what would happen without changing any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Byte-by-byte verification after a digest match
    ///
    /// Slower but guarantees no hash collisions.
    #[arg(long)]
    pub verify: bool,

    /// Number of I/O threads for hashing (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Follow symbolic links during scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Confirm each delete or move on the terminal
    #[arg(short, long, conflicts_with = "yes")]
    pub interactive: bool,

    /// Skip the confirmation prompt before deleting files
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl ScanArgs {
    /// Values that override config file and environment settings.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            recursive: self.recursive.then_some(true),
            algorithm: self.algorithm,
            min_size: self.min_size,
            keep: self.keep,
            io_threads: self.io_threads,
            verify: self.verify.then_some(true),
            follow_symlinks: self.follow_symlinks.then_some(true),
            chunk_size: None,
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupeguard::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    // 2^64 is exactly representable; anything at or above it does not fit.
    let bytes = (num * multiplier as f64).round();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(format!("Size too large: '{s}'"));
    }

    Ok(bytes as u64)
}
