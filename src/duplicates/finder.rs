//! Duplicate finder implementation with two-phase detection.
//!
//! # Overview
//!
//! This module orchestrates the detection pipeline:
//! 1. **Scan**: walk the root and collect [`FileRecord`]s
//! 2. **Size filter**: bucket by size (see [`crate::duplicates::groups`])
//! 3. **Hash**: stream every candidate through the chosen digest on a
//!    bounded worker pool
//! 4. **Group**: merge by digest, optionally splitting collisions by
//!    byte-for-byte comparison
//!
//! Recoverable per-file problems never abort the run; they are collected in
//! the [`ScanSummary`]. Cancellation stops scanning and hashing promptly and
//! returns whatever groups were completely built.
//!
//! # Example
//!
//! ```no_run
//! use dupeguard::duplicates::{DuplicateFinder, FinderConfig};
//! use dupeguard::scanner::HashAlgorithm;
//! use std::path::Path;
//!
//! let config = FinderConfig::default()
//!     .with_algorithm(HashAlgorithm::Strong)
//!     .with_io_threads(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//! println!("Found {} duplicate groups", summary.duplicate_groups);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::groups::{group_by_size, HashGroup, SizeBuckets};
use crate::events::{EventSink, LogSink, Phase};
use crate::scanner::{
    collapse_aliases, Digest, FileRecord, HashAlgorithm, HashError, Hasher, ScanError, Walker, WalkerConfig,
    DEFAULT_CHUNK_SIZE,
};

/// Threshold for logging large files.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024; // 100MB

/// Result of the hashing stage.
#[derive(Debug, Default)]
pub struct HashStageResult {
    /// Successfully hashed candidates, in completion order
    pub hashed: Vec<(FileRecord, Digest)>,
    /// Files excluded because reading failed
    pub errors: Vec<HashError>,
    /// Total bytes read
    pub bytes_hashed: u64,
    /// Whether cancellation cut the stage short
    pub interrupted: bool,
}

/// Hash every candidate in the size buckets on a bounded worker pool.
///
/// Completion order is unspecified. A failed read excludes the file and
/// records a [`HashError`]; it is never treated as a match.
#[must_use]
pub fn hash_candidates(
    buckets: SizeBuckets,
    hasher: &Hasher,
    io_threads: usize,
    events: &dyn EventSink,
) -> HashStageResult {
    let candidates: Vec<FileRecord> = buckets.into_values().flatten().collect();
    let mut result = HashStageResult::default();

    if candidates.is_empty() {
        log::debug!("Hash: No candidates to process");
        return result;
    }

    events.on_phase_start(Phase::Hash, candidates.len());
    log::info!(
        "Hashing {} candidate(s) with {} on {} thread(s)",
        candidates.len(),
        hasher.algorithm().digest_name(),
        io_threads
    );

    let counter = AtomicUsize::new(0);
    let hash_one = |file: FileRecord| -> (FileRecord, Result<Digest, HashError>) {
        let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
        events.on_progress(Phase::Hash, current, &file.path);

        if file.size > LARGE_FILE_THRESHOLD {
            log::debug!(
                "Hashing large file ({} MB): {}",
                file.size / (1024 * 1024),
                file.path.display()
            );
        }

        let digest = hasher.hash_record(&file);
        (file, digest)
    };

    let outcomes: Vec<(FileRecord, Result<Digest, HashError>)> =
        match rayon::ThreadPoolBuilder::new()
            .num_threads(io_threads.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| candidates.into_par_iter().map(&hash_one).collect()),
            Err(e) => {
                log::warn!(
                    "Failed to create hashing pool ({e}), using global pool with {} threads",
                    rayon::current_num_threads()
                );
                candidates.into_par_iter().map(&hash_one).collect()
            }
        };

    for (file, digest) in outcomes {
        match digest {
            Ok(digest) => {
                result.bytes_hashed += file.size;
                result.hashed.push((file, digest));
            }
            Err(e) if e.is_interrupted() => result.interrupted = true,
            Err(e) => {
                events.on_hash_error(&e);
                result.errors.push(e);
            }
        }
    }

    events.on_phase_end(Phase::Hash);
    result
}

/// Result of grouping hashed records.
#[derive(Debug, Default)]
pub struct GroupStageResult {
    /// Every group, including single-member ones
    pub groups: Vec<HashGroup>,
    /// Files dropped because verification could not read them
    pub errors: Vec<HashError>,
    /// Number of digest classes that verification split apart
    pub collisions: usize,
    /// Whether cancellation cut verification short
    pub interrupted: bool,
}

/// Merge hashed records into [`HashGroup`]s keyed by `(algorithm, digest)`.
///
/// Arrival order is irrelevant. When `verifier` is given, members sharing a
/// digest are compared byte for byte and split into classes of actual
/// equality; otherwise digest equality is trusted as content equality.
/// Groups are returned largest size first, ties by first member path.
#[must_use]
pub fn build_groups(
    hashed: Vec<(FileRecord, Digest)>,
    verifier: Option<&Hasher>,
    events: &dyn EventSink,
) -> GroupStageResult {
    let mut by_digest: HashMap<Digest, Vec<FileRecord>> = HashMap::new();
    for (file, digest) in hashed {
        by_digest.entry(digest).or_default().push(file);
    }

    let mut result = GroupStageResult::default();

    match verifier {
        None => {
            result.groups = by_digest
                .into_iter()
                .map(|(digest, members)| HashGroup::new(digest, members))
                .collect();
        }
        Some(hasher) => {
            let to_verify = by_digest.values().filter(|m| m.len() > 1).count();
            events.on_phase_start(Phase::Verify, to_verify);

            let mut current = 0;
            for (digest, members) in by_digest {
                if members.len() < 2 {
                    result.groups.push(HashGroup::new(digest, members));
                    continue;
                }
                if result.interrupted {
                    continue;
                }

                current += 1;
                events.on_progress(Phase::Verify, current, &members[0].path);

                let Some((classes, errors)) = split_by_content(members, hasher) else {
                    log::info!("Verification interrupted; unverified groups dropped");
                    result.interrupted = true;
                    continue;
                };
                for e in &errors {
                    events.on_hash_error(e);
                }
                result.errors.extend(errors);

                if classes.len() > 1 {
                    result.collisions += 1;
                    log::warn!(
                        "Digest collision on {}: split into {} groups",
                        digest.to_hex(),
                        classes.len()
                    );
                }
                result.groups.extend(
                    classes
                        .into_iter()
                        .map(|members| HashGroup::new(digest.clone(), members)),
                );
            }

            events.on_phase_end(Phase::Verify);
        }
    }

    result.groups.sort_by(|a, b| {
        b.size()
            .cmp(&a.size())
            .then_with(|| a.members[0].path.cmp(&b.members[0].path))
    });
    result
}

/// Partition records into classes of byte-equal content.
///
/// Returns `None` if cancellation was requested mid-comparison.
fn split_by_content(
    members: Vec<FileRecord>,
    hasher: &Hasher,
) -> Option<(Vec<Vec<FileRecord>>, Vec<HashError>)> {
    let mut classes: Vec<Vec<FileRecord>> = Vec::new();
    let mut errors = Vec::new();

    'records: for record in members {
        let mut i = 0;
        while i < classes.len() {
            match hasher.files_equal(&classes[i][0].path, &record.path) {
                Ok(true) => {
                    classes[i].push(record);
                    continue 'records;
                }
                Ok(false) => i += 1,
                Err(e) if e.is_interrupted() => return None,
                Err(e) if e.path() == record.path => {
                    errors.push(e);
                    continue 'records;
                }
                Err(e) => {
                    // The class representative became unreadable; drop it and
                    // compare against the next member of that class.
                    errors.push(e);
                    classes[i].remove(0);
                    if classes[i].is_empty() {
                        classes.remove(i);
                    }
                }
            }
        }
        classes.push(vec![record]);
    }

    Some((classes, errors))
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Number of worker threads for hashing. Bounds open files and buffers.
    pub io_threads: usize,
    /// Byte-for-byte verification of digest matches.
    pub verify: bool,
    /// Read buffer size for hashing and verification.
    pub chunk_size: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Event receiver.
    pub events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("algorithm", &self.algorithm)
            .field("io_threads", &self.io_threads)
            .field("verify", &self.verify)
            .field("chunk_size", &self.chunk_size)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("events", &"<sink>")
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            io_threads: 4,
            verify: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            events: Arc::new(LogSink),
        }
    }
}

impl FinderConfig {
    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the hashing pool size.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Enable byte-for-byte collision verification.
    #[must_use]
    pub fn with_verify(mut self, enabled: bool) -> Self {
        self.verify = enabled;
        self
    }

    /// Set the read buffer size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Hard links and followed symlinks dropped as aliases of another path
    pub aliases_skipped: usize,
    /// Files eliminated by size filtering
    pub eliminated_by_size: usize,
    /// Files successfully hashed
    pub hashed_files: usize,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Digest classes split by verification
    pub collisions: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Duplicate files (excluding one keeper per group)
    pub duplicate_files: usize,
    /// Space reclaimable by removing duplicates
    pub reclaimable_space: u64,
    /// Files skipped during traversal
    pub scan_errors: Vec<ScanError>,
    /// Files excluded because they could not be read
    pub hash_errors: Vec<HashError>,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Duration of the entire scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Number of files skipped because of a scan or hash error.
    #[must_use]
    pub fn skipped_files(&self) -> usize {
        self.scan_errors.len() + self.hash_errors.len()
    }
}

/// Fatal errors that prevent the pipeline from starting.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root itself could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Root path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Orchestrates scan, size filter, hashing and grouping.
///
/// # Example
///
/// ```no_run
/// use dupeguard::duplicates::DuplicateFinder;
/// use std::path::Path;
///
/// let finder = DuplicateFinder::with_defaults();
/// match finder.find_duplicates(Path::new(".")) {
///     Ok((groups, summary)) => {
///         println!("Found {} duplicate groups", groups.len());
///         println!("Can reclaim {} bytes", summary.reclaimable_space);
///     }
///     Err(e) => eprintln!("Scan failed: {}", e),
/// }
/// ```
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new(config.algorithm).with_chunk_size(config.chunk_size);
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(flag.clone());
        }
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find all duplicate groups under `root`.
    ///
    /// Only groups with two or more members are returned.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the root does not exist, is not a
    /// directory, or cannot be read. Everything below the root is recovered
    /// locally and reported in the summary.
    pub fn find_duplicates(
        &self,
        root: &Path,
    ) -> Result<(Vec<HashGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FinderError::PathNotFound(root.to_path_buf()),
            _ => FinderError::Io {
                path: root.to_path_buf(),
                source: e,
            },
        })?;
        if !metadata.is_dir() {
            return Err(FinderError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(|e| FinderError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;

        log::info!("Starting duplicate scan of {}", root.display());
        let events = self.config.events.as_ref();

        let mut walker = Walker::new(root, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        events.on_phase_start(Phase::Scan, 0);
        let mut files = Vec::new();
        let mut scan_errors = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    events.on_progress(Phase::Scan, files.len() + 1, &file.path);
                    files.push(file);
                }
                Err(e) => {
                    events.on_scan_error(&e);
                    scan_errors.push(e);
                }
            }
        }
        events.on_phase_end(Phase::Scan);

        let (groups, mut summary) = self.find_duplicates_from_files(files);
        summary.scan_errors = scan_errors;
        summary.interrupted |= self.config.is_shutdown_requested();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} files, {} duplicate groups, {} reclaimable bytes in {:.2?}",
            summary.total_files,
            summary.duplicate_groups,
            summary.reclaimable_space,
            summary.scan_duration
        );

        Ok((groups, summary))
    }

    /// Run size filter, hashing and grouping over an already collected list
    /// of files.
    ///
    /// Only groups with two or more members are returned. `scan_errors` and
    /// `scan_duration` are left empty for the caller to fill in.
    #[must_use]
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<FileRecord>,
    ) -> (Vec<HashGroup>, ScanSummary) {
        let events = self.config.events.as_ref();
        let mut summary = ScanSummary::default();

        if self.config.is_shutdown_requested() {
            summary.total_files = files.len();
            summary.interrupted = true;
            return (Vec::new(), summary);
        }

        let (files, aliases) = collapse_aliases(files);
        summary.aliases_skipped = aliases.len();
        if !aliases.is_empty() {
            log::info!("Skipped {} hard link or symlink alias(es)", aliases.len());
        }

        events.on_phase_start(Phase::SizeFilter, files.len());
        let (buckets, size_stats) = group_by_size(files);
        events.on_phase_end(Phase::SizeFilter);

        summary.total_files = size_stats.total_files + summary.aliases_skipped;
        summary.total_size = size_stats.total_size;
        summary.eliminated_by_size = size_stats.eliminated_unique;

        let hashing = hash_candidates(buckets, &self.hasher, self.config.io_threads, events);
        summary.hashed_files = hashing.hashed.len();
        summary.bytes_hashed = hashing.bytes_hashed;
        summary.hash_errors = hashing.errors;
        summary.interrupted = hashing.interrupted;

        let verifier = self.config.verify.then_some(&self.hasher);
        let grouping = build_groups(hashing.hashed, verifier, events);
        summary.hash_errors.extend(grouping.errors);
        summary.collisions = grouping.collisions;
        summary.interrupted |= grouping.interrupted;

        let groups: Vec<HashGroup> = grouping
            .groups
            .into_iter()
            .filter(HashGroup::is_duplicate_set)
            .collect();

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(|g| g.len() - 1).sum();
        summary.reclaimable_space = groups.iter().map(HashGroup::wasted_space).sum();

        (groups, summary)
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::with_defaults()
    }
}
