//! Size bucketing and content-hash groups.
//!
//! # Overview
//!
//! Size grouping is the first filter of duplicate detection. Files with
//! different sizes cannot be duplicates, so every bucket holding a single
//! file is dropped before any byte is read. Zero-length files form an
//! ordinary bucket: they are hashed like everything else and all share the
//! digest of empty input.
//!
//! # Example
//!
//! ```
//! use dupeguard::scanner::FileRecord;
//! use dupeguard::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let (buckets, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(buckets.len(), 1);
//! ```

use std::collections::BTreeMap;

use crate::scanner::{Digest, FileRecord, HashAlgorithm};

/// Files sharing one exact size, keyed by that size.
pub type SizeBuckets = BTreeMap<u64, Vec<FileRecord>>;

/// Statistics from the size filtering phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of distinct file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton buckets)
    pub eliminated_unique: usize,
    /// Number of zero-length files encountered
    pub empty_files: usize,
    /// Number of size buckets with 2+ files
    pub candidate_buckets: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by exact size, discarding singleton buckets.
///
/// Records inside a bucket keep their arrival order.
///
/// # Example
///
/// ```
/// use dupeguard::scanner::FileRecord;
/// use dupeguard::duplicates::group_by_size;
/// use std::path::PathBuf;
/// use std::time::SystemTime;
///
/// let files = vec![
///     FileRecord::new(PathBuf::from("/a.txt"), 100, SystemTime::now()),
///     FileRecord::new(PathBuf::from("/b.txt"), 100, SystemTime::now()),
///     FileRecord::new(PathBuf::from("/c.txt"), 200, SystemTime::now()),
/// ];
///
/// let (buckets, stats) = group_by_size(files);
///
/// assert_eq!(buckets.len(), 1);
/// assert_eq!(buckets[&100].len(), 2);
/// assert_eq!(stats.eliminated_unique, 1);
/// ```
#[must_use]
pub fn group_by_size(files: impl IntoIterator<Item = FileRecord>) -> (SizeBuckets, GroupingStats) {
    let mut all_buckets = SizeBuckets::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;
        if file.size == 0 {
            stats.empty_files += 1;
        }
        all_buckets.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_buckets.len();

    let buckets: SizeBuckets = all_buckets
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.candidate_buckets += 1;
                log::debug!("Size bucket {} bytes: {} candidates", size, files.len());
                true
            }
        })
        .collect();

    log::info!(
        "Size filter: {} files -> {} candidates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (buckets, stats)
}

/// Files sharing one digest under one algorithm.
///
/// When collision verification ran, members are also byte-equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashGroup {
    /// Shared content digest
    pub digest: Digest,
    /// Members, ordered by path
    pub members: Vec<FileRecord>,
}

impl HashGroup {
    /// Create a group; members are sorted by path.
    #[must_use]
    pub fn new(digest: Digest, mut members: Vec<FileRecord>) -> Self {
        members.sort_by(|a, b| a.path.cmp(&b.path));
        Self { digest, members }
    }

    /// Algorithm of the shared digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.digest.algorithm()
    }

    /// Size shared by every member.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.members.first().map_or(0, |f| f.size)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A group of fewer than two files is not a duplicate set.
    #[must_use]
    pub fn is_duplicate_set(&self) -> bool {
        self.members.len() > 1
    }

    /// Bytes freed by keeping one copy and removing the rest.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size() * self.members.len().saturating_sub(1) as u64
    }
}
