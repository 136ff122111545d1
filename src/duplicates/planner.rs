//! Keeper selection and action planning.
//!
//! Planning is a pure function of the groups, the keep rule and the action:
//! the same inputs always produce the same plans, so a dry run predicts a
//! real run exactly.
//!
//! # Example
//!
//! ```
//! use dupeguard::duplicates::{plan_groups, ActionMode, HashGroup, KeepRule};
//! use dupeguard::scanner::{Digest, FileRecord, HashAlgorithm};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let now = SystemTime::now();
//! let group = HashGroup::new(
//!     Digest::new(HashAlgorithm::Fast, vec![0; 16]),
//!     vec![
//!         FileRecord::new(PathBuf::from("/b.txt"), 1, now),
//!         FileRecord::new(PathBuf::from("/a.txt"), 1, now),
//!     ],
//! );
//!
//! let plans = plan_groups(&[group], KeepRule::FirstPath, &ActionMode::ReportOnly);
//! assert_eq!(plans[0].keeper.path, PathBuf::from("/a.txt"));
//! assert_eq!(plans[0].removable.len(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::groups::HashGroup;
use crate::scanner::FileRecord;

/// Rule for choosing the one file to keep in each group.
///
/// Every rule falls back to path order on ties.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum KeepRule {
    /// Earliest modification time
    Oldest,
    /// Fewest bytes in the path
    ShortestPath,
    /// Lexicographically first path
    #[default]
    FirstPath,
}

impl KeepRule {
    /// Total order over records: the minimum is the keeper.
    fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        let primary = match self {
            Self::Oldest => a.modified.cmp(&b.modified),
            Self::ShortestPath => a.path.as_os_str().len().cmp(&b.path.as_os_str().len()),
            Self::FirstPath => Ordering::Equal,
        };
        primary.then_with(|| a.path.cmp(&b.path))
    }
}

impl fmt::Display for KeepRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Oldest => "oldest",
            Self::ShortestPath => "shortest-path",
            Self::FirstPath => "first-path",
        };
        f.write_str(name)
    }
}

/// Plan-wide action applied to every removable file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ActionMode {
    /// Remove the file permanently
    Delete,
    /// Move the file into a quarantine directory
    Move(PathBuf),
    /// Only report; never touch the filesystem
    #[default]
    ReportOnly,
}

impl ActionMode {
    /// Whether this action changes the filesystem.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::ReportOnly)
    }

    /// Quarantine directory for [`ActionMode::Move`].
    #[must_use]
    pub fn destination(&self) -> Option<&std::path::Path> {
        match self {
            Self::Move(dest) => Some(dest),
            _ => None,
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => f.write_str("delete"),
            Self::Move(dest) => write!(f, "move:{}", dest.display()),
            Self::ReportOnly => f.write_str("report-only"),
        }
    }
}

/// Error parsing an action string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid action '{0}': expected delete, move:<DEST> or report-only")]
pub struct ParseActionError(pub String);

impl FromStr for ActionMode {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "delete" => return Ok(Self::Delete),
            "report-only" | "report" => return Ok(Self::ReportOnly),
            _ => {}
        }
        match trimmed.split_once(':') {
            Some((kind, dest)) if kind.eq_ignore_ascii_case("move") && !dest.is_empty() => {
                Ok(Self::Move(PathBuf::from(dest)))
            }
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}

/// Keeper and removables for one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePlan {
    /// The group this plan covers
    pub group: HashGroup,
    /// The one member left untouched
    pub keeper: FileRecord,
    /// Every other member, ordered by path
    pub removable: Vec<FileRecord>,
    /// Action applied to the removables
    pub action: ActionMode,
}

impl DuplicatePlan {
    /// Bytes freed if every removable is processed.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.removable.iter().map(|f| f.size).sum()
    }
}

/// Index of the keeper among `members`, or `None` when empty.
#[must_use]
pub fn select_keeper(members: &[FileRecord], rule: KeepRule) -> Option<usize> {
    members
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| rule.compare(a, b))
        .map(|(i, _)| i)
}

/// Build a plan for every group with two or more members.
///
/// Groups with fewer members are not duplicate sets and are skipped.
#[must_use]
pub fn plan_groups(groups: &[HashGroup], rule: KeepRule, action: &ActionMode) -> Vec<DuplicatePlan> {
    groups
        .iter()
        .filter(|g| g.is_duplicate_set())
        .filter_map(|group| {
            let keeper_idx = select_keeper(&group.members, rule)?;
            let keeper = group.members[keeper_idx].clone();
            let removable: Vec<FileRecord> = group
                .members
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != keeper_idx)
                .map(|(_, f)| f.clone())
                .collect();

            log::debug!(
                "Plan {}: keep {}, {} removable",
                group.digest.to_hex(),
                keeper.path.display(),
                removable.len()
            );

            Some(DuplicatePlan {
                group: group.clone(),
                keeper,
                removable,
                action: action.clone(),
            })
        })
        .collect()
}
