//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based candidate filtering
//! - Parallel content hashing and digest grouping
//! - Optional byte-for-byte collision verification
//! - Keeper selection and action planning

pub mod finder;
pub mod groups;
pub mod planner;

pub use finder::{
    build_groups, hash_candidates, DuplicateFinder, FinderConfig, FinderError, GroupStageResult,
    HashStageResult, ScanSummary,
};
pub use groups::{group_by_size, GroupingStats, HashGroup, SizeBuckets};
pub use planner::{
    plan_groups, select_keeper, ActionMode, DuplicatePlan, KeepRule, ParseActionError,
};
